//! HTML page handling: layout configuration, footnote extraction and
//! segmentation of a page into section fragments.

pub mod config;
pub mod footnotes;
pub mod segmenter;
pub mod utils;

pub use config::{CompiledMarkup, MarkupConfig, NodeKind};
pub use footnotes::{extract_footnotes, BodyNode, ExtractedBody};
pub use segmenter::{split_units, Segmenter};
pub use utils::{get_attribute, get_text, has_any_class, has_class, tag_name};
