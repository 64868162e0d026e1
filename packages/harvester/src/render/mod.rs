//! Output generation: one Markdown document per topic plus a YAML manifest.

mod markdown;
mod text;
mod writer;

pub use markdown::{render, RenderOptions, RenderedDocument};
pub use text::{should_wrap_text, wrap_text};
pub use writer::{
    sanitize_filename, save_topics, topic_path, write_atomic, FileNamer, Manifest, ManifestTopic,
};
