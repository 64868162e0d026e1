//! Markdown rendering of topic records.
//!
//! One document per topic. Footnotes are renumbered with a single counter
//! per document: local numbers only mean something inside their own entry,
//! so the local-to-global mapping starts over for every entry while the
//! counter keeps going.

use std::collections::HashMap;

use super::text::wrap_text;
use crate::types::{ContentUnit, Entry, TextRun, TopicRecord};

/// Labels and layout options for rendered documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Attribution line written under the title.
    pub source_line: String,

    /// Label of the entry count line.
    pub entry_count_label: String,

    /// Prefix of each group header, followed by the source title.
    pub group_prefix: String,

    /// Label of the line naming the heading an entry was captured under.
    pub context_label: String,

    /// Heading of the footnote definitions block.
    pub footnotes_heading: String,

    /// Wrap prose at this many characters; `None` keeps one line per
    /// paragraph.
    pub wrap_width: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            source_line: "المصدر: موسوعة التفسير — dorar.net".to_string(),
            entry_count_label: "عدد المقاطع".to_string(),
            group_prefix: "سورة".to_string(),
            context_label: "ضمن".to_string(),
            footnotes_heading: "الحواشي".to_string(),
            wrap_width: None,
        }
    }
}

/// A rendered topic document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Full document text, ending in a newline.
    pub text: String,

    /// Number of footnote definitions; also the highest footnote number.
    pub footnote_count: u32,
}

/// Assigns global footnote numbers across the entries of one document.
#[derive(Debug, Default)]
struct FootnoteNumbering {
    last: u32,
    definitions: Vec<(u32, String)>,
}

impl FootnoteNumbering {
    /// Render a run's text with its local markers rewritten to global
    /// numbers.
    ///
    /// A local number is allocated the first time it is met within the
    /// entry; later references reuse the allocation. Markers without a
    /// footnote body in the entry are dropped.
    fn rewrite(&mut self, run: &TextRun, entry: &Entry, mapping: &mut HashMap<u32, u32>) -> String {
        run.splice_markers(|local| {
            if let Some(global) = mapping.get(&local) {
                return Some(format!("[^{global}]"));
            }
            let Some(body) = entry.footnotes.get(local) else {
                tracing::debug!(local, heading = %entry.heading, "Dropped marker without footnote");
                return None;
            };
            self.last += 1;
            mapping.insert(local, self.last);
            self.definitions.push((self.last, body.to_string()));
            Some(format!("[^{}]", self.last))
        })
    }
}

/// Render one topic as a Markdown document.
///
/// Pure: rendering the same record twice gives identical output.
pub fn render(topic: &TopicRecord, options: &RenderOptions) -> RenderedDocument {
    let mut out = String::new();
    let mut numbering = FootnoteNumbering::default();

    out.push_str(&format!("# {}\n\n", topic.display_title));
    out.push_str(&format!("> {}  \n", options.source_line));
    out.push_str(&format!(
        "> {}: {}\n\n",
        options.entry_count_label,
        topic.entries.len()
    ));
    out.push_str("---\n");

    let mut current_group: Option<&str> = None;
    for entry in &topic.entries {
        if current_group != Some(entry.source_title.as_str()) {
            current_group = Some(entry.source_title.as_str());
            out.push_str(&format!(
                "\n## {} {}\n",
                options.group_prefix, entry.source_title
            ));
        }
        render_entry(&mut out, entry, topic, options, &mut numbering);
    }

    if !numbering.definitions.is_empty() {
        out.push_str(&format!("\n## {}\n\n", options.footnotes_heading));
        for (number, body) in &numbering.definitions {
            out.push_str(&format!("[^{number}]: {body}\n"));
        }
    }

    RenderedDocument {
        text: out,
        footnote_count: numbering.last,
    }
}

fn render_entry(
    out: &mut String,
    entry: &Entry,
    topic: &TopicRecord,
    options: &RenderOptions,
    numbering: &mut FootnoteNumbering,
) {
    out.push_str(&format!("\n### {}\n", entry.page_title));
    if entry.heading != topic.display_title {
        out.push_str(&format!("*{}: {}*\n", options.context_label, entry.heading));
    }

    let mut mapping = HashMap::new();
    for unit in &entry.units {
        match unit {
            ContentUnit::Heading(text) => out.push_str(&format!("\n**{text}**\n")),
            ContentUnit::Subheading(text) => out.push_str(&format!("\n#### {text}\n")),
            ContentUnit::TextRun(run) => {
                let prose = numbering.rewrite(run, entry, &mut mapping);
                if prose.is_empty() {
                    continue;
                }
                let prose = match options.wrap_width {
                    Some(width) => wrap_text(&prose, width),
                    None => prose,
                };
                out.push_str(&format!("\n{prose}\n"));
            }
        }
    }

    out.push_str("\n---\n");
}
