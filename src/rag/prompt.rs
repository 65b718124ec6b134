//! Prompt rendering.
//!
//! Rendering is a single left-to-right pass over the template: text that is
//! interpolated into a slot is never scanned for placeholders again, and every
//! user- or index-supplied value is sanitised first so it cannot open a slot or
//! forge a context delimiter.

use crate::retrieval::SearchHit;
use std::borrow::Cow;

/// Slot names filled per request; custom config variables never override them.
pub const CONTEXT_SLOTS: &[&str] = &["question", "context", "index", "title", "guest", "content"];

/// Line used by the default item template to fence each excerpt.
const DELIMITER: &str = "---";

/// A question-answering prompt template.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    user: String,
    item: String,
    separator: String,
}

impl PromptTemplate {
    pub fn new(user: impl Into<String>, item: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            item: item.into(),
            separator: separator.into(),
        }
    }

    /// The user-message template.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Render the prompt for a query and an ordered context.
    pub fn render(&self, query: &str, context: &[SearchHit]) -> String {
        let context_text = context
            .iter()
            .enumerate()
            .map(|(i, hit)| self.render_item(i + 1, hit))
            .collect::<Vec<_>>()
            .join(&self.separator);

        let question = sanitize(query);
        fill(&self.user, |slot| match slot {
            "question" => Some(Cow::Borrowed(question.as_str())),
            "context" => Some(Cow::Borrowed(context_text.as_str())),
            _ => None,
        })
    }

    fn render_item(&self, index: usize, hit: &SearchHit) -> String {
        let title = sanitize(&hit.title);
        let guest = sanitize(&hit.guest);
        let content = sanitize(&hit.content);
        fill(&self.item, |slot| match slot {
            "index" => Some(Cow::Owned(index.to_string())),
            "title" => Some(Cow::Borrowed(title.as_str())),
            "guest" => Some(Cow::Borrowed(guest.as_str())),
            "content" => Some(Cow::Borrowed(content.as_str())),
            _ => None,
        })
    }
}

/// Render `template` for `query` and `context`.
pub fn render(template: &PromptTemplate, query: &str, context: &[SearchHit]) -> String {
    template.render(query, context)
}

/// Neutralise text that could break the template structure.
///
/// No two braces are left adjacent, control characters other than newline and tab are
/// dropped, and lines consisting only of the context delimiter are broken up.
pub fn sanitize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    let mut cleaned = cleaned;
    while cleaned.contains("{{") || cleaned.contains("}}") {
        cleaned = cleaned.replace("{{", "{ {").replace("}}", "} }");
    }

    cleaned
        .split('\n')
        .map(|line| {
            if line.trim().starts_with(DELIMITER) && line.trim().chars().all(|c| c == '-') {
                line.replace('-', "- ").trim_end().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace `{{slot}}` placeholders in one pass; unknown slots are left untouched.
fn fill<'a, F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<Cow<'a, str>>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
