//! Edit plans produced by reflection and their application to prompt text.

use serde::{Deserialize, Serialize};

/// A single textual edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditOperation {
    /// Inserts `text` right after the first occurrence of `after`, or
    /// appends it as a new line when `after` is `None`.
    Insert { after: Option<String>, text: String },
    /// Replaces the first occurrence of `target`.
    Replace { target: String, replacement: String },
    /// Deletes the first occurrence of `target`.
    Delete { target: String },
}

/// An edit with its estimated impact on fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edit {
    pub operation: EditOperation,
    pub impact: f64,
}

impl Edit {
    pub fn insert(text: impl Into<String>, impact: f64) -> Self {
        Self {
            operation: EditOperation::Insert {
                after: None,
                text: text.into(),
            },
            impact,
        }
    }

    pub fn insert_after(after: impl Into<String>, text: impl Into<String>, impact: f64) -> Self {
        Self {
            operation: EditOperation::Insert {
                after: Some(after.into()),
                text: text.into(),
            },
            impact,
        }
    }

    pub fn replace(target: impl Into<String>, replacement: impl Into<String>, impact: f64) -> Self {
        Self {
            operation: EditOperation::Replace {
                target: target.into(),
                replacement: replacement.into(),
            },
            impact,
        }
    }

    pub fn delete(target: impl Into<String>, impact: f64) -> Self {
        Self {
            operation: EditOperation::Delete {
                target: target.into(),
            },
            impact,
        }
    }

    /// Applies this edit, returning `None` when its anchor or target is
    /// absent from `prompt`.
    fn apply_to(&self, prompt: &str) -> Option<String> {
        match &self.operation {
            EditOperation::Insert { after: None, text } => {
                if prompt.is_empty() {
                    Some(text.clone())
                } else {
                    Some(format!("{prompt}\n{text}"))
                }
            }
            EditOperation::Insert {
                after: Some(anchor),
                text,
            } => {
                let at = prompt.find(anchor.as_str())? + anchor.len();
                let mut out = String::with_capacity(prompt.len() + text.len() + 1);
                out.push_str(&prompt[..at]);
                out.push(' ');
                out.push_str(text);
                out.push_str(&prompt[at..]);
                Some(out)
            }
            EditOperation::Replace {
                target,
                replacement,
            } => {
                if target.is_empty() || !prompt.contains(target.as_str()) {
                    return None;
                }
                Some(prompt.replacen(target.as_str(), replacement, 1))
            }
            EditOperation::Delete { target } => {
                if target.is_empty() || !prompt.contains(target.as_str()) {
                    return None;
                }
                Some(tidy_spacing(&prompt.replacen(target.as_str(), "", 1)))
            }
        }
    }
}

/// Collapses space runs and reattaches punctuation left after a removed word.
fn tidy_spacing(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split(' ').filter(|w| !w.is_empty()) {
        let attaches = word.starts_with(['.', ',', ';', ':', '!', '?']);
        if !out.is_empty() && !attaches {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// An ordered list of edits for one prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditPlan {
    pub edits: Vec<Edit>,
}

impl EditPlan {
    pub fn new(edits: Vec<Edit>) -> Self {
        Self { edits }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Applies the edits to `prompt`, highest impact first.
    ///
    /// Edits whose anchor or target no longer occurs are skipped.
    pub fn apply(&self, prompt: &str) -> String {
        let mut ordered: Vec<&Edit> = self.edits.iter().collect();
        ordered.sort_by(|a, b| {
            b.impact
                .partial_cmp(&a.impact)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut text = prompt.to_string();
        for edit in ordered {
            if let Some(next) = edit.apply_to(&text) {
                text = next;
            }
        }
        text
    }
}
