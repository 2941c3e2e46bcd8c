//! Markdown notes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::markdown::{self, Block};

/// A note: raw markdown content plus metadata.
///
/// Only `content` is authoritative. The block view is rebuilt by
/// [`MarkdownDocument::render`] whenever it is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownDocument {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub content: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MarkdownDocument {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            icon: None,
            content: content.into(),
            is_favorite: false,
            is_archived: false,
            is_public: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn render(&self) -> Vec<Block> {
        markdown::render(&self.content)
    }

    /// Flip the todo on source line `line`. Returns `false` and leaves the
    /// note untouched when that line is not a todo.
    pub fn toggle_todo(&mut self, line: usize, now: DateTime<Utc>) -> bool {
        match markdown::toggle_todo(&self.content, line) {
            Some(content) => {
                self.content = content;
                self.updated_at = now;
                true
            }
            None => false,
        }
    }

    /// Replace the content, bumping `updated_at` only on an actual change.
    pub fn set_content(&mut self, content: impl Into<String>, now: DateTime<Utc>) {
        let content = content.into();
        if content != self.content {
            self.content = content;
            self.updated_at = now;
        }
    }

    /// `(done, total)` over the note's todos.
    pub fn todo_progress(&self) -> (usize, usize) {
        self.render()
            .iter()
            .filter_map(|block| match block {
                Block::Todo { checked, .. } => Some(*checked),
                _ => None,
            })
            .fold((0, 0), |(done, total), checked| {
                (done + usize::from(checked), total + 1)
            })
    }
}
