//! Line-oriented markdown parser for note content.
//!
//! The note editor renders from a block list that is rebuilt from the raw
//! content string on every change. Nothing here is persisted: the content
//! string is the single source of truth, and interactive edits (checking a
//! todo) rewrite the source and re-parse.
//!
//! # Pipeline
//!
//! ```text
//! content ──▶ Footnotes::collect ──▶ parse_blocks (ordered rules) ──▶ Vec<Block>
//!                                         │
//!                                         └─▶ RichText::parse (inline spans per line)
//! ```
//!
//! # Example
//!
//! ```rust
//! use taskflow_core::markdown::{render, toggle_todo, Block};
//!
//! let content = "# Groceries\n- [ ] Buy milk";
//! let blocks = render(content);
//! assert!(matches!(blocks[1], Block::Todo { checked: false, .. }));
//!
//! let updated = toggle_todo(content, 1).unwrap();
//! assert_eq!(updated, "# Groceries\n- [x] Buy milk");
//! assert!(matches!(render(&updated)[1], Block::Todo { checked: true, .. }));
//! ```

pub mod blocks;
pub mod inline;

use serde::Serialize;

pub use blocks::{parse_blocks, BlockRule, Matched, RULES};
pub use inline::{tokenize, tokenize_with_footnotes, InlineSpan};

/// Text of a line or cell together with its inline spans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RichText {
    pub text: String,
    pub spans: Vec<InlineSpan>,
}

impl RichText {
    pub fn parse(text: &str, footnotes: &Footnotes) -> Self {
        Self {
            text: text.to_string(),
            spans: tokenize_with_footnotes(text, footnotes),
        }
    }
}

/// Column alignment parsed from a table delimiter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Callout flavour from `> [!KIND]`. Unknown kinds render as [`CalloutKind::Note`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CalloutKind {
    Note,
    Info,
    Tip,
    Success,
    Question,
    Important,
    Warning,
    Caution,
    Danger,
    Example,
    Quote,
}

impl CalloutKind {
    pub fn parse(kind: &str) -> Self {
        match kind.trim().to_ascii_lowercase().as_str() {
            "info" => CalloutKind::Info,
            "tip" | "hint" => CalloutKind::Tip,
            "success" | "check" | "done" => CalloutKind::Success,
            "question" | "faq" | "help" => CalloutKind::Question,
            "important" => CalloutKind::Important,
            "warning" | "attention" => CalloutKind::Warning,
            "caution" => CalloutKind::Caution,
            "danger" | "error" | "bug" | "failure" => CalloutKind::Danger,
            "example" => CalloutKind::Example,
            "quote" | "cite" => CalloutKind::Quote,
            _ => CalloutKind::Note,
        }
    }
}

/// One entry of a bullet or numbered list.
///
/// Nesting is not modelled; `indent` records the leading whitespace width
/// (tabs count as four columns) so a renderer can offset the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub indent: usize,
    /// `-`, `*`, `+`, or the number with its delimiter (`3.`, `4)`).
    pub marker: String,
    pub content: RichText,
}

/// A top-level construct produced by one render pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        content: RichText,
    },
    Paragraph {
        content: RichText,
    },
    BulletList {
        items: Vec<ListItem>,
    },
    NumberedList {
        items: Vec<ListItem>,
    },
    /// `line` is the zero-based source line, used to toggle the checkbox.
    Todo {
        line: usize,
        checked: bool,
        content: RichText,
    },
    Quote {
        lines: Vec<RichText>,
    },
    CodeFence {
        lang: Option<String>,
        code: String,
    },
    Table {
        headers: Vec<RichText>,
        alignments: Vec<Alignment>,
        rows: Vec<Vec<RichText>>,
    },
    Callout {
        kind: CalloutKind,
        title: Option<String>,
        body: Vec<RichText>,
    },
    MathBlock {
        expr: String,
    },
    MermaidBlock {
        source: String,
    },
    HorizontalRule,
    FootnoteDef {
        id: String,
        content: RichText,
    },
    LineBreak,
}

impl Block {
    /// The block's text content with markup removed at the block level.
    ///
    /// List items are joined with newlines. Inline markers are kept.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Heading { content, .. }
            | Block::Paragraph { content }
            | Block::Todo { content, .. }
            | Block::FootnoteDef { content, .. } => content.text.clone(),
            Block::BulletList { items } | Block::NumberedList { items } => items
                .iter()
                .map(|item| item.content.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Quote { lines } => join_rich(lines),
            Block::Callout { title, body, .. } => {
                let body = join_rich(body);
                match title {
                    Some(t) if body.is_empty() => t.clone(),
                    Some(t) => format!("{}\n{}", t, body),
                    None => body,
                }
            }
            Block::CodeFence { code, .. } => code.clone(),
            Block::MathBlock { expr } => expr.clone(),
            Block::MermaidBlock { source } => source.clone(),
            Block::Table { headers, rows, .. } => std::iter::once(headers)
                .chain(rows.iter())
                .map(|row| {
                    row.iter()
                        .map(|c| c.text.as_str())
                        .collect::<Vec<_>>()
                        .join("\t")
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Block::HorizontalRule | Block::LineBreak => String::new(),
        }
    }
}

fn join_rich(lines: &[RichText]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Footnote definitions (`[^id]: text`) collected before the main pass.
///
/// Kept in definition order. When an id is defined twice the first
/// definition wins for lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Footnotes {
    defs: Vec<(String, String)>,
}

impl Footnotes {
    /// Scan all lines for footnote definitions, skipping fenced code and
    /// mermaid regions.
    pub fn collect(lines: &[&str]) -> Self {
        let mut footnotes = Self::default();
        let mut i = 0;
        while i < lines.len() {
            if let Some(close) = blocks::fenced_region_close(lines, i) {
                i = close + 1;
                continue;
            }
            if let Some((id, text)) = parse_footnote_def(lines[i]) {
                if footnotes.get(id).is_none() {
                    footnotes.defs.push((id.to_string(), text.to_string()));
                }
            }
            i += 1;
        }
        footnotes
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.defs
            .iter()
            .find(|(def_id, _)| def_id == id)
            .map(|(_, text)| text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defs.iter().map(|(id, text)| (id.as_str(), text.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }
}

/// Parse `[^id]: text`, returning `(id, text)`.
pub fn parse_footnote_def(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start().strip_prefix("[^")?;
    let close = rest.find("]:")?;
    let id = &rest[..close];
    if id.is_empty() || id.contains(char::is_whitespace) {
        return None;
    }
    Some((id, rest[close + 2..].trim()))
}

/// A `- [ ] text` / `- [x] text` source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodoLine<'a> {
    pub checked: bool,
    pub text: &'a str,
    /// Byte offset of the checkbox state character within the line.
    pub state_offset: usize,
}

/// Recognize a todo line.
pub fn parse_todo_line(line: &str) -> Option<TodoLine<'_>> {
    let indent = line.len() - line.trim_start().len();
    let bytes = line.as_bytes();
    let marker = *bytes.get(indent)?;
    if !matches!(marker, b'-' | b'*' | b'+') {
        return None;
    }
    if bytes.get(indent + 1) != Some(&b' ')
        || bytes.get(indent + 2) != Some(&b'[')
        || bytes.get(indent + 4) != Some(&b']')
    {
        return None;
    }
    let state_offset = indent + 3;
    let checked = match bytes.get(state_offset)? {
        b' ' => false,
        b'x' | b'X' => true,
        _ => return None,
    };
    let after = &line[indent + 5..];
    let text = match after.strip_prefix(' ') {
        Some(text) => text.trim(),
        None if after.trim().is_empty() => "",
        None => return None,
    };
    Some(TodoLine {
        checked,
        text,
        state_offset,
    })
}

/// Parse note content into blocks.
///
/// Footnote definitions are collected first so references anywhere in the
/// document resolve. The definitions are not rendered in place; they are
/// appended as [`Block::FootnoteDef`] entries after the body in definition
/// order.
pub fn render(content: &str) -> Vec<Block> {
    let lines: Vec<&str> = content.lines().collect();
    let footnotes = Footnotes::collect(&lines);
    let mut blocks = parse_blocks(&lines, &footnotes);
    blocks.extend(footnotes.iter().map(|(id, text)| Block::FootnoteDef {
        id: id.to_string(),
        content: RichText::parse(text, &footnotes),
    }));
    blocks
}

/// Flip the checkbox on source line `line` (zero-based).
///
/// Returns the rewritten content, or `None` when [`render`] does not show a
/// [`Block::Todo`] for that line (a missing line, a plain line, or a
/// todo-shaped line inside a fence). Every other byte of the content is
/// preserved, so toggling an unchecked item twice restores the original
/// string exactly.
pub fn toggle_todo(content: &str, line: usize) -> Option<String> {
    let rendered = render(content)
        .iter()
        .any(|b| matches!(b, Block::Todo { line: l, .. } if *l == line));
    if !rendered {
        return None;
    }

    let lines: Vec<&str> = content.split('\n').collect();
    let target = *lines.get(line)?;
    let todo = parse_todo_line(target)?;

    let state = if todo.checked { ' ' } else { 'x' };
    let mut toggled = String::with_capacity(target.len());
    toggled.push_str(&target[..todo.state_offset]);
    toggled.push(state);
    toggled.push_str(&target[todo.state_offset + 1..]);

    let mut out = String::with_capacity(content.len());
    for (i, l) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if i == line {
            out.push_str(&toggled);
        } else {
            out.push_str(l);
        }
    }
    Some(out)
}
