//! `taskflow render` and `taskflow toggle`: markdown notes on disk.

use std::path::Path;

use anyhow::{Context, Result};

use taskflow_core::markdown::{parse_todo_line, render, toggle_todo, Block};

fn read_note(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read note: {}", path.display()))
}

/// Print the block structure of a note.
pub fn run_render(path: &Path, json: bool) -> Result<()> {
    let content = read_note(path)?;
    let blocks = render(&content);

    if json {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
        return Ok(());
    }

    for block in &blocks {
        println!("{}", describe(block));
    }
    Ok(())
}

/// Flip the todo on 1-based `line` and write the note back.
pub fn run_toggle(path: &Path, line: usize) -> Result<()> {
    if line == 0 {
        anyhow::bail!("--line is 1-based");
    }
    let content = read_note(path)?;
    let updated = toggle_todo(&content, line - 1)
        .with_context(|| format!("line {} of {} is not a todo", line, path.display()))?;

    std::fs::write(path, &updated)
        .with_context(|| format!("Failed to write note: {}", path.display()))?;

    if let Some(todo) = updated.lines().nth(line - 1).and_then(parse_todo_line) {
        let mark = if todo.checked { "x" } else { " " };
        println!("line {}: [{}] {}", line, mark, todo.text);
    }
    Ok(())
}

/// One-line terminal rendering of a block.
fn describe(block: &Block) -> String {
    let text = block.plain_text();
    let first = text.lines().next().unwrap_or_default();
    match block {
        Block::Heading { level, .. } => format!("{} {}", "#".repeat(usize::from(*level)), first),
        Block::Todo { line, checked, .. } => {
            format!("[{}] {} (line {})", if *checked { "x" } else { " " }, first, line + 1)
        }
        Block::BulletList { items } | Block::NumberedList { items } => items
            .iter()
            .map(|i| format!("{}{} {}", " ".repeat(i.indent), i.marker, i.content.text))
            .collect::<Vec<_>>()
            .join("\n"),
        Block::CodeFence { lang, code } => format!(
            "```{} ({} lines)",
            lang.as_deref().unwrap_or(""),
            code.lines().count()
        ),
        Block::Callout { kind, .. } => format!("[!{:?}] {}", kind, first),
        Block::Table { headers, rows, .. } => {
            format!("table: {} columns, {} rows", headers.len(), rows.len())
        }
        Block::HorizontalRule => "---".to_string(),
        Block::LineBreak => String::new(),
        Block::FootnoteDef { id, .. } => format!("[^{}]: {}", id, first),
        Block::Quote { .. } => format!("> {}", first),
        Block::MathBlock { expr } => format!("$${}$$", expr),
        Block::MermaidBlock { .. } => "mermaid diagram".to_string(),
        Block::Paragraph { .. } => first.to_string(),
    }
}
