//! Block-level rules.
//!
//! Each rule is a function `(lines, i, footnotes) -> Option<Matched>` that
//! inspects the line at `i` (and, for multi-line constructs, the run that
//! follows it). [`parse_blocks`] tries [`RULES`] in order at every position
//! and takes the first match, so the order below is the precedence:
//!
//! | # | Rule | Recognizes |
//! |---|------|------------|
//! | 1 | `footnote_def` | `[^id]: text` (consumed, nothing emitted) |
//! | 2 | `todo` | `- [ ] text`, `- [x] text` |
//! | 3 | `math_block` | `$$ expr $$` on one line |
//! | 4 | `mermaid` | ```` ```mermaid ```` … ```` ``` ```` |
//! | 5 | `callout` | `> [!KIND] title` plus `>` continuation lines |
//! | 6 | `heading` | `#` to `######` followed by a space |
//! | 7 | `code_fence` | ```` ```lang ```` … ```` ``` ```` |
//! | 8 | `quote` | `>` lines that do not open a callout |
//! | 9 | `table` | two or more contiguous `|` lines |
//! | 10 | `list` | contiguous bullet or numbered items |
//! | 11 | `horizontal_rule` | `---`, `***`, `___` (three or more) |
//! | 12 | `paragraph` | any other non-blank line |
//! | 13 | `blank` | blank line |
//!
//! Unterminated fences fail their rule and fall through, which ends in the
//! paragraph rule rendering the opening line as text.

use super::{
    parse_footnote_def, parse_todo_line, Alignment, Block, CalloutKind, Footnotes, ListItem,
    RichText,
};

/// Result of a successful rule: an optional block and the index of the first unconsumed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    pub block: Option<Block>,
    pub next: usize,
}

impl Matched {
    fn emit(block: Block, next: usize) -> Option<Self> {
        Some(Self {
            block: Some(block),
            next,
        })
    }
}

pub type BlockMatcher = fn(&[&str], usize, &Footnotes) -> Option<Matched>;

/// A named block rule.
#[derive(Clone, Copy)]
pub struct BlockRule {
    pub name: &'static str,
    pub matcher: BlockMatcher,
}

/// Block rules in precedence order.
pub const RULES: [BlockRule; 13] = [
    BlockRule { name: "footnote_def", matcher: match_footnote_def },
    BlockRule { name: "todo", matcher: match_todo },
    BlockRule { name: "math_block", matcher: match_math_block },
    BlockRule { name: "mermaid", matcher: match_mermaid },
    BlockRule { name: "callout", matcher: match_callout },
    BlockRule { name: "heading", matcher: match_heading },
    BlockRule { name: "code_fence", matcher: match_code_fence },
    BlockRule { name: "quote", matcher: match_quote },
    BlockRule { name: "table", matcher: match_table },
    BlockRule { name: "list", matcher: match_list },
    BlockRule { name: "horizontal_rule", matcher: match_horizontal_rule },
    BlockRule { name: "paragraph", matcher: match_paragraph },
    BlockRule { name: "blank", matcher: match_blank },
];

/// Run the rules over `lines` in a single forward pass.
pub fn parse_blocks(lines: &[&str], footnotes: &Footnotes) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let matched = RULES
            .iter()
            .find_map(|rule| (rule.matcher)(lines, i, footnotes));
        match matched {
            Some(m) => {
                if let Some(block) = m.block {
                    blocks.push(block);
                }
                i = m.next.max(i + 1);
            }
            None => i += 1,
        }
    }

    blocks
}

// ═══════════════════════════════════════════════════════════════════════
// Rules
// ═══════════════════════════════════════════════════════════════════════

fn match_footnote_def(lines: &[&str], i: usize, _: &Footnotes) -> Option<Matched> {
    parse_footnote_def(lines[i])?;
    Some(Matched {
        block: None,
        next: i + 1,
    })
}

fn match_todo(lines: &[&str], i: usize, footnotes: &Footnotes) -> Option<Matched> {
    let todo = parse_todo_line(lines[i])?;
    Matched::emit(
        Block::Todo {
            line: i,
            checked: todo.checked,
            content: RichText::parse(todo.text, footnotes),
        },
        i + 1,
    )
}

fn match_math_block(lines: &[&str], i: usize, _: &Footnotes) -> Option<Matched> {
    let t = lines[i].trim();
    if t.len() < 4 || !t.starts_with("$$") || !t.ends_with("$$") {
        return None;
    }
    Matched::emit(
        Block::MathBlock {
            expr: t[2..t.len() - 2].trim().to_string(),
        },
        i + 1,
    )
}

fn match_mermaid(lines: &[&str], i: usize, _: &Footnotes) -> Option<Matched> {
    if fence_info(lines[i])? != "mermaid" {
        return None;
    }
    let close = find_fence_close(lines, i)?;
    Matched::emit(
        Block::MermaidBlock {
            source: lines[i + 1..close].join("\n"),
        },
        close + 1,
    )
}

fn match_callout(lines: &[&str], i: usize, footnotes: &Footnotes) -> Option<Matched> {
    let (kind, title) = parse_callout_open(lines[i])?;
    let mut body = Vec::new();
    let mut j = i + 1;
    while j < lines.len() && is_quote_line(lines[j]) && parse_callout_open(lines[j]).is_none() {
        body.push(RichText::parse(strip_quote_marker(lines[j]), footnotes));
        j += 1;
    }
    Matched::emit(
        Block::Callout {
            kind: CalloutKind::parse(kind),
            title: title.map(str::to_string),
            body,
        },
        j,
    )
}

fn match_heading(lines: &[&str], i: usize, footnotes: &Footnotes) -> Option<Matched> {
    let t = lines[i].trim_start();
    let level = t.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) || t.as_bytes().get(level) != Some(&b' ') {
        return None;
    }
    Matched::emit(
        Block::Heading {
            level: level as u8,
            content: RichText::parse(t[level..].trim(), footnotes),
        },
        i + 1,
    )
}

fn match_code_fence(lines: &[&str], i: usize, _: &Footnotes) -> Option<Matched> {
    let info = fence_info(lines[i])?;
    let close = find_fence_close(lines, i)?;
    Matched::emit(
        Block::CodeFence {
            lang: (!info.is_empty()).then(|| info.to_string()),
            code: lines[i + 1..close].join("\n"),
        },
        close + 1,
    )
}

fn match_quote(lines: &[&str], i: usize, footnotes: &Footnotes) -> Option<Matched> {
    if !is_quote_line(lines[i]) || parse_callout_open(lines[i]).is_some() {
        return None;
    }
    let mut quoted = Vec::new();
    let mut j = i;
    while j < lines.len() && is_quote_line(lines[j]) && parse_callout_open(lines[j]).is_none() {
        quoted.push(RichText::parse(strip_quote_marker(lines[j]), footnotes));
        j += 1;
    }
    Matched::emit(Block::Quote { lines: quoted }, j)
}

fn match_table(lines: &[&str], i: usize, footnotes: &Footnotes) -> Option<Matched> {
    let mut end = i;
    while end < lines.len() && lines[end].trim_start().starts_with('|') {
        end += 1;
    }
    if end - i < 2 {
        return None;
    }

    let headers: Vec<&str> = split_row(lines[i]);
    let (alignments, first_row) = if is_delimiter_row(lines[i + 1]) {
        (parse_alignments(lines[i + 1], headers.len()), i + 2)
    } else {
        (vec![Alignment::Left; headers.len()], i + 1)
    };

    let rows: Vec<Vec<RichText>> = lines[first_row..end]
        .iter()
        .map(|line| {
            let mut cells = split_row(line);
            cells.resize(headers.len(), "");
            cells
                .into_iter()
                .map(|c| RichText::parse(c, footnotes))
                .collect()
        })
        .collect();

    Matched::emit(
        Block::Table {
            headers: headers
                .into_iter()
                .map(|h| RichText::parse(h, footnotes))
                .collect(),
            alignments,
            rows,
        },
        end,
    )
}

fn match_list(lines: &[&str], i: usize, footnotes: &Footnotes) -> Option<Matched> {
    if parse_todo_line(lines[i]).is_some() {
        return None;
    }
    let first = parse_list_item(lines[i])?;
    let numbered = first.numbered;

    let mut items = Vec::new();
    let mut j = i;
    while j < lines.len() {
        let item = match parse_list_item(lines[j]) {
            Some(item) if item.numbered == numbered => item,
            _ => break,
        };
        if parse_todo_line(lines[j]).is_some() {
            break;
        }
        items.push(ListItem {
            indent: item.indent,
            marker: item.marker.to_string(),
            content: RichText::parse(item.text, footnotes),
        });
        j += 1;
    }

    let block = if numbered {
        Block::NumberedList { items }
    } else {
        Block::BulletList { items }
    };
    Matched::emit(block, j)
}

fn match_horizontal_rule(lines: &[&str], i: usize, _: &Footnotes) -> Option<Matched> {
    if !is_horizontal_rule(lines[i]) {
        return None;
    }
    Matched::emit(Block::HorizontalRule, i + 1)
}

fn match_paragraph(lines: &[&str], i: usize, footnotes: &Footnotes) -> Option<Matched> {
    let t = lines[i].trim();
    if t.is_empty() {
        return None;
    }
    Matched::emit(
        Block::Paragraph {
            content: RichText::parse(t, footnotes),
        },
        i + 1,
    )
}

fn match_blank(lines: &[&str], i: usize, _: &Footnotes) -> Option<Matched> {
    if !lines[i].trim().is_empty() {
        return None;
    }
    Matched::emit(Block::LineBreak, i + 1)
}

// ═══════════════════════════════════════════════════════════════════════
// Line helpers
// ═══════════════════════════════════════════════════════════════════════

/// Info string of an opening ```` ``` ```` fence, or `None` if the line is not a fence.
fn fence_info(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("```")?;
    Some(rest.trim_start_matches('`').trim())
}

/// Index of the closing fence for the fence opened at `open`.
/// Closing line of the fenced region opened at `open`, if `open` starts one
/// that is terminated.
pub(crate) fn fenced_region_close(lines: &[&str], open: usize) -> Option<usize> {
    fence_info(lines[open])?;
    find_fence_close(lines, open)
}

fn find_fence_close(lines: &[&str], open: usize) -> Option<usize> {
    (open + 1..lines.len()).find(|&j| fence_info(lines[j]) == Some(""))
}

fn is_quote_line(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

fn strip_quote_marker(line: &str) -> &str {
    let t = line.trim_start();
    let t = t.strip_prefix('>').unwrap_or(t);
    t.strip_prefix(' ').unwrap_or(t).trim_end()
}

/// Parse `> [!KIND] title` into `(kind, title)`.
fn parse_callout_open(line: &str) -> Option<(&str, Option<&str>)> {
    let t = line.trim_start().strip_prefix('>')?.trim_start();
    let rest = t.strip_prefix("[!")?;
    let close = rest.find(']')?;
    let kind = &rest[..close];
    if kind.is_empty() || !kind.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return None;
    }
    // `[!note]-` / `[!note]+` mark foldable callouts; the fold state is not rendered.
    let title = rest[close + 1..]
        .trim_start_matches(['-', '+'])
        .trim();
    Some((kind, (!title.is_empty()).then_some(title)))
}

fn split_row(line: &str) -> Vec<&str> {
    let t = line.trim();
    let t = t.strip_prefix('|').unwrap_or(t);
    let t = t.strip_suffix('|').unwrap_or(t);
    t.split('|').map(str::trim).collect()
}

/// A second table line is the delimiter row when it contains `---` or
/// consists only of well-formed `:--`, `--:`, `:-:` cells.
fn is_delimiter_row(line: &str) -> bool {
    line.contains("---") || split_row(line).iter().all(|c| is_alignment_cell(c))
}

fn is_alignment_cell(cell: &str) -> bool {
    let c = cell.trim();
    c.contains('-') && c.chars().all(|ch| ch == '-' || ch == ':')
}

/// Alignments for `columns` columns from a delimiter row.
///
/// Missing or malformed cells default to [`Alignment::Left`].
fn parse_alignments(line: &str, columns: usize) -> Vec<Alignment> {
    let cells = split_row(line);
    (0..columns)
        .map(|col| cells.get(col).map_or(Alignment::Left, |c| parse_alignment(c)))
        .collect()
}

fn parse_alignment(cell: &str) -> Alignment {
    let c = cell.trim();
    if !is_alignment_cell(c) {
        return Alignment::Left;
    }
    match (c.starts_with(':'), c.ends_with(':')) {
        (true, true) => Alignment::Center,
        (false, true) => Alignment::Right,
        _ => Alignment::Left,
    }
}

struct ListLine<'a> {
    indent: usize,
    numbered: bool,
    marker: &'a str,
    text: &'a str,
}

fn parse_list_item(line: &str) -> Option<ListLine<'_>> {
    if is_horizontal_rule(line) {
        return None;
    }
    let t = line.trim_start();
    let indent: usize = line[..line.len() - t.len()]
        .chars()
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum();

    let bytes = t.as_bytes();
    if matches!(bytes.first(), Some(b'-' | b'*' | b'+')) && bytes.get(1) == Some(&b' ') {
        return Some(ListLine {
            indent,
            numbered: false,
            marker: &t[..1],
            text: t[2..].trim(),
        });
    }

    let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits > 0
        && matches!(bytes.get(digits), Some(b'.' | b')'))
        && bytes.get(digits + 1) == Some(&b' ')
    {
        return Some(ListLine {
            indent,
            numbered: true,
            marker: &t[..digits + 1],
            text: t[digits + 2..].trim(),
        });
    }

    None
}

fn is_horizontal_rule(line: &str) -> bool {
    let compact: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && matches!(compact[0], '-' | '*' | '_')
        && compact.iter().all(|&c| c == compact[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn parse(src: &str) -> Vec<Block> {
        let lines: Vec<&str> = src.lines().collect();
        parse_blocks(&lines, &Footnotes::collect(&lines))
    }

    fn texts(cells: &[RichText]) -> Vec<&str> {
        cells.iter().map(|c| c.text.as_str()).collect()
    }

    /// Name of the first rule that matches the single line.
    fn winning_rule(line: &str) -> &'static str {
        let lines = [line];
        RULES
            .iter()
            .find(|r| (r.matcher)(&lines, 0, &Footnotes::default()).is_some())
            .map(|r| r.name)
            .unwrap()
    }

    #[rstest]
    #[case("[^1]: note", "footnote_def")]
    #[case("- [ ] task", "todo")]
    #[case("$$ e = mc^2 $$", "math_block")]
    #[case("> [!warning] Careful", "callout")]
    #[case("## Title", "heading")]
    #[case("> quoted", "quote")]
    #[case("- item", "list")]
    #[case("3. item", "list")]
    #[case("* * *", "horizontal_rule")]
    #[case("___", "horizontal_rule")]
    #[case("#hashtag", "paragraph")]
    #[case("$$", "paragraph")]
    #[case("| lonely |", "paragraph")]
    #[case("```rust", "paragraph")]
    #[case("   ", "blank")]
    fn test_rule_precedence(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(winning_rule(line), expected);
    }

    #[test]
    fn test_table_with_alignment_row() {
        let blocks = parse("| A | B |\n|:--|--:|\n| 1 | 2 |");
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::Table {
                headers,
                alignments,
                rows,
            } => {
                assert_eq!(texts(headers), vec!["A", "B"]);
                assert_eq!(alignments, &vec![Alignment::Left, Alignment::Right]);
                assert_eq!(rows.len(), 1);
                assert_eq!(texts(&rows[0]), vec!["1", "2"]);
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_table_center_and_missing_delimiter_cells() {
        let blocks = parse("| A | B | C |\n| :-: | --- |\n| x | y | z |");
        match &blocks[0] {
            Block::Table { alignments, .. } => assert_eq!(
                alignments,
                &vec![Alignment::Center, Alignment::Left, Alignment::Left]
            ),
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_table_without_delimiter_row_defaults_left() {
        let blocks = parse("| A | B |\n| 1 | 2 |\n| 3 |");
        match &blocks[0] {
            Block::Table {
                alignments, rows, ..
            } => {
                assert_eq!(alignments, &vec![Alignment::Left, Alignment::Left]);
                assert_eq!(rows.len(), 2);
                assert_eq!(texts(&rows[1]), vec!["3", ""]);
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_alignment_cell_is_left() {
        assert_eq!(parse_alignment(":x-:"), Alignment::Left);
        assert_eq!(parse_alignment(""), Alignment::Left);
        assert_eq!(parse_alignment("---:"), Alignment::Right);
    }

    #[test]
    fn test_code_fence() {
        let blocks = parse("```rust\nfn main() {}\n  let x = 1;\n```\nafter");
        assert_eq!(
            blocks[0],
            Block::CodeFence {
                lang: Some("rust".into()),
                code: "fn main() {}\n  let x = 1;".into(),
            }
        );
        assert!(matches!(&blocks[1], Block::Paragraph { content } if content.text == "after"));
    }

    #[test]
    fn test_unterminated_fence_falls_back_to_paragraph() {
        let blocks = parse("```python\nprint(1)\n# Heading");
        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[0], Block::Paragraph { content } if content.text == "```python"));
        assert!(matches!(&blocks[1], Block::Paragraph { .. }));
        assert!(matches!(&blocks[2], Block::Heading { level: 1, .. }));
    }

    #[test]
    fn test_mermaid_before_code_fence() {
        let blocks = parse("```mermaid\ngraph TD\n  A-->B\n```");
        assert_eq!(
            blocks,
            vec![Block::MermaidBlock {
                source: "graph TD\n  A-->B".into()
            }]
        );
    }

    #[test]
    fn test_math_block_single_line_only() {
        let blocks = parse("$$\nx^2\n$$");
        assert!(blocks
            .iter()
            .all(|b| matches!(b, Block::Paragraph { .. })));

        let blocks = parse("$$ \\int_0^1 x\\,dx $$");
        assert_eq!(
            blocks,
            vec![Block::MathBlock {
                expr: "\\int_0^1 x\\,dx".into()
            }]
        );
    }

    #[test]
    fn test_callout_consumes_continuation_lines() {
        let blocks = parse("> [!TIP] Pro tip\n> first\n>second\nplain");
        match &blocks[0] {
            Block::Callout { kind, title, body } => {
                assert_eq!(*kind, CalloutKind::Tip);
                assert_eq!(title.as_deref(), Some("Pro tip"));
                assert_eq!(texts(body), vec!["first", "second"]);
            }
            other => panic!("expected callout, got {:?}", other),
        }
        assert!(matches!(&blocks[1], Block::Paragraph { .. }));
    }

    #[test]
    fn test_quote_stops_at_callout() {
        let blocks = parse("> a\n> b\n> [!note]\n> c");
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            Block::Quote { lines } => assert_eq!(texts(lines), vec!["a", "b"]),
            other => panic!("expected quote, got {:?}", other),
        }
        match &blocks[1] {
            Block::Callout { title, body, .. } => {
                assert_eq!(*title, None);
                assert_eq!(texts(body), vec!["c"]);
            }
            other => panic!("expected callout, got {:?}", other),
        }
    }

    #[test]
    fn test_list_flattens_indentation() {
        let blocks = parse("- one\n  - nested\n\t- tabbed\n- two");
        match &blocks[0] {
            Block::BulletList { items } => {
                let indents: Vec<usize> = items.iter().map(|i| i.indent).collect();
                assert_eq!(indents, vec![0, 2, 4, 0]);
                assert_eq!(items[1].content.text, "nested");
            }
            other => panic!("expected bullet list, got {:?}", other),
        }
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_list_splits_on_kind_change_and_todo() {
        let blocks = parse("- a\n1. b\n2) c\n- [ ] d\n- e");
        assert!(matches!(&blocks[0], Block::BulletList { items } if items.len() == 1));
        match &blocks[1] {
            Block::NumberedList { items } => {
                let markers: Vec<&str> = items.iter().map(|i| i.marker.as_str()).collect();
                assert_eq!(markers, vec!["1.", "2)"]);
            }
            other => panic!("expected numbered list, got {:?}", other),
        }
        assert!(matches!(&blocks[2], Block::Todo { line: 3, .. }));
        assert!(matches!(&blocks[3], Block::BulletList { .. }));
    }

    #[test]
    fn test_blank_lines_emit_line_breaks() {
        let blocks = parse("a\n\nb");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1], Block::LineBreak);
    }

    #[test]
    fn test_heading_levels() {
        let blocks = parse("# One\n###### Six\n####### Seven");
        assert!(matches!(&blocks[0], Block::Heading { level: 1, content } if content.text == "One"));
        assert!(matches!(&blocks[1], Block::Heading { level: 6, .. }));
        assert!(matches!(&blocks[2], Block::Paragraph { .. }));
    }

    #[test]
    fn test_list_declines_todo_lines() {
        let lines = ["- [ ] task", "- item"];
        let footnotes = Footnotes::default();
        assert!(match_list(&lines, 0, &footnotes).is_none());

        // A todo ends a running list without being absorbed
        let lines = ["- item", "- [x] done"];
        let m = match_list(&lines, 0, &footnotes).unwrap();
        assert_eq!(m.next, 1);
        assert!(matches!(m.block, Some(Block::BulletList { ref items }) if items.len() == 1));
    }

    #[test]
    fn test_every_rule_advances() {
        let src = "[^x]: y\n- [ ] t\n$$a$$\n> [!info]\n# h\n> q\n| a |\n| b |\n- l\n---\np\n";
        let lines: Vec<&str> = src.lines().collect();
        let footnotes = Footnotes::collect(&lines);
        for i in 0..lines.len() {
            for rule in RULES.iter() {
                if let Some(m) = (rule.matcher)(&lines, i, &footnotes) {
                    assert!(m.next > i, "rule {} did not advance at line {}", rule.name, i);
                }
            }
        }
    }
}
