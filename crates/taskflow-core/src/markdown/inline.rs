//! Inline span tokenizer.
//!
//! A left-to-right scan over one line. At each cursor position the span
//! matchers are tried in priority order and the first hit wins; spans never
//! nest. When nothing matches, plain text is consumed up to the next marker
//! byte, or a single character if the cursor already sits on one, so every
//! step advances and the scan terminates on any input.

use serde::Serialize;

use super::Footnotes;

/// Bytes that may open a span.
const MARKER_BYTES: &[u8] = b"*_`[~$=";

/// One inline construct within a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InlineSpan {
    Text { text: String },
    Bold { text: String },
    Italic { text: String },
    Code { text: String },
    Link { text: String, href: String },
    Strikethrough { text: String },
    Highlight { text: String },
    InlineMath { expr: String },
    /// `title` is the definition text when the id resolves; renderers fall
    /// back to the raw id as the label otherwise.
    FootnoteRef { id: String, title: Option<String> },
}

type SpanMatcher = fn(&str, &Footnotes) -> Option<(InlineSpan, usize)>;

/// Span matchers in priority order. Bold precedes italic so `**x**` is never
/// read as two empty italics.
const MATCHERS: [(&str, SpanMatcher); 8] = [
    ("inline_math", match_math),
    ("footnote_ref", match_footnote_ref),
    ("bold", match_bold),
    ("italic", match_italic),
    ("code", match_code),
    ("link", match_link),
    ("strikethrough", match_strikethrough),
    ("highlight", match_highlight),
];

/// Tokenize a line without footnote context.
pub fn tokenize(line: &str) -> Vec<InlineSpan> {
    tokenize_with_footnotes(line, &Footnotes::default())
}

/// Tokenize a line, resolving `[^id]` references against `footnotes`.
pub fn tokenize_with_footnotes(line: &str, footnotes: &Footnotes) -> Vec<InlineSpan> {
    let mut spans: Vec<InlineSpan> = Vec::new();
    let mut pos = 0;

    // Every iteration consumes at least one byte, so `len + 1` is never reached.
    for _ in 0..=line.len() {
        if pos >= line.len() {
            break;
        }
        let rest = &line[pos..];

        let matched = MATCHERS
            .iter()
            .find_map(|(_, matcher)| matcher(rest, footnotes));

        match matched {
            Some((span, consumed)) if consumed > 0 => {
                spans.push(span);
                pos += consumed;
            }
            _ => {
                let len = plain_len(rest);
                push_text(&mut spans, &rest[..len]);
                pos += len;
            }
        }
    }

    spans
}

/// Length of the plain run at the start of `rest`.
fn plain_len(rest: &str) -> usize {
    match rest.bytes().position(|b| MARKER_BYTES.contains(&b)) {
        Some(0) => rest.chars().next().map_or(1, char::len_utf8),
        Some(n) => n,
        None => rest.len(),
    }
}

fn push_text(spans: &mut Vec<InlineSpan>, text: &str) {
    if let Some(InlineSpan::Text { text: prev }) = spans.last_mut() {
        prev.push_str(text);
    } else {
        spans.push(InlineSpan::Text {
            text: text.to_string(),
        });
    }
}

/// Match `open content close` at the start of `rest`, returning the content
/// and the total bytes consumed. Content must be non-empty.
fn delimited<'a>(rest: &'a str, open: &str, close: &str) -> Option<(&'a str, usize)> {
    let body = rest.strip_prefix(open)?;
    let end = body.find(close)?;
    if end == 0 {
        return None;
    }
    Some((&body[..end], open.len() + end + close.len()))
}

fn match_math(rest: &str, _: &Footnotes) -> Option<(InlineSpan, usize)> {
    let (expr, consumed) = delimited(rest, "$", "$")?;
    if expr.starts_with(char::is_whitespace) || expr.ends_with(char::is_whitespace) {
        return None;
    }
    Some((
        InlineSpan::InlineMath {
            expr: expr.to_string(),
        },
        consumed,
    ))
}

fn match_footnote_ref(rest: &str, footnotes: &Footnotes) -> Option<(InlineSpan, usize)> {
    let (id, consumed) = delimited(rest, "[^", "]")?;
    if id.contains(char::is_whitespace) {
        return None;
    }
    Some((
        InlineSpan::FootnoteRef {
            id: id.to_string(),
            title: footnotes.get(id).map(str::to_string),
        },
        consumed,
    ))
}

fn match_bold(rest: &str, _: &Footnotes) -> Option<(InlineSpan, usize)> {
    let (text, consumed) =
        delimited(rest, "**", "**").or_else(|| delimited(rest, "__", "__"))?;
    Some((
        InlineSpan::Bold {
            text: text.to_string(),
        },
        consumed,
    ))
}

fn match_italic(rest: &str, _: &Footnotes) -> Option<(InlineSpan, usize)> {
    let marker = match rest.as_bytes().first()? {
        b'*' => "*",
        b'_' => "_",
        _ => return None,
    };
    let (text, consumed) = delimited(rest, marker, marker)?;
    if text.starts_with(marker) {
        return None;
    }
    Some((
        InlineSpan::Italic {
            text: text.to_string(),
        },
        consumed,
    ))
}

fn match_code(rest: &str, _: &Footnotes) -> Option<(InlineSpan, usize)> {
    let (text, consumed) = delimited(rest, "`", "`")?;
    Some((
        InlineSpan::Code {
            text: text.to_string(),
        },
        consumed,
    ))
}

fn match_link(rest: &str, _: &Footnotes) -> Option<(InlineSpan, usize)> {
    let (text, label_len) = delimited(rest, "[", "]")?;
    let (href, href_len) = delimited(&rest[label_len..], "(", ")")?;
    Some((
        InlineSpan::Link {
            text: text.to_string(),
            href: href.trim().to_string(),
        },
        label_len + href_len,
    ))
}

fn match_strikethrough(rest: &str, _: &Footnotes) -> Option<(InlineSpan, usize)> {
    let (text, consumed) = delimited(rest, "~~", "~~")?;
    Some((
        InlineSpan::Strikethrough {
            text: text.to_string(),
        },
        consumed,
    ))
}

fn match_highlight(rest: &str, _: &Footnotes) -> Option<(InlineSpan, usize)> {
    let (text, consumed) = delimited(rest, "==", "==")?;
    Some((
        InlineSpan::Highlight {
            text: text.to_string(),
        },
        consumed,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn text(s: &str) -> InlineSpan {
        InlineSpan::Text { text: s.into() }
    }

    #[test]
    fn test_plain_line_is_single_text_span() {
        assert_eq!(tokenize("just words"), vec![text("just words")]);
        assert_eq!(tokenize(""), vec![]);
    }

    #[test]
    fn test_bold_wins_over_italic() {
        assert_eq!(
            tokenize("**bold** and *it*"),
            vec![
                InlineSpan::Bold {
                    text: "bold".into()
                },
                text(" and "),
                InlineSpan::Italic { text: "it".into() },
            ]
        );
        assert_eq!(
            tokenize("__b__"),
            vec![InlineSpan::Bold { text: "b".into() }]
        );
    }

    #[rstest]
    #[case("****____~~~~")]
    #[case("[[[[(((")]
    #[case("$ $ $ $")]
    #[case("==")]
    #[case("~a~ =b= `")]
    fn test_unmatched_markers_degrade_to_text(#[case] line: &str) {
        assert_eq!(tokenize(line), vec![text(line)]);
    }

    #[test]
    fn test_all_span_kinds() {
        let spans = tokenize("`c` [a](http://x) ~~s~~ ==h== $x^2$");
        assert_eq!(
            spans,
            vec![
                InlineSpan::Code { text: "c".into() },
                text(" "),
                InlineSpan::Link {
                    text: "a".into(),
                    href: "http://x".into()
                },
                text(" "),
                InlineSpan::Strikethrough { text: "s".into() },
                text(" "),
                InlineSpan::Highlight { text: "h".into() },
                text(" "),
                InlineSpan::InlineMath { expr: "x^2".into() },
            ]
        );
    }

    #[test]
    fn test_dollar_amounts_are_not_math() {
        assert_eq!(
            tokenize("$x$ costs $5 and $6"),
            vec![
                InlineSpan::InlineMath { expr: "x".into() },
                text(" costs $5 and $6"),
            ]
        );
    }

    #[test]
    fn test_link_requires_href() {
        assert_eq!(tokenize("[label]() end"), vec![text("[label]() end")]);
        assert_eq!(tokenize("[label] (x)"), vec![text("[label] (x)")]);
    }

    #[test]
    fn test_footnote_ref_resolution() {
        let footnotes = Footnotes::collect(&["[^n]: Defined"]);
        assert_eq!(
            tokenize_with_footnotes("x[^n] y[^missing]", &footnotes),
            vec![
                text("x"),
                InlineSpan::FootnoteRef {
                    id: "n".into(),
                    title: Some("Defined".into())
                },
                text(" y"),
                InlineSpan::FootnoteRef {
                    id: "missing".into(),
                    title: None
                },
            ]
        );
    }

    #[test]
    fn test_footnote_ref_before_link() {
        let spans = tokenize("[^1](http://x)");
        assert!(matches!(&spans[0], InlineSpan::FootnoteRef { id, .. } if id == "1"));
    }

    #[test]
    fn test_multibyte_text_around_markers() {
        assert_eq!(
            tokenize("héllo *wörld* ✓"),
            vec![
                text("héllo "),
                InlineSpan::Italic {
                    text: "wörld".into()
                },
                text(" ✓"),
            ]
        );
    }

    #[test]
    fn test_tokenize_is_idempotent() {
        let line = "a **b** _c_ `d` [e](f) ~~g~~ ==h== $i$ [^j]";
        assert_eq!(tokenize(line), tokenize(line));
    }

    #[test]
    fn test_span_serializes_with_type_tag() {
        let json = serde_json::to_value(tokenize("**x**")).unwrap();
        assert_eq!(json[0]["type"], "bold");
        assert_eq!(json[0]["text"], "x");
    }

    #[test]
    fn test_matcher_order() {
        let names: Vec<&str> = MATCHERS.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "inline_math",
                "footnote_ref",
                "bold",
                "italic",
                "code",
                "link",
                "strikethrough",
                "highlight"
            ]
        );
    }
}
