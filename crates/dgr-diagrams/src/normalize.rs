//! Diagram source repair.
//!
//! [`normalize`] turns loosely written diagram text into something the
//! engine accepts. It is pure and idempotent: normalizing normalized text
//! returns it unchanged. Each rule is exposed on its own and [`normalize`]
//! applies them in this order:
//!
//! 1. [`strip_fences`]: drop markdown code fences, trim
//! 2. [`strip_orientation_terminator`]: `graph TD;` becomes `graph TD`
//! 3. [`space_arrows`]: `A-->B` becomes `A --> B`
//! 4. [`close_labeled_edges`]: `A--|yes|B` becomes `A -->|yes|B`
//! 5. [`expand_escaped_newlines`]: literal `\n` becomes a line break
//! 6. [`space_ampersands`]: `A&B` becomes `A & B`
//! 7. [`ensure_diagram_prefix`]: headerless text gets `graph TD`
//! 8. [`canonicalize_flowchart`]: leading `flowchart` becomes `graph`

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Header prepended to text that doesn't start with a known diagram type.
pub const DEFAULT_PREFIX: &str = "graph TD";

/// Diagram type keywords accepted as a header.
pub const DIAGRAM_PREFIXES: [&str; 5] = ["graph", "flowchart", "sequence", "class", "pie"];

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:mermaid|diagram)?").unwrap());

// Anchored at the start of the document: the header is the only place an
// orientation token is meaningful. Leading escaped newlines are skipped since
// they only become line breaks in a later rule.
static ORIENTATION_TERMINATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:\s|\\r\\n|\\n)*(?:graph|flowchart)[ \t]+(?:TB|TD|BT|RL|LR))(?:[ \t]*;)+")
        .unwrap()
});

static ARROW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("-->").unwrap());

// The label may not contain a literal `\n` escape: rule 5 would split it
// across lines after the edge was closed.
static LABELED_EDGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \t]*--[ \t]*\|((?:[^|\n\\]|\\+[^\\n|\n])*\\*)\|").unwrap()
});

static AMPERSAND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]*&[ \t]*").unwrap());

// Named entities are limited to the ones that show up in labels, so `B&C;`
// stays a join followed by a statement terminator.
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:#[0-9]+|#x[0-9a-fA-F]+|amp|lt|gt|quot|apos|nbsp);").unwrap()
});

static FLOWCHART_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^flowchart(\s|$)").unwrap());

/// Repair raw diagram text.
///
/// Total: never fails. Blank input yields [`DEFAULT_PREFIX`] on its own.
///
/// # Example
///
/// ```
/// use dgr_diagrams::normalize;
///
/// assert_eq!(normalize("A-->B"), "graph TD\nA --> B");
/// assert_eq!(normalize("flowchart LR;\n  A-->B"), "graph LR\n  A --> B");
/// ```
#[must_use]
pub fn normalize(raw: &str) -> String {
    let text = strip_fences(raw);
    let text = strip_orientation_terminator(&text);
    let text = space_arrows(&text);
    let text = close_labeled_edges(&text);
    let text = expand_escaped_newlines(&text);
    let text = space_ampersands(&text);
    let text = ensure_diagram_prefix(&text);
    canonicalize_flowchart(&text)
}

/// Remove ```` ``` ````, ```` ```mermaid ```` and ```` ```diagram ```` markers and trim.
#[must_use]
pub fn strip_fences(text: &str) -> String {
    FENCE_RE.replace_all(text, "").trim().to_owned()
}

/// Remove `;` terminators directly after the orientation in a
/// `graph`/`flowchart` header.
///
/// A statement glued to the terminator (`graph TD;A-->B`) moves to its own line.
#[must_use]
pub fn strip_orientation_terminator(text: &str) -> String {
    ORIENTATION_TERMINATOR_RE
        .replace(text, |caps: &Captures| {
            let header = caps.get(1).map_or("", |m| m.as_str());
            let end = caps.get(0).map_or(0, |m| m.end());
            match text[end..].chars().next() {
                Some(c) if !c.is_whitespace() && c != '\\' => format!("{header}\n"),
                _ => header.to_owned(),
            }
        })
        .into_owned()
}

/// Put single spaces around `-->` where they are missing.
///
/// Longer links (`--->`, `<-->`) and labeled links (`-->|x|`) keep their
/// shape on the side that continues the link.
#[must_use]
pub fn space_arrows(text: &str) -> String {
    ARROW_RE
        .replace_all(text, |caps: &Captures| {
            let m = caps.get(0).map_or(0..0, |m| m.range());
            let before = text[..m.start].chars().next_back();
            let after = text[m.end..].chars().next();

            let mut arrow = String::with_capacity(5);
            if before.is_some_and(|c| !c.is_whitespace() && c != '<' && c != '-') {
                arrow.push(' ');
            }
            arrow.push_str("-->");
            if after.is_some_and(|c| !c.is_whitespace() && !matches!(c, '>' | '|' | '-')) {
                arrow.push(' ');
            }
            arrow
        })
        .into_owned()
}

/// Rewrite `A--|label|` and `A -- |label|` into `A -->|label|`.
///
/// Links that continue an arrow (`---|x|`, `<--|x|`) or start a line are left
/// alone. Chained edges (`A--|x|--|y|B`) are all closed.
#[must_use]
pub fn close_labeled_edges(text: &str) -> String {
    let mut current = close_labeled_edges_once(text);
    loop {
        let next = close_labeled_edges_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

// One pass can swallow the start of the next edge as label text; the loop in
// `close_labeled_edges` runs until nothing changes.
fn close_labeled_edges_once(text: &str) -> String {
    LABELED_EDGE_RE
        .replace_all(text, |caps: &Captures| {
            let Some(m) = caps.get(0) else {
                return String::new();
            };
            let before = text[..m.start()].chars().next_back();
            if before.is_none_or(|c| {
                c.is_whitespace() || matches!(c, '-' | '<' | '>' | '=' | '.')
            }) {
                return m.as_str().to_owned();
            }
            let label = caps.get(1).map_or("", |l| l.as_str());
            format!(" -->|{label}|")
        })
        .into_owned()
}

/// Turn literal `\r\n` and `\n` escape sequences into line breaks.
#[must_use]
pub fn expand_escaped_newlines(text: &str) -> String {
    text.replace("\\r\\n", "\n").replace("\\n", "\n")
}

/// Normalize `A&B` and `A  &  B` to `A & B`.
///
/// HTML entities such as `&amp;` or `&#35;` in labels are left alone, and no
/// padding is added at the start or end of a line.
#[must_use]
pub fn space_ampersands(text: &str) -> String {
    AMPERSAND_RE
        .replace_all(text, |caps: &Captures| {
            let Some(m) = caps.get(0) else {
                return String::new();
            };
            let amp = m.start() + m.as_str().find('&').unwrap_or(0);
            if ENTITY_RE.is_match(&text[amp..]) {
                return m.as_str().to_owned();
            }

            let inline = |c: Option<char>| c.is_some_and(|c| c != '\n' && c != '\r');
            let mut joined = String::with_capacity(3);
            if inline(text[..m.start()].chars().next_back()) {
                joined.push(' ');
            }
            joined.push('&');
            if inline(text[m.end()..].chars().next()) {
                joined.push(' ');
            }
            joined
        })
        .into_owned()
}

/// Trim, then prepend [`DEFAULT_PREFIX`] unless the text starts with one of
/// [`DIAGRAM_PREFIXES`].
#[must_use]
pub fn ensure_diagram_prefix(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return DEFAULT_PREFIX.to_owned();
    }
    if DIAGRAM_PREFIXES.iter().any(|prefix| text.starts_with(prefix)) {
        return text.to_owned();
    }
    format!("{DEFAULT_PREFIX}\n{text}")
}

/// Replace a leading `flowchart` keyword with `graph`.
#[must_use]
pub fn canonicalize_flowchart(text: &str) -> String {
    FLOWCHART_RE.replace(text, "graph${1}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strip_fences() {
        assert_eq!(
            strip_fences("```mermaid\ngraph TD\n  A-->B\n```"),
            "graph TD\n  A-->B"
        );
        assert_eq!(strip_fences("  ```diagram\nA\n```  "), "A");
        assert_eq!(strip_fences("graph TD"), "graph TD");
    }

    #[test]
    fn test_strip_orientation_terminator() {
        assert_eq!(strip_orientation_terminator("graph TD;\n  A"), "graph TD\n  A");
        assert_eq!(strip_orientation_terminator("flowchart LR ;"), "flowchart LR");
        assert_eq!(strip_orientation_terminator("graph TD;;"), "graph TD");
        assert_eq!(strip_orientation_terminator("graph TD;A-->B"), "graph TD\nA-->B");
        assert_eq!(strip_orientation_terminator(r"\ngraph LR;"), r"\ngraph LR");
    }

    #[test]
    fn test_strip_orientation_terminator_only_in_header() {
        assert_eq!(strip_orientation_terminator("graph TD\n  A;"), "graph TD\n  A;");
        assert_eq!(strip_orientation_terminator("A\ngraph TD;"), "A\ngraph TD;");
        assert_eq!(strip_orientation_terminator("graph TDX;"), "graph TDX;");
    }

    #[test]
    fn test_space_arrows() {
        assert_eq!(space_arrows("A-->B"), "A --> B");
        assert_eq!(space_arrows("A -->B-->C"), "A --> B --> C");
        assert_eq!(space_arrows("A --> B"), "A --> B");
    }

    #[test]
    fn test_space_arrows_keeps_link_shapes() {
        assert_eq!(space_arrows("A-->|yes|B"), "A -->|yes|B");
        assert_eq!(space_arrows("A<-->B"), "A<--> B");
        assert_eq!(space_arrows("A--->B"), "A---> B");
        assert_eq!(space_arrows("A-->-->B"), "A --> --> B");
    }

    #[test]
    fn test_close_labeled_edges() {
        assert_eq!(close_labeled_edges("A--|yes|B"), "A -->|yes|B");
        assert_eq!(close_labeled_edges("A -- |no| B"), "A -->|no| B");
        assert_eq!(close_labeled_edges("A -->|ok| B"), "A -->|ok| B");
        assert_eq!(close_labeled_edges("A---|x|B"), "A---|x|B");
    }

    #[test]
    fn test_close_labeled_edges_chained() {
        assert_eq!(close_labeled_edges("A--|x|--|y|B"), "A -->|x| -->|y|B");
        assert_eq!(close_labeled_edges("LR--|--|yes|"), "LR -->| -->|yes|");
        assert_eq!(close_labeled_edges("A--|yes|B--|no|C"), "A -->|yes|B -->|no|C");
    }

    #[test]
    fn test_close_labeled_edges_skips_labels_with_escaped_newlines() {
        assert_eq!(close_labeled_edges(r"A--|a\nb|B"), r"A--|a\nb|B");
        assert_eq!(close_labeled_edges(r"A--|a\\b|B"), r"A -->|a\\b|B");
    }

    #[test]
    fn test_expand_escaped_newlines() {
        assert_eq!(
            expand_escaped_newlines(r"graph TD\nA --> B\r\nB --> C"),
            "graph TD\nA --> B\nB --> C"
        );
    }

    #[test]
    fn test_space_ampersands() {
        assert_eq!(space_ampersands("A&B --> C"), "A & B --> C");
        assert_eq!(space_ampersands("A  &\tB"), "A & B");
        assert_eq!(space_ampersands("A\n&B &"), "A\n& B &");
    }

    #[test]
    fn test_space_ampersands_skips_entities() {
        assert_eq!(space_ampersands("A[Tom &amp; Jerry]"), "A[Tom &amp; Jerry]");
        assert_eq!(space_ampersands("A[#&#35;1]&B"), "A[#&#35;1] & B");
        assert_eq!(space_ampersands("A[x &lt; y]"), "A[x &lt; y]");
    }

    #[test]
    fn test_space_ampersands_before_terminator() {
        assert_eq!(space_ampersands("B&C;"), "B & C;");
        assert_eq!(normalize("graph TD\n  A-->B&C;"), "graph TD\n  A --> B & C;");
    }

    #[test]
    fn test_ensure_diagram_prefix() {
        assert_eq!(ensure_diagram_prefix("A --> B"), "graph TD\nA --> B");
        assert_eq!(ensure_diagram_prefix("   "), "graph TD");
        assert_eq!(
            ensure_diagram_prefix("sequenceDiagram\n  A->>B: hi"),
            "sequenceDiagram\n  A->>B: hi"
        );
        assert_eq!(ensure_diagram_prefix("pie\n  \"a\": 1"), "pie\n  \"a\": 1");
    }

    #[test]
    fn test_canonicalize_flowchart() {
        assert_eq!(canonicalize_flowchart("flowchart LR\n  A"), "graph LR\n  A");
        assert_eq!(canonicalize_flowchart("flowchart"), "graph");
        assert_eq!(canonicalize_flowchart("flowchartX"), "flowchartX");
        assert_eq!(canonicalize_flowchart("graph TD\nflowchart"), "graph TD\nflowchart");
    }

    #[test]
    fn test_normalize_full_pipeline() {
        let raw = "```mermaid\nflowchart TD;\n  A-->B\n  B--|ok|C & D\n```";

        assert_eq!(normalize(raw), "graph TD\n  A --> B\n  B -->|ok|C & D");
    }

    #[test]
    fn test_normalize_chained_labeled_edges() {
        assert_eq!(normalize("A--|x|--|y|B"), "graph TD\nA -->|x| -->|y|B");
        assert_eq!(normalize("LR--|--|yes|"), "graph TD\nLR -->| -->|yes|");
    }

    #[test]
    fn test_normalize_escaped_single_line() {
        assert_eq!(
            normalize(r"graph LR;\nA-->B\nB&C-->D"),
            "graph LR\nA --> B\nB & C --> D"
        );
    }

    #[test]
    fn test_normalize_empty_input() {
        assert_eq!(normalize(""), "graph TD");
        assert_eq!(normalize("  \n\t "), "graph TD");
        assert_eq!(normalize("```\n```"), "graph TD");
    }

    #[test]
    fn test_normalize_default_prefix() {
        let out = normalize("A --> B");

        assert!(out.starts_with("graph TD"));
        assert!(out.contains("A --> B"));
    }

    #[test]
    fn test_normalize_flowchart_becomes_graph() {
        for raw in ["flowchart TD\n A-->B", "flowchart LR;", "```\nflowchart BT\nA\n```"] {
            assert!(normalize(raw).starts_with("graph "), "{raw:?}");
        }
    }

    #[test]
    fn test_normalize_canonical_input_unchanged() {
        let canonical = "graph TD\n    A[Start] --> B{Check}\n    B -->|yes| C & D";

        assert_eq!(normalize(canonical), canonical);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "",
            "A-->B",
            "graph TD;;",
            "graph TD; ;x",
            "flowchart LR;\\n;A-->B",
            "```mermaid\nflowchart TD;\n  A-->B\n```",
            "A-->-->B",
            "A--->B<-->C",
            "A--|yes|B--|no|C",
            "A--|x&y|B",
            "A &amp;B&C",
            "graph TD\\n&B",
            "\\ngraph TD\\nA",
            "x\\\\ny",
            "A-->\\nB",
            "flowchart",
            "graph TD&;",
            "  trailing &",
            "sequenceDiagram\n  A->>B: hi",
            "pie\r\n  \"a\": 1",
            "&B",
            "A\n & B",
            "\\r\\ngraph LR;",
            "\\n\\ngraph TD; LR",
            "graph TD ;A",
            "A--|x|--|y|B",
            "LR--|--|yes|",
            "--|\\r\\nA&lt;B--|x|&x;",
            "A--|a\\nb--|x|",
            "A-->B&C;",
        ];

        for raw in inputs {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "input: {raw:?}");
        }
    }
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    /// Fragments that trigger at least one rewrite rule.
    const FRAGMENTS: &[&str] = &[
        "graph", "flowchart", "sequence", "class", "pie", " TD", " LR", "TB", ";", "-->", "--",
        "|", "|label|", "--|", "&", "&amp;", "&lt;", "&#35;", "&x;", "\\n", "\\r\\n", "\\",
        "\n", "```", "```mermaid", "```diagram", "A", "B", " ", "\t", "<", ">", "-", ".", "=", "#",
    ];

    fn fragment_source_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(FRAGMENTS), 0..16)
            .prop_map(|parts| parts.concat())
    }

    fn char_source_strategy() -> impl Strategy<Value = String> {
        r"[ABTDLRnramp \t\n;&|<>=.#`\\-]{0,24}"
    }

    // ===================
    // Property Test Functions
    // ===================

    /// Normalizing an already normalized source changes nothing.
    fn check_normalize_is_idempotent(raw: &str) -> Result<(), TestCaseError> {
        let once = normalize(raw);
        let twice = normalize(&once);

        prop_assert_eq!(&twice, &once, "input: {:?}", raw);
        Ok(())
    }

    /// Output always starts with a known diagram type.
    fn check_normalize_has_prefix(raw: &str) -> Result<(), TestCaseError> {
        let out = normalize(raw);

        prop_assert!(
            DIAGRAM_PREFIXES.iter().any(|prefix| out.starts_with(prefix)),
            "missing prefix for {raw:?}: {out:?}"
        );
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn test_normalize_idempotent_for_fragment_sources(raw in fragment_source_strategy()) {
            check_normalize_is_idempotent(&raw)?;
        }

        #[test]
        fn test_normalize_idempotent_for_char_sources(raw in char_source_strategy()) {
            check_normalize_is_idempotent(&raw)?;
        }

        #[test]
        fn test_normalize_has_prefix(raw in fragment_source_strategy()) {
            check_normalize_has_prefix(&raw)?;
        }
    }
}
