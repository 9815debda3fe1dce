//! Fixed diagrams used by the fallback tiers and the priming canary.

/// Minimal diagram every working engine can render.
pub const CANARY_DIAGRAM: &str = "graph TD\n    A --> B";

/// Static diagram shown when nothing else renders.
pub const ERROR_DIAGRAM: &str =
    "graph TD\n    A[\"Error\"] --> B[\"Could Not Render\"]\n    B --> C[\"Please Try Again\"]";

/// Built-in topic keywords looked up by [`placeholder_diagram`].
pub const DEFAULT_TOPIC_KEYWORDS: [&str; 10] = [
    "algorithm",
    "architecture",
    "database",
    "network",
    "process",
    "lifecycle",
    "workflow",
    "system",
    "cycle",
    "pipeline",
];

/// Label used when no keyword matches.
pub const DEFAULT_FALLBACK_LABEL: &str = "Diagram";

/// Minimal always-valid diagram rendered before the first request.
#[must_use]
pub fn canary_diagram() -> &'static str {
    CANARY_DIAGRAM
}

/// Static three-node error diagram.
#[must_use]
pub fn error_diagram() -> &'static str {
    ERROR_DIAGRAM
}

/// Pick the subject label for a placeholder.
///
/// Returns the first keyword (in `keywords` order) that occurs in `source`,
/// ignoring case, with its first letter capitalized. Falls back to
/// `fallback_label`.
#[must_use]
pub fn topic_label<S: AsRef<str>>(source: &str, keywords: &[S], fallback_label: &str) -> String {
    let haystack = source.to_lowercase();
    keywords
        .iter()
        .map(AsRef::<str>::as_ref)
        .find(|keyword| !keyword.is_empty() && haystack.contains(&keyword.to_lowercase()))
        .map_or_else(|| fallback_label.to_owned(), capitalize)
}

/// Build the simplified diagram rendered by the second tier.
///
/// Deterministic: the same inputs always give the same diagram.
///
/// ```
/// use dgr_diagrams::placeholder_diagram;
///
/// let diagram = placeholder_diagram("graph TD\n  db[(Database)]", &["database"], "Diagram");
/// assert!(diagram.contains(r#"A["Database"]"#));
/// ```
#[must_use]
pub fn placeholder_diagram<S: AsRef<str>>(
    source: &str,
    keywords: &[S],
    fallback_label: &str,
) -> String {
    let label = escape_label(&topic_label(source, keywords, fallback_label));
    format!(
        "graph TD\n    A[\"{label}\"] --> B[\"Overview\"]\n    A --> C[\"Key Concepts\"]\n    A --> D[\"Examples\"]"
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// Quotes would end the node label early.
fn escape_label(label: &str) -> String {
    label.replace('"', "#quot;")
}
