// src/utils/template.rs

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

use crate::utils::html::{escape_text, neutralize_css};

/// Tokens a certificate template may reference as `{{token}}`.
pub const KNOWN_TOKENS: &[&str] = &[
    "student_name",
    "student_number",
    "class_name",
    "title",
    "issue_date",
    "serial",
    "issuer_name",
    "verify_url",
];

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("placeholder regex"));

/// Distinct placeholder tokens used by `html`, sorted.
pub fn placeholders(html: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect()
}

/// Tokens in `html` that the renderer would not be able to fill.
pub fn unknown_placeholders(html: &str) -> Vec<String> {
    placeholders(html)
        .into_iter()
        .filter(|t| !KNOWN_TOKENS.contains(&t.as_str()))
        .collect()
}

/// Fills placeholders with escaped values and wraps the result in a standalone document.
/// Tokens without a value render as empty strings.
pub fn render_document(
    title: &str,
    html: &str,
    css: &str,
    values: &HashMap<&str, String>,
) -> String {
    let body = PLACEHOLDER.replace_all(html, |caps: &regex::Captures| {
        values
            .get(&caps[1])
            .map(|v| escape_text(v))
            .unwrap_or_default()
    });

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}\n</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_text(title),
        neutralize_css(css),
        body
    )
}

/// Values used by the template preview endpoint.
pub fn sample_values() -> HashMap<&'static str, String> {
    HashMap::from([
        ("student_name", "Sample Student".to_string()),
        ("student_number", "S0001".to_string()),
        ("class_name", "A10 [AMT]/1".to_string()),
        ("title", "Certificate of Completion".to_string()),
        ("issue_date", chrono::Utc::now().date_naive().to_string()),
        ("serial", "00000000-0000-0000-0000-000000000000".to_string()),
        ("issuer_name", "Portal Administrator".to_string()),
        ("verify_url", "#".to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_tokens_with_inner_whitespace() {
        let tokens = placeholders("<p>{{ student_name }} - {{title}} {{title}}</p>");
        assert_eq!(tokens.into_iter().collect::<Vec<_>>(), vec!["student_name", "title"]);
    }

    #[test]
    fn unknown_tokens_are_reported() {
        assert_eq!(
            unknown_placeholders("{{student_name}} {{favourite_colour}}"),
            vec!["favourite_colour"]
        );
        assert!(unknown_placeholders("{{serial}}").is_empty());
    }

    #[test]
    fn render_substitutes_and_escapes() {
        let values = HashMap::from([
            ("student_name", "<b>Ann</b>".to_string()),
            ("serial", "abc-123".to_string()),
        ]);
        let doc = render_document("Award", "<h1>{{student_name}}</h1><p>{{ serial }}</p><i>{{class_name}}</i>", "h1{color:red}", &values);

        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<p>abc-123</p>"));
        assert!(doc.contains("<i></i>"));
        assert!(doc.contains("h1{color:red}"));
        assert!(!doc.contains("<b>Ann</b>"));
        assert!(!doc.contains("{{"));
    }

    #[test]
    fn sample_values_cover_every_token() {
        let sample = sample_values();
        for token in KNOWN_TOKENS {
            assert!(sample.contains_key(token), "missing sample for {token}");
        }
    }
}
