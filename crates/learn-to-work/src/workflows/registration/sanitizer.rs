//! Strips injection-prone fragments from free text.
//!
//! Callers never accept the cleaned value: they compare it with the trimmed input and treat
//! any difference as unsafe content. That comparison is only meaningful because `sanitize`
//! is idempotent, so each pass below is repeated until the text stops changing.

use regex::Regex;
use std::sync::LazyLock;

static SQL_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|EXEC|UNION|SCRIPT)\b")
        .expect("sql keyword pattern compiles")
});

static SQL_PUNCTUATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"--|/\*|\*/|;|'|"|`"#).expect("sql punctuation pattern compiles")
});

static BOOLEAN_INJECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(OR|AND)\b\s+[0-9]+\s*=\s*[0-9]+").expect("boolean pattern compiles")
});

static MARKUP_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[A-Za-z!][^<>]*>").expect("markup tag pattern compiles")
});

static BRACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<>{}]").expect("brace pattern compiles"));

/// Remove SQL-ish tokens, markup and brace characters from `input`.
///
/// The result is trimmed; interior whitespace is kept exactly as supplied.
pub fn sanitize(input: &str) -> String {
    let mut current = input.trim().to_string();
    loop {
        let next = sanitize_pass(&current);
        // every pass either leaves the text alone or makes it shorter
        if next == current {
            return next;
        }
        current = next;
    }
}

/// True when sanitization would leave the trimmed input untouched.
pub fn is_clean(input: &str) -> bool {
    sanitize(input) == input.trim()
}

fn sanitize_pass(input: &str) -> String {
    let stripped = SQL_KEYWORD_RE.replace_all(input, "");
    let stripped = SQL_PUNCTUATION_RE.replace_all(&stripped, "");
    let stripped = BOOLEAN_INJECTION_RE.replace_all(&stripped, "");
    let stripped = MARKUP_TAG_RE.replace_all(&stripped, "");
    let stripped = BRACE_RE.replace_all(&stripped, "");
    stripped.trim().to_string()
}
