//! Post titles from email subjects.

use std::sync::OnceLock;

use regex::Regex;

fn prefix_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| super::compile(r"(?i)^(?:\s*(?:Fwd?|Re)\s*:\s*)+"))
}

/// Strips a leading run of `Fwd:`, `Fw:` and `Re:` prefixes and trims.
///
/// Prefixes are matched case-insensitively and may repeat in any mix.
/// Only the start of the subject is touched.
#[must_use]
pub fn clean_subject(subject: &str) -> String {
    prefix_regex().replace(subject, "").trim().to_string()
}
