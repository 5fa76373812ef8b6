//! Newsletter HTML and subject rewriting.
//!
//! All transformations here are pattern based. They target the markup that
//! newsletter senders and mail clients actually produce and leave anything
//! they do not recognize untouched; none of them attempt to repair
//! malformed HTML.

mod clean;
mod forward;
mod subject;

pub use clean::{BACKGROUND_VARIABLE, CONTAINER_CLASS, clean_html};
pub use forward::extract_forwarded_content;
pub use subject::clean_subject;

use regex::Regex;

/// Compiles a pattern known to be valid.
#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid built-in regex")
}
