//! Interpretation of the assistant CLI's raw text.
//!
//! There is no structured protocol with the CLI, so everything here is
//! heuristic screen-scraping: [`classifier`] labels supervision lines and
//! [`attribution`] assigns delegation lines to personas.

pub mod attribution;
pub mod classifier;

pub use attribution::{Attribution, DefaultMarkerGrammar, MarkerGrammar, MarkerMatch, PersonaAttributor, Speaker};
pub use classifier::{classify_stderr, classify_stdout, LineKind};

/// Remove ANSI escape sequences so heuristics see plain text
pub fn strip_ansi(line: &str) -> String {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static ANSI_REGEX: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("Invalid ANSI escape regex")
    });

    ANSI_REGEX.replace_all(line, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[1;32mok\x1b[0m done"), "ok done");
        assert_eq!(strip_ansi("plain"), "plain");
    }
}
