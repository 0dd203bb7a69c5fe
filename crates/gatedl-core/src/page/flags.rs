//! Pattern flag names → `regex::RegexBuilder` options.

use regex::{Regex, RegexBuilder};

/// Flags accepted in `re_flags`. Long and single-letter names are both accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_matches_all: bool,
    pub verbose: bool,
}

impl PatternFlags {
    /// Parse flag names; unknown names are logged and ignored.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> PatternFlags {
        let mut flags = PatternFlags::default();
        for name in names {
            match name.as_ref().trim().to_ascii_uppercase().as_str() {
                "IGNORECASE" | "I" => flags.case_insensitive = true,
                "MULTILINE" | "M" => flags.multi_line = true,
                "DOTALL" | "S" => flags.dot_matches_all = true,
                "VERBOSE" | "X" => flags.verbose = true,
                // Unicode matching is always on.
                "UNICODE" | "U" => {}
                other => tracing::warn!(flag = other, "ignoring unknown pattern flag"),
            }
        }
        flags
    }

    pub fn compile(&self, pattern: &str) -> Result<Regex, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(self.case_insensitive)
            .multi_line(self.multi_line)
            .dot_matches_new_line(self.dot_matches_all)
            .ignore_whitespace(self.verbose)
            .build()
    }
}
