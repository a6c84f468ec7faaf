//! Turns raw learner text into a complete Go compilation unit.
//!
//! This is a prefix check, not a parse: text that already opens with a
//! `package` clause is used as-is (trimmed), anything else gets the fixed
//! preamble that declares `package main` and imports `fmt`/`encoding/json`
//! under the `_fmt`/`_json` aliases the harness relies on.
use crate::templates;

const UNIT_KEYWORD: &str = "package";

/// Normalized source owned by exactly one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    text: String,
    wrapped: bool,
}

impl SourceUnit {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the preamble was prepended to the learner's text.
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }

    /// Append generated code after the learner's text.
    pub fn with_epilogue(mut self, epilogue: &str) -> Self {
        self.text.push('\n');
        self.text.push_str(epilogue);
        self
    }
}

pub fn normalize_source(raw: &str) -> SourceUnit {
    let trimmed = raw.trim();
    if declares_unit(trimmed) {
        return SourceUnit {
            text: trimmed.to_string(),
            wrapped: false,
        };
    }
    let mut text = String::with_capacity(templates::PREAMBLE_GO.len() + trimmed.len());
    text.push_str(templates::PREAMBLE_GO);
    text.push_str(trimmed);
    SourceUnit {
        text,
        wrapped: true,
    }
}

fn declares_unit(text: &str) -> bool {
    text.strip_prefix(UNIT_KEYWORD)
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_whitespace)
}
