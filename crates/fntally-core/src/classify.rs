//! Verdict classification for free-text harness lines.
//!
//! The harness prints natural language, so everything here is a substring
//! heuristic: glyph markers and keywords decide the verdict, and a small set
//! of positional patterns decides which registered function a line is about.

use std::sync::Arc;

use crate::registry::FunctionRegistry;
use crate::types::{Classification, Verdict};

// ─── Markers ─────────────────────────────────────────────────────

const SUCCESS_GLYPHS: &[char] = &['\u{2705}']; // ✅
const FAIL_GLYPHS: &[char] = &['\u{274C}']; // ❌
const NEUTRAL_GLYPHS: &[char] = &['\u{203C}']; // ‼
const WARNING_GLYPHS: &[char] = &['\u{26A0}']; // ⚠
const INFO_GLYPHS: &[char] = &['\u{2139}']; // ℹ
/// Legend decorations. Stripped for name matching, never a verdict.
const LEGEND_GLYPHS: &[char] = &['\u{26D4}', '\u{23FA}']; // ⛔ ⏺
/// Emoji presentation selector that trails most of the glyphs above.
const VARIATION_SELECTOR: char = '\u{FE0F}';

/// Banner and summary fragments that never describe a single function.
const SKIP_PATTERNS: &[&str] = &[
    "getting ready",
    "running tests",
    "environment check",
    "tested with",
    "success rate",
    " out of ",
    "tests failed",
    "- no test",
    "missing aliases",
];

const RESULT_KEYWORDS: &[&str] = &[
    "passed",
    "failed",
    "working",
    "error",
    "success",
    "neutral",
    "function is nil",
    "not working",
];

const PASS_KEYWORDS: &[&str] = &["working", "passed"];
const FAIL_KEYWORDS: &[&str] = &["function is nil", "failed", "error"];
const NEUTRAL_KEYWORDS: &[&str] = &["neutral"];

fn has_glyph(message: &str, glyphs: &[char]) -> bool {
    message.chars().any(|c| glyphs.contains(&c))
}

fn has_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn is_marker(c: char) -> bool {
    c == VARIATION_SELECTOR
        || SUCCESS_GLYPHS.contains(&c)
        || FAIL_GLYPHS.contains(&c)
        || NEUTRAL_GLYPHS.contains(&c)
        || WARNING_GLYPHS.contains(&c)
        || INFO_GLYPHS.contains(&c)
        || LEGEND_GLYPHS.contains(&c)
}

/// Strip status glyphs, trim, and lower-case. Used for name matching only.
pub fn normalize(message: &str) -> String {
    let stripped: String = message.chars().filter(|&c| !is_marker(c)).collect();
    stripped.trim().to_lowercase()
}

// ─── Name matching ───────────────────────────────────────────────

/// Whether `name` occurs in `normalized` at a position that reads as a
/// reference to the function: the whole line, a leading or trailing token, a
/// whitespace-delimited token, a quoted string, a call or a member access.
fn mentions(normalized: &str, name: &str) -> bool {
    normalized.match_indices(name).any(|(start, _)| {
        let prev = normalized[..start].chars().next_back();
        let next = normalized[start + name.len()..].chars().next();
        match (prev, next) {
            (None, None) => true,
            (_, Some('(' | '.')) => true,
            (Some(p), Some(n)) if (p == '\'' || p == '"') && p == n => true,
            (None, Some(n)) => n.is_whitespace(),
            (Some(p), None) => p.is_whitespace(),
            (Some(p), Some(n)) => p.is_whitespace() && n.is_whitespace(),
        }
    })
}

// ─── Classifier ──────────────────────────────────────────────────

/// Maps one harness line to a [`Classification`]. Stateless apart from the
/// shared registry, so classifying the same line twice gives the same answer.
#[derive(Debug, Clone)]
pub struct MessageClassifier {
    registry: Arc<FunctionRegistry>,
}

impl MessageClassifier {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// First registered function (longest, then lexicographic) the line refers to.
    pub fn extract_function_name(&self, message: &str) -> Option<String> {
        let normalized = normalize(message);
        if normalized.is_empty() {
            return None;
        }
        self.registry
            .iter()
            .find(|name| mentions(&normalized, name))
            .map(str::to_string)
    }

    pub fn is_function_test_result(&self, message: &str) -> bool {
        self.classify(message).is_result
    }

    pub fn classify(&self, message: &str) -> Classification {
        let lower = message.to_lowercase();
        let function = self.extract_function_name(message);

        if has_any(&lower, SKIP_PATTERNS) {
            return Classification::info(function);
        }
        let Some(name) = function else {
            return Classification::info(None);
        };

        let has_result_marker = has_any(&lower, RESULT_KEYWORDS)
            || has_glyph(message, SUCCESS_GLYPHS)
            || has_glyph(message, FAIL_GLYPHS)
            || has_glyph(message, NEUTRAL_GLYPHS)
            || has_glyph(message, WARNING_GLYPHS);
        if !has_result_marker {
            return Classification::info(Some(name));
        }

        Classification {
            function: Some(name),
            is_result: true,
            verdict: verdict_for(message, &lower),
        }
    }
}

/// Verdict priority: pass markers, then failure markers, then neutral/warning.
fn verdict_for(message: &str, lower: &str) -> Verdict {
    if has_glyph(message, SUCCESS_GLYPHS) || has_any(lower, PASS_KEYWORDS) {
        Verdict::Pass
    } else if has_glyph(message, FAIL_GLYPHS) || has_any(lower, FAIL_KEYWORDS) {
        Verdict::Fail
    } else if has_glyph(message, NEUTRAL_GLYPHS)
        || has_glyph(message, WARNING_GLYPHS)
        || has_any(lower, NEUTRAL_KEYWORDS)
    {
        Verdict::Neutral
    } else {
        Verdict::Info
    }
}

// ─── Tests ──────────────────────────────────────────────────────
