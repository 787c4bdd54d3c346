//! Text transformer: a single forward scan over the document's lines.
//!
//! Exported chat Markdown marks diagrams and code with a bare
//! `Code snippet` (or `Code snippet (lang):`) line instead of a fence, and
//! frequently leaves fences open or pads sections with long runs of blank
//! lines. This stage fixes all three in one pass.
//!
//! ## Rule precedence
//!
//! Each line is handled by the first rule that applies:
//!
//! 1. Sentinel line → opening fence
//! 2. Explicit ```` ``` ```` line → passed through, toggles fence state
//! 3. Inside a sentinel-opened mermaid block → passed through, a blank line
//!    after content closes the block
//! 4. Everything else → blank-run collapsing
//!
//! The rules share one `FenceState`, so they interact and cannot be split
//! into independent passes.

use crate::config::{Transform, TransformSet};
use once_cell::sync::Lazy;
use regex::Regex;

const FENCE: &str = "```";

/// Maximum consecutive blank lines kept when collapsing.
const MAX_BLANK_RUN: usize = 2;

static RE_SENTINEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*Code snippet(?:\s*\((?P<lang>[^)]+)\))?\s*:?$").unwrap()
});

/// Mutable scan state, reset for every document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct FenceState {
    mermaid_open: bool,
    mermaid_has_content: bool,
    generic_fence_open: bool,
    blank_run: usize,
}

impl FenceState {
    fn close_mermaid(&mut self) {
        self.mermaid_open = false;
        self.mermaid_has_content = false;
    }
}

/// Which transforms are on, resolved once per document.
#[derive(Debug, Clone, Copy)]
struct Enabled {
    code_snippet: bool,
    close_fences: bool,
    collapse_blanks: bool,
}

impl From<&TransformSet> for Enabled {
    fn from(set: &TransformSet) -> Self {
        Self {
            code_snippet: set.contains(Transform::CodeSnippet),
            close_fences: set.contains(Transform::CloseFences),
            collapse_blanks: set.contains(Transform::CollapseBlanks),
        }
    }
}

/// Rewrite `text` with the transforms in `enabled`.
///
/// Deterministic and infallible. The output ends with a newline exactly
/// when the input does.
///
/// Lines are split on `\n` and `\r\n` only; a lone `\r`, `\x0c` or U+2028
/// is kept as part of the line.
pub fn transform_text(text: &str, enabled: &TransformSet) -> String {
    let on = Enabled::from(enabled);
    let mut state = FenceState::default();
    let mut out: Vec<String> = Vec::new();

    for line in text.lines() {
        process_line(line, on, &mut state, &mut out);
    }

    if on.close_fences {
        finish(&state, &mut out);
    }

    let mut result = out.join("\n");
    if text.ends_with('\n') {
        result.push('\n');
    }
    result
}

/// Language captured from a sentinel line, or `None` if `line` is not one.
///
/// A sentinel without a language defaults to `mermaid`.
pub fn sentinel_language(line: &str) -> Option<String> {
    let caps = RE_SENTINEL.captures(line.trim())?;
    let lang = caps.name("lang").map_or("mermaid", |m| m.as_str());
    Some(lang.trim().to_string())
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn process_line(line: &str, on: Enabled, state: &mut FenceState, out: &mut Vec<String>) {
    // ── Rule 1: sentinel line ────────────────────────────────────────────
    if on.code_snippet {
        if let Some(lang) = sentinel_language(line) {
            out.push(format!("{FENCE}{lang}"));
            if lang.eq_ignore_ascii_case("mermaid") {
                state.mermaid_open = true;
                state.mermaid_has_content = false;
            } else {
                state.generic_fence_open = true;
            }
            state.blank_run = 0;
            return;
        }
    }

    // ── Rule 2: explicit fence marker ────────────────────────────────────
    if line.trim().starts_with(FENCE) {
        out.push(line.to_string());
        if on.close_fences {
            state.generic_fence_open = !state.generic_fence_open;
            // An explicit fence always cancels a sentinel-opened block.
            state.close_mermaid();
        }
        state.blank_run = 0;
        return;
    }

    let blank = is_blank(line);

    // ── Rule 3: inside a sentinel-opened mermaid block ───────────────────
    if state.mermaid_open {
        if on.close_fences && blank && state.mermaid_has_content {
            out.push(String::new());
            out.push(FENCE.to_string());
            out.push(String::new());
            state.close_mermaid();
            state.blank_run = 1;
            return;
        }
        if !blank {
            state.mermaid_has_content = true;
        }
        out.push(line.to_string());
        state.blank_run = if blank { state.blank_run + 1 } else { 0 };
        return;
    }

    // ── Rule 4: default handling, collapse blank runs ────────────────────
    if blank {
        state.blank_run += 1;
        if !on.collapse_blanks || state.blank_run <= MAX_BLANK_RUN {
            out.push(String::new());
        }
        return;
    }

    state.blank_run = 0;
    out.push(line.to_string());
}

/// Close whatever is still open at end of document.
///
/// A mermaid block that never received content stays unclosed.
fn finish(state: &FenceState, out: &mut Vec<String>) {
    if state.mermaid_open && state.mermaid_has_content {
        out.push(String::new());
        out.push(FENCE.to_string());
    } else if state.generic_fence_open {
        out.push(FENCE.to_string());
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
