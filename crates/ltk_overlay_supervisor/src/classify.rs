//! Classification of raw overlay output.
//!
//! The overlay tool only reports its progress as free-form text, so every
//! rule that depends on that text lives here.

use std::sync::OnceLock;

use regex::Regex;

/// Printed once injection is armed and the tool waits for a match.
pub const READY_MARKER: &str = "Waiting for league match to start";

/// Printed while the tool waits for the running game to exit.
pub const EXITING_MARKER: &str = "Waiting for exit";

/// Diagnostic prefixes that are never shown.
const NOISE_PREFIXES: &[&str] = &["[DLL] info:", "[INF] Done!"];

/// Lifecycle signal carried by an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMarker {
    Ready,
    Exiting,
}

/// One line of output after filtering and rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub text: String,
    pub marker: Option<LineMarker>,
}

fn wad_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?:redirected wad:|\[INF\] Writing wad:)\s*(\S.*)$").ok())
        .as_ref()
}

/// Splits `raw` into lines and classifies each one, preserving order.
///
/// Noise lines and blank lines are dropped. Wad redirect/write messages are
/// reduced to `Hunted wad: <file name>`.
pub fn classify(raw: &str) -> Vec<ClassifiedLine> {
    raw.split('\n').filter_map(classify_line).collect()
}

fn classify_line(line: &str) -> Option<ClassifiedLine> {
    let line = line.trim_end_matches('\r').trim();
    if line.is_empty() || NOISE_PREFIXES.iter().any(|prefix| line.starts_with(prefix)) {
        return None;
    }

    let text = match wad_pattern().and_then(|re| re.captures(line)) {
        Some(captures) => {
            let path = captures.get(1).map_or("", |m| m.as_str().trim());
            let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
            format!("Hunted wad: {name}")
        }
        None => line.to_string(),
    };

    let marker = if line.contains(READY_MARKER) {
        Some(LineMarker::Ready)
    } else if line.contains(EXITING_MARKER) {
        Some(LineMarker::Exiting)
    } else {
        None
    };

    Some(ClassifiedLine { text, marker })
}
