//! Build identifier extraction from free-form patch notes.
//!
//! Matchers are tried in priority order against each text; the first one
//! that matches decides the result. A "from → to" pair beats any single
//! build number, and the labelled forms beat the bare `build 1234567` form.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ChangeRecord;

/// What the notes say about build numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildInfo {
    NoMatch,
    SingleBuild(String),
    BuildChange { old: String, new: String },
}

#[derive(Debug, Clone, Copy)]
enum MatcherKind {
    Pair,
    Single,
}

/// One pattern in the priority list.
#[derive(Debug)]
pub struct BuildMatcher {
    name: &'static str,
    kind: MatcherKind,
    pattern: Regex,
}

impl BuildMatcher {
    fn new(name: &'static str, kind: MatcherKind, pattern: &str) -> Self {
        BuildMatcher {
            name,
            kind,
            // Patterns are compile-time constants covered by tests.
            pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("bad {name} pattern: {e}")),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the build info this matcher finds in `text`, if any.
    pub fn try_match(&self, text: &str) -> Option<BuildInfo> {
        let caps = self.pattern.captures(text)?;
        match self.kind {
            MatcherKind::Pair => Some(BuildInfo::BuildChange {
                old: caps.get(1)?.as_str().to_string(),
                new: caps.get(2)?.as_str().to_string(),
            }),
            MatcherKind::Single => Some(BuildInfo::SingleBuild(caps.get(1)?.as_str().to_string())),
        }
    }
}

static MATCHERS: LazyLock<Vec<BuildMatcher>> = LazyLock::new(|| {
    vec![
        BuildMatcher::new(
            "pair",
            MatcherKind::Pair,
            r"(?i)([0-9]{7,})\s*(?:→|->|➡️|➡|to)\s*([0-9]{7,})",
        ),
        BuildMatcher::new(
            "build-id",
            MatcherKind::Single,
            r"(?i)build\s*id[:\s]+([0-9]{7,})",
        ),
        BuildMatcher::new("buildid", MatcherKind::Single, r"(?i)buildid[:\s]+([0-9]{7,})"),
        BuildMatcher::new("build", MatcherKind::Single, r"(?i)build[:\s]+([0-9]{7,})"),
    ]
});

/// Build-ish substrings removed from descriptions. Looser than the matchers
/// so short numbers next to a label are scrubbed too.
static SCRUB: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)[0-9]{7,}\s*(?:→|->|➡️|➡|to)\s*[0-9]{7,}",
        r"(?i)build\s*id[:\s]+[0-9]+",
        r"(?i)build[:\s]+[0-9]{7,}",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("bad scrub pattern {p}: {e}")))
    .collect()
});

/// The matchers in priority order.
pub fn matchers() -> &'static [BuildMatcher] {
    &MATCHERS
}

/// Runs the priority list over a single text.
pub fn extract(text: &str) -> BuildInfo {
    matchers()
        .iter()
        .find_map(|m| m.try_match(text))
        .unwrap_or(BuildInfo::NoMatch)
}

/// Scans records newest first and returns the first match found.
pub fn extract_from_records(records: &[ChangeRecord]) -> BuildInfo {
    records
        .iter()
        .map(|r| extract(r.text()))
        .find(|info| *info != BuildInfo::NoMatch)
        .unwrap_or(BuildInfo::NoMatch)
}

/// Removes every build-identifier substring from `text`.
pub fn scrub(text: &str) -> String {
    SCRUB.iter().fold(text.to_string(), |acc, re| {
        re.replace_all(&acc, "").into_owned()
    })
}
