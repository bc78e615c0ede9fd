//! Package version comparison

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("valid segment pattern"))
}

/// A dotted package version such as `6.8.4`
///
/// Ordering compares the numeric segments left to right; missing trailing
/// segments count as zero, so `6.8` == `6.8.0`.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<u64>,
}

impl Version {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let segments = segment_pattern()
            .find_iter(raw)
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn major(&self) -> Option<u64> {
        self.segments.first().copied()
    }

    pub fn minor(&self) -> Option<u64> {
        self.segments.get(1).copied()
    }

    pub fn build(&self) -> Option<u64> {
        self.segments.get(2).copied()
    }

    pub fn segments(&self) -> &[u64] {
        &self.segments
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| {
                let a = self.segments.get(i).copied().unwrap_or(0);
                let b = other.segments.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}
