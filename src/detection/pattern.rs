//! Filename pattern matching for auto-numbered duplicates.
//!
//! Sync clients and attachment handlers that write the same file twice
//! produce names like `report-1.pdf`, `report-2.pdf`. A filename is a
//! *candidate* when it matches one of the configurable patterns **and**
//! carries a literal `-<digits>` right before its final extension. The
//! second check is fixed so a permissive user pattern can never turn every
//! file into a candidate.
//!
//! # Example
//!
//! ```
//! use dupeguard::detection::pattern::{base_name, PatternMatcher, DEFAULT_PATTERN};
//!
//! let matcher = PatternMatcher::new(&[DEFAULT_PATTERN.to_string()]);
//! assert!(matcher.is_candidate("invoice-1.pdf"));
//! assert!(!matcher.is_candidate("invoice.pdf"));
//! assert_eq!(base_name("invoice-1.pdf"), "invoice.pdf");
//! ```

use std::sync::LazyLock;

use regex::Regex;

/// Default pattern: a name, an optional `-<digits>` group, and an extension.
pub const DEFAULT_PATTERN: &str = r"(.+?)(-\d+)?(\.[^.]+)$";

/// Non-configurable suffix check: `-<digits>` immediately before the extension.
static NUMERIC_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-\d+\.[^.]+$").expect("numeric suffix regex is valid")
});

/// Captures the part to keep around the trailing `-<digits>` group.
static SUFFIX_STRIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(.*)-\d+(\.[^.]+)$").expect("suffix strip regex is valid")
});

/// Compiled set of user-configurable filename patterns.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    patterns: Vec<Regex>,
}

impl PatternMatcher {
    /// Compile the given patterns.
    ///
    /// Invalid expressions are logged and skipped rather than failing, so a
    /// typo in one pattern does not disable monitoring.
    #[must_use]
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match Self::compile(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("Ignoring invalid file pattern '{}': {}", p, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// Compile a single pattern the way the matcher applies it.
    ///
    /// Patterns are anchored at the start of the filename, mirroring a
    /// "match from the beginning" regex call.
    ///
    /// # Errors
    ///
    /// Returns the regex error if the pattern does not compile.
    pub fn compile(pattern: &str) -> Result<Regex, regex::Error> {
        Regex::new(&format!("^(?:{pattern})"))
    }

    /// Number of usable patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no usable pattern was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check whether `filename` looks like a numbered duplicate.
    ///
    /// True only when at least one pattern matches and the name has a
    /// `-<digits>` suffix before its extension.
    #[must_use]
    pub fn is_candidate(&self, filename: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(filename)) && has_numeric_suffix(filename)
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new(&[DEFAULT_PATTERN.to_string()])
    }
}

/// Whether `filename` ends in `-<digits>.<ext>`.
#[must_use]
pub fn has_numeric_suffix(filename: &str) -> bool {
    NUMERIC_SUFFIX.is_match(filename)
}

/// Derive the presumed original name by stripping the trailing `-<digits>`.
///
/// Only the group right before the extension is removed, so
/// `scan-2024-3.pdf` becomes `scan-2024.pdf`. Names without such a suffix
/// come back unchanged.
#[must_use]
pub fn base_name(filename: &str) -> String {
    match SUFFIX_STRIP.captures(filename) {
        Some(caps) => format!("{}{}", &caps[1], &caps[2]),
        None => filename.to_string(),
    }
}
