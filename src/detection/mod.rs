//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Recognizing auto-numbered filenames and deriving their original name
//! - Gathering presumed originals from the candidate's directory
//! - Classifying a candidate against an original by size, time window and hash
//!
//! # Architecture
//!
//! - [`pattern`]: filename pattern matcher and base-name derivation
//! - [`candidates`]: original-file enumeration in deterministic order
//! - [`classifier`]: the ordered size → time → hash comparison
//! - [`hasher`]: streaming content hashes
//! - [`window`]: time window parsing and formatting

pub mod candidates;
pub mod classifier;
pub mod hasher;
pub mod pattern;
pub mod window;

pub use candidates::gather_originals;
pub use classifier::{classify, creation_time, Check, DetectionSettings, FileFacts, Verdict};
pub use hasher::{hash_file, HashAlgorithm, HashError};
pub use pattern::{base_name, has_numeric_suffix, PatternMatcher, DEFAULT_PATTERN};
pub use window::{format_time_window, parse_time_window};
