//! Streaming whole-file content hashing.
//!
//! Files are read in fixed-size chunks so memory use stays flat regardless
//! of file size. The algorithm is selectable per configuration; MD5, SHA-1,
//! SHA-256 and SHA-512 go through the RustCrypto [`Digest`] trait and BLAKE3
//! through its own hasher.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::Digest;

/// Read buffer size for streaming hashes.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Content hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// MD5 (fast, not collision resistant)
    Md5,
    /// SHA-1
    Sha1,
    /// SHA-256
    #[default]
    Sha256,
    /// SHA-512
    Sha512,
    /// BLAKE3
    Blake3,
}

impl HashAlgorithm {
    /// All supported algorithms, in display order.
    pub const ALL: [HashAlgorithm; 5] = [
        Self::Md5,
        Self::Sha1,
        Self::Sha256,
        Self::Sha512,
        Self::Blake3,
    ];

    /// Lowercase name as used in configuration and reason strings.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "");
        Self::ALL
            .into_iter()
            .find(|a| a.name() == wanted)
            .ok_or_else(|| format!("Unknown hash algorithm: '{s}'"))
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// Hash the full contents of `path` and return the lowercase hex digest.
///
/// # Errors
///
/// Returns [`HashError`] if the file cannot be opened or read.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<String, HashError> {
    let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
    hash_reader(file, algorithm).map_err(|e| HashError::from_io(path, e))
}

/// Hash everything readable from `reader`.
///
/// # Errors
///
/// Propagates read errors.
pub fn hash_reader<R: Read>(reader: R, algorithm: HashAlgorithm) -> io::Result<String> {
    match algorithm {
        HashAlgorithm::Md5 => digest_reader::<md5::Md5, _>(reader),
        HashAlgorithm::Sha1 => digest_reader::<sha1::Sha1, _>(reader),
        HashAlgorithm::Sha256 => digest_reader::<sha2::Sha256, _>(reader),
        HashAlgorithm::Sha512 => digest_reader::<sha2::Sha512, _>(reader),
        HashAlgorithm::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            stream_chunks(reader, |chunk| {
                hasher.update(chunk);
            })?;
            Ok(hasher.finalize().to_hex().to_string())
        }
    }
}

fn digest_reader<D: Digest, R: Read>(reader: R) -> io::Result<String> {
    let mut hasher = D::new();
    stream_chunks(reader, |chunk| hasher.update(chunk))?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}

fn stream_chunks<R: Read>(mut reader: R, mut sink: impl FnMut(&[u8])) -> io::Result<()> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sink(&buffer[..n]);
    }
}

/// Compare two files by content hash.
///
/// # Errors
///
/// Returns [`HashError`] if either file cannot be read.
pub fn files_identical(a: &Path, b: &Path, algorithm: HashAlgorithm) -> Result<bool, HashError> {
    Ok(hash_file(a, algorithm)? == hash_file(b, algorithm)?)
}
