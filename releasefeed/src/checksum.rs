//! Streaming file digests for post-download verification.
//!
//! Digests are rendered as uppercase hexadecimal with no separators, the
//! format legacy release feeds use in their `SHA1` field.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Errors from digest computation.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// The file could not be opened or read.
    #[error("failed to read {} for checksum: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
}

/// Digest algorithm attached to downloaded assets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// 160-bit SHA-1, for parity with legacy feed consumers.
    #[default]
    Sha1,
    /// 256-bit SHA-2.
    Sha256,
}

impl DigestAlgorithm {
    /// Length of the hex digest in characters.
    pub fn hex_len(self) -> usize {
        match self {
            Self::Sha1 => 40,
            Self::Sha256 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "sha1"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            other => Err(format!("unknown digest algorithm: {}", other)),
        }
    }
}

/// Computes the digest attached to a downloaded asset.
///
/// Called from a blocking thread after the destination file is closed.
/// [`DigestAlgorithm`] is the standard implementation; tests substitute
/// their own to observe or fail verification.
pub trait ChecksumComputer: Send + Sync {
    /// Digest the file at `path` as uppercase hex.
    fn compute(&self, path: &Path) -> Result<String, ChecksumError>;
}

impl ChecksumComputer for DigestAlgorithm {
    fn compute(&self, path: &Path) -> Result<String, ChecksumError> {
        compute_digest(path, *self)
    }
}

/// Calculate the digest of a file.
///
/// The file is streamed in fixed-size chunks, so memory use does not grow
/// with file size.
///
/// # Errors
///
/// Returns [`ChecksumError::Read`] if the file cannot be opened or read.
pub fn compute_digest(path: &Path, algorithm: DigestAlgorithm) -> Result<String, ChecksumError> {
    match algorithm {
        DigestAlgorithm::Sha1 => digest_file::<Sha1>(path),
        DigestAlgorithm::Sha256 => digest_file::<Sha256>(path),
    }
}

fn digest_file<D: Digest>(path: &Path) -> Result<String, ChecksumError> {
    let read_failed = |source| ChecksumError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_failed)?;
    let mut hasher = D::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_failed(e)),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(to_upper_hex(&hasher.finalize()))
}

fn to_upper_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(data).unwrap();
        path
    }

    #[test]
    fn test_sha1_hello_world() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "test.txt", b"hello world");

        assert_eq!(
            compute_digest(&path, DigestAlgorithm::Sha1).unwrap(),
            "2AAE6C35C94FCFB415DBE95F408B9CE91EE846ED"
        );
    }

    #[test]
    fn test_sha256_hello_world() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "test.txt", b"hello world");

        assert_eq!(
            compute_digest(&path, DigestAlgorithm::Sha256).unwrap(),
            "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9"
        );
    }

    #[test]
    fn test_empty_file() {
        let temp = TempDir::new().unwrap();
        let path = write_file(&temp, "empty.bin", b"");

        assert_eq!(
            compute_digest(&path, DigestAlgorithm::Sha1).unwrap(),
            "DA39A3EE5E6B4B0D3255BFEF95601890AFD80709"
        );
    }

    #[test]
    fn test_nonexistent_file() {
        let result = compute_digest(Path::new("/nonexistent/file.bin"), DigestAlgorithm::Sha1);
        match result {
            Err(ChecksumError::Read { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/file.bin"));
            }
            Ok(_) => panic!("Expected read error"),
        }
    }

    #[test]
    fn test_large_file_spans_buffers() {
        let temp = TempDir::new().unwrap();
        let data = vec![0xABu8; BUFFER_SIZE * 3 + 17];
        let path = write_file(&temp, "large.bin", &data);

        let streamed = compute_digest(&path, DigestAlgorithm::Sha1).unwrap();
        let direct = to_upper_hex(&Sha1::digest(&data));
        assert_eq!(streamed, direct);
        assert_eq!(streamed.len(), DigestAlgorithm::Sha1.hex_len());
    }

    #[test]
    fn test_one_byte_difference_changes_digest() {
        let temp = TempDir::new().unwrap();
        let mut data = vec![7u8; 4096];
        let a = write_file(&temp, "a.bin", &data);
        data[2048] ^= 1;
        let b = write_file(&temp, "b.bin", &data);

        for algorithm in [DigestAlgorithm::Sha1, DigestAlgorithm::Sha256] {
            assert_ne!(
                compute_digest(&a, algorithm).unwrap(),
                compute_digest(&b, algorithm).unwrap()
            );
        }
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("SHA1".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Sha1));
        assert_eq!("sha-256".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Sha256));
        assert!("md5".parse::<DigestAlgorithm>().is_err());
        assert_eq!(DigestAlgorithm::Sha256.to_string(), "sha256");
    }
}
