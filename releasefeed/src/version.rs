//! Version extraction from artifact file names.
//!
//! Release artifacts are named `{package}-{version}.{ext}`, for example
//! `App-1.2.3.zip` or `My-App-1.2.3+build.5.nupkg`. The package part may
//! contain hyphens; the version is always the trailing hyphen-delimited
//! segment of the file stem and must be a strict semantic version.
//!
//! Names without a hyphen, or whose trailing segment is not valid semver,
//! are rejected; nothing is guessed. A prerelease such as `1.0.0-rc` cannot
//! be expressed in this convention since its hyphen splits the segment.

use std::path::Path;

use semver::Version;
use thiserror::Error;

/// Delimiter between the package identifier and the version.
const DELIMITER: char = '-';

/// Errors from [`parse_version`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The stem has no `-` separating an identifier from a version.
    #[error("'{file_name}' has no hyphen-delimited version segment")]
    MissingDelimiter { file_name: String },

    /// The trailing segment is not a strict semantic version.
    #[error("'{file_name}' does not end in a semantic version: {reason}")]
    InvalidVersion { file_name: String, reason: String },
}

/// Parse the semantic version embedded in an artifact file name.
///
/// # Examples
///
/// ```
/// use releasefeed::version::parse_version;
///
/// assert_eq!(parse_version("App-1.2.3.zip").unwrap().to_string(), "1.2.3");
/// assert_eq!(parse_version("My-App-0.4.0.nupkg").unwrap().to_string(), "0.4.0");
/// assert!(parse_version("readme.txt").is_err());
/// ```
///
/// # Errors
///
/// Returns [`VersionError`] naming the offending file when the name does not
/// follow the convention.
pub fn parse_version(file_name: &str) -> Result<Version, VersionError> {
    let stem = file_stem(file_name);

    let Some((identifier, candidate)) = stem.rsplit_once(DELIMITER) else {
        return Err(VersionError::MissingDelimiter {
            file_name: file_name.to_string(),
        });
    };

    if identifier.is_empty() {
        return Err(VersionError::InvalidVersion {
            file_name: file_name.to_string(),
            reason: "missing package identifier".to_string(),
        });
    }

    Version::parse(candidate).map_err(|e| VersionError::InvalidVersion {
        file_name: file_name.to_string(),
        reason: format!("'{}': {}", candidate, e),
    })
}

/// Strip the final extension, matching `Path::file_stem` on the bare name.
fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_simple() {
        assert_eq!(parse_version("App-1.2.3.zip").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn test_parse_hyphenated_package() {
        assert_eq!(
            parse_version("My-Cool-App-0.10.2.nupkg").unwrap(),
            Version::new(0, 10, 2)
        );
    }

    #[test]
    fn test_only_trailing_segment_is_considered() {
        assert_eq!(
            parse_version("App-1.0.0-2.0.0.zip").unwrap(),
            Version::new(2, 0, 0)
        );
        assert_eq!(
            parse_version("App-2024-1.2.3.zip").unwrap(),
            Version::new(1, 2, 3)
        );
    }

    #[test]
    fn test_hyphenated_prerelease_rejected() {
        for name in ["App-1.0.0-rc.zip", "App-2.0.0-beta.1.zip", "App-1.0.0-rc-2.zip"] {
            match parse_version(name) {
                Err(VersionError::InvalidVersion { file_name, .. }) => assert_eq!(file_name, name),
                other => panic!("Expected InvalidVersion for {name}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_extension_is_always_stripped() {
        // ".4" is taken as the extension, leaving "3.1"
        assert!(matches!(
            parse_version("App-3.1.4"),
            Err(VersionError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_parse_build_metadata() {
        let v = parse_version("App-1.2.3+build.5.zip").unwrap();
        assert_eq!(v, Version::parse("1.2.3+build.5").unwrap());
    }

    #[test]
    fn test_missing_delimiter() {
        assert_eq!(
            parse_version("readme.txt"),
            Err(VersionError::MissingDelimiter {
                file_name: "readme.txt".to_string()
            })
        );
    }

    #[test]
    fn test_non_strict_version_rejected() {
        for name in ["App-1.2.zip", "App-v1.2.3.zip", "App-latest.zip", "App-01.2.3.zip"] {
            match parse_version(name) {
                Err(VersionError::InvalidVersion { file_name, .. }) => assert_eq!(file_name, name),
                other => panic!("Expected InvalidVersion for {name}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_leading_hyphen_has_no_identifier() {
        assert!(matches!(
            parse_version("-1.2.3.zip"),
            Err(VersionError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_trailing_hyphen() {
        assert!(matches!(
            parse_version("App-.zip"),
            Err(VersionError::InvalidVersion { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_well_formed_names_round_trip(
            id in "[A-Za-z][A-Za-z0-9_]{0,8}(-[A-Za-z][A-Za-z0-9_]{0,5}){0,2}",
            major in 0u64..1000,
            minor in 0u64..1000,
            patch in 0u64..1000,
            build in proptest::option::of("[a-z0-9]{1,5}(\\.[a-z0-9]{1,3})?"),
            ext in "(zip|nupkg|tar|exe)",
        ) {
            let mut version = format!("{major}.{minor}.{patch}");
            if let Some(build) = build {
                version.push('+');
                version.push_str(&build);
            }
            let name = format!("{id}-{version}.{ext}");
            let parsed = parse_version(&name).unwrap();
            prop_assert_eq!(parsed, Version::parse(&version).unwrap());
        }

        #[test]
        fn prop_non_semver_trailing_segment_fails(
            id in "[A-Za-z][A-Za-z0-9]{0,8}",
            tail in "[a-z][a-z0-9]{0,6}",
        ) {
            let name = format!("{id}-1.0.0-{tail}.zip");
            let is_invalid = matches!(
                parse_version(&name),
                Err(VersionError::InvalidVersion { .. })
            );
            prop_assert!(is_invalid);
        }

        #[test]
        fn prop_names_without_hyphen_fail(stem in "[A-Za-z0-9_.]{1,16}", ext in "[a-z]{1,4}") {
            let name = format!("{stem}.{ext}");
            let is_missing_delimiter = matches!(
                parse_version(&name),
                Err(VersionError::MissingDelimiter { .. })
            );
            prop_assert!(is_missing_delimiter);
        }
    }
}
