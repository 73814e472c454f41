// SPDX-FileCopyrightText: © 2025 Marlin Contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Small helpers shared across the toolkit.

use std::path::Path;

use anyhow::{Context, Result};
use fs_err as fs;
use getrandom::fill as getrandom;

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::Digest;
    let mut hasher = sha2::Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Formats a duration given in minutes as a human-readable string, e.g.
/// `90 -> "1 hours 30 minutes"`. Zero-valued subunits are omitted.
pub fn format_duration(minutes: u64) -> String {
    let days = minutes / 1440;
    let hours = (minutes % 1440) / 60;
    let mins = minutes % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days} days"));
    }
    if hours > 0 {
        parts.push(format!("{hours} hours"));
    }
    if mins > 0 {
        parts.push(format!("{mins} minutes"));
    }
    if parts.is_empty() {
        return "0 minutes".to_string();
    }
    parts.join(" ")
}

/// Generates `bytes` random bytes and returns them hex encoded.
pub fn random_hex_key(bytes: usize) -> Result<String> {
    let mut data = vec![0u8; bytes];
    getrandom(&mut data).context("failed to generate random data")?;
    Ok(hex::encode(data))
}

/// Recursively copies the contents of `src` into `dst`, creating `dst` if
/// needed. Symlinks are not followed.
pub fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory {}", dst.display()))?;
    for entry in fs::read_dir(src).with_context(|| format!("failed to read {}", src.display()))? {
        let entry = entry.context("failed to read directory entry")?;
        let file_type = entry.file_type().context("failed to stat entry")?;
        let target = dst.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_all(entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_omits_zero_subunits() {
        assert_eq!(format_duration(30), "30 minutes");
        assert_eq!(format_duration(60), "1 hours");
        assert_eq!(format_duration(90), "1 hours 30 minutes");
        assert_eq!(format_duration(1440), "1 days");
        assert_eq!(format_duration(1500), "1 days 1 hours");
        assert_eq!(format_duration(1530), "1 days 1 hours 30 minutes");
    }

    #[test]
    fn format_duration_zero() {
        assert_eq!(format_duration(0), "0 minutes");
    }

    #[test]
    fn random_hex_key_has_requested_length() {
        let key = random_hex_key(32).unwrap();
        assert_eq!(key.len(), 64);
        assert!(key.bytes().all(|b| b.is_ascii_hexdigit()));
        // Two draws should differ
        assert_ne!(key, random_hex_key(32).unwrap());
    }

    #[test]
    fn sha256_known_vector() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn copy_dir_all_copies_nested_tree() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("sub")).unwrap();
        fs::write(src.path().join("a.txt"), "a").unwrap();
        fs::write(src.path().join("sub/b.txt"), "b").unwrap();

        copy_dir_all(src.path(), dst.path().join("out")).unwrap();

        assert_eq!(
            fs::read_to_string(dst.path().join("out/a.txt")).unwrap(),
            "a"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join("out/sub/b.txt")).unwrap(),
            "b"
        );
    }
}
