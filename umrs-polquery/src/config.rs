// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Environment-variable search path for default config/permission-map
//! files (§6): search `.`, then `$UMRS_POLICY_PATH` (if set), then a
//! compiled-in installation prefix, in that order, returning the first
//! candidate that exists.
// ===========================================================================

use std::path::{Path, PathBuf};

pub const POLICY_PATH_VAR: &str = "UMRS_POLICY_PATH";

/// The compiled-in installation prefix consulted last, mirroring
/// `original_source/setools`' `APOL_INSTALL_DIR`-style fallback.
pub const INSTALL_PREFIX: &str = "/usr/share/umrs-polquery";

/// Searches `.`, then `$UMRS_POLICY_PATH`, then [`INSTALL_PREFIX`] for
/// `filename`, returning the first path that exists on disk. Returns
/// `None` if none of the three locations has the file.
#[must_use]
pub fn find_default_file(filename: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = vec![Path::new(".").join(filename)];
    if let Ok(dir) = std::env::var(POLICY_PATH_VAR) {
        candidates.push(Path::new(&dir).join(filename));
    }
    candidates.push(Path::new(INSTALL_PREFIX).join(filename));

    candidates.into_iter().find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_file_in_current_directory_first() {
        let dir = std::env::temp_dir().join(format!(
            "umrs-polquery-config-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("perm_map.conf");
        std::fs::write(&file, "1\nclass file 0\n").unwrap();

        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(&dir).unwrap();
        let found = find_default_file("perm_map.conf");
        std::env::set_current_dir(original).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(found, Some(PathBuf::from("./perm_map.conf")));
    }

    #[test]
    fn returns_none_when_nowhere_has_the_file() {
        assert_eq!(
            find_default_file("definitely-not-a-real-file-umrs.conf"),
            None
        );
    }
}
