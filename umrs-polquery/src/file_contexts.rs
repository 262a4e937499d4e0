// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! File-contexts text format adapter (§6, component H — out of the core's
//! scope, grounded on `original_source/setools`'s `file_contexts` parsing
//! in the `seaudit`/report-generator family).
//!
//! ```text
//! PATH_GLOB   [FILETYPE]   (USER:ROLE:TYPE | <<none>>)
//! ```
//!
//! `FILETYPE` is one of `--`, `-d`, `-c`, `-b`, `-p`, `-l`, `-s` (regular
//! file, directory, char device, block device, fifo, symlink, socket);
//! when absent, the entry matches any file type. A context of `<<none>>`
//! means the path is explicitly unlabeled.
// ===========================================================================

use std::str::FromStr;

use umrs_selinux::SecurityContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Directory,
    CharDevice,
    BlockDevice,
    Fifo,
    Symlink,
    Socket,
}

impl FileType {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "--" => Some(Self::Regular),
            "-d" => Some(Self::Directory),
            "-c" => Some(Self::CharDevice),
            "-b" => Some(Self::BlockDevice),
            "-p" => Some(Self::Fifo),
            "-l" => Some(Self::Symlink),
            "-s" => Some(Self::Socket),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileContextEntry {
    pub path_glob: String,
    pub file_type: Option<FileType>,
    /// `None` for an explicit `<<none>>` (unlabeled) entry.
    pub context: Option<SecurityContext>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContextsWarning {
    pub line: usize,
    pub message: String,
}

/// Parses a file-contexts document. Malformed lines (wrong field count, an
/// unparsable context) are reported as warnings and skipped (§7: "Unknown
/// identifier ... the enclosing declaration is skipped" applies here by
/// extension — this adapter treats any unparsable line the same way
/// rather than failing the whole file) rather than aborting the parse.
#[must_use]
pub fn parse(text: &str) -> (Vec<FileContextEntry>, Vec<FileContextsWarning>) {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();

    for (lineno, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let (path_glob, file_type, context_field) = match fields.as_slice() {
            [path, ctx] => (*path, None, *ctx),
            [path, ft, ctx] => {
                let Some(file_type) = FileType::from_token(ft) else {
                    warnings.push(FileContextsWarning {
                        line: lineno + 1,
                        message: format!("unrecognized file-type token '{ft}'"),
                    });
                    continue;
                };
                (*path, Some(file_type), *ctx)
            }
            _ => {
                warnings.push(FileContextsWarning {
                    line: lineno + 1,
                    message: "expected 2 or 3 whitespace-separated fields".to_string(),
                });
                continue;
            }
        };

        let context = if context_field == "<<none>>" {
            None
        } else {
            match SecurityContext::from_str(context_field) {
                Ok(ctx) => Some(ctx),
                Err(e) => {
                    warnings.push(FileContextsWarning {
                        line: lineno + 1,
                        message: format!("invalid security context '{context_field}': {e}"),
                    });
                    continue;
                }
            }
        };

        entries.push(FileContextEntry {
            path_glob: path_glob.to_string(),
            file_type,
            context,
            line: lineno + 1,
        });
    }

    (entries, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_and_untyped_entries() {
        let text = "\
/etc/passwd        --   system_u:object_r:etc_t:s0
/var/lib(/.*)?           system_u:object_r:var_lib_t:s0
/tmp/.X11-unix/.*  -s   <<none>>
";
        let (entries, warnings) = parse(text);
        assert!(warnings.is_empty());
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].file_type, Some(FileType::Regular));
        assert_eq!(entries[1].file_type, None);
        assert!(entries[2].context.is_none());
    }

    #[test]
    fn unrecognized_file_type_token_warns_and_skips() {
        let text = "/foo -z system_u:object_r:foo_t:s0\n";
        let (entries, warnings) = parse(text);
        assert!(entries.is_empty());
        assert_eq!(warnings.len(), 1);
    }
}
