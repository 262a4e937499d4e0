// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! Permission map (component D, §4.D).
//!
//! Maps each `(class, permission)` pair to an access-bit classification
//! (read/write/both/none/unmapped) and an integer weight in `[1,10]`,
//! loadable from and writable to the text grammar in §4.D. Default access
//! is `Unmapped` until a loaded map overrides it, matching
//! `new_perm_mapping`'s `PERMMAP_UNMAPPED` default grounded in
//! `original_source/setools/libapol/perm-map.c`.
// ===========================================================================

use std::collections::HashMap;
use std::fmt;

use crate::error::{MessageSink, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Both,
    None,
    Unmapped,
}

impl Access {
    const fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'r' => Some(Self::Read),
            'w' => Some(Self::Write),
            'b' => Some(Self::Both),
            'n' => Some(Self::None),
            'u' => Some(Self::Unmapped),
            _ => None,
        }
    }

    const fn to_char(self) -> char {
        match self {
            Self::Read => 'r',
            Self::Write => 'w',
            Self::Both => 'b',
            Self::None => 'n',
            Self::Unmapped => 'u',
        }
    }
}

pub const MIN_WEIGHT: u8 = 1;
pub const MAX_WEIGHT: u8 = 10;
pub const DEFAULT_WEIGHT: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermMapping {
    pub access: Access,
    pub weight: u8,
}

impl PermMapping {
    #[must_use]
    pub const fn unmapped() -> Self {
        Self {
            access: Access::Unmapped,
            weight: MIN_WEIGHT,
        }
    }
}

/// A loaded permission map: `(class_name, perm_name) -> PermMapping`.
#[derive(Debug, Clone, Default)]
pub struct PermissionMap {
    entries: HashMap<(String, String), PermMapping>,
    /// Preserves declaration order so the writer reproduces a stable,
    /// byte-identical grammar across runs (§5 ordering guarantee).
    order: Vec<(String, Vec<String>)>,
}

impl PermissionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, class: &str, perm: &str) -> PermMapping {
        self.entries
            .get(&(class.to_string(), perm.to_string()))
            .copied()
            .unwrap_or_else(PermMapping::unmapped)
    }

    pub fn set(&mut self, class: &str, perm: &str, mapping: PermMapping) {
        let key = (class.to_string(), perm.to_string());
        if !self.entries.contains_key(&key) {
            match self.order.iter_mut().find(|(c, _)| c == class) {
                Some((_, perms)) => perms.push(perm.to_string()),
                None => self.order.push((class.to_string(), vec![perm.to_string()])),
            }
        }
        self.entries.insert(key, mapping);
    }

    #[must_use]
    pub fn contains(&self, class: &str, perm: &str) -> bool {
        self.entries
            .contains_key(&(class.to_string(), perm.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermMapError {
    MalformedInteger { line: usize },
    MissingClassHeader { line: usize },
}

impl fmt::Display for PermMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedInteger { line } => {
                write!(f, "malformed integer at line {line}")
            }
            Self::MissingClassHeader { line } => {
                write!(f, "expected 'class' header at line {line}")
            }
        }
    }
}

impl std::error::Error for PermMapError {}

/// Parses the §4.D text grammar. `known_classes` and `known_perms` (a list
/// of `(class, permission)` pairs legal in the policy), if given, let the
/// loader emit §4.D's "class not in policy" / "unknown permission name" /
/// "permission present in policy not mentioned in file" warnings; pass
/// empty slices to skip those cross-checks (the grammar itself is still
/// fully validated either way).
pub fn load_permission_map(
    text: &str,
    known_classes: &[&str],
    known_perms: &[(&str, &str)],
    sink: &mut MessageSink,
) -> Result<PermissionMap, PermMapError> {
    let mut map = PermissionMap::new();
    let mut lines = text.lines().enumerate().peekable();

    let mut declared_class_count: Option<usize> = None;
    while let Some(&(lineno, raw)) = lines.peek() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            lines.next();
            continue;
        }
        let count: usize = trimmed
            .parse()
            .map_err(|_| PermMapError::MalformedInteger { line: lineno + 1 })?;
        declared_class_count = Some(count);
        lines.next();
        break;
    }
    let declared_class_count = declared_class_count.unwrap_or(0);

    let mut seen_classes = 0usize;
    while let Some((lineno, raw)) = lines.next() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut fields = trimmed.split_whitespace();
        let keyword = fields.next().unwrap_or_default();
        if keyword != "class" {
            return Err(PermMapError::MissingClassHeader { line: lineno + 1 });
        }
        let class_name = fields
            .next()
            .ok_or(PermMapError::MissingClassHeader { line: lineno + 1 })?
            .to_string();
        let perm_count: usize = fields
            .next()
            .ok_or(PermMapError::MalformedInteger { line: lineno + 1 })?
            .parse()
            .map_err(|_| PermMapError::MalformedInteger { line: lineno + 1 })?;

        if !known_classes.is_empty() && !known_classes.contains(&class_name.as_str()) {
            sink.emit(
                Severity::Warning,
                &format!("object class '{class_name}' not present in policy"),
            );
        }

        let mut remaining = perm_count;
        while remaining > 0 {
            let Some((perm_lineno, perm_raw)) = lines.next() else {
                break;
            };
            let perm_trimmed = perm_raw.trim();
            if perm_trimmed.is_empty() || perm_trimmed.starts_with('#') {
                continue;
            }
            let mut perm_fields = perm_trimmed.split_whitespace();
            let perm_name = perm_fields.next().unwrap_or_default();
            let access_str = perm_fields.next().unwrap_or_default();

            if !known_perms.is_empty()
                && !known_perms.contains(&(class_name.as_str(), perm_name))
            {
                sink.emit(
                    Severity::Warning,
                    &format!("unknown permission name '{perm_name}' for class '{class_name}'"),
                );
            }

            let Some(access_char) = access_str.chars().next() else {
                sink.emit(
                    Severity::Warning,
                    &format!("unrecognized access field at line {}", perm_lineno + 1),
                );
                remaining -= 1;
                continue;
            };
            let Some(access) = Access::from_char(access_char) else {
                sink.emit(
                    Severity::Warning,
                    &format!("unknown permission access '{access_str}' for '{perm_name}'"),
                );
                remaining -= 1;
                continue;
            };

            let mut weight = DEFAULT_WEIGHT;
            if let Some(weight_str) = perm_fields.next() {
                match weight_str.parse::<i32>() {
                    Ok(w) if (i32::from(MIN_WEIGHT)..=i32::from(MAX_WEIGHT)).contains(&w) => {
                        weight = w as u8;
                    }
                    Ok(w) => {
                        sink.emit(
                            Severity::Warning,
                            &format!("weight {w} out of range for '{perm_name}', clamped"),
                        );
                        weight = w.clamp(i32::from(MIN_WEIGHT), i32::from(MAX_WEIGHT)) as u8;
                    }
                    Err(_) => {
                        sink.emit(
                            Severity::Warning,
                            &format!("malformed weight for '{perm_name}', using default"),
                        );
                    }
                }
            }

            // Duplicate (class, permission) entries: last write wins, with
            // a "remapped" warning on every override. Recorded in
            // DESIGN.md as a deliberate Open Question resolution rather
            // than left ambiguous.
            if map.contains(&class_name, perm_name) {
                sink.emit(
                    Severity::Warning,
                    &format!("permission '{perm_name}' for class '{class_name}' remapped"),
                );
            }
            map.set(&class_name, perm_name, PermMapping { access, weight });
            remaining -= 1;
        }

        seen_classes += 1;
    }

    if declared_class_count != seen_classes {
        sink.emit(
            Severity::Warning,
            &format!(
                "header declared {declared_class_count} classes but {seen_classes} were present"
            ),
        );
    }

    for (class, perm) in known_perms {
        if !map.contains(class, perm) {
            sink.emit(
                Severity::Warning,
                &format!("permission '{perm}' for class '{class}' present in policy but not mapped"),
            );
        }
    }

    Ok(map)
}

/// Writes `map` back out in the §4.D grammar. Any permission still marked
/// `Unmapped` gets a comment prefix, per the writer contract.
#[must_use]
pub fn save_permission_map(map: &PermissionMap) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", map.order.len()));

    for (class, perms) in &map.order {
        out.push_str(&format!("class {class} {}\n", perms.len()));
        for perm in perms {
            let mapping = map.get(class, perm);
            let line = format!("{perm} {} {}\n", mapping.access.to_char(), mapping.weight);
            if mapping.access == Access::Unmapped {
                out.push('#');
            }
            out.push_str(&line);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recording_sink() -> (MessageSink, Arc<Mutex<Vec<String>>>) {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&messages);
        let sink = MessageSink::with_handler(move |_severity, message| {
            recorder.lock().unwrap().push(message.to_string());
        });
        (sink, messages)
    }

    #[test]
    fn s5_permission_map_load_and_default_unmapped() {
        let text = "1\nclass file 1\nread r 7\n";
        let mut sink = MessageSink::stderr_fallback();
        let map = load_permission_map(text, &["file"], &[], &mut sink).unwrap();
        let mapping = map.get("file", "read");
        assert_eq!(mapping.access, Access::Read);
        assert_eq!(mapping.weight, 7);

        let unmapped = map.get("file", "write");
        assert_eq!(unmapped.access, Access::Unmapped);
    }

    #[test]
    fn weight_out_of_range_is_clamped() {
        let text = "1\nclass file 1\nread r 99\n";
        let mut sink = MessageSink::stderr_fallback();
        let map = load_permission_map(text, &["file"], &[], &mut sink).unwrap();
        assert_eq!(map.get("file", "read").weight, MAX_WEIGHT);
    }

    #[test]
    fn writer_comments_unmapped_permissions() {
        let mut map = PermissionMap::new();
        map.set("file", "read", PermMapping::unmapped());
        let text = save_permission_map(&map);
        assert!(text.contains("#read u"));
    }

    #[test]
    fn malformed_header_integer_is_fatal() {
        let text = "not-a-number\n";
        let mut sink = MessageSink::stderr_fallback();
        assert!(load_permission_map(text, &[], &[], &mut sink).is_err());
    }

    #[test]
    fn duplicate_entry_last_write_wins_with_remapped_warning() {
        let text = "1\nclass file 2\nread r 3\nread w 9\n";
        let (mut sink, messages) = recording_sink();
        let map = load_permission_map(text, &["file"], &[], &mut sink).unwrap();

        let mapping = map.get("file", "read");
        assert_eq!(mapping.access, Access::Write);
        assert_eq!(mapping.weight, 9);
        assert!(messages.lock().unwrap().iter().any(|m| m.contains("remapped")));
    }

    #[test]
    fn unknown_permission_name_warns_against_known_perms() {
        let text = "1\nclass file 1\nfrobnicate r 5\n";
        let (mut sink, messages) = recording_sink();
        let known_perms = [("file", "read")];
        load_permission_map(text, &["file"], &known_perms, &mut sink).unwrap();
        assert!(messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains("unknown permission name")));
    }

    #[test]
    fn permission_not_mentioned_in_file_warns() {
        let text = "1\nclass file 1\nread r 5\n";
        let (mut sink, messages) = recording_sink();
        let known_perms = [("file", "read"), ("file", "write")];
        load_permission_map(text, &["file"], &known_perms, &mut sink).unwrap();
        assert!(messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains("write") && m.contains("not mapped")));
    }
}
