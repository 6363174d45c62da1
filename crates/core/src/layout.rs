//! Mapping from outline layout names to template slide layout indices.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Layouts every template is expected to provide, in master order.
const DEFAULT_LAYOUTS: &[(&str, usize)] = &[
    ("title", 0),
    ("subtitle", 1),
    ("3_STEP", 2),
    ("4_NUMBERS", 3),
    ("5_BULLET_IMAGE", 4),
    ("TIMELINE", 5),
    ("6_STEPS", 6),
    ("Agenda", 7),
    ("One_Sentence", 8),
    ("3_BULLETS_IMAGE", 9),
    ("4_TOPIC", 10),
];

/// Index used when a layout name is not in the table.
pub const FALLBACK_LAYOUT_INDEX: usize = 0;

/// Immutable name to layout-index table.
///
/// Names are case-sensitive. Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTable {
    entries: BTreeMap<String, usize>,
}

/// Outcome of looking a name up in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMatch {
    /// The name is in the table.
    Known(usize),
    /// The name is not in the table; the fallback index applies.
    Fallback,
}

impl LayoutMatch {
    pub fn index(self) -> usize {
        match self {
            LayoutMatch::Known(index) => index,
            LayoutMatch::Fallback => FALLBACK_LAYOUT_INDEX,
        }
    }
}

impl LayoutTable {
    /// Build a table from explicit entries.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Parse a table from a JSON object of `{"name": index}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: BTreeMap<String, usize> =
            serde_json::from_str(json).map_err(|e| Error::InvalidLayoutTable(e.to_string()))?;
        if entries.is_empty() {
            return Err(Error::InvalidLayoutTable("table has no entries".to_string()));
        }
        Ok(Self { entries })
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidLayoutTable(format!("failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Look a layout name up.
    pub fn lookup(&self, name: &str) -> LayoutMatch {
        match self.entries.get(name) {
            Some(&index) => LayoutMatch::Known(index),
            None => LayoutMatch::Fallback,
        }
    }

    /// Resolve a name to an index, falling back to the title layout.
    pub fn resolve(&self, name: &str) -> usize {
        self.lookup(name).index()
    }

    /// Iterate entries ordered by index, then name.
    pub fn entries(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> =
            self.entries.iter().map(|(k, &v)| (k.as_str(), v)).collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// Highest index referenced by the table.
    pub fn max_index(&self) -> usize {
        self.entries
            .values()
            .copied()
            .max()
            .unwrap_or(FALLBACK_LAYOUT_INDEX)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LayoutTable {
    fn default() -> Self {
        Self::from_entries(DEFAULT_LAYOUTS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = LayoutTable::default();
        assert_eq!(table.len(), 11);
        assert_eq!(table.resolve("title"), 0);
        assert_eq!(table.resolve("Agenda"), 7);
        assert_eq!(table.resolve("4_TOPIC"), 10);
        assert_eq!(table.max_index(), 10);
    }

    #[test]
    fn test_unknown_names_fall_back_to_title() {
        let table = LayoutTable::default();
        assert_eq!(table.lookup("agenda"), LayoutMatch::Fallback);
        assert_eq!(table.resolve("agenda"), 0);
        assert_eq!(table.resolve(""), 0);
        assert_eq!(table.resolve("NOPE"), 0);
    }

    #[test]
    fn test_entries_sorted_by_index() {
        let table = LayoutTable::default();
        let names: Vec<&str> = table.entries().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names.first(), Some(&"title"));
        assert_eq!(names.last(), Some(&"4_TOPIC"));
    }

    #[test]
    fn test_from_json() {
        let table = LayoutTable::from_json(r#"{"cover": 0, "bullets": 3}"#).unwrap();
        assert_eq!(table.lookup("bullets"), LayoutMatch::Known(3));
        assert_eq!(table.lookup("title"), LayoutMatch::Fallback);
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(LayoutTable::from_json("{}").is_err());
        assert!(LayoutTable::from_json(r#"{"cover": -1}"#).is_err());
        assert!(LayoutTable::from_json("[1, 2]").is_err());
    }
}
