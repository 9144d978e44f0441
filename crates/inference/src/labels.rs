//! Class id → label lookup.

use crate::errors::LabelError;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Labels the detector ships with.
pub const DEFAULT_CLASS_LABELS: &[(i64, &str)] = &[(1, "box"), (2, "box_clear")];

static DEFAULT_TABLE: LazyLock<ClassLabelTable> = LazyLock::new(|| ClassLabelTable {
    labels: DEFAULT_CLASS_LABELS
        .iter()
        .map(|&(id, label)| (id, label.to_string()))
        .collect(),
});

/// Immutable mapping from positive class id to a human-readable label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabelTable {
    labels: HashMap<i64, String>,
}

impl ClassLabelTable {
    /// Process-wide table built from [`DEFAULT_CLASS_LABELS`] on first use.
    pub fn default_table() -> &'static ClassLabelTable {
        &DEFAULT_TABLE
    }

    /// Parse `id=label` entries separated by commas or newlines.
    ///
    /// Blank entries and entries starting with `#` are skipped.
    pub fn parse(entries: &str) -> Result<Self, LabelError> {
        let mut labels = HashMap::new();

        for raw in entries.split([',', '\n']) {
            let entry = raw.trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }

            let (id, label) = entry.split_once('=').ok_or_else(|| invalid(entry, "expected `id=label`"))?;
            let id: i64 = id
                .trim()
                .parse()
                .map_err(|_| invalid(entry, "class id is not an integer"))?;
            if id <= 0 {
                return Err(invalid(entry, "class id must be positive"));
            }
            let label = label.trim();
            if label.is_empty() {
                return Err(invalid(entry, "label is empty"));
            }

            if labels.insert(id, label.to_string()).is_some() {
                return Err(LabelError::DuplicateId { id });
            }
        }

        Ok(Self { labels })
    }

    /// Read a label file in the [`parse`](Self::parse) format, one entry per line.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn get(&self, class_id: i64) -> Option<&str> {
        self.labels.get(&class_id).map(String::as_str)
    }

    /// Label for `class_id`, or `#<id>` when the table has no entry.
    pub fn label(&self, class_id: i64) -> Cow<'_, str> {
        match self.get(class_id) {
            Some(label) => Cow::Borrowed(label),
            None => Cow::Owned(format!("#{class_id}")),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for ClassLabelTable {
    fn default() -> Self {
        Self::default_table().clone()
    }
}

fn invalid(entry: &str, reason: &'static str) -> LabelError {
    LabelError::InvalidEntry {
        entry: entry.to_string(),
        reason,
    }
}
