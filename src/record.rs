//! Flat view records and name safety checks.
//!
//! Input is line-oriented `id,name,parentId` with a header line. Lines that do
//! not describe a usable view are dropped with a [`SkipReason`]; they never
//! abort a run.
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

/// Characters that cannot appear in a directory name on any supported host.
const ILLEGAL_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

static RESERVED_DEVICE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])$")
        .expect("regex for reserved device names")
});

/// One declared view, possibly carrying its assembled children.
///
/// Equality and hashing consider `id` only, so two records with the same id
/// are the same view regardless of name or parent.
#[derive(Clone, Debug, Serialize)]
pub struct NodeDescriptor {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDescriptor>,
}

impl PartialEq for NodeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeDescriptor {}

impl Hash for NodeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl NodeDescriptor {
    pub fn new(id: i64, name: impl Into<String>, parent_id: Option<i64>) -> Self {
        // Self-parenting would be a one-node cycle; treat it as root-level.
        let parent_id = parent_id.filter(|parent| *parent != id);
        Self {
            id,
            name: name.into(),
            parent_id,
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Why a view name is unusable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NameRejection {
    Empty,
    IllegalChar { ch: char },
    ReservedDeviceName,
    TrailingSpaceOrPeriod,
}

impl fmt::Display for NameRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name is empty"),
            Self::IllegalChar { ch } => write!(f, "name contains illegal character {ch:?}"),
            Self::ReservedDeviceName => write!(f, "name is a reserved device name"),
            Self::TrailingSpaceOrPeriod => write!(f, "name ends with a space or period"),
        }
    }
}

/// Check that `name` would be a valid directory name.
pub fn validate_view_name(name: &str) -> Result<(), NameRejection> {
    if name.is_empty() {
        return Err(NameRejection::Empty);
    }
    if let Some(ch) = name
        .chars()
        .find(|ch| ch.is_control() || ILLEGAL_NAME_CHARS.contains(ch))
    {
        return Err(NameRejection::IllegalChar { ch });
    }
    if RESERVED_DEVICE_NAME.is_match(name) {
        return Err(NameRejection::ReservedDeviceName);
    }
    if name.ends_with(' ') || name.ends_with('.') {
        return Err(NameRejection::TrailingSpaceOrPeriod);
    }
    Ok(())
}

/// Why a line was left out of the batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    FieldCount { found: usize },
    InvalidId { raw: String },
    UnsafeName { name: String, rejection: NameRejection },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount { found } => write!(f, "expected 3 fields, found {found}"),
            Self::InvalidId { raw } => write!(f, "id {raw:?} is not an integer"),
            Self::UnsafeName { name, rejection } => write!(f, "{name:?}: {rejection}"),
        }
    }
}

/// Parse one data line into a descriptor.
///
/// A parent field that is blank, non-numeric, or equal to the id means the
/// view attaches under the implicit root.
pub fn parse_record(line: &str) -> Result<NodeDescriptor, SkipReason> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [id, name, parent] = fields.as_slice() else {
        return Err(SkipReason::FieldCount {
            found: fields.len(),
        });
    };
    let id: i64 = id.parse().map_err(|_| SkipReason::InvalidId {
        raw: id.to_string(),
    })?;
    validate_view_name(name).map_err(|rejection| SkipReason::UnsafeName {
        name: name.to_string(),
        rejection,
    })?;
    let parent_id = parent.parse::<i64>().ok();
    Ok(NodeDescriptor::new(id, *name, parent_id))
}

/// A rejected input line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// 1-based line number in the input, header included.
    pub line: usize,
    pub reason: SkipReason,
}

/// Valid descriptors plus everything that was dropped on the way.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub descriptors: Vec<NodeDescriptor>,
    pub skipped: Vec<SkippedRecord>,
}

/// Parse a whole input document, skipping the header and blank lines.
pub fn parse_records(text: &str) -> ParsedBatch {
    let mut batch = ParsedBatch::default();
    for (index, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(line) {
            Ok(descriptor) => batch.descriptors.push(descriptor),
            Err(reason) => {
                tracing::debug!(line = index + 1, %reason, "record skipped");
                batch.skipped.push(SkippedRecord {
                    line: index + 1,
                    reason,
                });
            }
        }
    }
    batch
}
