//! Typed records for the content service payloads
//!
//! Raw JSON is decoded into the private `*Record` shapes and converted into
//! the domain types at the transport boundary. A record that cannot be
//! converted (missing id, empty title) is rejected there and never reaches
//! the orchestrator.

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

/// Namespace applied to labels whose source carries none
pub const GLOBAL_LABEL_NAMESPACE: &str = "global";

/// Filename used for attachments listed without a title
pub const DEFAULT_ATTACHMENT_FILENAME: &str = "attachment.bin";

/// A page read from the source space. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ContentRecord")]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    /// Storage-format markup, copied verbatim
    pub body: String,
    /// Ancestor ids from the root down to the immediate parent
    pub ancestors: Vec<String>,
    pub version: u64,
}

impl ContentItem {
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// Source id of the immediate parent, `None` for root-level pages
    pub fn parent_id(&self) -> Option<&str> {
        self.ancestors.last().map(String::as_str)
    }
}

/// A destination page found by title lookup or returned from a write
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ContentRecord")]
pub struct DestinationMatch {
    pub id: String,
    pub title: String,
    /// Destination id of the page's own immediate parent
    pub parent_id: Option<String>,
    /// Current version; an update must send `version + 1`
    pub version: u64,
}

/// A label attached to a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    #[serde(rename = "prefix")]
    pub namespace: String,
    pub name: String,
}

impl Label {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self::new(GLOBAL_LABEL_NAMESPACE, name)
    }
}

/// An attachment as listed on a source page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "AttachmentRecord")]
pub struct AttachmentRef {
    pub filename: String,
    /// Download path relative to the instance base URL
    pub download_path: Option<String>,
}

/// Downloaded attachment content, held in memory until re-uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub payload: Bytes,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire records
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ContentRecord {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<BodyRecord>,
    #[serde(default)]
    ancestors: Vec<AncestorRecord>,
    #[serde(default)]
    version: Option<VersionRecord>,
}

#[derive(Debug, Deserialize)]
struct BodyRecord {
    #[serde(default)]
    storage: Option<StorageRecord>,
}

#[derive(Debug, Deserialize)]
struct StorageRecord {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AncestorRecord {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct VersionRecord {
    #[serde(default = "first_version")]
    number: u64,
}

fn first_version() -> u64 {
    1
}

impl ContentRecord {
    fn version_number(&self) -> u64 {
        self.version.as_ref().map_or(1, |v| v.number)
    }
}

impl TryFrom<ContentRecord> for ContentItem {
    type Error = String;

    fn try_from(record: ContentRecord) -> Result<Self, Self::Error> {
        if record.title.trim().is_empty() {
            return Err(format!("content {} has an empty title", record.id));
        }
        let version = record.version_number();
        let ContentRecord {
            id,
            title,
            body,
            ancestors,
            ..
        } = record;
        Ok(Self {
            id,
            title,
            body: body
                .and_then(|b| b.storage)
                .and_then(|s| s.value)
                .unwrap_or_default(),
            ancestors: ancestors.into_iter().map(|a| a.id).collect(),
            version,
        })
    }
}

impl From<ContentRecord> for DestinationMatch {
    fn from(record: ContentRecord) -> Self {
        let version = record.version_number();
        Self {
            parent_id: record.ancestors.last().map(|a| a.id.clone()),
            id: record.id,
            title: record.title,
            version,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelRecord {
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl LabelRecord {
    /// Labels without a name are dropped; a missing prefix means global
    pub(crate) fn into_label(self) -> Option<Label> {
        let name = self.name.filter(|n| !n.is_empty())?;
        let namespace = self
            .prefix
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| GLOBAL_LABEL_NAMESPACE.to_string());
        Some(Label { namespace, name })
    }
}

#[derive(Debug, Deserialize)]
struct AttachmentRecord {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "_links")]
    links: Option<AttachmentLinks>,
}

#[derive(Debug, Deserialize)]
struct AttachmentLinks {
    #[serde(default)]
    download: Option<String>,
}

impl From<AttachmentRecord> for AttachmentRef {
    fn from(record: AttachmentRecord) -> Self {
        Self {
            filename: record
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_ATTACHMENT_FILENAME.to_string()),
            download_path: record.links.and_then(|l| l.download),
        }
    }
}

/// Ids arrive as strings from real instances; accept numbers as well.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Text(String),
        Number(u64),
    }

    match IdRepr::deserialize(deserializer)? {
        IdRepr::Text(s) if !s.is_empty() => Ok(s),
        IdRepr::Text(_) => Err(serde::de::Error::custom("empty id")),
        IdRepr::Number(n) => Ok(n.to_string()),
    }
}
