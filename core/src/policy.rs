//! Create-vs-update decision when a page may already exist at the destination

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::model::DestinationMatch;

/// Literal appended to the title in [`ConflictMode::AppendSuffix`]
pub const COPY_SUFFIX: &str = " (copy)";

/// Configured handling of a `(title, parent)` match at the destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictMode {
    /// Leave the existing page alone and map to it
    Skip,
    /// Overwrite the existing page in place
    #[default]
    Update,
    /// Create a second page titled `"<title> (copy)"`
    AppendSuffix,
}

impl ConflictMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Update => "update",
            Self::AppendSuffix => "append-suffix",
        }
    }
}

impl fmt::Display for ConflictMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "update" => Ok(Self::Update),
            "append-suffix" | "append_suffix" => Ok(Self::AppendSuffix),
            other => Err(format!(
                "unknown conflict mode '{other}' (expected skip, update or append-suffix)"
            )),
        }
    }
}

/// The single write decision for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteAction {
    /// No match: create under the original title
    Create { title: String },
    /// Match ignored: create a new page under a suffixed title
    CreateWithSuffix { title: String },
    /// Overwrite the match at `existing.version + 1`
    Update { existing: DestinationMatch },
    /// No write; map to the match
    Skip { existing: DestinationMatch },
}

impl WriteAction {
    /// Narration tag used in progress logs
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Create { .. } => "CREATE",
            Self::CreateWithSuffix { .. } => "CREATE(+suffix)",
            Self::Update { .. } => "UPDATE",
            Self::Skip { .. } => "SKIP (exists)",
        }
    }
}

/// Decide what to write for a page titled `title` given the lookup result.
///
/// Without a match every mode creates under the unmodified title.
pub fn decide(mode: ConflictMode, title: &str, existing: Option<DestinationMatch>) -> WriteAction {
    let Some(existing) = existing else {
        return WriteAction::Create {
            title: title.to_string(),
        };
    };
    match mode {
        ConflictMode::Skip => WriteAction::Skip { existing },
        ConflictMode::Update => WriteAction::Update { existing },
        ConflictMode::AppendSuffix => WriteAction::CreateWithSuffix {
            title: format!("{title}{COPY_SUFFIX}"),
        },
    }
}
