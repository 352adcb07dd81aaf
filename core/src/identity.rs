//! Cross-instance identity: source id -> destination id
//!
//! Destination ids are assigned by the destination service and cannot be
//! derived from source ids. [`IdentityMap`] records the association for one
//! run; [`IdentityResolver`] finds pages that already exist at the
//! destination so re-runs converge instead of duplicating.

use std::collections::HashMap;

use crate::client::ContentClient;
use crate::error::{MigrateError, Result};
use crate::model::{ContentItem, DestinationMatch};

/// Run-scoped mapping from source id to destination id.
///
/// Grows monotonically: entries are never removed or replaced. Owned by the
/// orchestrator for the lifetime of a run.
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: HashMap<String, String>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source_id: &str) -> Option<&str> {
        self.entries.get(source_id).map(String::as_str)
    }

    /// Record a confirmed mapping. The first mapping for a source id wins;
    /// returns `false` if one was already present.
    pub fn record(&mut self, source_id: &str, destination_id: &str) -> bool {
        if let Some(existing) = self.entries.get(source_id) {
            tracing::warn!(
                source_id,
                existing = %existing,
                ignored = destination_id,
                "source id already mapped, keeping first mapping"
            );
            return false;
        }
        self.entries
            .insert(source_id.to_string(), destination_id.to_string());
        true
    }

    /// Destination id of `item`'s immediate parent.
    ///
    /// `None` for root pages, and also when the parent was never mapped
    /// (ancestor missing from the fetched batch): such pages fall back to
    /// the root of the destination space.
    pub fn resolve_parent(&self, item: &ContentItem) -> Option<&str> {
        let parent = item.parent_id()?;
        let resolved = self.get(parent);
        if resolved.is_none() {
            tracing::warn!(
                page = %item.title,
                source_parent = parent,
                "parent not migrated in this run, placing page at the root"
            );
        }
        resolved
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pick the candidate whose own immediate parent is `parent_id`.
///
/// Title alone is not unique across a space; `(title, parent)` is the key.
/// `None` on both sides counts as equal (root-level page).
pub fn select_match(
    candidates: Vec<DestinationMatch>,
    parent_id: Option<&str>,
) -> Option<DestinationMatch> {
    candidates
        .into_iter()
        .find(|candidate| candidate.parent_id.as_deref() == parent_id)
}

/// Locates pre-existing destination pages by `(title, resolved parent)`.
#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver<'a> {
    destination: &'a ContentClient,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(destination: &'a ContentClient) -> Self {
        Self { destination }
    }

    /// Existing destination page titled `title` under `parent_id`.
    ///
    /// A lookup the service rejects or answers with garbage is reported as
    /// "no match": a possible duplicate create is preferred over aborting the
    /// run. Connection faults still propagate.
    pub async fn find_existing(
        &self,
        title: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<DestinationMatch>> {
        match self.destination.find_pages_by_title(title).await {
            Ok(candidates) => Ok(select_match(candidates, parent_id)),
            Err(err) if err.is_remote_rejection() || matches!(err, MigrateError::Decode { .. }) => {
                tracing::warn!(title, error = %err, "existing-page lookup failed, treating as no match");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
