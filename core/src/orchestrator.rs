//! One full migration run
//!
//! fetch -> sort parent-first -> for each page in order:
//! resolve parent -> find existing -> decide -> write -> record -> propagate.
//!
//! Pages are processed strictly one at a time: a page can only be written
//! once its parent's destination id is in the identity map. Any error from
//! the page listing or from a page write aborts the run; pages already
//! written stay in place and a re-run converges through destination lookups.

use std::sync::Arc;

use futures::TryStreamExt;

use crate::client::ContentClient;
use crate::config::MigrationConfig;
use crate::error::Result;
use crate::hierarchy::sort_parent_first;
use crate::identity::{IdentityMap, IdentityResolver};
use crate::model::{ContentItem, DestinationMatch};
use crate::policy::{ConflictMode, WriteAction, decide};
use crate::propagate::{AssetPropagator, LabelOutcome, PropagationOutcome};
use crate::retry::Sleeper;

/// Tally of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub created: usize,
    pub created_with_suffix: usize,
    pub updated: usize,
    pub skipped: usize,
    pub labels_copied: usize,
    pub label_failures: usize,
    pub attachments_copied: usize,
    pub attachment_failures: usize,
    /// Size of the identity map at the end of the run
    pub mapped: usize,
}

impl MigrationReport {
    /// Source pages that ended up with a destination counterpart
    pub fn migrated(&self) -> usize {
        self.mapped
    }

    /// Pages written to the destination by this run
    pub fn written(&self) -> usize {
        self.created + self.created_with_suffix + self.updated
    }

    fn record_write(&mut self, action: &WriteAction) {
        match action {
            WriteAction::Create { .. } => self.created += 1,
            WriteAction::CreateWithSuffix { .. } => self.created_with_suffix += 1,
            WriteAction::Update { .. } => self.updated += 1,
            WriteAction::Skip { .. } => self.skipped += 1,
        }
    }

    fn record_propagation(&mut self, outcome: &PropagationOutcome) {
        match &outcome.labels {
            LabelOutcome::Copied(n) => self.labels_copied += n,
            LabelOutcome::Failed(_) => self.label_failures += 1,
            LabelOutcome::Disabled | LabelOutcome::NoLabels => {}
        }
        if let Some(attachments) = &outcome.attachments {
            self.attachments_copied += attachments.copied;
            self.attachment_failures += attachments.failed.len();
            if attachments.listing_error.is_some() {
                self.attachment_failures += 1;
            }
        }
    }
}

/// Drives a migration between two configured instances
#[derive(Debug)]
pub struct Migrator {
    source: ContentClient,
    destination: ContentClient,
    mode: ConflictMode,
    copy_labels: bool,
    copy_attachments: bool,
}

impl Migrator {
    pub fn new(config: &MigrationConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Same as [`Migrator::new`] with a custom backoff sleeper on both sides.
    pub fn with_sleeper(config: &MigrationConfig, sleeper: Arc<dyn Sleeper>) -> Result<Self> {
        Self::build(config, Some(sleeper))
    }

    fn build(config: &MigrationConfig, sleeper: Option<Arc<dyn Sleeper>>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source: ContentClient::from_config(&config.source, config, sleeper.clone())?,
            destination: ContentClient::from_config(&config.destination, config, sleeper)?,
            mode: config.on_title_conflict,
            copy_labels: config.copy_labels,
            copy_attachments: config.copy_attachments,
        })
    }

    pub async fn run(&self) -> Result<MigrationReport> {
        tracing::info!(
            source = %self.source.base_url(),
            space = %self.source.space_key(),
            "fetching pages"
        );
        let items: Vec<ContentItem> = self.source.list_pages()?.try_collect().await?;
        let mut report = MigrationReport::default();
        if items.is_empty() {
            tracing::info!("No pages found. Nothing to do.");
            return Ok(report);
        }
        tracing::info!(count = items.len(), mode = %self.mode, "migrating pages");

        let resolver = IdentityResolver::new(&self.destination);
        let propagator =
            AssetPropagator::new(&self.source, &self.destination, self.copy_labels, self.copy_attachments);
        let mut identities = IdentityMap::new();

        for item in sort_parent_first(items) {
            let parent = identities.resolve_parent(&item).map(str::to_string);
            let existing = resolver.find_existing(&item.title, parent.as_deref()).await?;
            let action = decide(self.mode, &item.title, existing);

            let written = self.apply(&action, &item, parent.as_deref()).await?;
            tracing::info!(
                "{} {} (src {} -> dst {})",
                action.tag(),
                written.title,
                item.id,
                written.id
            );
            report.record_write(&action);
            identities.record(&item.id, &written.id);

            let outcome = propagator.propagate(&item.id, &written.id).await;
            report.record_propagation(&outcome);
        }

        report.mapped = identities.len();
        Ok(report)
    }

    async fn apply(
        &self,
        action: &WriteAction,
        item: &ContentItem,
        parent: Option<&str>,
    ) -> Result<DestinationMatch> {
        match action {
            WriteAction::Create { title } | WriteAction::CreateWithSuffix { title } => {
                self.destination.create_page(title, &item.body, parent).await
            }
            WriteAction::Update { existing } => {
                self.destination.update_page(existing, &item.body, parent).await
            }
            WriteAction::Skip { existing } => Ok(existing.clone()),
        }
    }
}
