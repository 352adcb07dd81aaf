//! Best-effort copy of labels and attachments for a materialized page
//!
//! Nothing in here returns an error. Every failure is folded into a typed
//! outcome and handed back to the orchestrator, which counts it and moves on.

use std::pin::pin;

use futures::StreamExt;

use crate::client::ContentClient;
use crate::model::AttachmentRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelOutcome {
    /// Label copying is turned off
    Disabled,
    /// The source page has no labels; nothing was written
    NoLabels,
    /// This many labels were written in one batch
    Copied(usize),
    /// Reading or writing the label set failed
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentOutcome {
    pub copied: usize,
    /// Listed without a download link
    pub skipped: usize,
    /// Filenames whose download or upload failed
    pub failed: Vec<String>,
    /// The listing itself broke off; attachments after that point were not seen
    pub listing_error: Option<String>,
}

impl AttachmentOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.listing_error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationOutcome {
    pub labels: LabelOutcome,
    /// `None` when attachment copying is turned off
    pub attachments: Option<AttachmentOutcome>,
}

/// Copies dependent assets from a source page to its destination counterpart
#[derive(Debug, Clone, Copy)]
pub struct AssetPropagator<'a> {
    source: &'a ContentClient,
    destination: &'a ContentClient,
    copy_labels: bool,
    copy_attachments: bool,
}

impl<'a> AssetPropagator<'a> {
    pub fn new(
        source: &'a ContentClient,
        destination: &'a ContentClient,
        copy_labels: bool,
        copy_attachments: bool,
    ) -> Self {
        Self {
            source,
            destination,
            copy_labels,
            copy_attachments,
        }
    }

    /// Copy labels and attachments of `source_id` onto `destination_id`.
    ///
    /// The two halves are independent and run concurrently.
    pub async fn propagate(&self, source_id: &str, destination_id: &str) -> PropagationOutcome {
        let labels = async {
            if self.copy_labels {
                self.copy_labels(source_id, destination_id).await
            } else {
                LabelOutcome::Disabled
            }
        };
        let attachments = async {
            if self.copy_attachments {
                Some(self.copy_attachments(source_id, destination_id).await)
            } else {
                None
            }
        };
        let (labels, attachments) = tokio::join!(labels, attachments);
        if let Some(outcome) = attachments.as_ref().filter(|outcome| !outcome.is_clean()) {
            tracing::warn!(
                source_id,
                destination_id,
                copied = outcome.copied,
                failed = outcome.failed.len(),
                listing_failed = outcome.listing_error.is_some(),
                "some attachments were not copied"
            );
        }
        PropagationOutcome { labels, attachments }
    }

    pub async fn copy_labels(&self, source_id: &str, destination_id: &str) -> LabelOutcome {
        let labels = match self.source.labels(source_id).await {
            Ok(labels) => labels,
            Err(e) => {
                tracing::warn!(source_id, error = %e, "could not read labels");
                return LabelOutcome::Failed(e.to_string());
            }
        };
        if labels.is_empty() {
            return LabelOutcome::NoLabels;
        }
        match self.destination.add_labels(destination_id, &labels).await {
            Ok(()) => {
                tracing::debug!(destination_id, count = labels.len(), "labels copied");
                LabelOutcome::Copied(labels.len())
            }
            Err(e) => {
                tracing::warn!(destination_id, error = %e, "could not write labels");
                LabelOutcome::Failed(e.to_string())
            }
        }
    }

    pub async fn copy_attachments(&self, source_id: &str, destination_id: &str) -> AttachmentOutcome {
        let mut outcome = AttachmentOutcome::default();
        let listing = match self.source.list_attachments(source_id) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(source_id, error = %e, "could not list attachments");
                outcome.listing_error = Some(e.to_string());
                return outcome;
            }
        };
        let mut listing = pin!(listing);

        while let Some(next) = listing.next().await {
            let attachment = match next {
                Ok(attachment) => attachment,
                Err(e) => {
                    tracing::warn!(source_id, error = %e, "attachment listing failed");
                    outcome.listing_error = Some(e.to_string());
                    break;
                }
            };
            match self.transfer(&attachment, destination_id).await {
                Transfer::Copied => outcome.copied += 1,
                Transfer::NoLink => outcome.skipped += 1,
                Transfer::Failed => outcome.failed.push(attachment.filename),
            }
        }
        outcome
    }

    async fn transfer(&self, attachment: &AttachmentRef, destination_id: &str) -> Transfer {
        let Some(path) = attachment.download_path.as_deref() else {
            tracing::debug!(filename = %attachment.filename, "attachment has no download link");
            return Transfer::NoLink;
        };
        let payload = match self.source.download(&attachment.filename, path).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(filename = %attachment.filename, error = %e, "attachment download failed");
                return Transfer::Failed;
            }
        };
        match self.destination.upload_attachment(destination_id, &payload).await {
            Ok(()) => {
                tracing::debug!(filename = %attachment.filename, bytes = payload.payload.len(), "attachment copied");
                Transfer::Copied
            }
            Err(e) => {
                tracing::warn!(filename = %attachment.filename, error = %e, "attachment upload failed");
                Transfer::Failed
            }
        }
    }
}

enum Transfer {
    Copied,
    NoLink,
    Failed,
}
