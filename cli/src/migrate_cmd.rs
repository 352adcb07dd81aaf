//! `spacecopy migrate`

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use spacecopy_core::{ConflictMode, MigrationConfig, Migrator};

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Config file (defaults to $SPACECOPY_CONFIG, then ./spacecopy.toml).
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Handling of pages that already exist: skip, update or append-suffix.
    #[arg(long = "on-conflict", value_name = "MODE")]
    pub on_conflict: Option<ConflictMode>,

    /// Do not copy attachments.
    #[arg(long)]
    pub no_attachments: bool,

    /// Do not copy labels.
    #[arg(long)]
    pub no_labels: bool,

    /// Page size for listing requests.
    #[arg(long, value_name = "N")]
    pub page_limit: Option<u32>,
}

impl MigrateArgs {
    fn apply_overrides(&self, config: &mut MigrationConfig) {
        if let Some(mode) = self.on_conflict {
            config.on_title_conflict = mode;
        }
        if self.no_attachments {
            config.copy_attachments = false;
        }
        if self.no_labels {
            config.copy_labels = false;
        }
        if let Some(limit) = self.page_limit {
            config.page_limit = limit;
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let mut config =
            MigrationConfig::load(self.config.as_deref()).context("failed to load configuration")?;
        self.apply_overrides(&mut config);

        let migrator = Migrator::new(&config).context("invalid configuration")?;
        let report = migrator.run().await.context("migration aborted")?;

        tracing::info!(
            written = report.written(),
            created = report.created,
            created_with_suffix = report.created_with_suffix,
            updated = report.updated,
            skipped = report.skipped,
            labels_copied = report.labels_copied,
            label_failures = report.label_failures,
            attachments_copied = report.attachments_copied,
            attachment_failures = report.attachment_failures,
            "run finished"
        );
        println!("Done. Copied pages: {}", report.migrated());
        println!(
            "Destination space: {} at {}",
            config.destination.space_key, config.destination.base_url
        );
        Ok(())
    }
}
