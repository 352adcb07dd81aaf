//! `spacecopy check-config`

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use spacecopy_core::config::redact;
use spacecopy_core::{InstanceConfig, MigrationConfig};

#[derive(Debug, Args)]
pub struct CheckConfigArgs {
    /// Config file (defaults to $SPACECOPY_CONFIG, then ./spacecopy.toml).
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl CheckConfigArgs {
    pub fn run(&self) -> anyhow::Result<()> {
        let config =
            MigrationConfig::load(self.config.as_deref()).context("failed to load configuration")?;

        print_instance("source", &config.source);
        print_instance("destination", &config.destination);
        println!("on_title_conflict: {}", config.on_title_conflict);
        println!("copy_labels: {}", config.copy_labels);
        println!("copy_attachments: {}", config.copy_attachments);
        println!("page_limit: {}", config.page_limit);
        println!("timeout_secs: {}", config.timeout_secs);
        println!(
            "retry: max_attempts={} base_wait_secs={}",
            config.retry.max_attempts, config.retry.base_wait_secs
        );
        println!("Configuration OK");
        Ok(())
    }
}

fn print_instance(side: &str, instance: &InstanceConfig) {
    println!(
        "{side}: {} space={} user={} token={}",
        instance.base_url,
        instance.space_key,
        instance.username,
        redact(&instance.api_token)
    );
}
