//! Root of the `spacecopy-core` library.
//!
//! Copies a page hierarchy, with labels and attachments, from one content
//! service space to another. Entry point is [`Migrator`].

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output goes through tracing.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod client;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod identity;
pub mod model;
pub mod orchestrator;
pub mod pagination;
pub mod policy;
pub mod propagate;
pub mod retry;
pub mod transport;

pub use client::ContentClient;
pub use config::InstanceConfig;
pub use config::MigrationConfig;
pub use error::MigrateError;
pub use error::Result;
pub use model::Attachment;
pub use model::AttachmentRef;
pub use model::ContentItem;
pub use model::DestinationMatch;
pub use model::Label;
pub use orchestrator::MigrationReport;
pub use orchestrator::Migrator;
pub use policy::ConflictMode;
pub use retry::RetryConfig;
pub use retry::Sleeper;
