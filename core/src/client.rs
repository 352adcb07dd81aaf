//! Typed client for one content service instance
//!
//! Thin layer over [`Transport`]: builds URLs under `<base_url>/rest/api`,
//! encodes write payloads and decodes responses into [`crate::model`] types.
//! Methods that require a 2xx return [`MigrateError::Status`] otherwise; it
//! is up to the caller whether that is fatal.

use std::sync::Arc;

use futures::Stream;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::config::{InstanceConfig, MigrationConfig};
use crate::error::{MigrateError, Result};
use crate::model::{Attachment, AttachmentRef, ContentItem, DestinationMatch, Label, LabelRecord};
use crate::pagination::paginate;
use crate::retry::Sleeper;
use crate::transport::{HttpRequest, Transport};

/// REST prefix appended to the instance base URL
const API_PREFIX: &str = "/rest/api";

/// Header that disables the CSRF pre-check on multipart uploads
const CSRF_HEADER: &str = "X-Atlassian-Token";

#[derive(Debug, Deserialize)]
struct Listing<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug)]
pub struct ContentClient {
    transport: Transport,
    base_url: String,
    space_key: String,
    page_limit: u32,
}

impl ContentClient {
    pub fn new(transport: Transport, instance: &InstanceConfig, page_limit: u32) -> Result<Self> {
        // Fail early on an unusable base URL rather than on first request.
        instance.url()?;
        Ok(Self {
            transport,
            base_url: instance.base_url.trim_end_matches('/').to_string(),
            space_key: instance.space_key.clone(),
            page_limit,
        })
    }

    /// Build a client for `instance` with the run-wide transport settings.
    pub fn from_config(
        instance: &InstanceConfig,
        config: &MigrationConfig,
        sleeper: Option<Arc<dyn Sleeper>>,
    ) -> Result<Self> {
        let mut transport = Transport::new(instance, config.retry.clone(), config.timeout())?;
        if let Some(sleeper) = sleeper {
            transport = transport.with_sleeper(sleeper);
        }
        Self::new(transport, instance, config.page_limit)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn space_key(&self) -> &str {
        &self.space_key
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}{API_PREFIX}{path}", self.base_url);
        let mut url = Url::parse(&raw).map_err(|e| MigrateError::invalid_url(raw, e))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Stream every page of the space with body, ancestors and version.
    pub fn list_pages(&self) -> Result<impl Stream<Item = Result<ContentItem>> + '_> {
        let limit = self.page_limit.to_string();
        let seed = self.url(
            "/content",
            &[
                ("type", "page"),
                ("spaceKey", self.space_key.as_str()),
                ("expand", "body.storage,ancestors,version"),
                ("limit", limit.as_str()),
            ],
        )?;
        Ok(paginate::<ContentItem>(&self.transport, seed))
    }

    /// Pages of the space whose title equals `title` exactly (first page of
    /// results only).
    pub async fn find_pages_by_title(&self, title: &str) -> Result<Vec<DestinationMatch>> {
        let url = self.url(
            "/content",
            &[
                ("type", "page"),
                ("spaceKey", self.space_key.as_str()),
                ("title", title),
                ("expand", "ancestors,version"),
            ],
        )?;
        let response = self
            .transport
            .execute(&HttpRequest::get(url))
            .await?
            .error_for_status()?;
        let listing: Listing<Value> = response.json()?;
        Ok(listing
            .results
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<DestinationMatch>(raw) {
                Ok(found) => Some(found),
                Err(e) => {
                    tracing::warn!(title, error = %e, "ignoring malformed lookup result");
                    None
                }
            })
            .collect())
    }

    /// Create a page, linked under `parent_id` when given.
    pub async fn create_page(
        &self,
        title: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> Result<DestinationMatch> {
        let mut payload = json!({
            "type": "page",
            "title": title,
            "space": { "key": self.space_key },
            "body": storage_body(body),
        });
        if let Some(parent) = parent_id {
            payload["ancestors"] = json!([{ "id": parent }]);
        }

        let url = self.url("/content", &[])?;
        let response = self
            .transport
            .execute(&HttpRequest::json(Method::POST, url, payload))
            .await?
            .error_for_status()?;
        response.json()
    }

    /// Overwrite `existing` in place with `body`, bumping its version.
    pub async fn update_page(
        &self,
        existing: &DestinationMatch,
        body: &str,
        parent_id: Option<&str>,
    ) -> Result<DestinationMatch> {
        let mut payload = json!({
            "id": existing.id,
            "type": "page",
            "title": existing.title,
            "space": { "key": self.space_key },
            "body": storage_body(body),
            "version": { "number": existing.version.saturating_add(1) },
        });
        if let Some(parent) = parent_id {
            payload["ancestors"] = json!([{ "id": parent }]);
        }

        let url = self.url(&format!("/content/{}", existing.id), &[])?;
        let response = self
            .transport
            .execute(&HttpRequest::json(Method::PUT, url, payload))
            .await?
            .error_for_status()?;
        response.json()
    }

    pub async fn labels(&self, content_id: &str) -> Result<Vec<Label>> {
        let url = self.url(&format!("/content/{content_id}/label"), &[])?;
        let response = self
            .transport
            .execute(&HttpRequest::get(url))
            .await?
            .error_for_status()?;
        let listing: Listing<LabelRecord> = response.json()?;
        Ok(listing
            .results
            .into_iter()
            .filter_map(LabelRecord::into_label)
            .collect())
    }

    /// Attach `labels` to a page in one batched write.
    pub async fn add_labels(&self, content_id: &str, labels: &[Label]) -> Result<()> {
        let url = self.url(&format!("/content/{content_id}/label"), &[])?;
        let payload = serde_json::to_value(labels).map_err(|e| MigrateError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        self.transport
            .execute(&HttpRequest::json(Method::POST, url, payload))
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Stream the attachments listed on a page.
    pub fn list_attachments(
        &self,
        content_id: &str,
    ) -> Result<impl Stream<Item = Result<AttachmentRef>> + '_> {
        let limit = self.page_limit.to_string();
        let seed = self.url(
            &format!("/content/{content_id}/child/attachment"),
            &[("limit", limit.as_str())],
        )?;
        Ok(paginate::<AttachmentRef>(&self.transport, seed))
    }

    /// Download an attachment's content. `download_path` is relative to the
    /// instance base URL.
    pub async fn download(&self, filename: &str, download_path: &str) -> Result<Attachment> {
        let raw = format!("{}{download_path}", self.base_url);
        let url = Url::parse(&raw).map_err(|e| MigrateError::invalid_url(raw, e))?;
        let response = self
            .transport
            .execute(&HttpRequest::get(url))
            .await?
            .error_for_status()?;
        Ok(Attachment {
            filename: filename.to_string(),
            payload: response.body,
        })
    }

    /// Upload `attachment` to a page as a new attachment.
    pub async fn upload_attachment(&self, content_id: &str, attachment: &Attachment) -> Result<()> {
        let url = self.url(&format!("/content/{content_id}/child/attachment"), &[])?;
        let request = HttpRequest::file(url, &attachment.filename, attachment.payload.clone())
            .with_header(CSRF_HEADER, "nocheck");
        self.transport.execute(&request).await?.error_for_status()?;
        Ok(())
    }
}

fn storage_body(markup: &str) -> Value {
    json!({
        "storage": {
            "value": markup,
            "representation": "storage",
        }
    })
}
