//! Cursor-paginated listings as a lazy stream
//!
//! The server owns the cursor: each page envelope carries `_links.next`
//! (relative) and `_links.base` (absolute prefix), and the next page is
//! `base + next`. No client-side offset arithmetic.
//!
//! The stream is finite and not restartable. A failed page fetch yields one
//! error and ends the stream; callers that need resilience re-run the whole
//! listing.

use futures::stream::{self, Stream, TryStreamExt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{MigrateError, Result};
use crate::transport::{HttpRequest, Transport};

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    #[serde(default)]
    results: Vec<serde_json::Value>,
    #[serde(default, rename = "_links")]
    links: PageLinks,
}

#[derive(Debug, Default, Deserialize)]
struct PageLinks {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    base: Option<String>,
}

impl PageLinks {
    /// Absolute URL of the following page, if any.
    ///
    /// `base + next` when the envelope names a base; otherwise `next` is
    /// resolved against the URL of the page that produced it.
    fn next_url(&self, current: &Url) -> Result<Option<Url>> {
        let Some(next) = self.next.as_deref().filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        let resolved = match self.base.as_deref().filter(|b| !b.is_empty()) {
            Some(base) => {
                let joined = format!("{}{next}", base.trim_end_matches('/'));
                Url::parse(&joined).map_err(|e| MigrateError::invalid_url(joined, e))?
            }
            None => current
                .join(next)
                .map_err(|e| MigrateError::invalid_url(next, e))?,
        };
        Ok(Some(resolved))
    }
}

/// Stream every item of the listing that starts at `seed`.
///
/// Items come out in server order, page after page. Items that do not decode
/// into `T` are logged and skipped rather than passed inward.
pub fn paginate<'a, T>(transport: &'a Transport, seed: Url) -> impl Stream<Item = Result<T>> + 'a
where
    T: DeserializeOwned + 'a,
{
    stream::try_unfold(Some(seed), move |cursor: Option<Url>| async move {
        match cursor {
            None => Ok(None),
            Some(url) => fetch_page::<T>(transport, url).await.map(|(items, next)| {
                Some((stream::iter(items.into_iter().map(Ok::<T, MigrateError>)), next))
            }),
        }
    })
    .try_flatten()
}

async fn fetch_page<T: DeserializeOwned>(
    transport: &Transport,
    url: Url,
) -> Result<(Vec<T>, Option<Url>)> {
    let response = transport
        .execute(&HttpRequest::get(url.clone()))
        .await?
        .error_for_status()?;
    let page: PageEnvelope = response.json()?;
    let next = page.links.next_url(&url)?;
    let items = decode_items::<T>(&url, page.results);
    tracing::debug!(url = %url, items = items.len(), has_next = next.is_some(), "fetched page");
    Ok((items, next))
}

fn decode_items<T: DeserializeOwned>(url: &Url, raw: Vec<serde_json::Value>) -> Vec<T> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<T>(value) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "skipping malformed listing item");
                None
            }
        })
        .collect()
}
