mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use transport::{ApiError, ApiErrorKind, ApiResponse, HttpTransport, Query, Transport};

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::Result;

/// Fetches whole collections from the CDN API, transparently paginating.
#[derive(Debug, Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    concurrency: Option<usize>,
}

impl Client {
    pub fn new(token: &str, config: &ClientConfig, concurrency: Option<usize>) -> Result<Self> {
        let transport = HttpTransport::new(token, config)?;
        Ok(Client::with_transport(Arc::new(transport), concurrency))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, concurrency: Option<usize>) -> Self {
        Client { transport, concurrency }
    }

    /// Fetch every entity of one kind from `endpoint`.
    ///
    /// When `query` carries a page size, page 1 is requested first, alone:
    /// its `total` header determines how many pages exist, and every
    /// remaining page is requested concurrently. Page 1's entities always
    /// lead the result; pages ≥ 2 land in completion order. Without a page
    /// size, exactly one request is made.
    ///
    /// A body with no value under `entity_key` is an empty success, not an
    /// error; a single object under `entity_key` is a one-entity result.
    /// Any transport failure fails the whole fetch, without retry.
    pub async fn fetch_all(
        &self,
        endpoint: &str,
        entity_key: &str,
        query: Query,
    ) -> Result<Vec<Value>> {
        let Some(per_page) = query.page_size() else {
            let response = self.transport.get(endpoint, &query).await?;
            return Ok(entities(response.body, entity_key));
        };

        let first = self.transport.get(endpoint, &query.clone().page(1)).await?;
        if first.body.is_null() {
            return Ok(vec![]);
        }

        let total = first.total.unwrap_or(0);
        let total_pages = total.div_ceil(per_page.max(1) as u64);
        let mut all = entities(first.body, entity_key);

        if total_pages > 1 {
            let pages = (2..=total_pages).map(|page| {
                let query = query.clone().page(page as u32);
                async move { self.transport.get(endpoint, &query).await }
            });

            for response in fan_out_unordered(pages, self.concurrency).await {
                all.extend(entities(response?.body, entity_key));
            }
        }

        Ok(all)
    }
}

/// Pull the entities stored under `key` out of a response body. The single
/// `datasources/<slug>` endpoint nests an object rather than an array, so
/// an object reads as one entity.
fn entities(body: Value, key: &str) -> Vec<Value> {
    let Value::Object(mut body) = body else {
        return vec![];
    };

    match body.remove(key) {
        Some(Value::Array(items)) => items,
        Some(item @ Value::Object(_)) => vec![item],
        _ => vec![],
    }
}

/// Run independent futures concurrently, yielding results in completion
/// order. `limit` bounds how many run at once; `None` runs them all.
pub(crate) async fn fan_out_unordered<I, F, T>(futures: I, limit: Option<usize>) -> Vec<T>
    where I: IntoIterator<Item = F>, F: Future<Output = T>
{
    let futures: Vec<F> = futures.into_iter().collect();
    let limit = limit.unwrap_or(futures.len()).max(1);
    stream::iter(futures).buffer_unordered(limit).collect().await
}

/// Like [`fan_out_unordered`], but results keep the input order.
pub(crate) async fn fan_out<I, F, T>(futures: I, limit: Option<usize>) -> Vec<T>
    where I: IntoIterator<Item = F>, F: Future<Output = T>
{
    let futures: Vec<F> = futures.into_iter().collect();
    let limit = limit.unwrap_or(futures.len()).max(1);
    stream::iter(futures).buffered(limit).collect().await
}
