use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::{self, Query};
use crate::import::Importer;

/// One datasource entry. The API shape is stable (name/value plus a
/// per-dimension override) but anything extra is passed through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub dimension_value: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Datasource metadata, fetched only for its dimension names.
#[derive(Debug, Clone, Deserialize)]
struct Datasource {
    #[serde(default)]
    dimensions: Vec<Dimension>,
}

#[derive(Debug, Clone, Deserialize)]
struct Dimension {
    #[serde(default)]
    entry_value: String,
}

impl Importer {
    /// Entries of a single dimension (the empty name is the default
    /// dimension). A transport failure is an `Err`: the one resolver
    /// operation whose failure is distinguishable from an empty result.
    pub async fn datasource_dimension(&self, slug: &str, dimension: &str) -> crate::error::Result<Vec<Entry>> {
        let query = Query::new()
            .param("datasource", slug)
            .param("dimension", dimension)
            .per_page(self.config().per_page);

        let raw = self.client()
            .fetch_all("datasource_entries", "datasource_entries", query)
            .await?;

        Ok(raw.into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect())
    }

    /// Entries of a datasource across the default dimension and every
    /// named dimension, concatenated. Entries appearing in more than one
    /// dimension appear more than once. An unknown slug (or any metadata
    /// fetch failure) logs a diagnostic and resolves to an empty result.
    pub async fn datasource(&self, slug: &str) -> Vec<Entry> {
        let metadata = self.client()
            .fetch_all(&format!("datasources/{slug}"), "datasource", Query::new())
            .await;

        let metadata = match metadata {
            Ok(items) => items.into_iter().next(),
            Err(_) => None,
        };

        let Some(metadata) = metadata else {
            tracing::error!(slug, "datasource not found");
            return vec![];
        };

        // the default dimension comes first, then each named one
        let mut dimensions = vec![String::new()];
        if let Ok(datasource) = serde_json::from_value::<Datasource>(metadata) {
            dimensions.extend(datasource.dimensions.into_iter().map(|d| d.entry_value));
        }

        let fetches = dimensions.iter().map(|dimension| async move {
            // a failed dimension contributes nothing to the concatenation
            self.datasource_dimension(slug, dimension).await.unwrap_or_default()
        });

        api::fan_out(fetches, self.config().concurrency).await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Every datasource in the space, resolved concurrently into a
    /// slug → entries map. An index fetch failure yields an empty map.
    pub async fn datasources(&self) -> BTreeMap<String, Vec<Entry>> {
        let query = Query::new().per_page(self.config().per_page);
        let index = match self.client().fetch_all("datasources", "datasources", query).await {
            Ok(index) => index,
            Err(_) => return BTreeMap::new(),
        };

        let slugs: Vec<String> = index.iter()
            .filter_map(|datasource| datasource.get("slug").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        let fetches = slugs.into_iter().map(|slug| async move {
            let entries = self.datasource(&slug).await;
            (slug, entries)
        });

        api::fan_out(fetches, self.config().concurrency).await
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::api::testing::FakeTransport;
    use crate::api::{ApiError, ApiResponse};
    use crate::config::Config;

    use super::*;

    fn entries(dimension: &str, count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| json!({ "name": format!("{dimension}-{i}"), "value": "v" }))
            .collect()
    }

    /// A space with one datasource, `colors`, in dimensions en and fr:
    /// 5 default entries, 3 in en, 2 in fr.
    fn space() -> Arc<FakeTransport> {
        FakeTransport::new(|endpoint, query| {
            let response = match endpoint {
                "datasources" => ApiResponse {
                    body: json!({ "datasources": [{ "slug": "colors" }] }),
                    total: Some(1),
                },
                "datasources/colors" => ApiResponse {
                    body: json!({ "datasource": {
                        "slug": "colors",
                        "dimensions": [
                            { "entry_value": "en" },
                            { "entry_value": "fr" },
                        ],
                    }}),
                    total: None,
                },
                "datasource_entries" => {
                    assert_eq!(query.get("datasource").as_deref(), Some("colors"));
                    let items = match query.get("dimension").as_deref() {
                        Some("") => entries("default", 5),
                        Some("en") => entries("en", 3),
                        Some("fr") => entries("fr", 2),
                        other => panic!("unexpected dimension: {other:?}"),
                    };

                    let total = items.len() as u64;
                    ApiResponse {
                        body: json!({ "datasource_entries": items }),
                        total: Some(total),
                    }
                }
                other => return Err(ApiError::for_status(404, other.into()).into()),
            };

            Ok(response)
        })
    }

    fn importer(transport: Arc<FakeTransport>) -> Importer {
        Importer::with_transport(Config::default(), transport).unwrap()
    }

    #[tokio::test]
    async fn concatenates_every_dimension() {
        let importer = importer(space());
        let entries = importer.datasource("colors").await;

        // 5 + 3 + 2, duplicates across dimensions are not removed
        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0].name, "default-0");
    }

    #[tokio::test]
    async fn single_dimension_fetch() {
        let importer = importer(space());
        let entries = importer.datasource_dimension("colors", "en").await.unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn dimension_failure_is_a_sentinel_error() {
        let transport = FakeTransport::new(|_, _| {
            Err(ApiError::for_status(500, "boom".into()).into())
        });

        let importer = importer(transport);
        assert!(importer.datasource_dimension("colors", "en").await.is_err());
    }

    #[tokio::test]
    async fn missing_slug_resolves_empty() {
        let importer = importer(space());
        let entries = importer.datasource("missing-slug").await;
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn missing_metadata_resolves_empty() {
        let transport = FakeTransport::new(|_, _| Ok(ApiResponse {
            body: json!({}),
            total: None,
        }));

        let importer = importer(transport);
        assert!(importer.datasource("colors").await.is_empty());
    }

    #[tokio::test]
    async fn datasource_without_dimensions_uses_the_default() {
        let transport = FakeTransport::new(|endpoint, query| {
            let response = match endpoint {
                "datasources/plain" => ApiResponse {
                    body: json!({ "datasource": { "slug": "plain" } }),
                    total: None,
                },
                "datasource_entries" => {
                    assert_eq!(query.get("dimension").as_deref(), Some(""));
                    ApiResponse {
                        body: json!({ "datasource_entries": entries("default", 2) }),
                        total: Some(2),
                    }
                }
                other => panic!("unexpected endpoint: {other}"),
            };

            Ok(response)
        });

        let importer = importer(transport);
        assert_eq!(importer.datasource("plain").await.len(), 2);
    }

    #[tokio::test]
    async fn resolves_the_whole_space() {
        let importer = importer(space());
        let map = importer.datasources().await;

        assert_eq!(map.len(), 1);
        assert_eq!(map["colors"].len(), 10);
    }

    #[tokio::test]
    async fn index_failure_yields_an_empty_map() {
        let transport = FakeTransport::new(|_, _| {
            Err(ApiError::for_status(500, "boom".into()).into())
        });

        let importer = importer(transport);
        assert!(importer.datasources().await.is_empty());
    }
}
