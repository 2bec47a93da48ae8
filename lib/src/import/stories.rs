use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::Query;
use crate::import::Importer;
use crate::util::trim_slashes;

/// A story as the API returns it: routing fields plus the nested
/// component content, with everything else passed through untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct Story {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub content: Map<String, Value>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub full_slug: String,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// A story reshaped for the template layer: layout selection, a grouping
/// tag, the content hoisted into `data`, and a routable permalink. The
/// original `content` container is gone.
#[derive(Debug, Clone, Serialize)]
pub struct StoryRecord {
    pub uuid: String,
    pub layout: String,
    pub tags: String,
    pub data: Map<String, Value>,
    pub permalink: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub full_slug: String,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Importer {
    /// Fetch all stories, optionally filtered server-side by component.
    ///
    /// Returns the transformed stories in the order the API produced them.
    /// A fetch failure yields an empty result; the transport has already
    /// logged the category of the failure.
    pub async fn stories(&self, component: Option<&str>) -> Vec<StoryRecord> {
        let mut query = Query::new()
            .param("version", self.config().version.as_str())
            .per_page(self.config().per_page);

        if let Some(component) = component {
            query = query.param("filter_query[component][in]", component);
        }

        let raw = match self.client().fetch_all("stories", "stories", query).await {
            Ok(raw) => raw,
            Err(_) => return vec![],
        };

        raw.into_iter()
            .filter_map(|value| match serde_json::from_value::<Story>(value) {
                Ok(story) => Some(self.transform(story)),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed story");
                    None
                }
            })
            .collect()
    }

    /// Deterministic per-story reshaping; never reorders and never fails.
    pub fn transform(&self, story: Story) -> StoryRecord {
        let component = story.content.get("component")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let layout_name = self.config().components_layouts_map
            .get(&component)
            .cloned()
            .unwrap_or_else(|| component.clone());

        let source = story.path.as_deref()
            .filter(|path| !path.is_empty())
            .unwrap_or(&story.full_slug);

        StoryRecord {
            layout: format!("{}/{layout_name}", trim_slashes(&self.config().layouts_path)),
            permalink: format!("{}/", source.strip_suffix('/').unwrap_or(source)),
            tags: component,
            data: story.content,
            uuid: story.uuid,
            path: story.path,
            full_slug: story.full_slug,
            rest: story.rest,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::api::testing::FakeTransport;
    use crate::api::ApiResponse;
    use crate::config::Config;

    use super::*;

    fn importer(config: Config, transport: Arc<FakeTransport>) -> Importer {
        Importer::with_transport(config, transport).unwrap()
    }

    fn story(value: Value) -> Story {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn transform_reshapes_a_story() {
        let importer = importer(Config::default(), FakeTransport::new(|_, _| {
            unreachable!()
        }));

        let record = importer.transform(story(json!({
            "uuid": "u-1",
            "name": "Home",
            "full_slug": "home",
            "content": { "component": "hero", "title": "Hi" },
        })));

        assert_eq!(record.layout, "/hero");
        assert_eq!(record.tags, "hero");
        assert_eq!(record.permalink, "home/");
        assert_eq!(record.data["component"], "hero");
        assert_eq!(record.data["title"], "Hi");

        // the nested container is gone; pass-through fields remain
        let serialized = serde_json::to_value(&record).unwrap();
        assert!(serialized.get("content").is_none());
        assert_eq!(serialized["name"], "Home");
        assert_eq!(serialized["full_slug"], "home");
    }

    #[test]
    fn transform_prefers_the_path_override() {
        let importer = importer(Config::default(), FakeTransport::new(|_, _| {
            unreachable!()
        }));

        let record = importer.transform(story(json!({
            "uuid": "u-1",
            "full_slug": "ignored/slug",
            "path": "real/path/",
            "content": { "component": "page" },
        })));

        assert_eq!(record.permalink, "real/path/");
    }

    #[test]
    fn transform_applies_layout_overrides() {
        let mut config = Config { layouts_path: "/layouts/".into(), ..Config::default() };
        config.components_layouts_map.insert("hero".into(), "splash".into());
        let importer = importer(config, FakeTransport::new(|_, _| unreachable!()));

        let record = importer.transform(story(json!({
            "uuid": "u-1",
            "full_slug": "home",
            "content": { "component": "hero" },
        })));

        assert_eq!(record.layout, "layouts/splash");
    }

    #[tokio::test]
    async fn fetches_and_transforms_in_order() {
        let transport = FakeTransport::new(|_, query| {
            assert_eq!(query.get("version").as_deref(), Some("draft"));
            Ok(ApiResponse {
                body: json!({ "stories": [
                    { "uuid": "a", "full_slug": "one", "content": { "component": "hero" } },
                    { "uuid": "b", "full_slug": "two", "content": { "component": "cta" } },
                ]}),
                total: Some(2),
            })
        });

        let importer = importer(Config { token: Some("t".into()), ..Config::default() }, transport);
        let records = importer.stories(None).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].uuid, "a");
        assert_eq!(records[1].uuid, "b");
        assert_eq!(records[0].permalink, "one/");
    }

    #[tokio::test]
    async fn component_filter_is_sent_server_side() {
        let transport = FakeTransport::new(|_, query| {
            assert_eq!(query.get("filter_query[component][in]").as_deref(), Some("hero"));
            Ok(ApiResponse { body: json!({ "stories": [] }), total: Some(0) })
        });

        let importer = importer(Config::default(), transport.clone());
        let records = importer.stories(Some("hero")).await;

        assert!(records.is_empty());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_yields_empty() {
        let transport = FakeTransport::new(|_, _| {
            Err(crate::api::ApiError::for_status(500, "boom".into()).into())
        });

        let importer = importer(Config::default(), transport);
        assert!(importer.stories(None).await.is_empty());
    }
}
