use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Settings for an import run and for the template tags.
///
/// Every field has a default, so a configuration file only needs to name
/// what it overrides. Paths are resolved by [`crate::util::clean_path`]:
/// relative values land under the process working directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// The API token of the space. `client.access_token` takes precedence.
    pub token: Option<String>,
    /// Which version of the content to fetch.
    pub version: Version,
    /// Prefix for the `layout` field of transformed stories.
    pub layouts_path: String,
    /// Where story front-matter files are written.
    pub stories_path: String,
    /// Where datasource JSON files are written.
    pub datasources_path: String,
    /// Overrides mapping a component name to a layout name.
    pub components_layouts_map: FxHashMap<String, String>,
    /// Folder prefix for block templates, as seen by the template engine.
    pub blocks_folder: String,
    /// Page size for paginated API requests.
    pub per_page: u32,
    /// Bound on concurrent fan-out requests. `None` fans out unbounded.
    pub concurrency: Option<usize>,
    /// Raw transport overrides.
    pub client: ClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            token: None,
            version: Version::default(),
            layouts_path: String::new(),
            stories_path: "storyblok".into(),
            datasources_path: "_data".into(),
            components_layouts_map: FxHashMap::default(),
            blocks_folder: "blocks/".into(),
            per_page: 100,
            concurrency: None,
            client: ClientConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    #[default]
    Draft,
    Published,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Version::Draft => "draft",
            Version::Published => "published",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Token override; falls back to [`Config::token`].
    pub access_token: Option<String>,
    /// Base URL of the CDN API.
    pub base_url: String,
    /// Request timeout in seconds. `None` waits indefinitely.
    pub timeout: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            access_token: None,
            base_url: "https://api.storyblok.com/v2".into(),
            timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.version, Version::Draft);
        assert_eq!(config.stories_path, "storyblok");
        assert_eq!(config.datasources_path, "_data");
        assert_eq!(config.blocks_folder, "blocks/");
        assert_eq!(config.per_page, 100);
        assert_eq!(config.concurrency, None);
        assert_eq!(config.client.base_url, "https://api.storyblok.com/v2");
    }

    #[test]
    fn version_names() {
        let draft: Version = serde_json::from_str("\"draft\"").unwrap();
        let published: Version = serde_json::from_str("\"published\"").unwrap();
        assert_eq!(draft.as_str(), "draft");
        assert_eq!(published.as_str(), "published");
    }
}
