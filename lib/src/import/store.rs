use serde::Serialize;
use tokio::fs;

use crate::error::{Chainable, Error, Result};
use crate::import::Importer;

impl Importer {
    /// Fetch stories (optionally filtered by component) and write one
    /// front-matter file per story, named by its uuid. Reports success as
    /// a boolean: a failed write is logged, never propagated, and the
    /// build carries on.
    pub async fn store_stories(&self, component: Option<&str>) -> bool {
        let stories = self.stories(component).await;
        let result: Result<()> = async {
            fs::create_dir_all(&self.stories_path).await.chain_with(|| error! {
                "failed to create the stories directory",
                "path" => self.stories_path.display(),
            })?;

            for story in &stories {
                let path = self.stories_path.join(format!("{}.md", story.uuid));
                let json = to_pretty_json(story)?;
                fs::write(&path, format!("---json\n{json}\n---")).await.chain_with(|| error! {
                    "failed to write story",
                    "path" => path.display(),
                })?;
            }

            Ok(())
        }.await;

        match result {
            Ok(()) => {
                tracing::info!(
                    count = stories.len(),
                    path = %self.stories_path.display(),
                    "stories saved"
                );

                true
            }
            Err(e) => {
                tracing::error!("failed to store stories\n{e}");
                false
            }
        }
    }

    /// Resolve one datasource (or, without a slug, all of them) and write
    /// a single pretty-printed JSON file. An empty result writes nothing
    /// and reports `false`; so does a failed write, after logging.
    pub async fn store_datasources(&self, slug: Option<&str>) -> bool {
        let (filename, json) = match slug {
            Some(slug) => {
                let entries = self.datasource(slug).await;
                if entries.is_empty() {
                    return false;
                }

                (format!("{slug}.json"), to_pretty_json(&entries))
            }
            None => {
                let map = self.datasources().await;
                if map.is_empty() {
                    return false;
                }

                ("datasources.json".to_string(), to_pretty_json(&map))
            }
        };

        let result: Result<()> = async {
            fs::create_dir_all(&self.datasources_path).await.chain_with(|| error! {
                "failed to create the datasources directory",
                "path" => self.datasources_path.display(),
            })?;

            let path = self.datasources_path.join(&filename);
            fs::write(&path, json?).await.chain_with(|| error! {
                "failed to write datasource file",
                "path" => path.display(),
            })
        }.await;

        match result {
            Ok(()) => {
                tracing::info!(path = %self.datasources_path.display(), "datasources saved");
                true
            }
            Err(e) => {
                tracing::error!("failed to store datasources\n{e}");
                false
            }
        }
    }
}

/// Pretty JSON with the 4-space indent the output files use.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(Error::from_std)
}
