//! Build-time import: fetch stories and datasources from the CDN API,
//! reshape them, and write them out for the site build.

mod datasources;
mod stories;
mod store;

pub use datasources::Entry;
pub use stories::{Story, StoryRecord};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::{Client, Transport};
use crate::config::Config;
use crate::error::Result;
use crate::util;

#[derive(Debug)]
pub struct Importer {
    config: Config,
    client: Client,
    stories_path: PathBuf,
    datasources_path: PathBuf,
}

impl Importer {
    /// Fails without a token: either [`Config::token`] or the
    /// `client.access_token` override (which wins when both are set).
    pub fn new(config: Config) -> Result<Self> {
        let token = config.client.access_token.clone()
            .or_else(|| config.token.clone())
            .ok_or_else(|| error! {
                "missing API token",
                "expected" => "`token` or `client.access_token` to be set",
            })?;

        let client = Client::new(&token, &config.client, config.concurrency)?;
        Importer::with_client(config, client)
    }

    /// Build an importer over any transport. [`Importer::new`] is the
    /// usual entry point; this is the seam for substituting the wire.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let client = Client::with_transport(transport, config.concurrency);
        Importer::with_client(config, client)
    }

    fn with_client(config: Config, client: Client) -> Result<Self> {
        Ok(Importer {
            stories_path: util::clean_path(&config.stories_path)?,
            datasources_path: util::clean_path(&config.datasources_path)?,
            client,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Where story front-matter files are written.
    pub fn stories_path(&self) -> &Path {
        &self.stories_path
    }

    /// Where datasource JSON files are written.
    pub fn datasources_path(&self) -> &Path {
        &self.datasources_path
    }
}
