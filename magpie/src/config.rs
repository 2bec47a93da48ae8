use std::path::Path;

use bowerbird::error::{Chainable, Error, Result};

pub fn load(path: &Path) -> Result<bowerbird::Config> {
    let text = std::fs::read_to_string(path).chain_with(|| bowerbird::error! {
        "failed to read the configuration file",
        "path" => path.display(),
    })?;

    toml::from_str(&text).map_err(Error::from_std).chain_with(|| bowerbird::error! {
        "failed to parse the configuration file",
        "path" => path.display(),
    })
}
