use std::path::PathBuf;
use std::process::ExitCode;

use bowerbird::Importer;

mod config;

pub const CONFIG_FILE: &str = "magpie.toml";

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// Import Storyblok content for a static site build.
        cmd magpie {
            /// Path to the configuration file (default: magpie.toml).
            optional -c, --config config: PathBuf

            /// Fetch stories and store them as front-matter files.
            cmd stories {
                /// Only stories built from this component.
                optional --component component: String
            }

            /// Fetch datasources and store them as JSON.
            cmd datasources {
                /// A single datasource instead of the whole space.
                optional --slug slug: String
            }

            /// Stories and datasources in one run.
            cmd all {}
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let flags = flags::Magpie::from_env_or_exit();
    let path = flags.config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let importer = match config::load(&path).and_then(Importer::new) {
        Ok(importer) => importer,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let start = std::time::SystemTime::now();
    let ok = match flags.subcommand {
        flags::MagpieCmd::Stories(stories) => {
            importer.store_stories(stories.component.as_deref()).await
        }
        flags::MagpieCmd::Datasources(datasources) => {
            importer.store_datasources(datasources.slug.as_deref()).await
        }
        flags::MagpieCmd::All(_) => {
            let stories = importer.store_stories(None).await;
            let datasources = importer.store_datasources(None).await;
            stories && datasources
        }
    };

    println!("import time: {}ms", start.elapsed().unwrap().as_millis());
    match ok {
        true => ExitCode::SUCCESS,
        false => ExitCode::FAILURE,
    }
}
