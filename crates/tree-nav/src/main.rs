//! Shell for browsing a remote tree without loading more than needed
//!
//! Usage:
//!   tree-nav [--config FILE] [--demo] [DIR...]
//!
//! Each DIR becomes a root. With no directory the current one is used;
//! `--demo` browses a built-in tree instead. Set `RUST_LOG=debug` to see
//! every remote call the cache makes.

mod command;
mod demo;
mod shell;

use anyhow::{Context, Result};
use log::info;
use remote_tree::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::command::Args;
use crate::shell::Shell;

fn load_config(path: &Path) -> Result<NavigatorConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse(std::env::args().skip(1))?;
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => NavigatorConfig::default(),
    };
    info!("using {:?}", config);

    let client: Arc<dyn ResourceClient> = if args.demo {
        Arc::new(demo::demo_client())
    } else {
        let dirs = if args.dirs.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            args.dirs
        };
        Arc::new(FilesystemClient::new(dirs).context("opening directories")?)
    };

    let navigator = Navigator::connect(client, config)
        .await
        .context("listing roots")?;
    println!("{} roots, type help for commands", navigator.forest().len());

    Shell::new(navigator).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "page_size": 7, "search_limit": 3 }}"#).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.page_size, 7);
        assert_eq!(config.search_limit, 3);
        assert_eq!(config.max_depth, NavigatorConfig::default().max_depth);

        assert!(load_config(Path::new("/nonexistent/nav.json")).is_err());
    }
}
