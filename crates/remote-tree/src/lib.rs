//! Remote Tree Library
//!
//! A lazy-loading cache over a remote, tree-structured resource store.
//! Nothing is fetched until it is asked for, and nothing is materialized
//! beyond what a request needs.
//!
//! # Core Concepts
//!
//! - **ResourceClient**: the async capability that reaches the store
//! - **Node**: a cached container or leaf; discovers its children once
//! - **Forest**: the independently rooted trees the caller can reach
//! - **Navigator**: cursor, local lookup and global resolution
//!
//! # Example
//!
//! ```no_run
//! use remote_tree::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> remote_tree::Result<()> {
//! let client = Arc::new(FilesystemClient::new(["./src"])?);
//! let navigator = Navigator::connect(client, NavigatorConfig::default()).await?;
//!
//! // Finds the file even though nothing below the root was loaded
//! let node = navigator
//!     .resolve_global("lib.rs", &ResolveOptions::default())
//!     .await?
//!     .into_node()?;
//! println!("{}", node.path());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod navigator;
pub mod session;
pub mod tree;

pub use error::{Result, TreeError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{
        Body, FilesystemClient, LeafType, MemoryClient, Metadata, ResourceClient,
    };
    pub use crate::config::NavigatorConfig;
    pub use crate::error::{Result, TreeError};
    pub use crate::navigator::{Chooser, LoadScope, Navigator, ResolveOptions, Resolved};
    pub use crate::session::Session;
    pub use crate::tree::prelude::*;
}
