//! Development HTTP Server Binary
//!
//! Serves one changelist over HTTP for manual testing of the drag-and-drop UI.
//!
//! # Usage
//!
//! ```bash
//! # In-memory store seeded with a demo tree, outliner mode, port 3001
//! cargo run -p outliner-core --bin outliner-dev-server --features dev-server
//!
//! # Persistent libsql store in browsing mode
//! OUTLINER_DB_PATH=./data/outliner.db OUTLINER_MODE=browsing \
//!     cargo run -p outliner-core --bin outliner-dev-server --features dev-server
//! ```
//!
//! # Environment Variables
//!
//! - `OUTLINER_PORT`: Server port (default: 3001)
//! - `OUTLINER_DB_PATH`: libsql database file (default: in-memory demo tree)
//! - `OUTLINER_MODE`: `flat`, `outliner` or `browsing` (default: outliner)
//! - `OUTLINER_ROOT_LEVEL`: level of root nodes (default: 0)
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::sync::Arc;

use outliner_core::db::{LibsqlTreeStore, MemoryTreeStore, TreeStore};
use outliner_core::{ListingAdapter, ServerConfig};

/// Demo content: (title, index of parent in this list)
const DEMO_TREE: &[(&str, Option<usize>)] = &[
    ("Home", None),
    ("About", Some(0)),
    ("Team", Some(1)),
    ("History", Some(1)),
    ("Products", Some(0)),
    ("Hardware", Some(4)),
    ("Software", Some(4)),
    ("Archive", None),
    ("2023", Some(7)),
];

async fn seed_demo_tree(store: &dyn TreeStore) -> anyhow::Result<()> {
    let mut ids = Vec::with_capacity(DEMO_TREE.len());
    for (title, parent) in DEMO_TREE {
        let parent_id = parent.map(|index| ids[index]);
        let node = store.insert_node(title, parent_id).await?;
        ids.push(node.id);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let store: Arc<dyn TreeStore> = match &config.db_path {
        Some(path) => {
            tracing::info!("Database: {}", path.display());
            Arc::new(
                LibsqlTreeStore::new(
                    path.clone(),
                    config.adapter.fields.clone(),
                    config.adapter.root_level,
                )
                .await?,
            )
        }
        None => {
            tracing::info!("No OUTLINER_DB_PATH set, using a seeded in-memory tree");
            let store: Arc<dyn TreeStore> =
                Arc::new(MemoryTreeStore::with_root_level(config.adapter.root_level));
            seed_demo_tree(store.as_ref()).await?;
            store
        }
    };

    let adapter = ListingAdapter::new(store, config.adapter.clone());
    outliner_core::http::start_server(adapter, config.port).await
}
