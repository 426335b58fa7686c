//! Web server module: the REST boundary the UI calls.
//!
//! Serves the identity session, friend graph, directory search, and feed
//! endpoints, persisting everything through a single [`KeyValueStore`]
//! handle.  No rendering lives here; this is the seam between the core and
//! whatever front-end drives it.
//!
//! [`KeyValueStore`]: crate::kv::KeyValueStore

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod utils;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::Mutex;

use crate::kv::{db_path, MemoryStore, SharedStore, SqliteStore};
use crate::web::config::{Cli, Config};
use crate::web::state::AppState;
use crate::{logging, mlog};

/// Entry point: parse CLI, open the store, restore the session, serve.
pub async fn run() {
    let cli = Cli::parse();
    let config = Config::from_cli_and_env(cli);

    logging::init();

    mlog!("moment starting");

    let store: SharedStore = if config.ephemeral {
        mlog!("  store: in-memory (ephemeral)");
        Arc::new(MemoryStore::new())
    } else {
        let path = db_path(&config.data_dir);
        mlog!("  store: {}", path.display());
        Arc::new(SqliteStore::open(&path).expect("failed to open store"))
    };

    let mut app = AppState::new(store);

    // Pick up a persisted session from a previous run.
    match app.session.restore(app.store.as_ref()).await {
        Ok(Some(user)) => {
            mlog!("  session: {}", logging::user_tag(&user.username));
        }
        Ok(None) => mlog!("  session: signed out"),
        Err(e) => mlog!("  WARNING: session restore failed: {}", e),
    }
    app.establish_graph().await;

    let state = Arc::new(Mutex::new(app));
    let router = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    mlog!("moment listening on http://{}", config.bind_addr);

    axum::serve(listener, router).await.expect("server error");
}
