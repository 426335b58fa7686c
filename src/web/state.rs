//! Shared application state.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::graph::SocialGraph;
use crate::kv::SharedStore;
use crate::session::IdentitySession;
use crate::{logging, mlog};

/// Everything the handlers touch: the store handle, the identity session,
/// and, while someone is signed in, their graph context.  The graph is
/// (re)built from the store whenever the active identity changes and torn
/// down on sign-out; it never outlives its session.
pub struct AppState {
    pub store: SharedStore,
    pub session: IdentitySession,
    pub graph: Option<SocialGraph>,
}

impl AppState {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            session: IdentitySession::new(),
            graph: None,
        }
    }

    /// Username of the signed-in user, if any.
    pub fn current_username(&self) -> Option<String> {
        self.session.current().map(|u| u.username.clone())
    }

    /// Rebuild the graph context for the current identity, or drop it when
    /// signed out.  A failed load (corrupt lists) is logged and leaves the
    /// context empty; a later reload can still repair the view.
    pub async fn establish_graph(&mut self) {
        let Some(username) = self.current_username() else {
            self.graph = None;
            return;
        };

        let mut graph = SocialGraph::new(username.clone());
        if let Err(e) = graph.load(self.store.as_ref()).await {
            mlog!(
                "graph: load for {} failed: {}",
                logging::user_tag(&username),
                e
            );
        }
        self.graph = Some(graph);
    }
}

pub type SharedState = Arc<Mutex<AppState>>;
