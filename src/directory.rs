//! User directory lookups and search.
//!
//! The directory is the global `users` array owned by the identity session;
//! everything here reads it read-only and strips passwords before results
//! cross the boundary.

use crate::kv::{decode_list, KeyValueStore, StoreError, USERS_KEY};
use crate::model::{User, UserHandle};
use crate::{logging, mlog};

/// Load the full user directory.  Missing key means no one has signed up.
pub async fn load_directory(store: &dyn KeyValueStore) -> Result<Vec<User>, StoreError> {
    let raw = store.get(USERS_KEY).await?;
    decode_list(USERS_KEY, raw)
}

/// Whether a username exists in the directory.
pub async fn user_exists(store: &dyn KeyValueStore, username: &str) -> Result<bool, StoreError> {
    let users = load_directory(store).await?;
    Ok(users.iter().any(|u| u.username == username))
}

/// Case-insensitive substring search over usernames, excluding the viewer.
///
/// Returns handles only; no minimum term length is enforced here (an empty
/// term matches everyone but the viewer).  Any storage or parse failure is
/// logged and collapses to an empty result.
pub async fn search_users(
    store: &dyn KeyValueStore,
    viewer: &str,
    term: &str,
) -> Vec<UserHandle> {
    let users = match load_directory(store).await {
        Ok(users) => users,
        Err(e) => {
            mlog!("search: directory read failed for {}: {}", logging::user_tag(viewer), e);
            return Vec::new();
        }
    };

    let needle = term.to_lowercase();
    users
        .into_iter()
        .filter(|u| u.username.to_lowercase().contains(&needle) && u.username != viewer)
        .map(|u| UserHandle {
            username: u.username,
        })
        .collect()
}
