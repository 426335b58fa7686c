//! Identity session: who is signed in, and the signup/login/logout flows.
//!
//! The session owns two store keys: the global `users` directory and the
//! `user` key holding the active account.  Both are plain JSON; credentials
//! are stored as-is (local-first toy auth, not a security boundary).
//!
//! Mutators here follow the same contract as the graph: storage failures are
//! caught, logged, and reported through the return value, never propagated.

use crate::kv::{
    decode_list, decode_value, encode_value, KeyValueStore, StoreError, ACTIVE_USER_KEY, USERS_KEY,
};
use crate::model::{OpOutcome, User};
use crate::{logging, mlog};

/// The active identity, if any.  Re-materialized from the store at startup
/// via [`IdentitySession::restore`].
#[derive(Debug, Default)]
pub struct IdentitySession {
    current: Option<User>,
}

impl IdentitySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The signed-in user, or `None`.
    pub fn current(&self) -> Option<&User> {
        self.current.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    /// Re-read the persisted session.  A missing `user` key means signed
    /// out; a malformed one is a real error, not a silent sign-out.
    pub async fn restore(&mut self, store: &dyn KeyValueStore) -> Result<Option<&User>, StoreError> {
        let raw = store.get(ACTIVE_USER_KEY).await?;
        self.current = decode_value(ACTIVE_USER_KEY, raw)?;
        Ok(self.current())
    }

    /// Register a new account and sign it in.
    ///
    /// Rejects blank fields and duplicate usernames (exact, case-sensitive
    /// match on the directory key).  On success the directory gains an entry
    /// and the `user` key holds the new account.
    pub async fn signup(
        &mut self,
        store: &dyn KeyValueStore,
        username: &str,
        password: &str,
    ) -> OpOutcome {
        if username.trim().is_empty() || password.trim().is_empty() {
            return OpOutcome::fail("Please fill in all fields");
        }

        match self.try_signup(store, username, password).await {
            Ok(outcome) => outcome,
            Err(e) => {
                mlog!("session: signup failed for {}: {}", logging::user_tag(username), e);
                OpOutcome::fail("An error occurred")
            }
        }
    }

    async fn try_signup(
        &mut self,
        store: &dyn KeyValueStore,
        username: &str,
        password: &str,
    ) -> Result<OpOutcome, StoreError> {
        let raw = store.get(USERS_KEY).await?;
        let mut users: Vec<User> = decode_list(USERS_KEY, raw)?;

        if users.iter().any(|u| u.username == username) {
            return Ok(OpOutcome::fail("Username already exists"));
        }

        let user = User {
            username: username.to_string(),
            password: password.to_string(),
        };
        users.push(user.clone());
        store
            .set(USERS_KEY, &encode_value(USERS_KEY, &users)?)
            .await?;
        store
            .set(ACTIVE_USER_KEY, &encode_value(ACTIVE_USER_KEY, &user)?)
            .await?;

        mlog!("session: signed up {}", logging::user_tag(username));
        self.current = Some(user);
        Ok(OpOutcome::ok("Account created"))
    }

    /// Sign in with exact username/password match.  Returns whether the
    /// session is now established; failures of any kind read as `false`.
    pub async fn login(
        &mut self,
        store: &dyn KeyValueStore,
        username: &str,
        password: &str,
    ) -> bool {
        match self.try_login(store, username, password).await {
            Ok(signed_in) => signed_in,
            Err(e) => {
                mlog!("session: login failed for {}: {}", logging::user_tag(username), e);
                false
            }
        }
    }

    async fn try_login(
        &mut self,
        store: &dyn KeyValueStore,
        username: &str,
        password: &str,
    ) -> Result<bool, StoreError> {
        let raw = store.get(USERS_KEY).await?;
        let users: Vec<User> = decode_list(USERS_KEY, raw)?;

        let found = users
            .into_iter()
            .find(|u| u.username == username && u.password == password);

        match found {
            Some(user) => {
                store
                    .set(ACTIVE_USER_KEY, &encode_value(ACTIVE_USER_KEY, &user)?)
                    .await?;
                mlog!("session: signed in {}", logging::user_tag(username));
                self.current = Some(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Sign out: drop the persisted `user` key, then clear the in-memory
    /// session.  If the removal fails the session stays signed in, matching
    /// the store.
    pub async fn logout(&mut self, store: &dyn KeyValueStore) {
        if let Err(e) = store.remove(ACTIVE_USER_KEY).await {
            mlog!("session: logout failed: {}", e);
            return;
        }
        if let Some(user) = self.current.take() {
            mlog!("session: signed out {}", logging::user_tag(&user.username));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    #[tokio::test]
    async fn signup_persists_directory_and_active_user() {
        let store = MemoryStore::new();
        let mut session = IdentitySession::new();

        let outcome = session.signup(&store, "alice", "hunter2").await;
        assert!(outcome.success);
        assert_eq!(session.current().unwrap().username, "alice");

        // Both keys are now populated.
        assert!(store.get(USERS_KEY).await.unwrap().is_some());
        assert!(store.get(ACTIVE_USER_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn signup_rejects_blank_fields_and_duplicates() {
        let store = MemoryStore::new();
        let mut session = IdentitySession::new();

        let outcome = session.signup(&store, "", "pw").await;
        assert_eq!(outcome, OpOutcome::fail("Please fill in all fields"));
        let outcome = session.signup(&store, "alice", "  ").await;
        assert_eq!(outcome, OpOutcome::fail("Please fill in all fields"));

        assert!(session.signup(&store, "alice", "pw").await.success);
        let outcome = session.signup(&store, "alice", "other").await;
        assert_eq!(outcome, OpOutcome::fail("Username already exists"));
    }

    #[tokio::test]
    async fn login_requires_exact_credentials() {
        let store = MemoryStore::new();
        let mut session = IdentitySession::new();
        session.signup(&store, "alice", "hunter2").await;
        session.logout(&store).await;
        assert!(!session.is_signed_in());

        assert!(!session.login(&store, "alice", "wrong").await);
        assert!(!session.login(&store, "Alice", "hunter2").await);
        assert!(session.login(&store, "alice", "hunter2").await);
        assert_eq!(session.current().unwrap().username, "alice");
    }

    #[tokio::test]
    async fn restore_picks_up_persisted_session() {
        let store = MemoryStore::new();
        let mut session = IdentitySession::new();
        session.signup(&store, "alice", "pw").await;

        // A fresh session over the same store sees the signed-in user.
        let mut restored = IdentitySession::new();
        let user = restored.restore(&store).await.unwrap();
        assert_eq!(user.unwrap().username, "alice");

        restored.logout(&store).await;
        let mut after_logout = IdentitySession::new();
        assert!(after_logout.restore(&store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_surfaces_corrupt_session_record() {
        let store = MemoryStore::new();
        store.set(ACTIVE_USER_KEY, "not-json").await.unwrap();

        let mut session = IdentitySession::new();
        assert!(session.restore(&store).await.is_err());
        assert!(!session.is_signed_in());
    }
}
