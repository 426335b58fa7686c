//! Friend-relationship graph: request lifecycle and symmetric friendship.
//!
//! A [`SocialGraph`] is a session-scoped view of one user's corner of the
//! graph: their friend list plus incoming and outgoing request queues.  It
//! is constructed for whichever user is signed in and re-[`load`]ed when the
//! identity changes; nothing here is global.
//!
//! Every friendship and every request is a symmetric record: the same fact
//! written under two different users' keys.  Mutators keep the pair in
//! lock-step with an explicit ordered list of writes, committed one key at a
//! time with no transaction and no rollback.  A failure or interleaving
//! between steps leaves the two sides disagreeing — an accepted risk of the
//! storage model, surfaced to tests through `kv::FaultStore` rather than
//! silently repaired here.
//!
//! In-memory state is applied before the writes are committed (the caller
//! sees the optimistic result); a failed commit therefore leaves this view
//! ahead of storage until the next `load`.
//!
//! [`load`]: SocialGraph::load

use chrono::Utc;

use crate::directory;
use crate::kv::{
    decode_list, encode_value, friend_requests_key, friends_key, sent_requests_key, KeyValueStore,
    StoreError,
};
use crate::model::{Friend, FriendRequest, OpOutcome, RequestStatus};
use crate::{logging, mlog};

/// One pending write in a multi-key mutation, in commit order.
struct WriteStep {
    key: String,
    value: String,
}

fn step<T: serde::Serialize>(key: &str, value: &T) -> Result<WriteStep, StoreError> {
    Ok(WriteStep {
        key: key.to_string(),
        value: encode_value(key, value)?,
    })
}

/// Write each step in order, stopping at the first failure.  Whatever was
/// already written stays written.
async fn commit(store: &dyn KeyValueStore, steps: Vec<WriteStep>) -> Result<(), StoreError> {
    for s in steps {
        store.set(&s.key, &s.value).await?;
    }
    Ok(())
}

/// One user's friends and request queues, loaded from their three store
/// keys.
#[derive(Debug)]
pub struct SocialGraph {
    username: String,
    friends: Vec<Friend>,
    incoming: Vec<FriendRequest>,
    outgoing: Vec<FriendRequest>,
}

impl SocialGraph {
    /// An empty graph context for `username`.  Call [`load`] to populate it.
    ///
    /// [`load`]: SocialGraph::load
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            friends: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn friends(&self) -> &[Friend] {
        &self.friends
    }

    pub fn incoming(&self) -> &[FriendRequest] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[FriendRequest] {
        &self.outgoing
    }

    /// Replace in-memory state from the store.  Missing keys load as empty;
    /// malformed values are an error.  Never writes.
    pub async fn load(&mut self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        let fk = friends_key(&self.username);
        let ik = friend_requests_key(&self.username);
        let ok = sent_requests_key(&self.username);

        let friends = decode_list(&fk, store.get(&fk).await?)?;
        let incoming = decode_list(&ik, store.get(&ik).await?)?;
        let outgoing = decode_list(&ok, store.get(&ok).await?)?;

        self.friends = friends;
        self.incoming = incoming;
        self.outgoing = outgoing;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Predicates (pure, no I/O)
    // -----------------------------------------------------------------------

    pub fn is_friend(&self, username: &str) -> bool {
        self.friends.iter().any(|f| f.username == username)
    }

    /// Whether an outgoing request to `username` is still pending.
    /// Rejected history records do not count.
    pub fn has_sent_request(&self, username: &str) -> bool {
        self.outgoing
            .iter()
            .any(|r| r.username == username && r.is_pending())
    }

    /// Whether any incoming record from `username` exists, regardless of
    /// status.
    pub fn has_incoming_request(&self, username: &str) -> bool {
        self.incoming.iter().any(|r| r.username == username)
    }

    // -----------------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------------

    /// Send a friend request to `target`.
    ///
    /// Preconditions, first match wins: self-request, existing friendship,
    /// pending outgoing request, unknown target.  On success two writes go
    /// out in order: the sender's outgoing list, then the target's incoming
    /// list.  A failure between them strands an outgoing-only record.
    pub async fn send_friend_request(
        &mut self,
        store: &dyn KeyValueStore,
        target: &str,
    ) -> OpOutcome {
        if target == self.username {
            return OpOutcome::fail("Invalid request");
        }
        if self.is_friend(target) {
            return OpOutcome::fail("Already friends with this user");
        }
        if self.has_sent_request(target) {
            return OpOutcome::fail("Friend request already sent");
        }

        match self.try_send(store, target).await {
            Ok(outcome) => outcome,
            Err(e) => {
                mlog!(
                    "friend-request: send to {} failed: {}",
                    logging::user_tag(target),
                    e
                );
                OpOutcome::fail("Error sending request")
            }
        }
    }

    async fn try_send(
        &mut self,
        store: &dyn KeyValueStore,
        target: &str,
    ) -> Result<OpOutcome, StoreError> {
        if !directory::user_exists(store, target).await? {
            return Ok(OpOutcome::fail("User not found"));
        }

        let now = Utc::now();

        // A stale rejected record to the same target is replaced, not
        // accumulated, so a resend after rejection starts clean.
        let mut outgoing = self.outgoing.clone();
        outgoing.retain(|r| r.username != target);
        outgoing.push(FriendRequest::pending(target, now));

        let their_incoming_key = friend_requests_key(target);
        let mut their_incoming: Vec<FriendRequest> =
            decode_list(&their_incoming_key, store.get(&their_incoming_key).await?)?;
        their_incoming.push(FriendRequest::pending(&self.username, now));

        let my_key = sent_requests_key(&self.username);
        let steps = vec![
            step(&my_key, &outgoing)?,
            step(&their_incoming_key, &their_incoming)?,
        ];

        self.outgoing = outgoing;
        commit(store, steps).await?;

        mlog!(
            "friend-request: {} -> {}",
            logging::user_tag(&self.username),
            logging::user_tag(target)
        );
        Ok(OpOutcome::ok("Friend request sent!"))
    }

    /// Accept the incoming request from `from`: write the symmetric Friend
    /// pair, then clear the request pair.  Four writes in order (accepter's
    /// friends, sender's friends, accepter's incoming, sender's outgoing),
    /// plus two more when a counter-request from the accepter existed, so no
    /// pending ghost survives a mutual handshake.
    pub async fn accept_friend_request(
        &mut self,
        store: &dyn KeyValueStore,
        from: &str,
    ) -> OpOutcome {
        match self.try_accept(store, from).await {
            Ok(outcome) => outcome,
            Err(e) => {
                mlog!(
                    "friend-accept: from {} failed: {}",
                    logging::user_tag(from),
                    e
                );
                OpOutcome::fail("Error accepting request")
            }
        }
    }

    async fn try_accept(
        &mut self,
        store: &dyn KeyValueStore,
        from: &str,
    ) -> Result<OpOutcome, StoreError> {
        let now = Utc::now();

        let mut friends = self.friends.clone();
        friends.push(Friend {
            username: from.to_string(),
            added_at: now,
        });

        let their_friends_key = friends_key(from);
        let mut their_friends: Vec<Friend> =
            decode_list(&their_friends_key, store.get(&their_friends_key).await?)?;
        their_friends.push(Friend {
            username: self.username.clone(),
            added_at: now,
        });

        let mut incoming = self.incoming.clone();
        incoming.retain(|r| r.username != from);

        let their_sent_key = sent_requests_key(from);
        let mut their_sent: Vec<FriendRequest> =
            decode_list(&their_sent_key, store.get(&their_sent_key).await?)?;
        their_sent.retain(|r| r.username != self.username);

        let my_friends_key = friends_key(&self.username);
        let my_incoming_key = friend_requests_key(&self.username);
        let mut steps = vec![
            step(&my_friends_key, &friends)?,
            step(&their_friends_key, &their_friends)?,
            step(&my_incoming_key, &incoming)?,
            step(&their_sent_key, &their_sent)?,
        ];

        // Mutual-request handshake: if the accepter had their own request
        // out to `from`, retire it on both sides now that the friendship
        // exists.
        let mut outgoing = self.outgoing.clone();
        if outgoing.iter().any(|r| r.username == from) {
            outgoing.retain(|r| r.username != from);
            let their_incoming_key = friend_requests_key(from);
            let mut their_incoming: Vec<FriendRequest> =
                decode_list(&their_incoming_key, store.get(&their_incoming_key).await?)?;
            their_incoming.retain(|r| r.username != self.username);
            steps.push(step(&sent_requests_key(&self.username), &outgoing)?);
            steps.push(step(&their_incoming_key, &their_incoming)?);
        }

        self.friends = friends;
        self.incoming = incoming;
        self.outgoing = outgoing;
        commit(store, steps).await?;

        mlog!(
            "friend-accept: {} <- {}",
            logging::user_tag(&self.username),
            logging::user_tag(from)
        );
        Ok(OpOutcome::ok("Friend request accepted!"))
    }

    /// Reject the incoming request from `from`: the incoming record is
    /// deleted, the sender's outgoing record is rewritten to `rejected` in
    /// place: kept as history, excluded from pending checks, and no bar to
    /// a fresh request later.
    pub async fn reject_friend_request(
        &mut self,
        store: &dyn KeyValueStore,
        from: &str,
    ) -> OpOutcome {
        match self.try_reject(store, from).await {
            Ok(outcome) => outcome,
            Err(e) => {
                mlog!(
                    "friend-reject: from {} failed: {}",
                    logging::user_tag(from),
                    e
                );
                OpOutcome::fail("Error rejecting request")
            }
        }
    }

    async fn try_reject(
        &mut self,
        store: &dyn KeyValueStore,
        from: &str,
    ) -> Result<OpOutcome, StoreError> {
        let mut incoming = self.incoming.clone();
        incoming.retain(|r| r.username != from);

        let their_sent_key = sent_requests_key(from);
        let mut their_sent: Vec<FriendRequest> =
            decode_list(&their_sent_key, store.get(&their_sent_key).await?)?;
        for r in their_sent.iter_mut() {
            if r.username == self.username {
                r.status = RequestStatus::Rejected;
            }
        }

        let my_incoming_key = friend_requests_key(&self.username);
        let steps = vec![
            step(&my_incoming_key, &incoming)?,
            step(&their_sent_key, &their_sent)?,
        ];

        self.incoming = incoming;
        commit(store, steps).await?;

        mlog!(
            "friend-reject: {} x {}",
            logging::user_tag(&self.username),
            logging::user_tag(from)
        );
        Ok(OpOutcome::ok("Friend request rejected"))
    }

    /// Remove the friendship with `target` from both sides (two writes).
    /// Removing someone who is not a friend is a no-op that still reports
    /// success.
    pub async fn remove_friend(&mut self, store: &dyn KeyValueStore, target: &str) -> OpOutcome {
        match self.try_remove(store, target).await {
            Ok(outcome) => outcome,
            Err(e) => {
                mlog!(
                    "friend-remove: {} failed: {}",
                    logging::user_tag(target),
                    e
                );
                OpOutcome::fail("Error removing friend")
            }
        }
    }

    async fn try_remove(
        &mut self,
        store: &dyn KeyValueStore,
        target: &str,
    ) -> Result<OpOutcome, StoreError> {
        let mut friends = self.friends.clone();
        friends.retain(|f| f.username != target);

        let their_friends_key = friends_key(target);
        let mut their_friends: Vec<Friend> =
            decode_list(&their_friends_key, store.get(&their_friends_key).await?)?;
        their_friends.retain(|f| f.username != self.username);

        let my_friends_key = friends_key(&self.username);
        let steps = vec![
            step(&my_friends_key, &friends)?,
            step(&their_friends_key, &their_friends)?,
        ];

        self.friends = friends;
        commit(store, steps).await?;

        mlog!(
            "friend-remove: {} - {}",
            logging::user_tag(&self.username),
            logging::user_tag(target)
        );
        Ok(OpOutcome::ok("Friend removed"))
    }
}
