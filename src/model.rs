//! Persisted data shapes.
//!
//! Every value read from the store deserializes into one of these structs.
//! The wire format is the original JSON layout (camelCase timestamps,
//! optional `front`/`back` image fields); in memory the shapes are strict:
//! request status is a closed enum and a post's images are a sum type, so
//! "at least one angle, possibly both" is not representable any other way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Directory entry and session record.  The password never leaves the
/// session/signup boundary; anything user-facing gets a [`UserHandle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password: String,
}

/// A username on its own, as returned by directory search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserHandle {
    pub username: String,
}

/// One edge of a (symmetric) friendship, stored under the owning user's
/// `friends_{username}` key.  The mirrored entry lives under the other
/// user's key and is maintained by paired writes, never atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub username: String,
    #[serde(rename = "addedAt")]
    pub added_at: DateTime<Utc>,
}

/// Friend request state.  `Rejected` records are kept on the sender's side
/// as history; they no longer count as pending anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Rejected,
}

/// One half of a logical friend request.  The `username` field names the
/// counterparty: the sender in an incoming list, the recipient in an
/// outgoing list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub username: String,
    #[serde(rename = "sentAt")]
    pub sent_at: DateTime<Utc>,
    pub status: RequestStatus,
}

impl FriendRequest {
    pub fn pending(username: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            username: username.into(),
            sent_at,
            status: RequestStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Post author reference.  Stored posts may carry `user: null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostAuthor {
    pub username: String,
}

/// The image payload of a post: front camera, back camera, or both.
/// A post with neither angle is not a post and fails validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostImages {
    FrontOnly(String),
    BackOnly(String),
    Both { front: String, back: String },
}

impl PostImages {
    /// Assemble from the two optional wire fields; `None` when both are
    /// absent.
    pub fn from_parts(front: Option<String>, back: Option<String>) -> Option<Self> {
        match (front, back) {
            (Some(front), Some(back)) => Some(PostImages::Both { front, back }),
            (Some(front), None) => Some(PostImages::FrontOnly(front)),
            (None, Some(back)) => Some(PostImages::BackOnly(back)),
            (None, None) => None,
        }
    }

    pub fn front(&self) -> Option<&str> {
        match self {
            PostImages::FrontOnly(front) | PostImages::Both { front, .. } => Some(front),
            PostImages::BackOnly(_) => None,
        }
    }

    pub fn back(&self) -> Option<&str> {
        match self {
            PostImages::BackOnly(back) | PostImages::Both { back, .. } => Some(back),
            PostImages::FrontOnly(_) => None,
        }
    }
}

/// A timestamped post in the global `photos` collection.  Append-only:
/// never mutated after creation; feeds are computed views over this data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPost", into = "RawPost")]
pub struct Post {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<PostAuthor>,
    pub images: PostImages,
}

impl Post {
    pub fn author_username(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.username.as_str())
    }
}

/// Wire-format mirror of [`Post`]: independently optional image fields.
#[derive(Serialize, Deserialize)]
struct RawPost {
    id: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    user: Option<PostAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    front: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    back: Option<String>,
}

impl TryFrom<RawPost> for Post {
    type Error = String;

    fn try_from(raw: RawPost) -> Result<Self, Self::Error> {
        let images = PostImages::from_parts(raw.front, raw.back)
            .ok_or_else(|| format!("post {} has neither a front nor a back image", raw.id))?;
        Ok(Post {
            id: raw.id,
            created_at: raw.created_at,
            author: raw.user,
            images,
        })
    }
}

impl From<Post> for RawPost {
    fn from(post: Post) -> Self {
        let front = post.images.front().map(str::to_string);
        let back = post.images.back().map(str::to_string);
        RawPost {
            id: post.id,
            created_at: post.created_at,
            user: post.author,
            front,
            back,
        }
    }
}

/// Structured result of a mutating operation.  Mutators report validation
/// and storage failures through this shape instead of erroring, so event
/// handlers can surface the message directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpOutcome {
    pub success: bool,
    pub message: String,
}

impl OpOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
