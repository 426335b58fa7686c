//! Feed composition: the filtered, time-windowed, ordered view of posts.
//!
//! A feed is computed fresh on every call from the global post collection —
//! nothing is cached or resumable.  "Today" means the same calendar date as
//! the reference instant in the observer's time zone, not a rolling 24-hour
//! window, so the visible set rolls over at local midnight.
//!
//! Ordering is newest-first by `createdAt`.  Stored timestamps are RFC 3339
//! UTC strings, for which chronological order and lexicographic order
//! coincide; the sort is explicitly stable, so posts sharing an instant keep
//! their insertion order.

use std::collections::HashSet;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::model::{Friend, Post};

/// Whether two instants fall on the same calendar date in `tz`.
fn same_calendar_day<Tz: TimeZone>(a: DateTime<Utc>, b: DateTime<Utc>, tz: &Tz) -> bool {
    a.with_timezone(tz).date_naive() == b.with_timezone(tz).date_naive()
}

fn sorted_newest_first(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    posts
}

/// The primary feed for `viewer`: today's posts authored by the viewer or
/// one of their friends, newest first.  Posts without an author never match.
pub fn compose_feed(
    posts: &[Post],
    viewer: &str,
    friends: &[Friend],
    reference: DateTime<Utc>,
) -> Vec<Post> {
    compose_feed_in(posts, viewer, friends, reference, &Local)
}

/// [`compose_feed`] with an explicit time zone for the day boundary.
pub fn compose_feed_in<Tz: TimeZone>(
    posts: &[Post],
    viewer: &str,
    friends: &[Friend],
    reference: DateTime<Utc>,
    tz: &Tz,
) -> Vec<Post> {
    let friend_usernames: HashSet<&str> =
        friends.iter().map(|f| f.username.as_str()).collect();

    let kept = posts
        .iter()
        .filter(|p| same_calendar_day(p.created_at, reference, tz))
        .filter(|p| {
            p.author_username()
                .is_some_and(|author| author == viewer || friend_usernames.contains(author))
        })
        .cloned()
        .collect();

    sorted_newest_first(kept)
}

/// The unfiltered browse variant: every post from today, regardless of
/// author, newest first.
pub fn compose_explore(posts: &[Post], reference: DateTime<Utc>) -> Vec<Post> {
    compose_explore_in(posts, reference, &Local)
}

/// [`compose_explore`] with an explicit time zone for the day boundary.
pub fn compose_explore_in<Tz: TimeZone>(
    posts: &[Post],
    reference: DateTime<Utc>,
    tz: &Tz,
) -> Vec<Post> {
    let kept = posts
        .iter()
        .filter(|p| same_calendar_day(p.created_at, reference, tz))
        .cloned()
        .collect();

    sorted_newest_first(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PostAuthor, PostImages};
    use chrono::FixedOffset;

    fn post(id: &str, created_at: &str, author: Option<&str>) -> Post {
        Post {
            id: id.to_string(),
            created_at: created_at.parse().unwrap(),
            author: author.map(|u| PostAuthor {
                username: u.to_string(),
            }),
            images: PostImages::FrontOnly(format!("data:{id}")),
        }
    }

    fn friend(username: &str) -> Friend {
        Friend {
            username: username.to_string(),
            added_at: "2026-01-01T00:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn day_boundary_is_calendar_date_not_rolling_window() {
        let reference: DateTime<Utc> = "2026-08-07T00:10:00Z".parse().unwrap();
        // 30 minutes earlier, but yesterday.
        let late_last_night = post("1", "2026-08-06T23:40:00Z", Some("alice"));
        // 23 hours later on the same date.
        let tonight = post("2", "2026-08-07T23:10:00Z", Some("alice"));

        let feed = compose_feed_in(
            &[late_last_night, tonight],
            "alice",
            &[],
            reference,
            &Utc,
        );
        assert_eq!(feed.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), ["2"]);
    }

    #[test]
    fn day_boundary_respects_the_observer_zone() {
        // 23:30 UTC on the 6th is already the 7th at UTC+2.
        let reference: DateTime<Utc> = "2026-08-07T10:00:00Z".parse().unwrap();
        let p = post("1", "2026-08-06T23:30:00Z", Some("alice"));

        let east = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(compose_feed_in(&[p.clone()], "alice", &[], reference, &east).len(), 1);
        assert_eq!(compose_feed_in(&[p], "alice", &[], reference, &Utc).len(), 0);
    }

    #[test]
    fn feed_keeps_only_viewer_and_friend_posts() {
        let reference: DateTime<Utc> = "2026-08-07T12:00:00Z".parse().unwrap();
        let posts = vec![
            post("mine", "2026-08-07T08:00:00Z", Some("alice")),
            post("friends", "2026-08-07T09:00:00Z", Some("bob")),
            post("strangers", "2026-08-07T10:00:00Z", Some("mallory")),
            post("anon", "2026-08-07T11:00:00Z", None),
        ];

        let feed = compose_feed_in(&posts, "alice", &[friend("bob")], reference, &Utc);
        assert_eq!(
            feed.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            ["friends", "mine"]
        );
    }

    #[test]
    fn feed_is_newest_first() {
        let reference: DateTime<Utc> = "2026-08-07T12:00:00Z".parse().unwrap();
        let posts = vec![
            post("oldest", "2026-08-07T06:00:00Z", Some("alice")),
            post("newest", "2026-08-07T11:00:00Z", Some("alice")),
            post("middle", "2026-08-07T09:00:00Z", Some("alice")),
        ];

        let feed = compose_feed_in(&posts, "alice", &[], reference, &Utc);
        assert_eq!(
            feed.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            ["newest", "middle", "oldest"]
        );
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let reference: DateTime<Utc> = "2026-08-07T12:00:00Z".parse().unwrap();
        let posts = vec![
            post("first", "2026-08-07T09:00:00Z", Some("alice")),
            post("second", "2026-08-07T09:00:00Z", Some("alice")),
            post("third", "2026-08-07T09:00:00Z", Some("alice")),
        ];

        let feed = compose_feed_in(&posts, "alice", &[], reference, &Utc);
        assert_eq!(
            feed.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            ["first", "second", "third"]
        );
    }

    #[test]
    fn explore_ignores_authorship_but_not_the_day() {
        let reference: DateTime<Utc> = "2026-08-07T12:00:00Z".parse().unwrap();
        let posts = vec![
            post("stranger", "2026-08-07T08:00:00Z", Some("mallory")),
            post("anon", "2026-08-07T09:00:00Z", None),
            post("stale", "2026-08-01T09:00:00Z", Some("mallory")),
        ];

        let explore = compose_explore_in(&posts, reference, &Utc);
        assert_eq!(
            explore.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            ["anon", "stranger"]
        );
    }
}
