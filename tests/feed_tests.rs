//! Integration tests for feed composition: the friend filter, the
//! calendar-day window, and ordering.

use chrono::{DateTime, Utc};
use moment::feed::{compose_explore_in, compose_feed_in};
use moment::model::{Friend, Post, PostAuthor, PostImages};

fn post(id: &str, created_at: &str, author: Option<&str>) -> Post {
    Post {
        id: id.to_string(),
        created_at: created_at.parse().unwrap(),
        author: author.map(|u| PostAuthor {
            username: u.to_string(),
        }),
        images: PostImages::Both {
            front: format!("front:{id}"),
            back: format!("back:{id}"),
        },
    }
}

fn friend(username: &str) -> Friend {
    Friend {
        username: username.to_string(),
        added_at: "2026-01-01T00:00:00Z".parse().unwrap(),
    }
}

fn ids(posts: &[Post]) -> Vec<&str> {
    posts.iter().map(|p| p.id.as_str()).collect()
}

#[tokio::test]
async fn feed_shows_only_todays_posts_from_self_and_friends() {
    // Viewer alice; bob is NOT a friend.  Only alice's post from today
    // survives the filter.
    let reference: DateTime<Utc> = "2026-08-07T12:00:00Z".parse().unwrap();
    let posts = vec![
        post("1", "2026-08-07T08:00:00Z", Some("alice")),
        post("2", "2026-08-06T08:00:00Z", Some("alice")),
        post("3", "2026-08-07T09:00:00Z", Some("bob")),
    ];

    let feed = compose_feed_in(&posts, "alice", &[], reference, &Utc);
    assert_eq!(ids(&feed), ["1"]);

    // With bob befriended, his post appears too, newest first.
    let feed = compose_feed_in(&posts, "alice", &[friend("bob")], reference, &Utc);
    assert_eq!(ids(&feed), ["3", "1"]);
}

#[tokio::test]
async fn feed_is_recomputed_per_call_not_cached() {
    let reference: DateTime<Utc> = "2026-08-07T12:00:00Z".parse().unwrap();
    let mut posts = vec![post("1", "2026-08-07T08:00:00Z", Some("alice"))];

    let first = compose_feed_in(&posts, "alice", &[], reference, &Utc);
    assert_eq!(ids(&first), ["1"]);

    // A post appended after the first composition shows up on the next
    // call over the same inputs.
    posts.push(post("2", "2026-08-07T10:00:00Z", Some("alice")));
    let second = compose_feed_in(&posts, "alice", &[], reference, &Utc);
    assert_eq!(ids(&second), ["2", "1"]);
}

#[tokio::test]
async fn feed_window_rolls_over_at_midnight_not_24_hours() {
    let posts = vec![post("late", "2026-08-06T23:59:00Z", Some("alice"))];

    // One minute after posting: visible.
    let before_midnight: DateTime<Utc> = "2026-08-06T23:59:59Z".parse().unwrap();
    assert_eq!(
        compose_feed_in(&posts, "alice", &[], before_midnight, &Utc).len(),
        1
    );

    // Two minutes after posting, but past midnight: gone, even though far
    // less than 24 hours have elapsed.
    let after_midnight: DateTime<Utc> = "2026-08-07T00:01:00Z".parse().unwrap();
    assert_eq!(
        compose_feed_in(&posts, "alice", &[], after_midnight, &Utc).len(),
        0
    );
}

#[tokio::test]
async fn explore_is_unfiltered_but_still_windowed() {
    let reference: DateTime<Utc> = "2026-08-07T12:00:00Z".parse().unwrap();
    let posts = vec![
        post("stranger", "2026-08-07T07:00:00Z", Some("mallory")),
        post("anonymous", "2026-08-07T08:00:00Z", None),
        post("yesterday", "2026-08-06T08:00:00Z", Some("mallory")),
    ];

    let explore = compose_explore_in(&posts, reference, &Utc);
    assert_eq!(ids(&explore), ["anonymous", "stranger"]);

    // The primary feed drops the author-less post even for a matching day.
    let feed = compose_feed_in(&posts, "alice", &[friend("mallory")], reference, &Utc);
    assert_eq!(ids(&feed), ["stranger"]);
}

#[tokio::test]
async fn ordering_is_stable_for_equal_timestamps() {
    let reference: DateTime<Utc> = "2026-08-07T12:00:00Z".parse().unwrap();
    let posts = vec![
        post("a", "2026-08-07T09:00:00Z", Some("alice")),
        post("b", "2026-08-07T09:00:00Z", Some("alice")),
        post("newer", "2026-08-07T10:00:00Z", Some("alice")),
        post("c", "2026-08-07T09:00:00Z", Some("alice")),
    ];

    let feed = compose_feed_in(&posts, "alice", &[], reference, &Utc);
    assert_eq!(ids(&feed), ["newer", "a", "b", "c"]);
}
