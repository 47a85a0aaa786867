use super::*;
use crate::history::Member;
use crate::relations::testing::{FakeHistory, MessageExt, alice, bob, carol, msg, tracked};
use std::sync::atomic::Ordering;

#[test]
fn test_cursor_tracks_distinct_speakers() {
    let (a, b) = (MemberId(1), MemberId(2));
    let mut cursor = SpeakerCursor::new();
    assert_eq!(cursor.advance(a), None);
    assert_eq!(cursor.advance(a), None);
    assert_eq!(cursor.advance(b), Some(a));
    assert_eq!(cursor.advance(b), Some(a));
    assert_eq!(cursor.advance(a), Some(b));
}

#[test]
fn test_cursor_never_points_at_current_author() {
    let ids = [1, 1, 2, 2, 2, 3, 1, 1];
    let mut cursor = SpeakerCursor::new();
    for id in ids {
        let author = MemberId(id);
        if let Some(previous) = cursor.advance(author) {
            assert_ne!(previous, author);
        }
    }
}

#[test]
fn test_cursor_holds_through_bursts() {
    let mut cursor = SpeakerCursor::new();
    cursor.advance(MemberId(1));
    cursor.advance(MemberId(2));
    assert_eq!(cursor.advance(MemberId(2)), Some(MemberId(1)));
    assert_eq!(cursor.advance(MemberId(2)), Some(MemberId(1)));
}

#[tokio::test]
async fn test_plain_message_targets_previous_speaker() {
    let members = tracked(&[alice(), bob()]);
    let source = FakeHistory::new();
    let resolver = TargetResolver::new(&members, &source);

    let m = msg(2, 1, &bob(), "hello");
    let targets = resolver.resolve(&m, Some(alice().id)).await.unwrap();
    assert_eq!(targets, vec![alice().id]);

    let targets = resolver.resolve(&m, None).await.unwrap();
    assert!(targets.is_empty());
}

#[tokio::test]
async fn test_cached_reply_wins_over_previous_speaker() {
    let members = tracked(&[alice(), bob(), carol()]);
    let source = FakeHistory::new();
    let resolver = TargetResolver::new(&members, &source);

    let original = msg(1, 1, &alice(), "hi");
    let reply = msg(3, 1, &bob(), "hey!").replying_to(&original, true);
    let targets = resolver.resolve(&reply, Some(carol().id)).await.unwrap();
    assert_eq!(targets, vec![alice().id]);
    assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_uncached_reply_is_fetched() {
    let members = tracked(&[alice(), bob()]);
    let original = msg(1, 1, &alice(), "hi");
    let source = FakeHistory::new().with_channel(1, "general", vec![original.clone()]);
    let resolver = TargetResolver::new(&members, &source);

    let reply = msg(2, 1, &bob(), "hey!").replying_to(&original, false);
    let targets = resolver.resolve(&reply, None).await.unwrap();
    assert_eq!(targets, vec![alice().id]);
    assert_eq!(source.fetch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reply_to_deleted_message_yields_no_fallback() {
    let members = tracked(&[alice(), bob()]);
    let original = msg(1, 1, &alice(), "hi");
    let source = FakeHistory::new().missing(1);
    let resolver = TargetResolver::new(&members, &source);

    let reply = msg(2, 1, &bob(), "hey!").replying_to(&original, false);
    let targets = resolver.resolve(&reply, Some(alice().id)).await.unwrap();
    assert!(targets.is_empty());
}

#[tokio::test]
async fn test_reply_fetch_failure_surfaces() {
    let members = tracked(&[alice(), bob()]);
    let original = msg(1, 1, &alice(), "hi");
    let source = FakeHistory::new().fetch_error(1);
    let resolver = TargetResolver::new(&members, &source);

    let reply = msg(2, 1, &bob(), "hey!").replying_to(&original, false);
    let err = resolver.resolve(&reply, None).await.unwrap_err();
    assert!(matches!(
        err,
        RelmapError::ReplyFetch {
            channel_id: 1,
            message_id: 1,
            ..
        }
    ));
}

#[tokio::test]
async fn test_reply_to_untracked_author_yields_nothing() {
    let outsider = Member::new(99, "Mallory");
    let members = tracked(&[alice(), bob()]);
    let source = FakeHistory::new();
    let resolver = TargetResolver::new(&members, &source);

    let original = msg(1, 1, &outsider, "spam");
    let reply = msg(2, 1, &bob(), "no").replying_to(&original, true);
    let targets = resolver.resolve(&reply, Some(alice().id)).await.unwrap();
    assert!(targets.is_empty());
}

#[tokio::test]
async fn test_mentions_are_additive_with_fallback() {
    let members = tracked(&[alice(), bob(), carol()]);
    let source = FakeHistory::new();
    let resolver = TargetResolver::new(&members, &source);

    let m = msg(3, 1, &carol(), "@Alice thanks").mentioning(&[alice()]);
    let targets = resolver.resolve(&m, Some(bob().id)).await.unwrap();
    assert_eq!(targets, vec![bob().id, alice().id]);
}

#[tokio::test]
async fn test_duplicate_targets_are_suppressed() {
    let members = tracked(&[alice(), bob(), carol()]);
    let source = FakeHistory::new();
    let resolver = TargetResolver::new(&members, &source);

    let original = msg(1, 1, &alice(), "hi");
    let m = msg(4, 1, &carol(), "@Alice @Alice @Bob")
        .replying_to(&original, true)
        .mentioning(&[alice(), alice(), bob(), bob()]);
    let targets = resolver.resolve(&m, None).await.unwrap();
    assert_eq!(targets, vec![alice().id, bob().id]);
}

#[tokio::test]
async fn test_self_mention_and_untracked_mentions_are_ignored() {
    let members = tracked(&[alice(), bob()]);
    let source = FakeHistory::new();
    let resolver = TargetResolver::new(&members, &source);

    let m = msg(1, 1, &alice(), "me and @Mallory")
        .mentioning(&[alice(), Member::new(99, "Mallory")]);
    let targets = resolver.resolve(&m, None).await.unwrap();
    assert!(targets.is_empty());
}
