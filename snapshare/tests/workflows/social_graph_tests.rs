use super::support::*;

use snapshare::services::MissingSide;

#[tokio::test]
async fn follow_records_both_sides_and_notifies_target() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;

    t.app.graph().follow(&u1.id, &u2.id).await.expect("follow");

    let target = t.profile(&u2.id).await;
    let actor = t.profile(&u1.id).await;
    assert_eq!(target.followers, vec![u1.id.clone()]);
    assert_eq!(actor.following, vec![u2.id.clone()]);

    let notifications = t.app.notifications().list(&u2.id).await.expect("list");
    assert_eq!(notifications.len(), 1);
    let notification = &notifications[0];
    assert_eq!(notification.recipient_id, u2.id);
    assert_eq!(notification.sender_id, u1.id);
    assert_eq!(notification.kind, NotificationKind::Follow);
    assert_eq!(notification.message, "U1 started following you");
    assert_eq!(notification.sender.username, "u1");
    assert!(!notification.read);

    assert!(t.app.notifications().list(&u1.id).await.expect("list").is_empty());
}

#[tokio::test]
async fn unfollow_removes_both_sides() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let graph = t.app.graph();

    graph.follow(&u1.id, &u2.id).await.expect("follow");
    graph.unfollow(&u1.id, &u2.id).await.expect("unfollow");

    assert!(t.profile(&u2.id).await.followers.is_empty());
    assert!(t.profile(&u1.id).await.following.is_empty());
    assert!(!graph.is_following(&u1.id, &u2.id).await.expect("is following"));
}

#[tokio::test]
async fn repeated_follow_keeps_a_single_entry() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let graph = t.app.graph();

    graph.follow(&u1.id, &u2.id).await.expect("first follow");
    graph.follow(&u1.id, &u2.id).await.expect("second follow");

    assert_eq!(t.profile(&u2.id).await.followers, vec![u1.id.clone()]);
    assert_eq!(t.profile(&u1.id).await.following, vec![u2.id.clone()]);
}

#[tokio::test]
async fn toggle_follow_flips_the_edge() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let graph = t.app.graph();

    assert!(graph.toggle_follow(&u1.id, &u2.id).await.expect("toggle on"));
    assert!(graph.is_following(&u1.id, &u2.id).await.expect("is following"));
    assert!(!graph.toggle_follow(&u1.id, &u2.id).await.expect("toggle off"));
    assert!(!graph.is_following(&u1.id, &u2.id).await.expect("is following"));
}

#[tokio::test]
async fn following_yourself_sends_no_notification() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;

    t.app.graph().follow(&u1.id, &u1.id).await.expect("self follow");

    let profile = t.profile(&u1.id).await;
    assert!(profile.is_followed_by(&u1.id));
    assert!(profile.is_following(&u1.id));
    assert!(t.app.notifications().list(&u1.id).await.expect("list").is_empty());
}

#[tokio::test]
async fn following_an_unknown_user_writes_nothing() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;

    let err = t.app.graph().follow(&u1.id, "ghost").await.expect_err("missing target");
    assert!(matches!(err, AppError::Store(_)));
    assert!(t.profile(&u1.id).await.following.is_empty());
    assert!(t.store.is_empty("notifications"));
}

#[tokio::test]
async fn following_as_an_unknown_user_writes_nothing() {
    let t = TestApp::new();
    let u2 = t.register("u2").await;

    let err = t.app.graph().follow("ghost", &u2.id).await.expect_err("missing actor");
    assert!(matches!(err, AppError::NotFound { what: "user", .. }));
    assert!(t.profile(&u2.id).await.followers.is_empty());
    assert!(t.app.graph().audit().await.expect("audit").is_empty());
    assert!(t.store.is_empty("notifications"));
}

#[tokio::test]
async fn followers_and_following_resolve_profiles() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let u3 = t.register("u3").await;
    let graph = t.app.graph();

    graph.follow(&u1.id, &u3.id).await.expect("follow");
    graph.follow(&u2.id, &u3.id).await.expect("follow");

    let followers: Vec<String> = graph
        .followers(&u3.id)
        .await
        .expect("followers")
        .into_iter()
        .map(|profile| profile.username)
        .collect();
    assert_eq!(followers, vec!["u1", "u2"]);

    let following = graph.following(&u1.id).await.expect("following");
    assert_eq!(following.len(), 1);
    assert_eq!(following[0].id, u3.id);
}

#[tokio::test]
async fn audit_finds_and_repair_completes_one_sided_edges() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let users = t.app.client().users();

    // An interrupted follow: only the followee side was written.
    users
        .update(&u2.id, &[FieldUpdate::array_union("followers", u1.id.as_str())])
        .await
        .expect("partial write");

    let graph = t.app.graph();
    let found = graph.audit().await.expect("audit");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].follower, u1.id);
    assert_eq!(found[0].followee, u2.id);
    assert_eq!(found[0].missing, MissingSide::Following);

    let repairs = graph.repair().await.expect("repair");
    assert_eq!(repairs.len(), 1);
    assert!(repairs[0].repaired);

    assert_eq!(t.profile(&u1.id).await.following, vec![u2.id.clone()]);
    assert!(graph.audit().await.expect("audit").is_empty());
}
