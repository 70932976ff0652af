use super::support::*;

#[tokio::test]
async fn home_feed_view_receives_new_posts() {
    let t = TestApp::new();
    let alice = t.register("alice").await;
    let first = t.post_as(&alice.id, "first").await;

    let mut feed = t.app.feed().watch_home_feed().await.expect("watch");
    refreshed(&mut feed).await;
    assert_eq!(feed.items().len(), 1);
    assert_eq!(feed.items()[0].id, first.id);

    tick().await;
    let second = t.post_as(&alice.id, "second").await;
    refreshed(&mut feed).await;
    let ids: Vec<&str> = feed.items().iter().map(|post| post.id.as_str()).collect();
    assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
}

#[tokio::test]
async fn profile_view_ignores_other_authors() {
    let t = TestApp::new();
    let alice = t.register("alice").await;
    let bob = t.register("bob").await;

    let mut view = t.app.feed().watch_profile_posts(&alice.id).await.expect("watch");
    refreshed(&mut view).await;
    assert!(view.items().is_empty());

    t.post_as(&bob.id, "not alice").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!view.try_refresh());

    t.post_as(&alice.id, "alice").await;
    refreshed(&mut view).await;
    assert_eq!(view.items().len(), 1);
    assert_eq!(view.items()[0].user_id, alice.id);
}

#[tokio::test]
async fn chat_list_view_moves_active_chats_to_the_top() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let u3 = t.register("u3").await;
    let chat = t.app.chat();

    let with_u2 = chat.start_chat(&u1.id, &u2.id).await.expect("chat u2");
    tick().await;
    let with_u3 = chat.start_chat(&u1.id, &u3.id).await.expect("chat u3");

    let mut view = chat.watch_chats(&u1.id).await.expect("watch");
    refreshed(&mut view).await;
    let order: Vec<&str> = view.items().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(order, vec![with_u3.id.as_str(), with_u2.id.as_str()]);

    tick().await;
    chat.send_message(&u2.id, &with_u2.id, "bump").await.expect("send");
    refreshed(&mut view).await;
    let order: Vec<&str> = view.items().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(order, vec![with_u2.id.as_str(), with_u3.id.as_str()]);
    assert_eq!(view.items()[0].unread_for(&u1.id), 1);
}

#[tokio::test]
async fn message_view_lists_oldest_first() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let chat = t.app.chat();
    let conversation = chat.start_chat(&u1.id, &u2.id).await.expect("start");

    let mut view = chat.watch_messages(&u2.id, &conversation.id).await.expect("watch");
    refreshed(&mut view).await;
    assert!(view.items().is_empty());

    chat.send_message(&u1.id, &conversation.id, "one").await.expect("send");
    refreshed(&mut view).await;
    tick().await;
    chat.send_message(&u2.id, &conversation.id, "two").await.expect("send");
    refreshed(&mut view).await;

    let texts: Vec<&str> = view.items().iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two"]);
}

#[tokio::test]
async fn notification_view_shows_new_follows() {
    let t = TestApp::new();
    let alice = t.register("alice").await;
    let bob = t.register("bob").await;

    let mut view = t.app.notifications().watch(&alice.id).await.expect("watch");
    refreshed(&mut view).await;
    assert!(view.items().is_empty());

    t.app.graph().follow(&bob.id, &alice.id).await.expect("follow");
    refreshed(&mut view).await;
    assert_eq!(view.items().len(), 1);
    assert_eq!(view.items()[0].kind, NotificationKind::Follow);
}

#[tokio::test]
async fn closed_view_keeps_its_last_list() {
    let t = TestApp::new();
    let alice = t.register("alice").await;
    t.post_as(&alice.id, "kept").await;

    let mut feed = t.app.feed().watch_home_feed().await.expect("watch");
    refreshed(&mut feed).await;
    feed.close();
    assert!(!feed.is_open());

    t.post_as(&alice.id, "unseen").await;
    assert!(!feed.refresh().await.expect("refresh"));
    assert_eq!(feed.items().len(), 1);
}
