use super::support::*;

use std::collections::BTreeMap;

use snapshare::{
    Chat,
    services::{FALLBACK_USERNAME, SUGGESTION_LIMIT},
};

fn counts(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
    pairs.iter().map(|(id, n)| (id.to_string(), *n)).collect()
}

#[tokio::test]
async fn unread_counters_follow_send_and_open() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let chat_service = t.app.chat();

    let chat = chat_service.start_chat(&u1.id, &u2.id).await.expect("start chat");
    assert_eq!(chat.unread_counts, counts(&[(u1.id.as_str(), 0), (u2.id.as_str(), 0)]));

    chat_service.send_message(&u1.id, &chat.id, "hello").await.expect("send");
    let after_send = t.app.client().chats().get_or_error(&chat.id).await.expect("chat");
    assert_eq!(after_send.unread_counts, counts(&[(u1.id.as_str(), 0), (u2.id.as_str(), 1)]));

    let opened = chat_service.open_chat(&u2.id, &chat.id).await.expect("open");
    assert_eq!(opened.unread_for(&u2.id), 0);
    let after_open = t.app.client().chats().get_or_error(&chat.id).await.expect("chat");
    assert_eq!(after_open.unread_counts, counts(&[(u1.id.as_str(), 0), (u2.id.as_str(), 0)]));
}

#[tokio::test]
async fn send_message_updates_preview_and_history() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let chat_service = t.app.chat();
    let chat = chat_service.start_chat(&u1.id, &u2.id).await.expect("start chat");

    chat_service.send_message(&u1.id, &chat.id, "first").await.expect("send");
    tick().await;
    let second = chat_service
        .send_message(&u2.id, &chat.id, "  second  ")
        .await
        .expect("send");
    assert_eq!(second.text, "second");

    let stored = t.app.client().chats().get_or_error(&chat.id).await.expect("chat");
    let last = stored.last_message.clone().expect("preview");
    assert_eq!(last.text, "second");
    assert_eq!(last.sender_id, u2.id);
    assert_eq!(stored.updated_at, second.created_at);
    assert_eq!(stored.unread_for(&u1.id), 1);
    assert_eq!(stored.unread_for(&u2.id), 1);

    let texts: Vec<String> = chat_service
        .messages(&u1.id, &chat.id)
        .await
        .expect("messages")
        .into_iter()
        .map(|message| message.text)
        .collect();
    assert_eq!(texts, vec!["first", "second"]);
}

#[tokio::test]
async fn opening_a_read_chat_writes_nothing() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let chat_service = t.app.chat();
    let chat = chat_service.start_chat(&u1.id, &u2.id).await.expect("start chat");

    let mut view = chat_service.watch_chats(&u1.id).await.expect("watch");
    refreshed(&mut view).await;
    let revision = view.revision();

    chat_service.open_chat(&u1.id, &chat.id).await.expect("open");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!view.try_refresh());
    assert_eq!(view.revision(), revision);
}

#[tokio::test]
async fn start_chat_reuses_the_existing_conversation() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let chat_service = t.app.chat();

    let first = chat_service.start_chat(&u1.id, &u2.id).await.expect("start chat");
    let again = chat_service.start_chat(&u1.id, &u2.id).await.expect("start again");
    let reverse = chat_service.start_chat(&u2.id, &u1.id).await.expect("start reverse");

    assert_eq!(first.id, again.id);
    assert_eq!(first.id, reverse.id);
    assert_eq!(t.store.len("chats"), 1);
}

#[tokio::test]
async fn start_chat_rejects_self_and_unknown_users() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let chat_service = t.app.chat();

    let err = chat_service.start_chat(&u1.id, &u1.id).await.expect_err("self chat");
    assert!(matches!(err, AppError::InvalidRequest { .. }));

    let err = chat_service.start_chat(&u1.id, "ghost").await.expect_err("unknown user");
    assert!(matches!(err, AppError::NotFound { what: "user", .. }));
    assert!(t.store.is_empty("chats"));
}

#[tokio::test]
async fn outsiders_cannot_read_or_write_a_chat() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let u3 = t.register("u3").await;
    let chat_service = t.app.chat();
    let chat = chat_service.start_chat(&u1.id, &u2.id).await.expect("start chat");

    let err = chat_service
        .send_message(&u3.id, &chat.id, "hi")
        .await
        .expect_err("outsider send");
    assert!(matches!(err, AppError::Forbidden { .. }));
    let err = chat_service.messages(&u3.id, &chat.id).await.expect_err("outsider read");
    assert!(matches!(err, AppError::Forbidden { .. }));

    let err = chat_service
        .send_message(&u1.id, &chat.id, "   ")
        .await
        .expect_err("blank message");
    assert!(matches!(err, AppError::InvalidRequest { .. }));
}

#[tokio::test]
async fn only_the_sender_deletes_a_message() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let chat_service = t.app.chat();
    let chat = chat_service.start_chat(&u1.id, &u2.id).await.expect("start chat");
    let message = chat_service.send_message(&u1.id, &chat.id, "oops").await.expect("send");

    let err = chat_service
        .delete_message(&u2.id, &chat.id, &message.id)
        .await
        .expect_err("not the sender");
    assert!(matches!(err, AppError::Forbidden { .. }));

    chat_service
        .delete_message(&u1.id, &chat.id, &message.id)
        .await
        .expect("delete");
    assert!(chat_service.messages(&u1.id, &chat.id).await.expect("messages").is_empty());
}

#[tokio::test]
async fn chat_list_orders_by_activity_and_falls_back_for_missing_partners() {
    let t = TestApp::new();
    let u1 = t.register("u1").await;
    let u2 = t.register("u2").await;
    let u3 = t.register("u3").await;
    let chat_service = t.app.chat();

    let with_u2 = chat_service.start_chat(&u1.id, &u2.id).await.expect("chat u2");
    tick().await;
    let with_u3 = chat_service.start_chat(&u1.id, &u3.id).await.expect("chat u3");
    tick().await;

    let stale = with_u3.created_at - chrono::Duration::days(1);
    t.app
        .client()
        .chats()
        .set(&Chat {
            id: "orphaned".to_string(),
            participants: vec![u1.id.clone(), "deleted-user".to_string()],
            last_message: None,
            unread_counts: BTreeMap::new(),
            created_at: stale,
            updated_at: stale,
        })
        .await
        .expect("orphaned chat");

    chat_service.send_message(&u2.id, &with_u2.id, "ping").await.expect("send");

    let list = chat_service.chat_list(&u1.id).await.expect("chat list");
    let order: Vec<&str> = list.iter().map(|summary| summary.chat.id.as_str()).collect();
    assert_eq!(order, vec![with_u2.id.as_str(), with_u3.id.as_str(), "orphaned"]);

    assert_eq!(list[0].other_username, "u2");
    assert_eq!(list[0].unread, 1);
    assert_eq!(list[1].other_id, u3.id);
    assert_eq!(list[2].other_username, FALLBACK_USERNAME);
    assert_eq!(list[2].other_photo_url, "");
}

#[tokio::test]
async fn suggestions_skip_existing_chats_and_are_capped() {
    let t = TestApp::new();
    let viewer = t.register("viewer").await;
    let graph = t.app.graph();

    let mut contacts = Vec::new();
    for n in 0..SUGGESTION_LIMIT + 2 {
        let contact = t.register(&format!("contact{n}")).await;
        graph.follow(&contact.id, &viewer.id).await.expect("follow viewer");
        contacts.push(contact);
    }
    // Mutual follow must not produce a duplicate suggestion.
    graph.follow(&viewer.id, &contacts[1].id).await.expect("follow back");
    t.app
        .chat()
        .start_chat(&viewer.id, &contacts[0].id)
        .await
        .expect("existing chat");

    let suggestions = t.app.chat().suggestions(&viewer.id).await.expect("suggestions");
    assert_eq!(suggestions.len(), SUGGESTION_LIMIT);
    assert!(suggestions.iter().all(|profile| profile.id != contacts[0].id));
    assert!(suggestions.iter().all(|profile| profile.id != viewer.id));
    let mutual = suggestions.iter().filter(|profile| profile.id == contacts[1].id).count();
    assert_eq!(mutual, 1);
}
