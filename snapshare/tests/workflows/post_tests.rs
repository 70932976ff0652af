use super::support::*;

#[tokio::test]
async fn create_post_uploads_then_saves_with_author_snapshot() {
    let t = TestApp::new();
    let alice = t.register("alice").await;

    let post = t
        .app
        .posts()
        .create_post(
            &alice.id,
            NewPost {
                caption: "  sunset  ".to_string(),
                image: Some(image("sunset.jpg")),
            },
        )
        .await
        .expect("create post");

    assert_eq!(post.caption, "sunset");
    assert_eq!(post.image_url, "memory://uploads/1/sunset.jpg");
    assert_eq!(post.user_id, alice.id);
    assert_eq!(post.user.username, "alice");
    assert!(post.likes.is_empty());
    assert_eq!(t.uploader.upload_count(), 1);

    let stored = t.app.posts().get(&post.id).await.expect("get").expect("stored");
    assert_eq!(stored, post);
}

#[tokio::test]
async fn create_post_requires_an_image() {
    let t = TestApp::new();
    let alice = t.register("alice").await;

    let err = t
        .app
        .posts()
        .create_post(
            &alice.id,
            NewPost {
                caption: "no picture".to_string(),
                image: None,
            },
        )
        .await
        .expect_err("missing image");
    assert_eq!(err.to_string(), "invalid request: Please select an image");
    assert!(t.store.is_empty("posts"));
    assert_eq!(t.uploader.upload_count(), 0);
}

#[tokio::test]
async fn failed_upload_writes_no_post() {
    let t = TestApp::with_uploader(MemoryUploader::failing("Upload failed"));
    let alice = t.register("alice").await;

    let err = t
        .app
        .posts()
        .create_post(
            &alice.id,
            NewPost {
                caption: "lost".to_string(),
                image: Some(image("lost.jpg")),
            },
        )
        .await
        .expect_err("upload rejected");
    assert!(matches!(err, AppError::Upload(_)));
    assert_eq!(err.to_string(), "upload failed: Upload failed");
    assert!(t.store.is_empty("posts"));
}

#[tokio::test]
async fn only_the_author_edits_or_deletes_a_post() {
    let t = TestApp::new();
    let alice = t.register("alice").await;
    let bob = t.register("bob").await;
    let post = t.post_as(&alice.id, "mine").await;
    let posts = t.app.posts();

    let err = posts.edit_caption(&bob.id, &post.id, "hijacked").await.expect_err("not author");
    assert!(matches!(err, AppError::Forbidden { .. }));
    let err = posts.delete_post(&bob.id, &post.id).await.expect_err("not author");
    assert!(matches!(err, AppError::Forbidden { .. }));

    posts.edit_caption(&alice.id, &post.id, " edited ").await.expect("edit");
    let stored = posts.get(&post.id).await.expect("get").expect("stored");
    assert_eq!(stored.caption, "edited");

    posts.delete_post(&alice.id, &post.id).await.expect("delete");
    assert!(posts.get(&post.id).await.expect("get").is_none());
    let err = posts.delete_post(&alice.id, &post.id).await.expect_err("already gone");
    assert!(matches!(err, AppError::NotFound { what: "post", .. }));
}

#[tokio::test]
async fn toggle_like_adds_then_removes() {
    let t = TestApp::new();
    let alice = t.register("alice").await;
    let bob = t.register("bob").await;
    let post = t.post_as(&alice.id, "like me").await;
    let posts = t.app.posts();

    assert!(posts.toggle_like(&bob.id, &post.id).await.expect("like"));
    assert!(posts.toggle_like(&alice.id, &post.id).await.expect("like"));
    let stored = posts.get(&post.id).await.expect("get").expect("stored");
    assert_eq!(stored.likes, vec![bob.id.clone(), alice.id.clone()]);

    assert!(!posts.toggle_like(&bob.id, &post.id).await.expect("unlike"));
    let stored = posts.get(&post.id).await.expect("get").expect("stored");
    assert_eq!(stored.likes, vec![alice.id.clone()]);
}

#[tokio::test]
async fn comment_author_without_display_name_shows_as_user() {
    let t = TestApp::new();
    let alice = t.register("alice").await;
    let bob = t.register("bob").await;
    t.app
        .client()
        .users()
        .update(&bob.id, &[FieldUpdate::set("displayName", "  ")])
        .await
        .expect("clear display name");
    let post = t.post_as(&alice.id, "comment here").await;

    let comment = t.app.posts().add_comment(&bob.id, &post.id, "hi").await.expect("comment");
    assert_eq!(comment.username, "User");
}

#[tokio::test]
async fn comments_notify_the_post_author() {
    let t = TestApp::new();
    let alice = t.register("alice").await;
    let bob = t.register("bob").await;
    let post = t.post_as(&alice.id, "comment here").await;
    let posts = t.app.posts();

    posts.add_comment(&bob.id, &post.id, "nice shot").await.expect("comment");
    tick().await;
    posts.add_comment(&alice.id, &post.id, "thanks").await.expect("own comment");

    let comments = posts.comments(&post.id).await.expect("comments");
    let texts: Vec<&str> = comments.iter().map(|comment| comment.text.as_str()).collect();
    assert_eq!(texts, vec!["nice shot", "thanks"]);
    assert_eq!(comments[0].username, "Bob");

    let notifications = t.app.notifications().list(&alice.id).await.expect("list");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Comment);
    assert_eq!(notifications[0].sender_id, bob.id);
    assert_eq!(notifications[0].post_id.as_deref(), Some(post.id.as_str()));
    assert_eq!(notifications[0].message, "Bob commented on your post");
}

#[tokio::test]
async fn blank_comments_are_rejected() {
    let t = TestApp::new();
    let alice = t.register("alice").await;
    let post = t.post_as(&alice.id, "quiet").await;

    let err = t
        .app
        .posts()
        .add_comment(&alice.id, &post.id, "  ")
        .await
        .expect_err("blank comment");
    assert!(matches!(err, AppError::InvalidRequest { .. }));
    assert!(t.app.posts().comments(&post.id).await.expect("comments").is_empty());
}

#[tokio::test]
async fn only_the_comment_author_deletes_it() {
    let t = TestApp::new();
    let alice = t.register("alice").await;
    let bob = t.register("bob").await;
    let post = t.post_as(&alice.id, "thread").await;
    let posts = t.app.posts();
    let comment = posts.add_comment(&bob.id, &post.id, "first!").await.expect("comment");

    let err = posts
        .delete_comment(&alice.id, &post.id, &comment.id)
        .await
        .expect_err("post author is not comment author");
    assert!(matches!(err, AppError::Forbidden { .. }));

    posts.delete_comment(&bob.id, &post.id, &comment.id).await.expect("delete");
    assert!(posts.comments(&post.id).await.expect("comments").is_empty());
}

#[tokio::test]
async fn feeds_list_newest_first() {
    let t = TestApp::new();
    let alice = t.register("alice").await;
    let bob = t.register("bob").await;

    let first = t.post_as(&alice.id, "first").await;
    tick().await;
    let second = t.post_as(&bob.id, "second").await;
    tick().await;
    let third = t.post_as(&alice.id, "third").await;

    let feed = t.app.feed();
    let home: Vec<String> = feed
        .home_feed(None)
        .await
        .expect("home")
        .into_iter()
        .map(|post| post.id)
        .collect();
    assert_eq!(home, vec![third.id.clone(), second.id.clone(), first.id.clone()]);

    let limited = feed.home_feed(Some(2)).await.expect("limited");
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].id, third.id);

    let profile: Vec<String> = feed
        .profile_posts(&alice.id)
        .await
        .expect("profile posts")
        .into_iter()
        .map(|post| post.id)
        .collect();
    assert_eq!(profile, vec![third.id, first.id]);
}
