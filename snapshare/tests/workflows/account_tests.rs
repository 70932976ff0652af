use super::support::*;

use snapshare::{SessionState, SsoAssertion};

fn sso(subject: &str, email: &str, display_name: Option<&str>) -> SsoAssertion {
    SsoAssertion {
        subject: subject.to_string(),
        email: email.to_string(),
        display_name: display_name.map(str::to_string),
        photo_url: None,
    }
}

#[tokio::test]
async fn sign_up_creates_a_complete_profile_and_signs_in() {
    let t = TestApp::new();
    let user = t
        .app
        .accounts()
        .sign_up("alice@example.com", PASSWORD, "  alice ", "Alice Liddell")
        .await
        .expect("sign up");

    let profile = user.profile.clone().expect("profile");
    assert_eq!(profile.username, "alice");
    assert_eq!(profile.display_name, "Alice Liddell");
    assert_eq!(profile.email, "alice@example.com");
    assert!(profile.is_profile_complete);
    assert!(profile.followers.is_empty());

    let current = t.app.session().current_user().expect("signed in");
    assert_eq!(current.uid(), user.uid());
    assert!(!current.needs_profile_setup());
    assert_eq!(Route::Home.resolve(&t.app.session().state()), RouteDecision::Render(Route::Home));
}

#[tokio::test]
async fn sign_up_requires_a_username() {
    let t = TestApp::new();
    let err = t
        .app
        .accounts()
        .sign_up("alice@example.com", PASSWORD, "   ", "Alice")
        .await
        .expect_err("blank username");
    assert!(matches!(err, AppError::UsernameRequired));
    assert_eq!(err.to_string(), "Username is required");
    assert!(t.store.is_empty("users"));
}

#[tokio::test]
async fn malformed_username_is_rejected_before_the_account_exists() {
    let t = TestApp::new();
    let accounts = t.app.accounts();

    let err = accounts
        .sign_up("john@example.com", PASSWORD, "john doe", "John")
        .await
        .expect_err("username with whitespace");
    match &err {
        AppError::Validation(validation) => assert_eq!(validation.issues[0].field, "username"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(t.store.is_empty("users"));
    assert!(accounts.login("john@example.com", PASSWORD).await.is_err());

    let user = accounts
        .sign_up("john@example.com", PASSWORD, "johndoe", "John")
        .await
        .expect("retry with a valid username");
    assert_eq!(user.profile.map(|profile| profile.username).as_deref(), Some("johndoe"));
}

#[tokio::test]
async fn taken_username_blocks_sign_up_before_the_account_exists() {
    let t = TestApp::new();
    let alice = t.register("alice").await;

    let err = t
        .app
        .accounts()
        .sign_up("other@example.com", PASSWORD, "alice", "Other")
        .await
        .expect_err("taken username");
    match &err {
        AppError::UsernameTaken { username, existing_id } => {
            assert_eq!(username, "alice");
            assert_eq!(existing_id, &alice.id);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "Username is already taken. Please choose another one.");

    let login = t.app.accounts().login("other@example.com", PASSWORD).await;
    assert!(login.is_err(), "no account should have been created");
    assert_eq!(t.store.len("users"), 1);
}

#[tokio::test]
async fn auth_failures_surface_as_inline_messages() {
    let t = TestApp::new();
    let accounts = t.app.accounts();

    let err = accounts
        .sign_up("alice@example.com", "123", "alice", "Alice")
        .await
        .expect_err("weak password");
    assert_eq!(err.to_string(), "Failed to sign up: password must be at least 6 characters");

    t.register("bob").await;
    let err = accounts
        .sign_up("bob@example.com", PASSWORD, "bobby", "Bob")
        .await
        .expect_err("email in use");
    assert_eq!(err.to_string(), "Failed to sign up: email address is already in use");

    let err = accounts
        .login("bob@example.com", "wrong-password")
        .await
        .expect_err("bad password");
    assert_eq!(err.to_string(), "Failed to login: invalid email or password");
}

#[tokio::test]
async fn login_and_sign_out_drive_the_session() {
    let t = TestApp::new();
    let alice = t.register("alice").await;
    t.app.accounts().sign_out().await.expect("sign out");
    assert_eq!(t.app.session().state(), SessionState::SignedOut);
    assert_eq!(
        Route::Home.resolve(&t.app.session().state()),
        RouteDecision::Redirect(Route::Login)
    );

    t.login("alice").await;
    let current = t.app.session().current_user().expect("signed in");
    assert_eq!(current.uid(), alice.id);
    assert_eq!(current.profile.map(|profile| profile.username).as_deref(), Some("alice"));
    assert_eq!(
        Route::Login.resolve(&t.app.session().state()),
        RouteDecision::Redirect(Route::Home)
    );
}

#[tokio::test]
async fn first_sso_sign_in_needs_profile_setup() {
    let t = TestApp::new();
    let user = t
        .app
        .accounts()
        .sign_in_with_sso(&sso("google-1", "Jane.Doe@example.com", Some("Jane Doe")))
        .await
        .expect("sso");

    let profile = user.profile.clone().expect("profile created");
    assert_eq!(profile.username, "janedoe");
    assert_eq!(profile.display_name, "Jane Doe");
    assert!(!profile.is_profile_complete);
    assert!(user.needs_profile_setup());

    let state = t.app.session().state();
    assert_eq!(
        Route::Home.resolve(&state),
        RouteDecision::Redirect(Route::profile_setup(user.uid()))
    );
    let setup = Route::profile_setup(user.uid());
    assert_eq!(setup.clone().resolve(&state), RouteDecision::Render(setup));

    let saved = t
        .app
        .profiles()
        .update_profile(ProfileUpdate {
            username: "jane".to_string(),
            display_name: "Jane".to_string(),
            bio: "hello".to_string(),
            avatar: None,
        })
        .await
        .expect("complete profile");
    assert!(saved.is_profile_complete);
    assert_eq!(
        Route::Home.resolve(&t.app.session().state()),
        RouteDecision::Render(Route::Home)
    );
}

#[tokio::test]
async fn returning_sso_user_keeps_their_profile() {
    let t = TestApp::new();
    let assertion = sso("google-2", "sam@example.com", None);
    let first = t.app.accounts().sign_in_with_sso(&assertion).await.expect("first");
    assert_eq!(first.profile.as_ref().map(|p| p.username.as_str()), Some("sam"));

    t.app
        .profiles()
        .update_profile(ProfileUpdate {
            username: "samwise".to_string(),
            display_name: "Sam".to_string(),
            ..Default::default()
        })
        .await
        .expect("setup");
    t.app.accounts().sign_out().await.expect("sign out");

    let again = t.app.accounts().sign_in_with_sso(&assertion).await.expect("again");
    assert_eq!(again.uid(), first.uid());
    let profile = again.profile.expect("profile");
    assert_eq!(profile.username, "samwise");
    assert!(profile.is_profile_complete);
    assert_eq!(t.store.len("users"), 1);
}

#[tokio::test]
async fn keeping_your_own_username_is_not_a_conflict() {
    let t = TestApp::new();
    t.register("bob").await;
    let alice = t.register("alice").await;

    let saved = t
        .app
        .profiles()
        .update_profile(ProfileUpdate {
            username: "alice".to_string(),
            display_name: "Alice A.".to_string(),
            bio: "new bio".to_string(),
            avatar: None,
        })
        .await
        .expect("own username is fine");
    assert_eq!(saved.bio, "new bio");

    let err = t
        .app
        .profiles()
        .update_profile(ProfileUpdate {
            username: "bob".to_string(),
            display_name: "Alice".to_string(),
            ..Default::default()
        })
        .await
        .expect_err("someone else's username");
    assert!(matches!(err, AppError::UsernameTaken { .. }));
    assert_eq!(t.profile(&alice.id).await.username, "alice");
}

#[tokio::test]
async fn profile_edit_keeps_follow_arrays() {
    let t = TestApp::new();
    let bob = t.register("bob").await;
    let alice = t.register("alice").await;
    t.app.graph().follow(&bob.id, &alice.id).await.expect("follow");

    t.app
        .profiles()
        .update_profile(ProfileUpdate {
            username: "alice2".to_string(),
            display_name: "Alice".to_string(),
            avatar: Some(image("me.png")),
            ..Default::default()
        })
        .await
        .expect("update");

    let profile = t.profile(&alice.id).await;
    assert_eq!(profile.username, "alice2");
    assert_eq!(profile.followers, vec![bob.id.clone()]);
    assert_eq!(profile.photo_url, "memory://uploads/1/me.png");
    let current = t.app.session().current_user().expect("signed in");
    assert_eq!(current.profile.map(|p| p.username).as_deref(), Some("alice2"));
}

#[tokio::test]
async fn failed_avatar_upload_leaves_the_profile_untouched() {
    let t = TestApp::with_uploader(MemoryUploader::failing("Upload failed"));
    let alice = t.register("alice").await;

    let err = t
        .app
        .profiles()
        .update_profile(ProfileUpdate {
            username: "alice2".to_string(),
            display_name: "Alice".to_string(),
            avatar: Some(image("me.png")),
            ..Default::default()
        })
        .await
        .expect_err("upload fails");
    assert!(matches!(err, AppError::Upload(_)));
    assert_eq!(t.profile(&alice.id).await.username, "alice");
}

#[tokio::test]
async fn malformed_username_skips_the_avatar_upload() {
    let t = TestApp::new();
    let alice = t.register("alice").await;

    let err = t
        .app
        .profiles()
        .update_profile(ProfileUpdate {
            username: "alice smith".to_string(),
            display_name: "Alice".to_string(),
            avatar: Some(image("me.png")),
            ..Default::default()
        })
        .await
        .expect_err("username with whitespace");
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(t.uploader.upload_count(), 0);
    assert_eq!(t.profile(&alice.id).await.username, "alice");
}

#[tokio::test]
async fn profile_update_requires_a_session() {
    let t = TestApp::new();
    let err = t
        .app
        .profiles()
        .update_profile(ProfileUpdate {
            username: "nobody".to_string(),
            ..Default::default()
        })
        .await
        .expect_err("signed out");
    assert!(matches!(err, AppError::NotSignedIn));
}

#[tokio::test]
async fn search_matches_lowercased_username_prefixes() {
    let t = TestApp::new();
    t.register("alice").await;
    t.register("alfred").await;
    t.register("bob").await;
    let search = t.app.search();

    let mut found: Vec<String> = search
        .search_users("AL")
        .await
        .expect("search")
        .into_iter()
        .map(|profile| profile.username)
        .collect();
    found.sort();
    assert_eq!(found, vec!["alfred", "alice"]);

    assert!(search.search_users("   ").await.expect("blank").is_empty());
    assert!(search.search_users("zed").await.expect("no match").is_empty());
}
