//! Registration, login, token expiry and the `/me` overview

use school_service::contract::*;

mod common;
use common::{new_user, TestEnv};

#[tokio::test]
async fn register_creates_user_profile_and_token() {
    let env = TestEnv::new();

    let (user, token) = env
        .service
        .register(new_user("alice", Role::Student))
        .await
        .unwrap();

    assert_eq!(token.user_id, user.id);
    assert_eq!(token.key.len(), 40);
    assert!(!user.is_staff);
    let profile = env.store.profile_of(user.id).unwrap();
    assert_eq!((profile.xp, profile.level), (0, 1));

    let me = env.service.me(&user).await.unwrap();
    assert_eq!(me.profile.map(|p| p.id), Some(profile.id));
}

#[tokio::test]
async fn registration_cannot_grant_staff() {
    let env = TestEnv::new();
    let mut input = new_user("mallory", Role::Teacher);
    input.is_staff = true;

    let (user, _) = env.service.register(input).await.unwrap();
    assert!(!user.is_staff);
}

#[tokio::test]
async fn duplicate_username_is_a_validation_error() {
    let env = TestEnv::new();
    env.service
        .register(new_user("alice", Role::Student))
        .await
        .unwrap();

    let err = env
        .service
        .register(new_user("alice", Role::Parent))
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::Validation { .. }));
}

#[tokio::test]
async fn weak_input_is_rejected() {
    let env = TestEnv::new();

    let mut short = new_user("bob", Role::Student);
    short.password = "short".to_string();
    assert!(env.service.register(short).await.is_err());

    let mut bad_email = new_user("bob", Role::Student);
    bad_email.email = "not-an-email".to_string();
    assert!(env.service.register(bad_email).await.is_err());

    let bad_name = new_user("bob smith", Role::Student);
    assert!(env.service.register(bad_name).await.is_err());
}

#[tokio::test]
async fn login_returns_the_live_token() {
    let env = TestEnv::new();
    let (_, issued) = env
        .service
        .register(new_user("alice", Role::Student))
        .await
        .unwrap();

    let token = env
        .service
        .login("alice", "correct-horse")
        .await
        .unwrap();
    assert_eq!(token.key, issued.key);

    let err = env.service.login("alice", "wrong-horse").await.unwrap_err();
    assert!(matches!(err, SchoolError::Validation { .. }));
}

#[tokio::test]
async fn expired_token_is_rejected_and_deleted() {
    let env = TestEnv::new();
    let (user, token) = env
        .service
        .register(new_user("alice", Role::Student))
        .await
        .unwrap();

    let authenticated = env.service.authenticate(&token.key).await.unwrap();
    assert_eq!(authenticated.id, user.id);

    env.clock.advance(chrono::Duration::hours(24) + chrono::Duration::seconds(1));
    let err = env.service.authenticate(&token.key).await.unwrap_err();
    assert_eq!(err, SchoolError::unauthenticated("Token has expired"));
    assert_eq!(env.store.token_count(), 0);
}

#[tokio::test]
async fn token_is_valid_up_to_its_lifetime() {
    let env = TestEnv::new();
    let (_, token) = env
        .service
        .register(new_user("alice", Role::Student))
        .await
        .unwrap();

    env.clock.advance(chrono::Duration::hours(24));
    assert!(env.service.authenticate(&token.key).await.is_ok());
}

#[tokio::test]
async fn login_reissues_an_expired_token() {
    let env = TestEnv::new();
    let (user, old) = env
        .service
        .register(new_user("alice", Role::Student))
        .await
        .unwrap();

    env.clock.advance(chrono::Duration::days(2));
    let fresh = env
        .service
        .login("alice", "correct-horse")
        .await
        .unwrap();

    assert_ne!(fresh.key, old.key);
    assert_eq!(fresh.created, env.service.now());
    assert_eq!(env.store.token_of(user.id).map(|t| t.key), Some(fresh.key));
}

#[tokio::test]
async fn unknown_token_is_unauthenticated() {
    let env = TestEnv::new();
    let err = env.service.authenticate("deadbeef").await.unwrap_err();
    assert!(matches!(err, SchoolError::Unauthenticated { .. }));
}

#[tokio::test]
async fn logout_deletes_the_token() {
    let env = TestEnv::new();
    let (user, token) = env
        .service
        .register(new_user("alice", Role::Student))
        .await
        .unwrap();

    env.service.logout(&user).await.unwrap();
    assert!(env.service.authenticate(&token.key).await.is_err());

    let err = env.service.logout(&user).await.unwrap_err();
    assert!(matches!(err, SchoolError::Validation { .. }));
}

#[tokio::test]
async fn deactivated_user_cannot_authenticate() {
    let env = TestEnv::new();
    let staff = env.staff("admin").await;
    let (user, token) = env
        .service
        .register(new_user("alice", Role::Student))
        .await
        .unwrap();

    env.service
        .update_user(
            &staff,
            user.id,
            UserPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = env.service.authenticate(&token.key).await.unwrap_err();
    assert!(matches!(err, SchoolError::Unauthenticated { .. }));
    assert!(env.service.login("alice", "correct-horse").await.is_err());
}

#[tokio::test]
async fn staff_bootstrap_sets_the_flag() {
    let env = TestEnv::new();
    let user = env
        .service
        .bootstrap_staff(new_user("root", Role::Teacher))
        .await
        .unwrap();
    assert!(user.is_staff);
    assert!(env.events.names().contains(&"user_created"));
}
