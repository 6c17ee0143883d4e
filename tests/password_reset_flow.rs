use account_recovery::{
    auth::{error::AuthError, password::verify_password, store::UserStore},
    clock::Clock,
};
use time::Duration;

mod common;

async fn registered(h: &common::Harness, email: &str, password: &str) {
    h.state
        .verification
        .request_verification(email, password)
        .await
        .expect("register");
}

#[tokio::test]
async fn unknown_email_creates_nothing() {
    let h = common::harness();

    h.state
        .reset
        .request_reset("z@x.com")
        .await
        .expect("generic success");
    assert!(h.store.is_empty().await);
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test]
async fn request_issues_fifteen_minute_token() {
    let h = common::harness();
    registered(&h, "a@x.com", "pw1").await;
    let now = h.clock.now();

    h.state.reset.request_reset("a@x.com").await.unwrap();

    let user = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(user.password_reset_expiry, Some(now + Duration::minutes(15)));
    let mail = h.notifier.last().unwrap();
    assert_eq!(mail.subject, "Password Reset Request");
    assert!(mail.body.contains("/reset-password?token="));
    assert_eq!(h.notifier.last_token(), user.password_reset_token);
}

#[tokio::test]
async fn request_succeeds_when_mail_fails() {
    let h = common::harness();
    registered(&h, "a@x.com", "pw1").await;
    h.notifier.fail_sends(true);

    h.state.reset.request_reset("a@x.com").await.unwrap();
    let user = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert!(user.password_reset_token.is_some());
}

#[tokio::test]
async fn reset_round_trip_consumes_token() {
    let h = common::harness();
    registered(&h, "a@x.com", "old-pw").await;
    h.state.reset.request_reset("a@x.com").await.unwrap();
    let token = h.notifier.last_token().unwrap();

    h.state
        .reset
        .confirm_reset(&token, "a@x.com", "new-pw")
        .await
        .expect("reset");

    let user = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert!(verify_password("new-pw", &user.password_hash).unwrap());
    assert!(!verify_password("old-pw", &user.password_hash).unwrap());
    assert!(user.password_reset_token.is_none());
    assert!(user.password_reset_expiry.is_none());
    assert_eq!(
        h.notifier.last().unwrap().subject,
        "Password Reset Successful"
    );

    let err = h
        .state
        .reset
        .confirm_reset(&token, "a@x.com", "third-pw")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidOrExpiredLink));
}

#[tokio::test]
async fn new_password_passes_credential_check() {
    let h = common::harness();
    registered(&h, "a@x.com", "old-pw").await;
    h.state.reset.request_reset("a@x.com").await.unwrap();
    let token = h.notifier.last_token().unwrap();
    h.state
        .reset
        .confirm_reset(&token, "a@x.com", "new-pw")
        .await
        .unwrap();

    let err = h
        .state
        .verification
        .request_verification("a@x.com", "old-pw")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::IncorrectCredential));
    h.state
        .verification
        .request_verification("a@x.com", "new-pw")
        .await
        .expect("new password accepted");
}

#[tokio::test]
async fn mismatched_email_leaves_hash_untouched() {
    let h = common::harness();
    registered(&h, "a@x.com", "pw1").await;
    h.state.reset.request_reset("a@x.com").await.unwrap();
    let token = h.notifier.last_token().unwrap();
    let before = h.store.find_by_email("a@x.com").await.unwrap().unwrap();

    let err = h
        .state
        .reset
        .confirm_reset(&token, "b@x.com", "hijack")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailMismatch));

    let after = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(after.password_hash, before.password_hash);
    assert_eq!(after.password_reset_token, before.password_reset_token);
}

#[tokio::test]
async fn token_is_dead_after_window() {
    let h = common::harness();
    registered(&h, "a@x.com", "pw1").await;
    h.state.reset.request_reset("a@x.com").await.unwrap();
    let token = h.notifier.last_token().unwrap();

    h.clock.advance(Duration::minutes(16));

    assert!(matches!(
        h.state.reset.reset_form(&token).await.unwrap_err(),
        AuthError::InvalidOrExpiredLink
    ));
    assert!(matches!(
        h.state
            .reset
            .confirm_reset(&token, "a@x.com", "new-pw")
            .await
            .unwrap_err(),
        AuthError::InvalidOrExpiredLink
    ));
}

#[tokio::test]
async fn reset_form_exposes_token_without_consuming_it() {
    let h = common::harness();
    registered(&h, "a@x.com", "pw1").await;
    h.state.reset.request_reset("a@x.com").await.unwrap();
    let token = h.notifier.last_token().unwrap();

    assert_eq!(h.state.reset.reset_form(&token).await.unwrap(), token);
    assert_eq!(h.state.reset.reset_form(&token).await.unwrap(), token);

    let user = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(user.password_reset_token.as_deref(), Some(token.as_str()));
}

#[tokio::test]
async fn empty_or_unknown_token_is_invalid() {
    let h = common::harness();
    registered(&h, "a@x.com", "pw1").await;

    for token in ["", "deadbeef"] {
        assert!(matches!(
            h.state.reset.reset_form(token).await.unwrap_err(),
            AuthError::InvalidOrExpiredLink
        ));
    }
}

#[tokio::test]
async fn reset_does_not_touch_verification_state() {
    let h = common::harness();
    registered(&h, "a@x.com", "pw1").await;
    let before = h.store.find_by_email("a@x.com").await.unwrap().unwrap();

    h.state.reset.request_reset("a@x.com").await.unwrap();
    let token = h.notifier.last_token().unwrap();
    h.state
        .reset
        .confirm_reset(&token, "a@x.com", "pw2")
        .await
        .unwrap();

    let after = h.store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(after.verified, before.verified);
    assert_eq!(after.verification_token, before.verification_token);
}
