//! Refresh-token rotation and reuse-detection tests.
//!
//! These verify the security-critical properties of the session state
//! machine: single-use refresh tokens, cascading revocation on replay,
//! and exactly-one-winner semantics for concurrent rotations.

use std::net::{IpAddr, Ipv4Addr};
use tradepost_auth::mocks::{MockSessionCache, MockSessionRepository};
use tradepost_auth::{
    AccountId, AuthError, SessionConfig, SessionId, SessionManager, TokenCodec, TokenConfig,
    TokenKind,
};

type Manager = SessionManager<MockSessionRepository, MockSessionCache>;

struct Harness {
    manager: Manager,
    sessions: MockSessionRepository,
    cache: MockSessionCache,
}

fn harness() -> Harness {
    let sessions = MockSessionRepository::new();
    let cache = MockSessionCache::new();

    let codec = TokenCodec::new(
        &TokenConfig::new("access-secret".to_string(), "refresh-secret".to_string())
            .with_issuer("tradepost-test"),
    );

    let manager = SessionManager::new(sessions.clone(), cache.clone(), codec, SessionConfig::new());

    Harness {
        manager,
        sessions,
        cache,
    }
}

fn ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(198, 51, 100, 23))
}

/// The session id a refresh token was minted for.
fn session_of(manager: &Manager, refresh_token: &str) -> SessionId {
    manager
        .codec()
        .verify(refresh_token, TokenKind::Refresh)
        .expect("valid refresh token")
        .session_id
}

#[tokio::test]
async fn test_rotation_issues_fresh_pair() {
    let h = harness();
    let account_id = AccountId::new();

    let pair = h
        .manager
        .create_session(account_id, Some("android".to_string()), ip())
        .await
        .expect("create session");

    let rotated = h
        .manager
        .rotate(&pair.refresh_token, ip())
        .await
        .expect("rotation with the current token should succeed");

    assert_ne!(rotated.refresh_token, pair.refresh_token);
    assert_ne!(rotated.access_token, pair.access_token);
    // The session itself survives the rotation.
    assert_eq!(
        session_of(&h.manager, &rotated.refresh_token),
        session_of(&h.manager, &pair.refresh_token)
    );
}

#[tokio::test]
async fn test_superseded_token_is_permanently_unusable() {
    let h = harness();
    let account_id = AccountId::new();

    let first = h
        .manager
        .create_session(account_id, None, ip())
        .await
        .expect("create session");
    let second = h.manager.rotate(&first.refresh_token, ip()).await.expect("rotate");
    let third = h.manager.rotate(&second.refresh_token, ip()).await.expect("rotate again");

    // Three distinct refresh tokens so far.
    assert_ne!(first.refresh_token, second.refresh_token);
    assert_ne!(second.refresh_token, third.refresh_token);
    assert_ne!(first.refresh_token, third.refresh_token);

    // Replaying the first token is necessarily malicious: the
    // legitimate holder has already rotated past it twice.
    let replay = h.manager.rotate(&first.refresh_token, ip()).await;
    assert_eq!(replay, Err(AuthError::SessionCompromised));
}

#[tokio::test]
async fn test_reuse_revokes_every_account_session() {
    let h = harness();
    let account_id = AccountId::new();

    let compromised = h
        .manager
        .create_session(account_id, Some("web".to_string()), ip())
        .await
        .expect("create session");
    let bystander = h
        .manager
        .create_session(account_id, Some("ios".to_string()), ip())
        .await
        .expect("create second session");

    let bystander_id = session_of(&h.manager, &bystander.refresh_token);
    assert!(h.manager.is_valid(bystander_id).await.expect("is_valid"));

    // The legitimate holder rotates; an attacker replays the captured
    // pre-rotation token.
    let _fresh = h
        .manager
        .rotate(&compromised.refresh_token, ip())
        .await
        .expect("legitimate rotation");
    let replay = h.manager.rotate(&compromised.refresh_token, ip()).await;
    assert_eq!(replay, Err(AuthError::SessionCompromised));

    // The blast radius is the whole account, not just the one session.
    assert_eq!(h.sessions.session_count().expect("count"), 0);
    assert!(!h.manager.is_valid(bystander_id).await.expect("is_valid"));
}

#[tokio::test]
async fn test_rotation_after_reuse_requires_reauth() {
    let h = harness();
    let account_id = AccountId::new();

    let pair = h
        .manager
        .create_session(account_id, None, ip())
        .await
        .expect("create session");
    let rotated = h.manager.rotate(&pair.refresh_token, ip()).await.expect("rotate");

    let _ = h.manager.rotate(&pair.refresh_token, ip()).await;

    // Even the latest pair died in the cascade.
    let result = h.manager.rotate(&rotated.refresh_token, ip()).await;
    assert_eq!(result, Err(AuthError::SessionCompromised));
}

#[tokio::test]
async fn test_concurrent_rotation_has_one_winner() {
    let h = harness();
    let account_id = AccountId::new();

    let pair = h
        .manager
        .create_session(account_id, None, ip())
        .await
        .expect("create session");

    let manager1 = h.manager.clone();
    let manager2 = h.manager.clone();
    let token1 = pair.refresh_token.clone();
    let token2 = pair.refresh_token.clone();

    let (result1, result2) = tokio::join!(
        async move { manager1.rotate(&token1, ip()).await },
        async move { manager2.rotate(&token2, ip()).await }
    );

    // The digest compare-and-swap lets exactly one rotation commit;
    // the other is handled as a reuse event.
    let winners = [&result1, &result2].iter().filter(|r| r.is_ok()).count();
    assert_eq!(
        winners, 1,
        "exactly one concurrent rotation should succeed, got {result1:?} / {result2:?}"
    );

    let loser = if result1.is_ok() { result2 } else { result1 };
    assert_eq!(loser, Err(AuthError::SessionCompromised));

    // The reuse cascade removed the account's sessions.
    assert_eq!(h.sessions.session_count().expect("count"), 0);
}

#[tokio::test]
async fn test_garbage_and_cross_kind_tokens_rejected() {
    let h = harness();
    let account_id = AccountId::new();

    let pair = h
        .manager
        .create_session(account_id, None, ip())
        .await
        .expect("create session");

    assert_eq!(
        h.manager.rotate("not-a-token", ip()).await,
        Err(AuthError::InvalidRefreshToken)
    );

    // An access token signed with the access secret must never rotate.
    assert_eq!(
        h.manager.rotate(&pair.access_token, ip()).await,
        Err(AuthError::InvalidRefreshToken)
    );

    // Neither attempt may have touched the session.
    assert_eq!(h.sessions.session_count().expect("count"), 1);
}

#[tokio::test]
async fn test_rotation_of_revoked_session_is_reuse() {
    let h = harness();
    let account_id = AccountId::new();

    let pair = h
        .manager
        .create_session(account_id, None, ip())
        .await
        .expect("create session");
    let session_id = session_of(&h.manager, &pair.refresh_token);

    h.manager.revoke(session_id).await.expect("revoke");

    // The durable record is gone; a later presentation of its refresh
    // token is treated as replay.
    let result = h.manager.rotate(&pair.refresh_token, ip()).await;
    assert_eq!(result, Err(AuthError::SessionCompromised));
}

#[tokio::test]
async fn test_rotation_survives_cache_outage() {
    let h = harness();
    let account_id = AccountId::new();

    let pair = h
        .manager
        .create_session(account_id, None, ip())
        .await
        .expect("create session");

    // Cache writes fail; the rotation must still commit because the
    // durable store is authoritative.
    h.cache.set_fail_writes(true);

    let rotated = h
        .manager
        .rotate(&pair.refresh_token, ip())
        .await
        .expect("rotation should tolerate cache write failure");
    assert_ne!(rotated.refresh_token, pair.refresh_token);
}
