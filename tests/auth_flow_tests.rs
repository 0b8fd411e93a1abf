//! Identity flow integration tests: signup, password signin, federated signin
//! and handle allocation, exercised over a real file-backed identity store.

use std::sync::Arc;

use anyhow::Result;
use tempfile::tempdir;

use inkpress::error::{AppError, AppResult};
use inkpress::federated::{FederatedClaims, FederatedVerifier};
use inkpress::identity::{
    allocate, AuthMode, FileIdentityStore, IdentityResolver, IdentityStore, NewUser,
    DEFAULT_PROFILE_IMG, HANDLE_SUFFIX_LEN,
};
use inkpress::token::TokenIssuer;

const TEST_SECRET: &[u8] = b"integration-test-secret";
const GOOD_FEDERATED_TOKEN: &str = "good-federated-token";

/// Stand-in for the external issuer: accepts exactly one token value and
/// returns fixed claims, everything else fails opaquely.
struct StaticVerifier {
    claims: FederatedClaims,
}

impl FederatedVerifier for StaticVerifier {
    fn verify(&self, external_token: &str) -> AppResult<FederatedClaims> {
        if external_token == GOOD_FEDERATED_TOKEN {
            Ok(self.claims.clone())
        } else {
            Err(AppError::verification("Failed to authenticate you with google. Try with some other google account"))
        }
    }
}

fn claims_for(email: &str) -> FederatedClaims {
    FederatedClaims {
        email: email.to_string(),
        name: "Jon Arbuckle".to_string(),
        picture: "https://lh3.example.com/photo=s384-c".to_string(),
    }
}

fn harness(dir: &std::path::Path, claims: FederatedClaims) -> (Arc<FileIdentityStore>, IdentityResolver, TokenIssuer) {
    let store = Arc::new(FileIdentityStore::new(dir).expect("store"));
    let tokens = TokenIssuer::new(TEST_SECRET);
    let resolver = IdentityResolver::new(
        store.clone(),
        Arc::new(StaticVerifier { claims }),
        tokens.clone(),
    );
    (store, resolver, TokenIssuer::new(TEST_SECRET))
}

#[tokio::test]
async fn signup_succeeds_once_then_duplicates() -> Result<()> {
    let tmp = tempdir()?;
    let (_store, resolver, _tokens) = harness(tmp.path(), claims_for("x@y.co"));

    let session = resolver.signup("Tom Cat", "tom@acme.co", "Passw0rd").await.expect("signup");
    assert!(!session.access_token.is_empty());
    assert!(session.username.starts_with("tom"));
    assert_eq!(session.fullname, "Tom Cat");
    assert_eq!(session.profile_img, DEFAULT_PROFILE_IMG);

    let repeat = resolver.signup("Tom Cat", "tom@acme.co", "Passw0rd").await;
    assert!(matches!(repeat, Err(AppError::Duplicate { .. })), "second signup with same email must fail");
    Ok(())
}

#[tokio::test]
async fn invalid_signup_writes_nothing() -> Result<()> {
    let tmp = tempdir()?;
    let (store, resolver, _tokens) = harness(tmp.path(), claims_for("x@y.co"));

    let cases = [
        ("Al", "al@acme.co", "Passw0rd"),        // fullname too short
        ("Alice", "", "Passw0rd"),               // empty email
        ("Alice", "not-an-email", "Passw0rd"),   // malformed email
        ("Alice", "alice@acme.co", "password"),  // no digit/uppercase
        ("Alice", "alice@acme.co", "Pw1"),       // too short
    ];
    for (fullname, email, password) in cases {
        let r = resolver.signup(fullname, email, password).await;
        assert!(matches!(r, Err(AppError::Validation { .. })), "expected validation failure for {:?}", (fullname, email, password));
    }
    // No record was created by any rejected attempt
    assert!(store.find_by_email("al@acme.co")?.is_none());
    assert!(store.find_by_email("alice@acme.co")?.is_none());
    Ok(())
}

#[tokio::test]
async fn password_signin_paths() -> Result<()> {
    let tmp = tempdir()?;
    let (store, resolver, tokens) = harness(tmp.path(), claims_for("fed@only.co"));

    resolver.signup("Tom Cat", "tom@acme.co", "Passw0rd").await?;
    let user = store.find_by_email("tom@acme.co")?.expect("created");

    // Correct credentials: token verifies back to the same user id
    let session = resolver.password_signin("tom@acme.co", "Passw0rd").await.expect("signin");
    let claims = tokens.decode(&session.access_token).expect("decode");
    assert_eq!(claims.id, user.id);

    // Wrong password
    let wrong = resolver.password_signin("tom@acme.co", "Passw0rd!").await;
    assert!(matches!(wrong, Err(AppError::InvalidCredential { .. })));

    // Unknown email: distinct from wrong password, by product choice
    let missing = resolver.password_signin("nobody@acme.co", "Passw0rd").await;
    match missing {
        Err(AppError::NotFound { ref message }) => assert_eq!(message, "Email not found"),
        other => panic!("expected NotFound, got {:?}", other.map(|s| s.username)),
    }

    // Federated-only account rejects password signin regardless of the value
    resolver.federated_signin(GOOD_FEDERATED_TOKEN).await.expect("federated signup");
    for pw in ["Passw0rd", "anything", ""] {
        let r = resolver.password_signin("fed@only.co", pw).await;
        assert!(matches!(r, Err(AppError::WrongMode { .. })), "federated account must reject password signin");
    }
    Ok(())
}

#[tokio::test]
async fn federated_signin_creates_exactly_one_identity() -> Result<()> {
    let tmp = tempdir()?;
    let (store, resolver, tokens) = harness(tmp.path(), claims_for("jon@acme.co"));

    let first = resolver.federated_signin(GOOD_FEDERATED_TOKEN).await.expect("first federated signin");
    let user = store.find_by_email("jon@acme.co")?.expect("created");
    assert!(user.auth.is_federated());
    assert_eq!(user.fullname, "Jon Arbuckle");
    assert_eq!(tokens.decode(&first.access_token)?.id, user.id);

    // Second signin reuses the identity
    let second = resolver.federated_signin(GOOD_FEDERATED_TOKEN).await.expect("second federated signin");
    assert_eq!(second.username, first.username);
    assert_eq!(tokens.decode(&second.access_token)?.id, user.id);

    // Invalid external token is an opaque verification failure
    let bad = resolver.federated_signin("forged").await;
    assert!(matches!(bad, Err(AppError::Verification { .. })));
    Ok(())
}

#[tokio::test]
async fn federated_signin_never_links_password_accounts() -> Result<()> {
    let tmp = tempdir()?;
    let (store, resolver, _tokens) = harness(tmp.path(), claims_for("tom@acme.co"));

    resolver.signup("Tom Cat", "tom@acme.co", "Passw0rd").await?;
    let r = resolver.federated_signin(GOOD_FEDERATED_TOKEN).await;
    assert!(matches!(r, Err(AppError::WrongMode { .. })), "password account must not be silently linked");

    // The account is untouched and still password-backed
    let user = store.find_by_email("tom@acme.co")?.expect("still present");
    assert!(!user.auth.is_federated());
    Ok(())
}

#[tokio::test]
async fn handle_allocation_resolves_collisions() -> Result<()> {
    let tmp = tempdir()?;
    let (store, resolver, _tokens) = harness(tmp.path(), claims_for("x@y.co"));

    let first = resolver.signup("Garfield Cat", "garfield@example.com", "Lasagn4").await?;
    assert_eq!(first.username, "garfield");

    let second = resolver.signup("Other Garfield", "garfield@other.co", "Lasagn4").await?;
    assert_ne!(second.username, "garfield");
    assert!(second.username.starts_with("garfield"));
    assert_eq!(second.username.len(), "garfield".len() + HANDLE_SUFFIX_LEN);

    // The allocator itself performs no writes
    let probe = allocate(store.as_ref(), "unseen@example.com")?;
    assert_eq!(probe, "unseen");
    assert!(store.find_by_email("unseen@example.com")?.is_none());
    assert!(!store.exists_by_handle("unseen")?);
    Ok(())
}

#[tokio::test]
async fn store_constraint_backstops_the_handle_race() -> Result<()> {
    let tmp = tempdir()?;
    let store = FileIdentityStore::new(tmp.path())?;

    // Two allocations that raced to the same final handle: the store-level
    // uniqueness constraint must reject the second create.
    let make = |email: &str| NewUser {
        email: email.to_string(),
        username: "garfieldAb1x9".to_string(),
        fullname: "Racer".to_string(),
        profile_img: DEFAULT_PROFILE_IMG.to_string(),
        auth: AuthMode::Federated,
    };
    store.create(make("a@x.co"))?;
    let loser = store.create(make("b@x.co"));
    assert!(matches!(loser, Err(AppError::Duplicate { .. })));
    Ok(())
}
