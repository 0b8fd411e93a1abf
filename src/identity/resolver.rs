//! Identity resolution: the three entry flows (signup, password signin,
//! federated signin) orchestrated over an explicitly injected dependency
//! bundle. Each flow is request-scoped and strictly sequential; the only
//! state shared across concurrent invocations is the identity store itself.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::federated::FederatedVerifier;
use crate::security;
use crate::token::TokenIssuer;
use crate::tprintln;
use crate::validate;

use super::handle;
use super::store::IdentityStore;
use super::user::{AuthMode, NewUser, User, DEFAULT_PROFILE_IMG};

/// The response shape shared by all three auth flows.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub profile_img: String,
    pub username: String,
    pub fullname: String,
}

pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    verifier: Arc<dyn FederatedVerifier>,
    tokens: TokenIssuer,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>, verifier: Arc<dyn FederatedVerifier>, tokens: TokenIssuer) -> Self {
        Self { store, verifier, tokens }
    }

    fn session_for(&self, user: &User) -> AppResult<AuthSession> {
        let access_token = self.tokens.issue(&user.id).map_err(AppError::from)?;
        Ok(AuthSession {
            access_token,
            profile_img: user.profile_img.clone(),
            username: user.username.clone(),
            fullname: user.fullname.clone(),
        })
    }

    /// validate -> hash -> allocate handle -> create -> issue token.
    /// Validation runs before any hashing or storage I/O.
    pub async fn signup(&self, fullname: &str, email: &str, password: &str) -> AppResult<AuthSession> {
        validate::validate_signup(fullname, email, password)?;
        let phc = hash_off_thread(password.to_string()).await?;
        let username = handle::allocate(self.store.as_ref(), email)?;
        let user = self.store.create(NewUser {
            email: email.to_string(),
            username,
            fullname: fullname.to_string(),
            profile_img: DEFAULT_PROFILE_IMG.to_string(),
            auth: AuthMode::Password { phc },
        })?;
        tprintln!("auth.signup email={} username={}", user.email, user.username);
        self.session_for(&user)
    }

    /// Lookup miss and wrong password are reported with distinct messages by
    /// product choice (enumeration tradeoff noted in DESIGN.md).
    pub async fn password_signin(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let Some(user) = self.store.find_by_email(email)? else {
            return Err(AppError::not_found("Email not found"));
        };
        let phc = match &user.auth {
            AuthMode::Federated => {
                return Err(AppError::wrong_mode("Account was created using google. Try logging in with google."));
            }
            AuthMode::Password { phc } => phc.clone(),
        };
        if !verify_off_thread(phc, password.to_string()).await? {
            return Err(AppError::invalid_credential("Incorrect password"));
        }
        tprintln!("auth.signin email={} username={}", user.email, user.username);
        self.session_for(&user)
    }

    /// Verify the external token, then either sign the existing federated
    /// identity in or create one. A password-backed account with the claimed
    /// email is never silently linked.
    pub async fn federated_signin(&self, external_token: &str) -> AppResult<AuthSession> {
        let claims = self.verifier.verify(external_token)?;
        if let Some(user) = self.store.find_by_email(&claims.email)? {
            if !user.auth.is_federated() {
                return Err(AppError::wrong_mode(
                    "This email was signed up without google. Please log in with password to access the account",
                ));
            }
            tprintln!("auth.google email={} username={} (existing)", user.email, user.username);
            return self.session_for(&user);
        }
        let username = handle::allocate(self.store.as_ref(), &claims.email)?;
        let profile_img = if claims.picture.is_empty() { DEFAULT_PROFILE_IMG.to_string() } else { claims.picture };
        let user = self.store.create(NewUser {
            email: claims.email,
            username,
            fullname: claims.name,
            profile_img,
            auth: AuthMode::Federated,
        })?;
        tprintln!("auth.google email={} username={} (created)", user.email, user.username);
        self.session_for(&user)
    }
}

// Argon2 is the one CPU-bound step in these flows; keep it off the request
// threads. A hashing failure surfaces as Internal, never as an
// authentication-specific error.
async fn hash_off_thread(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || security::hash_password(&password))
        .await
        .map_err(|e| AppError::internal(format!("hash task failed: {}", e)))?
        .map_err(AppError::from)
}

async fn verify_off_thread(phc: String, password: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || security::verify_password(&phc, &password))
        .await
        .map_err(|e| AppError::internal(format!("verify task failed: {}", e)))
}
