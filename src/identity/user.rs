use serde::{Deserialize, Serialize};

/// Avatar assigned to password signups until the user uploads one.
pub const DEFAULT_PROFILE_IMG: &str = "https://api.dicebear.com/6.x/fun-emoji/svg?seed=Garfield";

/// How an identity authenticates. Exactly one mode per account, enforced
/// structurally: a record is either password-backed (carrying its PHC hash)
/// or federated, never both and never neither.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthMode {
    Password { phc: String },
    Federated,
}

impl AuthMode {
    pub fn is_federated(&self) -> bool { matches!(self, AuthMode::Federated) }
}

/// A persisted identity. Ids and timestamps are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub fullname: String,
    pub profile_img: String,
    pub auth: AuthMode,
    /// Creation time in epoch milliseconds.
    pub created_at: i64,
}

/// Input to `IdentityStore::create`. The store owns id assignment.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub fullname: String,
    pub profile_img: String,
    pub auth: AuthMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_mode_is_tagged_in_json() {
        let pw = AuthMode::Password { phc: "$argon2id$x".into() };
        let v = serde_json::to_value(&pw).unwrap();
        assert_eq!(v["mode"], "password");
        assert_eq!(v["phc"], "$argon2id$x");

        let fed = serde_json::to_value(&AuthMode::Federated).unwrap();
        assert_eq!(fed["mode"], "federated");
        assert!(AuthMode::Federated.is_federated());
        assert!(!pw.is_federated());
    }
}
