//! Handle allocation.
//! Derives the public username from the email local part with a single
//! existence check against the store. On collision a fixed-length random
//! alphanumeric suffix is appended and used as-is, with no re-check: the
//! store's uniqueness constraint is the backstop if two concurrent
//! allocations race to the same fallback (open question in DESIGN.md).

use crate::error::{AppError, AppResult};
use super::store::IdentityStore;

pub const HANDLE_SUFFIX_LEN: usize = 5;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// An exhausted entropy source must surface as an internal error, never as a
/// fixed suffix.
fn random_suffix(len: usize) -> AppResult<String> {
    let mut bytes = vec![0u8; len];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| AppError::internal(format!("entropy source failed: {}", e)))?;
    Ok(bytes.iter().map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char).collect())
}

/// One read, one decision: the allocator never writes. The caller persists
/// the chosen handle as part of user creation.
pub fn allocate(store: &dyn IdentityStore, email: &str) -> AppResult<String> {
    let local = email.split('@').next().unwrap_or(email);
    if store.exists_by_handle(local)? {
        Ok(format!("{}{}", local, random_suffix(HANDLE_SUFFIX_LEN)?))
    } else {
        Ok(local.to_string())
    }
}
