//! Signup credential validation.
//! Pure shape checks over fullname/email/password. The first failing rule is
//! reported and nothing else runs; callers must not hash or touch storage
//! before this passes.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult};

// local@domain.tld with letter/digit segments joined by single dots or hyphens
// and a 2-3 character final label.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+([\.-]?\w+)*@\w+([\.-]?\w+)*(\.\w{2,3})+$").unwrap()
});

pub const MIN_FULLNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_PASSWORD_LEN: usize = 20;

pub fn validate_signup(fullname: &str, email: &str, password: &str) -> AppResult<()> {
    if fullname.chars().count() < MIN_FULLNAME_LEN {
        return Err(AppError::validation("Fullname must be at least 3 letters long"));
    }
    validate_email(email)?;
    validate_password(password)
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if email.is_empty() {
        return Err(AppError::validation("Enter the email"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::validation("Email is invalid"));
    }
    Ok(())
}

/// 6-20 characters with at least one digit, one lowercase and one uppercase
/// letter. Checked with char classes; the regex crate has no lookahead.
pub fn validate_password(password: &str) -> AppResult<()> {
    let len = password.chars().count();
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    if len < MIN_PASSWORD_LEN || len > MAX_PASSWORD_LEN || !has_digit || !has_lower || !has_upper {
        return Err(AppError::validation(
            "Password should be 6 to 20 characters long with a numeric, 1 lowercase and 1 uppercase letter",
        ));
    }
    Ok(())
}
