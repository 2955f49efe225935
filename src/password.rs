use bcrypt::{hash, verify};

use crate::error::AppError;

const HASH_COST: u32 = 10;
const MIN_LENGTH: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "princess", "football",
    "baseball", "welcome1", "abc12345", "admin123", "letmein1", "trustno1",
    "passw0rd", "superman", "starwars", "whatever", "dragon12", "monkey12",
    "11111111", "00000000", "asdfghjk", "zaq12wsx", "1q2w3e4r", "changeme",
];

/// Rejects passwords that are short, purely numeric, common, or equal to the
/// account's own username or email local part.
pub fn check_strength(password: &str, username: Option<&str>, email: Option<&str>) -> Result<(), AppError> {
    let lowered = password.to_lowercase();
    let too_short = password.chars().count() < MIN_LENGTH;
    let numeric = !password.is_empty() && password.chars().all(|c| c.is_ascii_digit());
    let common = COMMON_PASSWORDS.contains(&lowered.as_str());
    let similar = username
        .map(|u| u.to_lowercase() == lowered)
        .unwrap_or(false)
        || email
            .and_then(|e| e.split('@').next())
            .map(|local| !local.is_empty() && local.to_lowercase() == lowered)
            .unwrap_or(false);

    if too_short || numeric || common || similar {
        return Err(AppError::weak_password());
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, HASH_COST).map_err(|e| {
        log::error!("password hash failed: {}", e);
        AppError::system_exception()
    })
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    verify(password, password_hash).unwrap_or(false)
}
