//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::session::{MAX_NICKNAME_CHARS, normalize_nickname};

/// Characters used in join codes: uppercase alphanumerics without look-alikes (0/O, 1/I/L).
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
/// Length of a join code.
pub const JOIN_CODE_LENGTH: usize = 6;

/// Validates that a nickname is non-blank and at most [`MAX_NICKNAME_CHARS`]
/// characters once whitespace is collapsed.
///
/// # Examples
///
/// ```ignore
/// validate_nickname("  Ada   L ") // Ok - normalised to "Ada L"
/// validate_nickname("   ")        // Err - blank
/// ```
pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    if normalize_nickname(nickname).is_err() {
        let mut err = ValidationError::new("nickname_length");
        err.message = Some(
            format!("Nickname must contain between 1 and {MAX_NICKNAME_CHARS} characters").into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Validates that a join code is exactly six characters from [`JOIN_CODE_ALPHABET`].
///
/// Lowercase input is accepted since codes are matched case-insensitively.
pub fn validate_join_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != JOIN_CODE_LENGTH {
        let mut err = ValidationError::new("join_code_length");
        err.message = Some(
            format!(
                "Join code must be exactly {JOIN_CODE_LENGTH} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .bytes()
        .all(|c| JOIN_CODE_ALPHABET.contains(&c.to_ascii_uppercase()))
    {
        let mut err = ValidationError::new("join_code_format");
        err.message = Some("Join code contains characters outside the allowed alphabet".into());
        return Err(err);
    }

    Ok(())
}
