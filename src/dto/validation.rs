//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::error::GameError;

/// Longest accepted display name, in characters.
pub const MAX_NAME_CHARS: usize = 32;
/// Longest accepted room code, in characters.
const MAX_ROOM_CODE_CHARS: usize = 8;

/// Validates that a host or player display name is non-blank and reasonably short.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Dana")  // Ok
/// validate_display_name("   ")   // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Name must not be empty".into());
        return Err(err);
    }

    let chars = trimmed.chars().count();
    if chars > MAX_NAME_CHARS {
        let mut err = ValidationError::new("name_length");
        err.message = Some(
            format!("Name must be at most {MAX_NAME_CHARS} characters (got {chars})").into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that a room code is a short alphanumeric token.
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    let trimmed = code.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_ROOM_CODE_CHARS {
        let mut err = ValidationError::new("room_code_length");
        err.message = Some(
            format!("Room code must be 1 to {MAX_ROOM_CODE_CHARS} characters").into(),
        );
        return Err(err);
    }

    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Trim a display name and reject it when invalid.
pub fn sanitize_display_name(name: &str) -> Result<String, GameError> {
    validate_display_name(name).map_err(|err| {
        GameError::InvalidName(
            err.message
                .map(|message| message.into_owned())
                .unwrap_or_else(|| err.code.into_owned()),
        )
    })?;
    Ok(name.trim().to_string())
}

/// Canonical form of a room code as typed by a player.
pub fn normalize_room_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
