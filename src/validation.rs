//! Input validation for the public API surface.
//! Enforces length limits and character sets before anything touches the
//! database or an outbound service.

use anyhow::{anyhow, Result};

/// Maximum lengths
pub const MAX_USERNAME_LENGTH: usize = 64;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_TODO_LENGTH: usize = 2_000;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_PROMPT_LENGTH: usize = 8_000;

/// Validate a username at signup
pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(anyhow!("username cannot be empty"));
    }

    if username.len() < MIN_USERNAME_LENGTH {
        return Err(anyhow!(
            "username too short: {} chars (min: {})",
            username.len(),
            MIN_USERNAME_LENGTH
        ));
    }

    if username.len() > MAX_USERNAME_LENGTH {
        return Err(anyhow!(
            "username too long: {} chars (max: {})",
            username.len(),
            MAX_USERNAME_LENGTH
        ));
    }

    // Only allow alphanumeric, dash, underscore, dot
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(anyhow!(
            "username contains invalid characters (allowed: alphanumeric, -, _, .)"
        ));
    }

    Ok(())
}

/// Validate a password at signup or password change
pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(anyhow!("password cannot be empty"));
    }

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(anyhow!(
            "password too short (min: {MIN_PASSWORD_LENGTH} chars)"
        ));
    }

    // bcrypt truncates beyond 72 bytes; cap well before that surprises anyone
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(anyhow!(
            "password too long (max: {MAX_PASSWORD_LENGTH} chars)"
        ));
    }

    Ok(())
}

/// Validate todo text after trimming
pub fn validate_todo_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(anyhow!("todo cannot be empty"));
    }

    if text.len() > MAX_TODO_LENGTH {
        return Err(anyhow!(
            "todo too long: {} chars (max: {})",
            text.len(),
            MAX_TODO_LENGTH
        ));
    }

    Ok(())
}

/// Validate a chat prompt after trimming
pub fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(anyhow!("prompt required"));
    }

    if prompt.len() > MAX_PROMPT_LENGTH {
        return Err(anyhow!(
            "prompt too long: {} chars (max: {})",
            prompt.len(),
            MAX_PROMPT_LENGTH
        ));
    }

    Ok(())
}
