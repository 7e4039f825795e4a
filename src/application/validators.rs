use rand::RngCore;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::BrowserInfo;

pub const MAX_REFERENCE_LEN: usize = 64;
const MAX_TIMEZONE_OFFSET_MINUTES: u32 = 840;
const MAX_COLOR_DEPTH: u8 = 48;

/// Uses the caller's reference when given, otherwise generates `sp_<32 hex>`.
pub fn resolve_reference(supplied: Option<&str>) -> AppResult<String> {
    match supplied {
        Some(reference) => {
            validate_reference(reference)?;
            Ok(reference.to_string())
        }
        None => Ok(generate_reference()),
    }
}

/// `sp_` followed by 32 random hex characters.
pub fn generate_reference() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("sp_{}", hex::encode(bytes))
}

/// 1 to [`MAX_REFERENCE_LEN`] characters of `[A-Za-z0-9_-]`.
pub fn validate_reference(reference: &str) -> AppResult<()> {
    if reference.is_empty() || reference.len() > MAX_REFERENCE_LEN {
        return Err(AppError::Validation(format!(
            "reference must be 1-{MAX_REFERENCE_LEN} characters"
        )));
    }
    if !reference
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(
            "reference may only contain letters, digits, '-' and '_'".into(),
        ));
    }
    Ok(())
}

pub fn validate_amount(amount_minor_units: i64) -> AppResult<()> {
    if amount_minor_units <= 0 {
        return Err(AppError::Validation(
            "amount_minor_units must be a positive integer".into(),
        ));
    }
    Ok(())
}

pub fn validate_currency(currency: &str) -> AppResult<()> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(AppError::Validation(
            "currency must be a three-letter ISO code".into(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::Validation("a valid email is required".into())),
    }
}

pub fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Bounds for the 3DS v2 browser fingerprint, checked before any row is
/// written so a malformed request never burns a reference.
pub fn validate_browser_info(info: &BrowserInfo) -> AppResult<()> {
    if info.color_depth == 0 || info.color_depth > MAX_COLOR_DEPTH {
        return Err(AppError::Validation("browser color_depth is out of range".into()));
    }
    if info.screen_width == 0 || info.screen_height == 0 {
        return Err(AppError::Validation("browser screen size is required".into()));
    }
    require_non_empty("browser language", &info.language)?;
    require_non_empty("browser user_agent", &info.user_agent)?;
    if info.timezone_offset_minutes.unsigned_abs() > MAX_TIMEZONE_OFFSET_MINUTES {
        return Err(AppError::Validation(
            "browser timezone offset is out of range".into(),
        ));
    }
    Ok(())
}
