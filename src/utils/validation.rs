use crate::error::{AppError, AppResult};

/// Trims `value` and checks its length in characters.
pub fn require_length(field: &str, value: &str, min: usize, max: usize) -> AppResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();

    if len < min {
        return Err(AppError::BadRequest(format!(
            "{} must be at least {} characters",
            field, min
        )));
    }
    if len > max {
        return Err(AppError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }

    Ok(trimmed.to_string())
}

pub fn require_range(field: &str, value: i32, min: i32, max: i32) -> AppResult<i32> {
    if value < min || value > max {
        return Err(AppError::BadRequest(format!(
            "{} must be between {} and {}",
            field, min, max
        )));
    }
    Ok(value)
}

/// Normalises a Ugandan mobile number, accepting `07XXXXXXXX`,
/// `2567XXXXXXXX` and `+2567XXXXXXXX` with any whitespace.
pub fn normalize_ugandan_mobile(raw: &str) -> Option<String> {
    let clean: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let subscriber = clean
        .strip_prefix("+256")
        .or_else(|| clean.strip_prefix("256"))
        .or_else(|| clean.strip_prefix('0'))?;

    let valid = subscriber.len() == 9
        && subscriber.starts_with('7')
        && subscriber.chars().all(|c| c.is_ascii_digit());

    valid.then_some(clean)
}

/// Loose email shape check; confirmation proves ownership.
pub fn require_email(value: &str) -> AppResult<String> {
    let email = value.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid || email.len() > 255 {
        return Err(AppError::BadRequest("A valid email address is required".to_string()));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ugandan_mobile_formats() {
        assert_eq!(
            normalize_ugandan_mobile("0771 234 567").as_deref(),
            Some("0771234567")
        );
        assert_eq!(
            normalize_ugandan_mobile("256701234567").as_deref(),
            Some("256701234567")
        );
        assert_eq!(
            normalize_ugandan_mobile("+256 752 123 456").as_deref(),
            Some("+256752123456")
        );
    }

    #[test]
    fn test_rejects_non_mobile_numbers() {
        // Landline prefix
        assert_eq!(normalize_ugandan_mobile("0414123456"), None);
        // Too short / too long
        assert_eq!(normalize_ugandan_mobile("077123456"), None);
        assert_eq!(normalize_ugandan_mobile("07712345678"), None);
        // Foreign prefix
        assert_eq!(normalize_ugandan_mobile("+254712345678"), None);
        assert_eq!(normalize_ugandan_mobile("07712a4567"), None);
    }

    #[test]
    fn test_require_length_trims() {
        assert_eq!(require_length("Full name", "  Amina  ", 2, 100).unwrap(), "Amina");
        assert!(require_length("Full name", " A ", 2, 100).is_err());
        assert!(require_length("Pickup location", &"x".repeat(201), 3, 200).is_err());
    }

    #[test]
    fn test_require_range() {
        assert_eq!(require_range("Seats", 4, 1, 8).unwrap(), 4);
        assert!(require_range("Seats", 0, 1, 8).is_err());
        assert!(require_range("Seats", 9, 1, 8).is_err());
    }

    #[test]
    fn test_require_email() {
        assert_eq!(require_email(" Rider@Example.com ").unwrap(), "rider@example.com");
        assert!(require_email("not-an-email").is_err());
        assert!(require_email("a@b").is_err());
    }
}
