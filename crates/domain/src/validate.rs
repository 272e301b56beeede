//! Field validation helpers shared by the entity constructors.

use brigade_core::{DomainError, DomainResult};

/// Trimmed, non-empty, bounded string.
pub fn required(field: &str, value: &str, max_len: usize) -> DomainResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if v.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(v.to_string())
}

/// Like [`required`], but absent or blank input becomes `None`.
pub fn optional(field: &str, value: Option<&str>, max_len: usize) -> DomainResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => required(field, v, max_len).map(Some),
        None => Ok(None),
    }
}

/// Minimal shape check; deliverability is the mail system's problem.
pub fn email(field: &str, value: &str) -> DomainResult<String> {
    let v = required(field, value, 254)?.to_ascii_lowercase();
    match v.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => Ok(v),
        _ => Err(DomainError::validation(format!("{field} is not a valid email address"))),
    }
}
