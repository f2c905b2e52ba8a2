//! Password strength validation.
//!
//! A pure policy check applied before hashing at the edge. Each unmet
//! requirement yields one human-readable error; strength is a coarse
//! score over length and character classes.

/// Coarse strength classification of a candidate password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStrength {
    /// Fails one or more requirements, or barely passes.
    Weak,
    /// Meets the requirements with a modest score.
    Medium,
    /// Long and diverse.
    Strong,
}

/// Outcome of validating a candidate password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordValidation {
    /// Whether every requirement is met.
    pub is_valid: bool,
    /// One message per unmet requirement.
    pub errors: Vec<String>,
    /// Coarse strength classification.
    pub strength: PasswordStrength,
}

const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Validate a candidate password against the platform policy.
#[must_use]
pub fn validate_password(password: &str) -> PasswordValidation {
    let mut errors = Vec::new();
    let mut score = 0u32;

    let length = password.chars().count();
    if length < 8 {
        errors.push("Password must be at least 8 characters long".to_string());
    } else if length >= 12 {
        score += 2;
    } else {
        score += 1;
    }

    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 1;
    } else {
        errors.push("Password must contain at least one uppercase letter".to_string());
    }

    if password.chars().any(|c| c.is_ascii_lowercase()) {
        score += 1;
    } else {
        errors.push("Password must contain at least one lowercase letter".to_string());
    }

    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    } else {
        errors.push("Password must contain at least one number".to_string());
    }

    if password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        score += 1;
    } else {
        errors.push("Password must contain at least one special character".to_string());
    }

    let strength = if score >= 5 {
        PasswordStrength::Strong
    } else if score >= 3 {
        PasswordStrength::Medium
    } else {
        PasswordStrength::Weak
    };

    PasswordValidation {
        is_valid: errors.is_empty(),
        errors,
        strength,
    }
}
