//! Short code generation and custom alias validation.

/// Symbols a generated code is drawn from.
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub const DEFAULT_CODE_LENGTH: usize = 6;

pub const ALIAS_MIN_LENGTH: usize = 3;
pub const ALIAS_MAX_LENGTH: usize = 32;

/// Path segments under `/links/` that a code must never shadow.
const RESERVED_ALIASES: &[&str] = &["shorten", "search"];

/// Generate a random short code of `length` symbols.
///
/// Uses the thread-local RNG, which is a CSPRNG, so live codes cannot be
/// predicted from previously issued ones.
pub fn generate(length: usize) -> String {
    (0..length)
        .map(|_| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Check a caller-chosen alias. Returns the reason on failure.
pub fn validate_alias(alias: &str) -> Result<(), String> {
    let len = alias.chars().count();
    if !(ALIAS_MIN_LENGTH..=ALIAS_MAX_LENGTH).contains(&len) {
        return Err(format!(
            "Custom alias must be {ALIAS_MIN_LENGTH}-{ALIAS_MAX_LENGTH} characters"
        ));
    }

    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(
            "Custom alias may only contain letters, digits, '-' and '_'".to_string(),
        );
    }

    if RESERVED_ALIASES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(alias))
    {
        return Err(format!("Custom alias '{alias}' is reserved"));
    }

    Ok(())
}
