//! Database password generation

use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of auto-generated database passwords
pub const GENERATED_PASSWORD_LENGTH: usize = 32;

/// Generate a random alphanumeric password from the OS entropy source.
///
/// Used when a `redis`-protocol database is declared without a password.
#[must_use]
pub fn generate_password() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(GENERATED_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_charset() {
        let password = generate_password();
        assert_eq!(password.len(), GENERATED_PASSWORD_LENGTH);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_passwords_differ() {
        assert_ne!(generate_password(), generate_password());
    }
}
