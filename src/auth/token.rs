//! Opaque single-use tokens for verification and reset links.

use rand::{rngs::OsRng, RngCore};

/// Random bytes per token; hex encoding doubles the length.
pub const TOKEN_BYTES: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("random source unavailable: {0}")]
    RandomSourceUnavailable(#[from] rand::Error),
}

/// Generate a URL-safe token from the operating system RNG.
///
/// There is no fallback generator: if the OS cannot provide entropy the
/// caller gets an error.
pub fn generate_token() -> Result<String, TokenError> {
    let mut buf = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut buf)?;
    Ok(hex::encode(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn token_has_fixed_length_and_is_url_safe() {
        let token = generate_token().expect("os rng");
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..256).map(|_| generate_token().unwrap()).collect();
        assert_eq!(tokens.len(), 256);
    }
}
