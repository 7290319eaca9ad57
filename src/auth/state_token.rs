//! Anti-forgery state tokens for the authorization-code flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::types::StateToken;

/// Bytes of OS entropy in each state token.
pub const STATE_TOKEN_BYTES: usize = 48;

/// Generate a state token: 48 random bytes, base64url without padding
/// (64 characters).
///
/// Errors only when the OS entropy source is unavailable.
pub fn generate_state_token() -> Result<StateToken, getrandom::Error> {
    let mut bytes = [0u8; STATE_TOKEN_BYTES];
    getrandom::getrandom(&mut bytes)?;
    Ok(StateToken::new(URL_SAFE_NO_PAD.encode(bytes)))
}

/// Compare a received state with the pending one in constant time.
pub fn state_matches(expected: &StateToken, received: &str) -> bool {
    let expected = expected.as_str().as_bytes();
    let received = received.as_bytes();
    if expected.len() != received.len() {
        return false;
    }
    expected
        .iter()
        .zip(received)
        .fold(0, |acc, (a, b)| acc | (a ^ b))
        == 0
}
