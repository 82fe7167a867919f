use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;

use model::booking::{REFERENCE_LENGTH, REFERENCE_PREFIX};
use rand::Rng;

use crate::{RequestError, RequestResult};

const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Hashes a password into a PHC string using argon2 with a random salt.
pub fn hash_password(password: &str) -> RequestResult<String> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|why| RequestError::Other(why.to_string().into()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|why| RequestError::Other(why.to_string().into()))
}

/// An unparsable hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(why) => {
            log::warn!("stored password hash could not be parsed: {}", why);
            false
        }
    }
}

/// A hash no account owns. Logins for unknown emails are checked against it,
/// so they take as long as logins with a wrong password.
pub fn dummy_password_hash() -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| {
        hash_password(&new_session_token()).unwrap_or_else(|why| {
            log::error!("could not prepare the dummy password hash: {}", why);
            String::new()
        })
    })
}

/// 32 random bytes, hex encoded.
pub fn new_session_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

pub fn new_booking_reference() -> String {
    let mut rng = rand::thread_rng();
    let code: String = (0..REFERENCE_LENGTH)
        .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", REFERENCE_PREFIX, code)
}
