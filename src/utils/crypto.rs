use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

/// Argon2-encodes a plain password. Callers persist the returned PHC string.
pub fn encode_password(plain: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let encoded = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)?
        .to_string();
    Ok(encoded)
}

pub fn verify_password(plain: &str, encoded: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(encoded)?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_password_verifies_only_against_its_plain_text() {
        let encoded = encode_password("s3cret-pass").unwrap();
        assert_ne!(encoded, "s3cret-pass");
        assert!(verify_password("s3cret-pass", &encoded).unwrap());
        assert!(!verify_password("wrong", &encoded).unwrap());
    }
}
