//! Login credential checks.
//!
//! A single identity is supported. The password is kept only as a salted
//! SHA-256 digest, encoded as `sha256$<salt>$<hex digest>`.

use anyhow::{Context, Result, anyhow};
use sha2::{Digest, Sha256};

const SCHEME: &str = "sha256";
const DIGEST_LEN: usize = 32;

pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// One configured username and its salted password digest.
#[derive(Debug, Clone)]
pub struct StaticCredential {
    username: String,
    salt: String,
    digest: Vec<u8>,
}

impl StaticCredential {
    /// Hash `password` under a fresh random salt.
    pub fn from_password(username: impl Into<String>, password: &str) -> Self {
        let salt = uuid::Uuid::new_v4().simple().to_string();
        let digest = salted_digest(&salt, password);
        Self { username: username.into(), salt, digest }
    }

    /// Parse a previously encoded hash, e.g. from the config file.
    pub fn from_encoded(username: impl Into<String>, encoded: &str) -> Result<Self> {
        let mut parts = encoded.splitn(3, '$');
        let (Some(scheme), Some(salt), Some(digest)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(anyhow!("Password hash must look like `sha256$<salt>$<hex>`"));
        };

        if scheme != SCHEME {
            return Err(anyhow!("Unsupported password hash scheme '{scheme}'"));
        }
        if salt.is_empty() {
            return Err(anyhow!("Password hash has an empty salt"));
        }

        let digest = hex::decode(digest).context("Password hash digest is not valid hex")?;
        if digest.len() != DIGEST_LEN {
            return Err(anyhow!("Password hash digest must be {DIGEST_LEN} bytes"));
        }

        Ok(Self { username: username.into(), salt: salt.to_string(), digest })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Encoded form suitable for the `login.password_hash` config key.
    pub fn encoded(&self) -> String {
        format!("{SCHEME}${}${}", self.salt, hex::encode(&self.digest))
    }
}

impl CredentialVerifier for StaticCredential {
    fn verify(&self, username: &str, password: &str) -> bool {
        let candidate = salted_digest(&self.salt, password);
        // no short-circuit between the two checks
        let user_ok = username == self.username;
        let pass_ok = constant_time_eq(&candidate, &self.digest);
        user_ok & pass_ok
    }
}

/// Rejects every login. Used when no credential is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Locked;

impl CredentialVerifier for Locked {
    fn verify(&self, _username: &str, _password: &str) -> bool {
        false
    }
}

fn salted_digest(salt: &str, password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_credentials() {
        let cred = StaticCredential::from_password("harish", "56789");
        assert!(cred.verify("harish", "56789"));
    }

    #[test]
    fn rejects_wrong_password_or_username() {
        let cred = StaticCredential::from_password("harish", "56789");

        assert!(!cred.verify("harish", "5678"));
        assert!(!cred.verify("Harish", "56789"));
        assert!(!cred.verify("", ""));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = StaticCredential::from_password("harish", "56789");
        let b = StaticCredential::from_password("harish", "56789");

        assert_ne!(a.encoded(), b.encoded());
    }

    #[test]
    fn encoded_hash_roundtrips() {
        let original = StaticCredential::from_password("harish", "56789");
        let parsed = StaticCredential::from_encoded("harish", &original.encoded())
            .expect("encoded hash should parse");

        assert!(parsed.verify("harish", "56789"));
        assert!(!parsed.verify("harish", "wrong"));
    }

    #[test]
    fn malformed_hash_is_rejected() {
        assert!(StaticCredential::from_encoded("u", "plain-text").is_err());
        assert!(StaticCredential::from_encoded("u", "md5$salt$abcd").is_err());
        assert!(StaticCredential::from_encoded("u", "sha256$salt$nothex").is_err());
        assert!(StaticCredential::from_encoded("u", "sha256$$00").is_err());
    }

    #[test]
    fn digest_must_be_full_length() {
        let short = format!("sha256$salt${}", "ab".repeat(DIGEST_LEN - 1));
        let err = StaticCredential::from_encoded("u", &short).unwrap_err();

        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn encoded_digest_is_lowercase_hex() {
        let encoded = StaticCredential::from_password("harish", "56789").encoded();
        let digest = encoded.rsplit('$').next().unwrap();

        assert_eq!(digest.len(), DIGEST_LEN * 2);
        assert_eq!(hex::decode(digest).unwrap().len(), DIGEST_LEN);
        assert_eq!(digest, digest.to_ascii_lowercase());
    }

    #[test]
    fn uppercase_hex_digest_still_verifies() {
        let cred = StaticCredential::from_password("harish", "56789");
        let encoded = cred.encoded();
        let (prefix, digest) = encoded.rsplit_once('$').unwrap();
        let upper = format!("{prefix}${}", digest.to_ascii_uppercase());

        let parsed = StaticCredential::from_encoded("harish", &upper).unwrap();
        assert!(parsed.verify("harish", "56789"));
    }

    #[test]
    fn locked_rejects_everything() {
        assert!(!Locked.verify("harish", "56789"));
    }
}
