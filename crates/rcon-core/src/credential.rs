//! Credential verification.
//!
//! A `CredentialRecord` holds a salt and the expected digest of the
//! configured RCON password. The plaintext password is never retained: it
//! exists only for the duration of the `hash`/`verify` call that consumes
//! it.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

const SALT_LEN: usize = 16;

/// A verified-password record: a random salt and the digest it produces
/// when combined with the correct password.
///
/// Deliberately does not derive `Debug`: a derived impl would print both
/// fields, and both are secret-derived. The manual impl below redacts
/// them.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    salt: Vec<u8>,
    expected_digest: Vec<u8>,
}

impl CredentialRecord {
    /// Hash `password` with a freshly generated random salt.
    ///
    /// # Panics
    ///
    /// Panics if the OS RNG fails. A server that cannot source
    /// cryptographic randomness for its own credential salt cannot operate
    /// securely.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn hash(password: &str) -> Self {
        let mut salt = vec![0u8; SALT_LEN];
        getrandom::fill(&mut salt).expect("invariant: OS RNG failure is unrecoverable");

        let expected_digest = digest(&salt, password);

        Self { salt, expected_digest }
    }

    /// Verify `candidate` against this record in constant time.
    ///
    /// `candidate` is wrapped internally so its plaintext bytes are wiped
    /// from memory as soon as this call returns.
    #[must_use]
    pub fn verify(&self, candidate: &str) -> bool {
        let candidate = Zeroizing::new(candidate.to_string());
        let candidate_digest = digest(&self.salt, candidate.as_str());
        candidate_digest.ct_eq(&self.expected_digest).into()
    }

    /// Encode as the on-disk form `Base64(salt):Base64(digest)`.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}:{}", BASE64.encode(&self.salt), BASE64.encode(&self.expected_digest))
    }

    /// Parse the on-disk form `Base64(salt):Base64(digest)`.
    ///
    /// # Errors
    ///
    /// Returns `Err` with a human-readable reason if the string is not
    /// exactly two colon-separated, valid-base64 fields.
    pub fn decode(encoded: &str) -> Result<Self, CredentialDecodeError> {
        let (salt_b64, digest_b64) =
            encoded.split_once(':').ok_or(CredentialDecodeError::MissingSeparator)?;

        let salt =
            BASE64.decode(salt_b64).map_err(|_| CredentialDecodeError::InvalidBase64("salt"))?;
        let expected_digest = BASE64
            .decode(digest_b64)
            .map_err(|_| CredentialDecodeError::InvalidBase64("digest"))?;

        Ok(Self { salt, expected_digest })
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord").field("salt", &"<redacted>").finish_non_exhaustive()
    }
}

/// Error returned by [`CredentialRecord::decode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialDecodeError {
    /// The string did not contain the `:` separator between salt and
    /// digest.
    #[error("credential record is missing the ':' separator")]
    MissingSeparator,
    /// One of the two fields was not valid base64.
    #[error("credential {0} field is not valid base64")]
    InvalidBase64(&'static str),
}

fn digest(salt: &[u8], secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}
