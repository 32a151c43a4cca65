use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const NONCE_LEN: usize = 12;

/// AES-256-GCM sealing of OAuth tokens at rest.
///
/// Sealed values are base64 text of `nonce || ciphertext` so they fit a TEXT column.
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    /// Create from a base64-encoded 32-byte key.
    pub fn new(key_base64: &str) -> Result<Self, EncryptionError> {
        let key_bytes = STANDARD
            .decode(key_base64.trim())
            .map_err(|_| EncryptionError::InvalidKey)?;

        if key_bytes.len() != 32 {
            return Err(EncryptionError::InvalidKey);
        }

        let cipher = Aes256Gcm::new_from_slice(&key_bytes).map_err(|_| EncryptionError::InvalidKey)?;

        Ok(Self { cipher })
    }

    pub fn seal(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError::EncryptFailed)?;

        let mut output = nonce.to_vec();
        output.extend(ciphertext);
        Ok(STANDARD.encode(output))
    }

    pub fn open(&self, sealed: &str) -> Result<String, EncryptionError> {
        let data = STANDARD
            .decode(sealed)
            .map_err(|_| EncryptionError::DecryptFailed)?;
        if data.len() < NONCE_LEN {
            return Err(EncryptionError::DecryptFailed);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| EncryptionError::DecryptFailed)?;

        String::from_utf8(plaintext).map_err(|_| EncryptionError::DecryptFailed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    #[error("Invalid encryption key (must be 32 bytes, base64-encoded)")]
    InvalidKey,

    #[error("Encryption failed")]
    EncryptFailed,

    #[error("Decryption failed")]
    DecryptFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> TokenCipher {
        TokenCipher::new(&STANDARD.encode([7u8; 32])).unwrap()
    }

    #[test]
    fn test_seal_then_open() {
        let cipher = cipher();
        let sealed = cipher.seal("ya29.access-token").unwrap();
        assert_ne!(sealed, "ya29.access-token");
        assert_eq!(cipher.open(&sealed).unwrap(), "ya29.access-token");
    }

    #[test]
    fn test_nonce_differs_per_seal() {
        let cipher = cipher();
        assert_ne!(cipher.seal("same").unwrap(), cipher.seal("same").unwrap());
    }

    #[test]
    fn test_tampered_value_is_rejected() {
        let cipher = cipher();
        let mut raw = STANDARD.decode(cipher.seal("refresh").unwrap()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        assert!(cipher.open(&STANDARD.encode(raw)).is_err());
        assert!(cipher.open("not base64!").is_err());
    }

    #[test]
    fn test_key_must_be_32_bytes() {
        assert!(TokenCipher::new(&STANDARD.encode([1u8; 16])).is_err());
        assert!(TokenCipher::new("???").is_err());
    }
}
