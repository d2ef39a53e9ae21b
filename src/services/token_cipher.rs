//! Encryption of stored provider tokens.
//!
//! Written format: `salt:nonce:ciphertext`, all hex. The key is
//! scrypt(ENCRYPTION_KEY, salt) and the cipher AES-256-GCM with a random
//! 96-bit nonce.
//!
//! Rows written before the switch use `salt:ciphertext`: the scrypt key is fed
//! through OpenSSL's `EVP_BytesToKey` (MD5, one round, no salt) to obtain an
//! AES-256-CBC key and IV. That format is decrypted but never produced.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const LEGACY_IV_LEN: usize = 16;

// scrypt N = 2^14, r = 8, p = 1
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Token encryption errors. Messages never include plaintext or key material.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid encrypted data format")]
    InvalidFormat,

    #[error("key derivation failed")]
    KeyDerivation,

    #[error("encryption failed")]
    Encryption,

    #[error("decryption failed")]
    Decryption,
}

/// Encrypts and decrypts tokens with the configured master secret.
#[derive(Clone)]
pub struct TokenCipher {
    secret: SecretString,
}

impl TokenCipher {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Encrypt `plaintext` in the current format.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let salt: [u8; SALT_LEN] = rand::random();
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let key = self.derive_key(&salt)?;

        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Encryption)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encryption)?;

        Ok(format!(
            "{}:{}:{}",
            hex::encode(salt),
            hex::encode(nonce_bytes),
            hex::encode(ciphertext)
        ))
    }

    /// Decrypt either format.
    pub fn decrypt(&self, encrypted: &str) -> Result<String, CryptoError> {
        let parts: Vec<&str> = encrypted.split(':').collect();
        let plaintext = match parts.as_slice() {
            [salt, nonce, ciphertext] => self.decrypt_gcm(salt, nonce, ciphertext)?,
            [salt, ciphertext] => self.decrypt_legacy(salt, ciphertext)?,
            _ => return Err(CryptoError::InvalidFormat),
        };
        String::from_utf8(plaintext).map_err(|_| CryptoError::Decryption)
    }

    fn decrypt_gcm(&self, salt: &str, nonce: &str, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
        let salt = decode_part(salt)?;
        let nonce = decode_part(nonce)?;
        let ciphertext = decode_part(ciphertext)?;
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::InvalidFormat);
        }

        let key = self.derive_key(&salt)?;
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Decryption)?;
        cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| CryptoError::Decryption)
    }

    fn decrypt_legacy(&self, salt: &str, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
        let salt = decode_part(salt)?;
        let ciphertext = decode_part(ciphertext)?;

        let password = self.derive_key(&salt)?;
        let (key, iv) = evp_bytes_to_key(&password);
        let cipher =
            Aes256CbcDec::new_from_slices(&key, &iv).map_err(|_| CryptoError::Decryption)?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CryptoError::Decryption)
    }

    fn derive_key(&self, salt: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
        let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
            .map_err(|_| CryptoError::KeyDerivation)?;
        let mut key = [0u8; KEY_LEN];
        scrypt::scrypt(
            self.secret.expose_secret().as_bytes(),
            salt,
            &params,
            &mut key,
        )
        .map_err(|_| CryptoError::KeyDerivation)?;
        Ok(key)
    }
}

fn decode_part(part: &str) -> Result<Vec<u8>, CryptoError> {
    if part.is_empty() {
        return Err(CryptoError::InvalidFormat);
    }
    hex::decode(part).map_err(|_| CryptoError::InvalidFormat)
}

/// OpenSSL `EVP_BytesToKey` with MD5, no salt and a single iteration.
fn evp_bytes_to_key(password: &[u8]) -> ([u8; KEY_LEN], [u8; LEGACY_IV_LEN]) {
    let mut derived = Vec::with_capacity(KEY_LEN + LEGACY_IV_LEN);
    let mut previous: Vec<u8> = Vec::new();

    while derived.len() < KEY_LEN + LEGACY_IV_LEN {
        let mut hasher = Md5::new();
        hasher.update(&previous);
        hasher.update(password);
        previous = hasher.finalize().to_vec();
        derived.extend_from_slice(&previous);
    }

    let mut key = [0u8; KEY_LEN];
    let mut iv = [0u8; LEGACY_IV_LEN];
    key.copy_from_slice(&derived[..KEY_LEN]);
    iv.copy_from_slice(&derived[KEY_LEN..KEY_LEN + LEGACY_IV_LEN]);
    (key, iv)
}
