use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose};

use crate::app_error::{AppError, AppResult};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// AES-256-GCM envelope for gateway secrets at rest.
///
/// Ciphertext layout: base64(nonce || ciphertext+tag), fresh random nonce per call.
#[derive(Clone)]
pub struct ProcessCipher {
    key: aes_gcm::Key<Aes256Gcm>,
}

impl ProcessCipher {
    pub fn new_from_base64(key_b64: &str) -> AppResult<Self> {
        let raw = general_purpose::STANDARD
            .decode(key_b64.trim().as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid CREDENTIALS_KEY: {e}")))?;
        if raw.len() != KEY_LEN {
            return Err(AppError::Internal(
                "CREDENTIALS_KEY must decode to 32 bytes".into(),
            ));
        }
        let key = aes_gcm::Key::<Aes256Gcm>::from_slice(&raw);
        Ok(Self { key: *key })
    }

    pub fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        let cipher = Aes256Gcm::new(&self.key);
        let nonce_bytes = rand::random::<[u8; NONCE_LEN]>();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let mut buffer = Vec::with_capacity(NONCE_LEN + plaintext.len() + 16);
        buffer.extend_from_slice(nonce);
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Internal(format!("encrypt failed: {e}")))?;
        buffer.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(buffer))
    }

    pub fn decrypt(&self, data_b64: &str) -> AppResult<String> {
        let data = general_purpose::STANDARD
            .decode(data_b64.as_bytes())
            .map_err(|e| AppError::Internal(format!("decrypt decode failed: {e}")))?;
        if data.len() <= NONCE_LEN {
            return Err(AppError::Internal("ciphertext too short".into()));
        }
        let (nonce_bytes, cipher_bytes) = data.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(&self.key);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), cipher_bytes)
            .map_err(|e| AppError::Internal(format!("decrypt failed: {e}")))?;
        String::from_utf8(plaintext).map_err(|e| AppError::Internal(e.to_string()))
    }
}
