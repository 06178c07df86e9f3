//! RSA-OAEP (SHA-256) payload encryption for batch uploads.
//!
//! Payloads longer than one OAEP block are split into chunks; each chunk
//! encrypts to exactly `key size` bytes, so the ciphertext is a plain
//! concatenation that the receiver splits at the same width.

use crate::error::CryptoError;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::path::Path;

/// Request header that marks an encrypted body.
pub const ENCRYPTION_HEADER: &str = "x-payload-encryption";
/// Value of [`ENCRYPTION_HEADER`] for RSA-OAEP with SHA-256.
pub const ENCRYPTION_SCHEME: &str = "rsa-oaep-sha256";

// OAEP overhead: two digests plus two bytes.
const OAEP_OVERHEAD: usize = 2 * 32 + 2;

fn read_pem(path: &Path) -> Result<String, CryptoError> {
    std::fs::read_to_string(path).map_err(|source| CryptoError::KeyFile {
        path: path.display().to_string(),
        source,
    })
}

/// Agent-side half, holding the server's public key.
#[derive(Debug, Clone)]
pub struct Encryptor {
    key: RsaPublicKey,
}

impl Encryptor {
    /// Parses a PEM encoded SubjectPublicKeyInfo (`BEGIN PUBLIC KEY`).
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { key })
    }

    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, CryptoError> {
        Self::from_pem(&read_pem(path.as_ref())?)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let block = self.key.size();
        let chunk_len = block.saturating_sub(OAEP_OVERHEAD);
        if chunk_len == 0 {
            return Err(CryptoError::InvalidKey(format!("key of {block} bytes is too small")));
        }

        let mut rng = rand::thread_rng();
        let mut out = Vec::with_capacity(plaintext.len().div_ceil(chunk_len) * block);
        for chunk in plaintext.chunks(chunk_len) {
            out.extend(self.key.encrypt(&mut rng, Oaep::new::<Sha256>(), chunk)?);
        }
        Ok(out)
    }
}

/// Server-side half, holding the private key.
#[derive(Debug, Clone)]
pub struct Decryptor {
    key: RsaPrivateKey,
}

impl Decryptor {
    /// Parses a PKCS#1 (`BEGIN RSA PRIVATE KEY`) or PKCS#8 PEM private key.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { key })
    }

    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, CryptoError> {
        Self::from_pem(&read_pem(path.as_ref())?)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let block = self.key.size();
        if ciphertext.len() % block != 0 {
            return Err(CryptoError::InvalidKey(format!(
                "ciphertext length {} is not a multiple of {block}",
                ciphertext.len()
            )));
        }

        let mut out = Vec::with_capacity(ciphertext.len());
        for chunk in ciphertext.chunks(block) {
            out.extend(self.key.decrypt(Oaep::new::<Sha256>(), chunk)?);
        }
        Ok(out)
    }
}
