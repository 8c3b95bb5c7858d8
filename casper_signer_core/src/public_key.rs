// Algorithm-tagged Casper keys
//
// Any mention of a public key in "account hex" form refers to the hex-encoded
// key bytes prefixed with one byte naming the algorithm:
//   01 - ed25519
//   02 - secp256k1

use crate::error::{SignerError, SignerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ED25519_TAG: u8 = 0x01;
pub const SECP256K1_TAG: u8 = 0x02;

const ED25519_PUBLIC_KEY_LEN: usize = 32;
const SECP256K1_PUBLIC_KEY_LEN: usize = 33;
const SECRET_KEY_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    Ed25519,
    Secp256k1,
}

impl KeyAlgorithm {
    pub fn tag(self) -> u8 {
        match self {
            KeyAlgorithm::Ed25519 => ED25519_TAG,
            KeyAlgorithm::Secp256k1 => SECP256K1_TAG,
        }
    }

    pub fn from_tag(tag: u8) -> SignerResult<Self> {
        match tag {
            ED25519_TAG => Ok(KeyAlgorithm::Ed25519),
            SECP256K1_TAG => Ok(KeyAlgorithm::Secp256k1),
            other => Err(SignerError::UnsupportedKeyAlgorithm(other)),
        }
    }

    fn public_key_len(self) -> usize {
        match self {
            KeyAlgorithm::Ed25519 => ED25519_PUBLIC_KEY_LEN,
            KeyAlgorithm::Secp256k1 => SECP256K1_PUBLIC_KEY_LEN,
        }
    }
}

/// Public key as handed over by the vault.
///
/// The tag is stored raw rather than as a [`KeyAlgorithm`] so that a key with
/// an unknown tag can still be carried around and rejected at the point where
/// the algorithm actually matters.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey {
    tag: u8,
    bytes: Vec<u8>,
}

impl PublicKey {
    pub fn new(algorithm: KeyAlgorithm, bytes: Vec<u8>) -> SignerResult<Self> {
        if bytes.len() != algorithm.public_key_len() {
            return Err(SignerError::InvalidKey(format!(
                "{:?} public key must be {} bytes, got {}",
                algorithm,
                algorithm.public_key_len(),
                bytes.len()
            )));
        }
        Ok(Self { tag: algorithm.tag(), bytes })
    }

    /// Build a key without checking the tag or length.
    pub fn from_raw_parts(tag: u8, bytes: Vec<u8>) -> Self {
        Self { tag, bytes }
    }

    /// Parse the account-hex form (`01…` / `02…`).
    pub fn from_account_hex(account_hex: &str) -> SignerResult<Self> {
        let raw = hex::decode(account_hex.trim())
            .map_err(|e| SignerError::InvalidKey(format!("not valid hex: {}", e)))?;
        let (tag, bytes) = raw
            .split_first()
            .ok_or_else(|| SignerError::InvalidKey("empty key".to_string()))?;
        let algorithm = KeyAlgorithm::from_tag(*tag)?;
        Self::new(algorithm, bytes.to_vec())
    }

    pub fn tag(&self) -> u8 {
        self.tag
    }

    pub fn algorithm(&self) -> SignerResult<KeyAlgorithm> {
        KeyAlgorithm::from_tag(self.tag)
    }

    /// Key bytes without the algorithm prefix.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_account_hex(&self) -> String {
        let mut out = String::with_capacity(2 + self.bytes.len() * 2);
        out.push_str(&hex::encode([self.tag]));
        out.push_str(&hex::encode(&self.bytes));
        out
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_account_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_account_hex())
    }
}

impl TryFrom<String> for PublicKey {
    type Error = SignerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PublicKey::from_account_hex(&value)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_account_hex()
    }
}

/// Secret scalar / seed bytes. Never printed.
#[derive(Clone)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    public_key: PublicKey,
    secret_key: SecretKey,
}

impl KeyPair {
    /// Derive the public half from a 32-byte secret.
    pub fn from_secret_bytes(algorithm: KeyAlgorithm, secret: &[u8]) -> SignerResult<Self> {
        if secret.len() != SECRET_KEY_LEN {
            return Err(SignerError::InvalidKey(format!(
                "secret key must be {} bytes, got {}",
                SECRET_KEY_LEN,
                secret.len()
            )));
        }

        let public_bytes = match algorithm {
            KeyAlgorithm::Ed25519 => {
                let mut seed = [0u8; SECRET_KEY_LEN];
                seed.copy_from_slice(secret);
                let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
                signing_key.verifying_key().to_bytes().to_vec()
            }
            KeyAlgorithm::Secp256k1 => {
                let signing_key = k256::ecdsa::SigningKey::from_slice(secret)
                    .map_err(|e| SignerError::InvalidKey(format!("secp256k1: {}", e)))?;
                signing_key
                    .verifying_key()
                    .to_encoded_point(true)
                    .as_bytes()
                    .to_vec()
            }
        };

        Ok(Self {
            public_key: PublicKey::new(algorithm, public_bytes)?,
            secret_key: SecretKey(secret.to_vec()),
        })
    }

    pub fn from_secret_hex(algorithm: KeyAlgorithm, secret_hex: &str) -> SignerResult<Self> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|e| SignerError::InvalidKey(format!("secret key is not valid hex: {}", e)))?;
        Self::from_secret_bytes(algorithm, &bytes)
    }

    /// Pair an externally supplied public key with a secret as-is.
    ///
    /// Used when the vault hands over a key whose tag this crate may not
    /// understand; signing with such a pair fails later with
    /// [`SignerError::UnsupportedKeyAlgorithm`].
    pub fn from_parts(public_key: PublicKey, secret: Vec<u8>) -> Self {
        Self {
            public_key,
            secret_key: SecretKey(secret),
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }
}
