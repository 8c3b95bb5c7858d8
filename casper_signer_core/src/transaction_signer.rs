// Deploy signing abstraction
// The manager only decides *whether* to sign; producing the signature is
// delegated through this trait.

use crate::deploy::{Approval, Deploy};
use crate::error::{SignerError, SignerResult};
use crate::platform::MaybeSendSync;
use crate::public_key::{KeyAlgorithm, KeyPair};
use log::debug;

/// Signs a deploy with the active account's key pair.
///
/// Called while the manager holds its state lock, so implementations must be
/// synchronous and must not call back into the manager.
pub trait DeploySigner: MaybeSendSync {
    fn sign_deploy(&self, deploy: &Deploy, key_pair: &KeyPair) -> SignerResult<Deploy>;
}

/// Signs the deploy hash in-process with ed25519 or secp256k1 and appends
/// the approval.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyPairSigner;

impl KeyPairSigner {
    pub fn new() -> Self {
        Self
    }
}

impl DeploySigner for KeyPairSigner {
    fn sign_deploy(&self, deploy: &Deploy, key_pair: &KeyPair) -> SignerResult<Deploy> {
        let public_key = key_pair.public_key();
        let algorithm = public_key.algorithm()?;
        let digest = deploy.hash_bytes()?;
        let secret = key_pair.secret_key().as_bytes();

        let signature = match algorithm {
            KeyAlgorithm::Ed25519 => {
                use ed25519_dalek::Signer;
                let seed: [u8; 32] = secret
                    .try_into()
                    .map_err(|_| SignerError::SigningFailed("ed25519 secret must be 32 bytes".to_string()))?;
                let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
                signing_key.sign(&digest).to_bytes().to_vec()
            }
            KeyAlgorithm::Secp256k1 => {
                use k256::ecdsa::signature::Signer;
                let signing_key = k256::ecdsa::SigningKey::from_slice(secret)
                    .map_err(|e| SignerError::SigningFailed(format!("secp256k1: {}", e)))?;
                let signature: k256::ecdsa::Signature = signing_key.sign(&digest);
                signature.to_bytes().to_vec()
            }
        };

        let mut tagged = Vec::with_capacity(1 + signature.len());
        tagged.push(algorithm.tag());
        tagged.extend_from_slice(&signature);

        let mut signed = deploy.clone();
        signed.approvals.retain(|approval| &approval.signer != public_key);
        signed.approvals.push(Approval {
            signer: public_key.clone(),
            signature: hex::encode(tagged),
        });
        debug!("Signed deploy {} with {}", signed.hash, public_key);
        Ok(signed)
    }
}
