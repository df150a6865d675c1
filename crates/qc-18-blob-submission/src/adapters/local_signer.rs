//! # Ed25519 Signer
//!
//! In-memory signer for tests and local tooling. Key storage and wallets are
//! out of scope; production callers plug their own `Signer`.

use ed25519_dalek::{Signer as _, SigningKey};
use rand::Rng;

use crate::domain::{Address, SignerError};
use crate::ports::Signer;

/// Ed25519 key held in memory. The secret is zeroized on drop.
pub struct Ed25519Signer {
    signing_key: SigningKey,
    address: Address,
}

impl Ed25519Signer {
    /// Create from a 32-byte secret seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let address = Address::from_public_key(&signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Fresh random key.
    pub fn random() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill(&mut seed);
        Self::from_seed(seed)
    }
}

impl Signer for Ed25519Signer {
    fn address(&self) -> Address {
        self.address
    }

    fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    fn sign(&self, message: &[u8]) -> Result<[u8; 64], SignerError> {
        Ok(self.signing_key.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    #[test]
    fn test_signature_verifies_under_public_key() {
        let signer = Ed25519Signer::random();
        let sig = signer.sign(b"pay-for-blobs").unwrap();
        let key = VerifyingKey::from_bytes(&signer.public_key()).unwrap();
        assert!(key
            .verify(b"pay-for-blobs", &Signature::from_bytes(&sig))
            .is_ok());
    }

    #[test]
    fn test_address_is_derived_from_public_key() {
        let signer = Ed25519Signer::from_seed([9u8; 32]);
        assert_eq!(signer.address(), Address::from_public_key(&signer.public_key()));
        assert_eq!(
            Ed25519Signer::from_seed([9u8; 32]).address(),
            signer.address()
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = Ed25519Signer::from_seed([1u8; 32]);
        let rendered = format!("{:?}", signer);
        assert!(rendered.contains("celestia1"));
        assert!(!rendered.contains("signing_key"));
    }
}
