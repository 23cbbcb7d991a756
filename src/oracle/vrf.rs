//! VRF randomness beacon
//!
//! Produces the random words behind each draw along with a publicly
//! verifiable proof. The beacon signs the request's domain-separated input
//! message with its sr25519 keypair; the VRF output is the SHA-256 of the
//! signature, and the signature itself is published as the proof. Anyone
//! holding the public key can re-verify a draw.

use crate::errors::OracleError;
use crate::raffle::RequestId;
use schnorrkel::context::SigningContext;
use schnorrkel::{Keypair, PublicKey, Signature};
use sha2::{Digest, Sha256};

const SIGNING_CONTEXT: &[u8] = b"tombola-raffle-vrf";

/// One fulfilled draw: the random words plus the verification bundle.
#[derive(Clone, Debug)]
pub struct VrfDraw {
    pub words: Vec<u64>,
    /// Hex-encoded VRF output (32 bytes).
    pub output: String,
    /// Hex-encoded proof (64-byte sr25519 signature).
    pub proof: String,
    /// Hex-encoded public key (32 bytes).
    pub public_key: String,
    /// Input message the proof commits to.
    pub input_message: String,
}

pub struct VrfBeacon {
    keypair: Keypair,
}

impl VrfBeacon {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn new_random() -> Self {
        use rand_core::OsRng;
        Self::new(Keypair::generate_with(OsRng))
    }

    /// Draw `num_words` random words for a request.
    ///
    /// Deterministic: the same keypair and request id always yield the same
    /// words, so a fulfilled round can be re-derived from the proof.
    pub fn draw(&self, request_id: RequestId, num_words: u32) -> Result<VrfDraw, OracleError> {
        if num_words == 0 {
            return Err(OracleError::EmptyRandomness);
        }

        let input_message = format!("request:{request_id}");
        let ctx = SigningContext::new(SIGNING_CONTEXT);
        let signature = self.keypair.sign(ctx.bytes(input_message.as_bytes()));

        let mut hasher = Sha256::new();
        hasher.update(signature.to_bytes());
        let output = hasher.finalize();

        let words = (0..num_words)
            .map(|index| {
                let mut hasher = Sha256::new();
                hasher.update(&output);
                hasher.update(index.to_le_bytes());
                let digest = hasher.finalize();
                let mut word = [0u8; 8];
                word.copy_from_slice(&digest[..8]);
                u64::from_le_bytes(word)
            })
            .collect();

        Ok(VrfDraw {
            words,
            output: hex::encode(output),
            proof: hex::encode(signature.to_bytes()),
            public_key: hex::encode(self.keypair.public.to_bytes()),
            input_message,
        })
    }

    /// Verify a published draw against its input message.
    pub fn verify_draw(draw: &VrfDraw, expected_input: &str) -> Result<bool, OracleError> {
        if draw.input_message != expected_input {
            return Ok(false);
        }

        let output = hex::decode(&draw.output)
            .map_err(|e| OracleError::Vrf(format!("invalid output hex: {e}")))?;
        let proof = hex::decode(&draw.proof)
            .map_err(|e| OracleError::Vrf(format!("invalid proof hex: {e}")))?;
        let public_key_bytes = hex::decode(&draw.public_key)
            .map_err(|e| OracleError::Vrf(format!("invalid public key hex: {e}")))?;

        let public_key = PublicKey::from_bytes(&public_key_bytes)
            .map_err(|e| OracleError::Vrf(format!("invalid public key: {e:?}")))?;
        let signature_bytes: [u8; 64] = proof
            .try_into()
            .map_err(|_| OracleError::Vrf("proof must be 64 bytes".to_string()))?;
        let signature = Signature::from_bytes(&signature_bytes)
            .map_err(|e| OracleError::Vrf(format!("invalid signature: {e:?}")))?;

        let ctx = SigningContext::new(SIGNING_CONTEXT);
        if public_key
            .verify(ctx.bytes(expected_input.as_bytes()), &signature)
            .is_err()
        {
            return Ok(false);
        }

        // the output must be derived from the proof
        let mut hasher = Sha256::new();
        hasher.update(signature_bytes);
        Ok(hasher.finalize().as_slice() == output.as_slice())
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.keypair.public.to_bytes())
    }
}
