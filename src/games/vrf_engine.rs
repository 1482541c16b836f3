use crate::errors::RandomnessError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schnorrkel::context::SigningContext;
use schnorrkel::{ExpansionMode, Keypair, MiniSecretKey, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const VRF_SIGNING_CONTEXT: &[u8] = b"wagerflip";

/// A per-call stream of random coin outcomes
pub trait RandomGenerator {
    /// Next outcome; `true` means heads
    fn generate_bool(&mut self) -> bool;

    /// Proof material that lets anyone replay this stream
    fn attestation(&self) -> Option<VrfBundle> {
        None
    }
}

/// Source of randomness generators.
///
/// The engine asks for exactly one generator per batch call, seeded with a context
/// string unique to that call.
pub trait RandomnessOracle {
    type Generator: RandomGenerator;

    fn new_generator(&self, context: &str) -> Self::Generator;
}

/// VRF bundle containing cryptographic proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfBundle {
    /// Hex-encoded VRF output (32 bytes), the seed of the outcome stream
    pub vrf_output: String,
    /// Hex-encoded VRF proof (64-byte schnorrkel signature)
    pub vrf_proof: String,
    /// Hex-encoded public key (32 bytes)
    pub public_key: String,
    /// Input message used for VRF
    pub input_message: String,
}

/// Deterministic outcome stream: SHA-256 in counter mode over a 32-byte seed.
/// Each outcome consumes one byte; an even byte is heads.
#[derive(Debug, Clone)]
pub struct HashStream {
    seed: [u8; 32],
    counter: u64,
    block: [u8; 32],
    pos: usize,
}

impl HashStream {
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            seed,
            counter: 0,
            block: [0u8; 32],
            pos: 32,
        }
    }

    fn next_byte(&mut self) -> u8 {
        if self.pos == self.block.len() {
            let mut hasher = Sha256::new();
            hasher.update(self.seed);
            hasher.update(self.counter.to_be_bytes());
            self.block = hasher.finalize().into();
            self.counter += 1;
            self.pos = 0;
        }
        let byte = self.block[self.pos];
        self.pos += 1;
        byte
    }

    pub fn next_outcome(&mut self) -> bool {
        self.next_byte() % 2 == 0
    }
}

/// Generator produced by `VrfOracle`
#[derive(Debug, Clone)]
pub struct VrfGenerator {
    stream: HashStream,
    bundle: VrfBundle,
}

impl RandomGenerator for VrfGenerator {
    fn generate_bool(&mut self) -> bool {
        self.stream.next_outcome()
    }

    fn attestation(&self) -> Option<VrfBundle> {
        Some(self.bundle.clone())
    }
}

/// VRF-backed randomness oracle
pub struct VrfOracle {
    keypair: Arc<Keypair>,
}

impl VrfOracle {
    /// Create a new VRF oracle with a keypair
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Create a new VRF oracle with a random keypair
    pub fn new_random() -> Self {
        use rand_core::OsRng;
        let keypair = Keypair::generate_with(OsRng);
        Self::new(keypair)
    }

    /// Derive the oracle key from a 32-byte secret seed
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, RandomnessError> {
        let mini = MiniSecretKey::from_bytes(seed)
            .map_err(|e| RandomnessError::KeyDerivation(format!("{:?}", e)))?;
        Ok(Self::new(mini.expand_to_keypair(ExpansionMode::Ed25519)))
    }

    /// Sign `context` and derive the 32-byte output from the signature
    fn vrf_sign(&self, message: &[u8]) -> ([u8; 32], [u8; 64]) {
        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        let signature = self.keypair.sign(ctx.bytes(message));
        let proof = signature.to_bytes();
        (output_from_proof(&proof), proof)
    }

    /// Verify a VRF bundle against the context it claims to have signed
    pub fn verify_vrf_proof(bundle: &VrfBundle, expected_input: &str) -> Result<bool, RandomnessError> {
        if bundle.input_message != expected_input {
            return Ok(false);
        }

        let vrf_output = decode_hex("vrf_output", &bundle.vrf_output)?;
        let vrf_proof = decode_hex("vrf_proof", &bundle.vrf_proof)?;
        let public_key_bytes = decode_hex("public_key", &bundle.public_key)?;

        let public_key = PublicKey::from_bytes(&public_key_bytes)
            .map_err(|e| RandomnessError::InvalidPublicKey(format!("{:?}", e)))?;
        let signature_array: [u8; 64] = vrf_proof
            .try_into()
            .map_err(|_| RandomnessError::InvalidSignature("signature must be 64 bytes".to_string()))?;
        let signature = Signature::from_bytes(&signature_array)
            .map_err(|e| RandomnessError::InvalidSignature(format!("{:?}", e)))?;

        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        if public_key.verify(ctx.bytes(expected_input.as_bytes()), &signature).is_err() {
            return Ok(false);
        }

        Ok(output_from_proof(&signature_array).as_slice() == vrf_output.as_slice())
    }

    /// Recompute the first `count` outcomes of a verified bundle
    pub fn replay_outcomes(bundle: &VrfBundle, count: usize) -> Result<Vec<bool>, RandomnessError> {
        let output = decode_hex("vrf_output", &bundle.vrf_output)?;
        let seed: [u8; 32] = output.try_into().map_err(|_| RandomnessError::InvalidEncoding {
            field: "vrf_output",
            reason: "output must be 32 bytes".to_string(),
        })?;
        let mut stream = HashStream::new(seed);
        Ok((0..count).map(|_| stream.next_outcome()).collect())
    }

    pub fn public_key(&self) -> Vec<u8> {
        self.keypair.public.to_bytes().to_vec()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }
}

impl RandomnessOracle for VrfOracle {
    type Generator = VrfGenerator;

    fn new_generator(&self, context: &str) -> VrfGenerator {
        let (output, proof) = self.vrf_sign(context.as_bytes());
        let bundle = VrfBundle {
            vrf_output: hex::encode(output),
            vrf_proof: hex::encode(proof),
            public_key: self.public_key_hex(),
            input_message: context.to_string(),
        };
        VrfGenerator {
            stream: HashStream::new(output),
            bundle,
        }
    }
}

fn output_from_proof(proof: &[u8; 64]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(proof);
    hasher.finalize().into()
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, RandomnessError> {
    hex::decode(value).map_err(|e| RandomnessError::InvalidEncoding {
        field,
        reason: e.to_string(),
    })
}

/// Reproducible oracle for simulations and benchmarks.
///
/// Each generator is an `StdRng` seeded from the oracle seed and the call context.
#[derive(Debug, Clone, Copy)]
pub struct SeededOracle {
    seed: u64,
}

impl SeededOracle {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

pub struct SeededGenerator {
    rng: StdRng,
}

impl RandomGenerator for SeededGenerator {
    fn generate_bool(&mut self) -> bool {
        self.rng.gen()
    }
}

impl RandomnessOracle for SeededOracle {
    type Generator = SeededGenerator;

    fn new_generator(&self, context: &str) -> SeededGenerator {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_be_bytes());
        hasher.update(context.as_bytes());
        SeededGenerator {
            rng: StdRng::from_seed(hasher.finalize().into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vrf_generation_and_verification() {
        let oracle = VrfOracle::new_random();
        let context = "batch:1:sender:0xab:games:3";

        let mut generator = oracle.new_generator(context);
        let bundle = generator.attestation().expect("VRF oracle always attests");
        let drawn: Vec<bool> = (0..40).map(|_| generator.generate_bool()).collect();

        assert!(VrfOracle::verify_vrf_proof(&bundle, context).unwrap());
        assert_eq!(VrfOracle::replay_outcomes(&bundle, 40).unwrap(), drawn);
    }

    #[test]
    fn test_vrf_tamper_detection() {
        let oracle = VrfOracle::new_random();
        let mut bundle = oracle.new_generator("batch:7").attestation().unwrap();

        bundle.vrf_output = hex::encode(vec![0xff; 32]);
        assert!(!VrfOracle::verify_vrf_proof(&bundle, "batch:7").unwrap());
    }

    #[test]
    fn test_vrf_rejects_other_context() {
        let oracle = VrfOracle::new_random();
        let bundle = oracle.new_generator("batch:1").attestation().unwrap();
        assert!(!VrfOracle::verify_vrf_proof(&bundle, "batch:2").unwrap());
    }

    #[test]
    fn test_seeded_key_is_stable() {
        let a = VrfOracle::from_seed(&[7u8; 32]).unwrap();
        let b = VrfOracle::from_seed(&[7u8; 32]).unwrap();
        assert_eq!(a.public_key_hex(), b.public_key_hex());
    }

    #[test]
    fn test_hash_stream_parity_rule() {
        // Outcomes follow the byte parity of SHA-256(seed || counter)
        let seed = [3u8; 32];
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(0u64.to_be_bytes());
        let first_block: [u8; 32] = hasher.finalize().into();

        let mut stream = HashStream::new(seed);
        for byte in first_block {
            assert_eq!(stream.next_outcome(), byte % 2 == 0);
        }
    }

    #[test]
    fn test_hash_stream_is_roughly_fair() {
        let mut stream = HashStream::new([9u8; 32]);
        let heads = (0..10_000).filter(|_| stream.next_outcome()).count();
        assert!((4_500..=5_500).contains(&heads), "heads = {}", heads);
    }

    #[test]
    fn test_seeded_oracle_reproducible() {
        let oracle = SeededOracle::new(42);
        let mut a = oracle.new_generator("ctx");
        let mut b = oracle.new_generator("ctx");
        let xs: Vec<bool> = (0..32).map(|_| a.generate_bool()).collect();
        let ys: Vec<bool> = (0..32).map(|_| b.generate_bool()).collect();
        assert_eq!(xs, ys);
        assert!(a.attestation().is_none());
    }
}
