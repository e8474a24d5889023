pub mod encoding;
pub mod symmetric;
pub mod tree;
pub mod xmss;

// Re-export main types
pub use xmss::{
    Encodable, HashSig, HashSigError, HashSigPoseidon, HashSigSha3, Poseidon2Scheme, Sha3Scheme,
    SharedSecretKey, SignatureScheme, StatefulSecretKey,
};
