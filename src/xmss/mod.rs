// Stateful signature scheme over the generalized XMSS construction
//
// Key generation, epoch-window preparation, signing and verification,
// together with the byte codec for keys and signatures and an async handle
// for preparing a key in the background.

pub mod background;
pub mod codec;
pub mod config;
pub mod epoch;
pub mod error;
pub mod keys;
pub mod message;
pub mod prepare;
pub mod scheme;
pub mod wrapper;

pub use background::SharedSecretKey;
pub use codec::Encodable;
pub use config::{ParameterMetadata, ParameterSet, DEFAULT_LIFETIME};
pub use epoch::EpochValidator;
pub use error::{HashSigError, Result};
pub use keys::{PublicKey, SecretKey, Signature, StatefulSecretKey};
pub use message::MessagePreprocessor;
pub use prepare::prepare_for_epoch;
pub use scheme::{GeneralizedXmss, Poseidon2Scheme, Sha3Scheme, SignatureScheme};
pub use wrapper::{HashSig, HashSigPoseidon, HashSigSha3};
