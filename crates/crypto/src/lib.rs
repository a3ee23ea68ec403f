//! CraftDrop Cryptography
//!
//! Ed25519 keys and the delegated-claim authorization signer.

mod authorize;
mod keys;
mod sign;

pub use authorize::*;
pub use keys::*;
pub use sign::*;
