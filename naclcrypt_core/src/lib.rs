mod error;
pub use error::*;

pub mod codec;
pub mod crypto;
pub mod keyring;
