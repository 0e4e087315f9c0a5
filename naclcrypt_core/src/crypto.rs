// naclcrypt_core is the core library implementing the keyring store
// and the stream codec shared by the naclcrypt command-line tool.
// Copyright (C) 2024  Himbeer <himbeerserverde@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Thin pass-through to NaCl-compatible authenticated encryption.
//!
//! This module wraps `crypto_box` (X25519-XSalsa20-Poly1305, the Rust
//! equivalent of libsodium's `crypto_box`) and `crypto_secretbox`
//! (XSalsa20-Poly1305, the equivalent of `crypto_secretbox`). It does not
//! redesign the primitives: it adapts their Rust AEAD-trait calling
//! convention (tag appended at the end) to the NaCl wire convention used by
//! [`crate::codec`] (mac prefixed before the ciphertext).

use crate::error::CryptoError;
use crypto_box::aead::{Aead, AeadCore, KeyInit};
use crypto_secretbox::{
    aead::generic_array::GenericArray as SecretGenericArray, XSalsa20Poly1305,
};
use rand_core::{OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length in bytes of a box/secretbox MAC.
pub const MAC_LEN: usize = 16;
/// Length in bytes of a box nonce.
pub const BOX_NONCE_LEN: usize = 24;
/// Length in bytes of a secretbox nonce.
pub const SECRETBOX_NONCE_LEN: usize = 24;

/// A Curve25519 public key, as used on either side of a `box_seal`/`box_open`
/// call. 32 bytes, not secret.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(pub [u8; Self::LEN]);

impl PublicKey {
    /// Length in bytes of a public key. Distinct from [`PrivateKey::LEN`] so
    /// that a role mixup between the two is a type error, not a silent
    /// wrong-length accident.
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != Self::LEN {
            return Err(CryptoError::WrongLength {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let mut buf = [0u8; Self::LEN];
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PublicKey").field(&hex_preview(&self.0)).finish()
    }
}

/// A Curve25519 private key. Zeroized on drop; its bytes are never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; Self::LEN]);

impl PrivateKey {
    /// Length in bytes of a private key. Distinct from [`PublicKey::LEN`]
    /// for the same reason: a role mixup should not type-check.
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != Self::LEN {
            return Err(CryptoError::WrongLength {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let mut buf = [0u8; Self::LEN];
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PrivateKey").field(&"<redacted>").finish()
    }
}

fn hex_preview(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A sealed box/secretbox message in NaCl's mac-prefixed wire convention:
/// the 16-byte MAC comes before the ciphertext, the opposite of the
/// RustCrypto AEAD trait's append-at-the-end convention.
#[derive(Clone)]
pub struct Sealed {
    pub mac: [u8; MAC_LEN],
    pub ciphertext: Vec<u8>,
}

impl Sealed {
    /// Serializes as `mac ‖ ciphertext`, the layout used on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAC_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.mac);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    pub fn from_mac_prefixed(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < MAC_LEN {
            return Err(CryptoError::WrongLength {
                expected: MAC_LEN,
                actual: bytes.len(),
            });
        }
        let mut mac = [0u8; MAC_LEN];
        mac.copy_from_slice(&bytes[..MAC_LEN]);
        Ok(Self {
            mac,
            ciphertext: bytes[MAC_LEN..].to_vec(),
        })
    }
}

/// Generates a fresh X25519 keypair using the OS CSPRNG.
pub fn box_keypair() -> (PublicKey, PrivateKey) {
    let secret = crypto_box::SecretKey::generate(&mut OsRng);
    let public = secret.public_key();
    (
        PublicKey(*public.as_bytes()),
        PrivateKey(secret.to_bytes()),
    )
}

/// Seals `plaintext` with `crypto_box` for `recipient`, authenticated as
/// having come from `sender`. Returns the nonce used alongside the sealed
/// message so the caller can place it on the wire as its protocol requires.
pub fn box_seal(
    sender: &PrivateKey,
    recipient: &PublicKey,
    plaintext: &[u8],
) -> Result<([u8; BOX_NONCE_LEN], Sealed), CryptoError> {
    let secret = crypto_box::SecretKey::from(sender.0);
    let public = crypto_box::PublicKey::from(recipient.0);
    let cipher = crypto_box::SalsaBox::new(&public, &secret);
    let nonce = crypto_box::SalsaBox::generate_nonce(&mut OsRng);
    let out = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::Aead)?;
    let mut nonce_bytes = [0u8; BOX_NONCE_LEN];
    nonce_bytes.copy_from_slice(nonce.as_slice());
    Ok((nonce_bytes, rearrange_tag_to_front(out)))
}

/// Opens a `crypto_box` message sealed by `box_seal`.
pub fn box_open(
    recipient: &PrivateKey,
    sender: &PublicKey,
    nonce: &[u8; BOX_NONCE_LEN],
    sealed: &Sealed,
) -> Result<Vec<u8>, CryptoError> {
    let secret = crypto_box::SecretKey::from(recipient.0);
    let public = crypto_box::PublicKey::from(sender.0);
    let cipher = crypto_box::SalsaBox::new(&public, &secret);
    let nonce = crypto_box::Nonce::clone_from_slice(nonce);
    let wire = append_tag_to_back(sealed);
    cipher.decrypt(&nonce, wire.as_slice()).map_err(|_| CryptoError::Aead)
}

/// Seals `plaintext` with `crypto_secretbox` under symmetric key `key`,
/// using caller-supplied `nonce` (the stream codec derives this
/// deterministically from a counter; it is never random for secretbox).
pub fn secretbox_seal(
    key: &[u8; 32],
    nonce: &[u8; SECRETBOX_NONCE_LEN],
    plaintext: &[u8],
) -> Result<Sealed, CryptoError> {
    let cipher = XSalsa20Poly1305::new(SecretGenericArray::from_slice(key));
    let nonce = SecretGenericArray::clone_from_slice(nonce);
    let out = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::Aead)?;
    Ok(rearrange_tag_to_front(out))
}

/// Opens a `crypto_secretbox` message sealed by `secretbox_seal`.
pub fn secretbox_open(
    key: &[u8; 32],
    nonce: &[u8; SECRETBOX_NONCE_LEN],
    sealed: &Sealed,
) -> Result<Vec<u8>, CryptoError> {
    let cipher = XSalsa20Poly1305::new(SecretGenericArray::from_slice(key));
    let nonce = SecretGenericArray::clone_from_slice(nonce);
    let wire = append_tag_to_back(sealed);
    cipher
        .decrypt(&nonce, wire.as_slice())
        .map_err(|_| CryptoError::Aead)
}

/// Fills `buf` with cryptographically random bytes from the OS CSPRNG.
pub fn random_bytes(buf: &mut [u8]) {
    OsRng.fill_bytes(buf);
}

/// RustCrypto's AEAD trait appends the 16-byte tag after the ciphertext;
/// NaCl's wire convention puts it first. This is a pure relabeling, not a
/// cryptographic operation: no data is re-encrypted.
fn rearrange_tag_to_front(mut aead_output: Vec<u8>) -> Sealed {
    let split_at = aead_output.len() - MAC_LEN;
    let mut mac = [0u8; MAC_LEN];
    mac.copy_from_slice(&aead_output[split_at..]);
    aead_output.truncate(split_at);
    Sealed {
        mac,
        ciphertext: aead_output,
    }
}

fn append_tag_to_back(sealed: &Sealed) -> Vec<u8> {
    let mut out = Vec::with_capacity(sealed.ciphertext.len() + MAC_LEN);
    out.extend_from_slice(&sealed.ciphertext);
    out.extend_from_slice(&sealed.mac);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_round_trip() {
        let (alice_pk, alice_sk) = box_keypair();
        let (bob_pk, bob_sk) = box_keypair();
        let msg = b"hello across the wire";
        let (nonce, sealed) = box_seal(&alice_sk, &bob_pk, msg).unwrap();
        let opened = box_open(&bob_sk, &alice_pk, &nonce, &sealed).unwrap();
        assert_eq!(opened, msg);
    }

    #[test]
    fn box_open_fails_with_wrong_key() {
        let (_, alice_sk) = box_keypair();
        let (bob_pk, _) = box_keypair();
        let (mallory_pk, mallory_sk) = box_keypair();
        let msg = b"secret";
        let (nonce, sealed) = box_seal(&alice_sk, &bob_pk, msg).unwrap();
        assert!(box_open(&mallory_sk, &mallory_pk, &nonce, &sealed).is_err());
    }

    #[test]
    fn secretbox_round_trip() {
        let mut key = [0u8; 32];
        random_bytes(&mut key);
        let nonce = [7u8; SECRETBOX_NONCE_LEN];
        let msg = b"chunk payload";
        let sealed = secretbox_seal(&key, &nonce, msg).unwrap();
        let opened = secretbox_open(&key, &nonce, &sealed).unwrap();
        assert_eq!(opened, msg);
    }

    #[test]
    fn secretbox_tamper_detected() {
        let mut key = [0u8; 32];
        random_bytes(&mut key);
        let nonce = [1u8; SECRETBOX_NONCE_LEN];
        let mut sealed = secretbox_seal(&key, &nonce, b"data").unwrap();
        sealed.mac[0] ^= 0xff;
        assert!(secretbox_open(&key, &nonce, &sealed).is_err());
    }

    #[test]
    fn public_key_rejects_wrong_length() {
        assert!(PublicKey::from_bytes(&[0u8; 31]).is_err());
        assert!(PublicKey::from_bytes(&[0u8; 32]).is_ok());
    }

    #[test]
    fn sealed_wire_round_trip() {
        let sealed = Sealed {
            mac: [9u8; MAC_LEN],
            ciphertext: vec![1, 2, 3, 4],
        };
        let bytes = sealed.to_bytes();
        let parsed = Sealed::from_mac_prefixed(&bytes).unwrap();
        assert_eq!(parsed.mac, sealed.mac);
        assert_eq!(parsed.ciphertext, sealed.ciphertext);
    }
}
