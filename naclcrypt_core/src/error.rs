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

use thiserror::Error;

/// A `CryptoError` indicates a failure inside the crypto primitives layer.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A key or nonce buffer did not have the length the primitive requires.
    #[error("expected a {expected}-byte buffer, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    /// A box or secretbox operation failed. This covers both a genuine MAC
    /// verification failure and the rare internal AEAD error; NaCl-family
    /// primitives do not distinguish the two on purpose.
    #[error("authenticated encryption or decryption failed")]
    Aead,
}

/// A `KeyringError` indicates a failure condition reported by the keyring
/// store. `Locked` and `Busy` are transient: the caller may retry. All other
/// variants are fatal.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// Another connection holds the lock the operation needed.
    #[error("the keyring is locked by another connection")]
    Locked,
    /// The storage engine is momentarily unable to proceed.
    #[error("the keyring is busy")]
    Busy,
    /// `set_public`/`set_pair` would have overwritten an existing public half.
    #[error("a public key named \"{0}\" already exists")]
    PublicOverwriteRejected(String),
    /// `set_private`/`set_pair` would have overwritten an existing private half.
    #[error("a private key named \"{0}\" already exists")]
    PrivateOverwriteRejected(String),
    /// A `delete_*` call without `force` found nothing to delete.
    #[error("no key named \"{0}\" to delete")]
    NothingToDelete(String),
    /// A key blob read back from storage did not have the declared length.
    /// The CHECK constraints in the schema should make this unreachable;
    /// if it happens the database has been tampered with or corrupted.
    #[error("key \"{name}\" has a corrupt {role} half: expected {expected} bytes, got {actual}")]
    CorruptKeyLength {
        name: String,
        role: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Any other SQLite failure: schema violation, I/O error, corruption.
    #[error("keyring storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// A `CodecError` indicates a failure condition in the stream codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// An I/O error occurred on the underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The 72-byte header could not be unsealed: wrong key pair or corrupt
    /// header bytes. NaCl's box construction cannot distinguish the two.
    #[error("header is corrupt or the key pair does not match")]
    HeaderCorrupt,
    /// The stream ended with fewer than 72 header bytes.
    #[error("stream is shorter than the 72-byte header")]
    HeaderTruncated,
    /// A chunk had fewer than the 16-byte MAC prefix.
    #[error("chunk #{0} is too short to contain a MAC")]
    ChunkTruncated(u64),
    /// A chunk's MAC did not verify.
    #[error("chunk #{0} failed MAC verification")]
    ChunkAuthFailed(u64),
    /// The stream produced more than 2^64 - 1 chunks.
    #[error("stream exceeded the maximum of 2^64 - 1 chunks")]
    CounterOverflow,
    /// An underlying crypto primitive failed unexpectedly.
    #[error("crypto primitive failure: {0}")]
    Crypto(#[from] CryptoError),
}
