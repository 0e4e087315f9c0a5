// naclcrypt is a personal keyring and authenticated file-encryption tool.
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

use std::io;

use naclcrypt_core::{CodecError, CryptoError, KeyringError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("named entry \"{0}\" not found")]
    NotFound(String),
    #[error("malformed import line: \"{0}\"")]
    MalformedImport(String),
    #[error("no NACLCRYPT_DB set and no database path given")]
    NoDbPath,

    #[error("{0}")]
    Keyring(#[from] KeyringError),
    #[error("{0}")]
    Codec(#[from] CodecError),
    #[error("{0}")]
    Crypto(#[from] CryptoError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps this error to the process exit code it should produce.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NotFound(_) => 1,
            Error::Keyring(KeyringError::NothingToDelete(_)) => 1,
            Error::NoDbPath => 64,
            Error::Keyring(KeyringError::PublicOverwriteRejected(_))
            | Error::Keyring(KeyringError::PrivateOverwriteRejected(_)) => 65,
            Error::MalformedImport(_) => 66,
            Error::Keyring(KeyringError::Locked) | Error::Keyring(KeyringError::Busy) => 75,
            Error::Keyring(_) | Error::Crypto(_) => 70,
            Error::Io(_) => 74,
            Error::Codec(CodecError::Io(_)) => 74,
            Error::Codec(_) => 76,
        }
    }
}
