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

//! Textual import/export format: one `p:`/`P:`-tagged uppercase-hex line
//! per half (`p:` for the public half, `P:` for the private half, per the
//! original tool's `pk_to_hex`/`sk_to_hex` export order), and the
//! tab-separated table `list` prints.

use crate::Error;
use naclcrypt_core::crypto::{PrivateKey, PublicKey};

/// Formats a public half as an export line: `p:` followed by uppercase hex.
pub fn format_public_line(key: &PublicKey) -> String {
    format!("p:{}", hex::encode_upper(key.as_bytes()))
}

/// Formats a private half as an export line: `P:` followed by uppercase hex.
pub fn format_private_line(key: &PrivateKey) -> String {
    format!("P:{}", hex::encode_upper(key.as_bytes()))
}

/// Parses one import line. The tag letter is case-sensitive (`p` denotes a
/// public half, `P` a private half, matching the export tags); the hex
/// digits after it are case-insensitive.
pub enum ParsedLine {
    Public(PublicKey),
    Private(PrivateKey),
}

pub fn parse_line(line: &str) -> Result<ParsedLine, Error> {
    let line = line.trim();
    if line.len() < 2 || line.as_bytes()[1] != b':' {
        return Err(Error::MalformedImport(line.to_string()));
    }
    let tag = line.as_bytes()[0];
    let hex_part = &line[2..];
    let bytes = hex::decode(hex_part).map_err(|_| Error::MalformedImport(line.to_string()))?;

    match tag {
        b'p' => Ok(ParsedLine::Public(
            PublicKey::from_bytes(&bytes).map_err(|_| Error::MalformedImport(line.to_string()))?,
        )),
        b'P' => Ok(ParsedLine::Private(
            PrivateKey::from_bytes(&bytes).map_err(|_| Error::MalformedImport(line.to_string()))?,
        )),
        _ => Err(Error::MalformedImport(line.to_string())),
    }
}

/// Formats one `list` row: `name<TAB>public_hex_or_underscores<TAB>private_hex_or_underscores`.
/// A half that is absent is rendered as that half's hex width in `_`
/// characters so columns stay aligned.
pub fn format_list_row(name: &str, public: Option<&PublicKey>, private: Option<&PrivateKey>) -> String {
    let public_col = match public {
        Some(key) => hex::encode_upper(key.as_bytes()),
        None => "_".repeat(PublicKey::LEN * 2),
    };
    let private_col = match private {
        Some(key) => hex::encode_upper(key.as_bytes()),
        None => "_".repeat(PrivateKey::LEN * 2),
    };
    format!("{name}\t{public_col}\t{private_col}")
}
