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

//! The named-key store: a small SQLite-backed table set mapping a human
//! readable name to an optional public half and an optional private half.
//!
//! Three tables: `names` (the surrogate-keyed name registry),
//! `public_keys` and `private_keys` (each a 32-byte blob referencing a
//! `names` row). Foreign keys cascade on delete/update; two triggers clean
//! up a `names` row once neither key table references it any longer.

use crate::crypto::{PrivateKey, PublicKey};
use crate::error::KeyringError;
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::ops::ControlFlow;
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS names (
    id   INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS public_keys (
    name_id INTEGER PRIMARY KEY
        REFERENCES names(id) ON DELETE CASCADE ON UPDATE CASCADE,
    blob    BLOB NOT NULL CHECK (length(blob) = 32)
);

CREATE TABLE IF NOT EXISTS private_keys (
    name_id INTEGER PRIMARY KEY
        REFERENCES names(id) ON DELETE CASCADE ON UPDATE CASCADE,
    blob    BLOB NOT NULL CHECK (length(blob) = 32)
);

CREATE TRIGGER IF NOT EXISTS cleanup_name_after_public_delete
AFTER DELETE ON public_keys
WHEN NOT EXISTS (SELECT 1 FROM private_keys WHERE name_id = old.name_id)
BEGIN
    DELETE FROM names WHERE id = old.name_id;
END;

CREATE TRIGGER IF NOT EXISTS cleanup_name_after_private_delete
AFTER DELETE ON private_keys
WHEN NOT EXISTS (SELECT 1 FROM public_keys WHERE name_id = old.name_id)
BEGIN
    DELETE FROM names WHERE id = old.name_id;
END;
";

/// Which half(s) of a named entry are present. Only [`Keyring::list`] ever
/// sees a partial record; every other read returns a joined, complete pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyHalves {
    PublicOnly,
    PrivateOnly,
    Both,
}

impl KeyHalves {
    /// Derives which halves are present from the two options a
    /// [`Keyring::list`] callback receives. Panics if both are absent: a
    /// `names` row is never visible without at least one referencing half.
    pub fn new(public: bool, private: bool) -> Self {
        match (public, private) {
            (true, true) => KeyHalves::Both,
            (true, false) => KeyHalves::PublicOnly,
            (false, true) => KeyHalves::PrivateOnly,
            (false, false) => unreachable!("a names row always has at least one half"),
        }
    }
}

/// Which half a `set_*`/`put_*`/`delete_*` call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Half {
    Public,
    Private,
    Pair,
}

/// Outcome of a `set_*`/`put_*` call: whether each requested half was
/// newly written or already present (and, for `set_*`, therefore rejected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PutOutcome {
    pub public_written: bool,
    pub private_written: bool,
}

/// Outcome of a `delete_*` call: whether each requested half actually
/// existed prior to the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteOutcome {
    pub public_existed: bool,
    pub private_existed: bool,
}

/// A handle to the keyring's backing SQLite database.
pub struct Keyring {
    conn: Connection,
}

impl Keyring {
    /// Opens (creating if necessary) the keyring at `path`, applying the
    /// schema idempotently and enabling foreign-key enforcement.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KeyringError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Closes the keyring, surfacing any final SQLite error (e.g. unflushed
    /// WAL) rather than silently dropping the connection.
    pub fn close(self) -> Result<(), KeyringError> {
        self.conn
            .close()
            .map_err(|(_, e)| KeyringError::Storage(e))
    }

    pub fn get_public(&self, name: &str) -> Result<Option<PublicKey>, KeyringError> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT public_keys.blob FROM public_keys
                 JOIN names ON names.id = public_keys.name_id
                 WHERE names.name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        blob.map(|b| to_public(name, &b)).transpose()
    }

    pub fn get_private(&self, name: &str) -> Result<Option<PrivateKey>, KeyringError> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT private_keys.blob FROM private_keys
                 JOIN names ON names.id = private_keys.name_id
                 WHERE names.name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        blob.map(|b| to_private(name, b)).transpose()
    }

    /// Returns the pair only when both halves exist for `name`; this is a
    /// join, not two independent reads, so a partial record yields `None`.
    pub fn get_pair(&self, name: &str) -> Result<Option<(PublicKey, PrivateKey)>, KeyringError> {
        let row: Option<(Vec<u8>, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT public_keys.blob, private_keys.blob FROM names
                 JOIN public_keys ON public_keys.name_id = names.id
                 JOIN private_keys ON private_keys.name_id = names.id
                 WHERE names.name = ?1",
                [name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((pub_blob, priv_blob)) => {
                Ok(Some((to_public(name, &pub_blob)?, to_private(name, priv_blob)?)))
            }
        }
    }

    /// Writes `key` as the public half of `name`, failing if one already
    /// exists.
    pub fn set_public(&mut self, name: &str, key: &PublicKey) -> Result<(), KeyringError> {
        self.store(name, Half::Public, Some(key), None, true)
            .map(|_| ())
    }

    /// Writes `key` as the private half of `name`, failing if one already
    /// exists.
    pub fn set_private(&mut self, name: &str, key: &PrivateKey) -> Result<(), KeyringError> {
        self.store(name, Half::Private, None, Some(key), true)
            .map(|_| ())
    }

    /// Writes both halves of `name` atomically, failing (and writing
    /// neither) if either already exists. The private half is attempted
    /// first: if it is rejected, the public half is never attempted.
    pub fn set_pair(
        &mut self,
        name: &str,
        public: &PublicKey,
        private: &PrivateKey,
    ) -> Result<(), KeyringError> {
        self.store(name, Half::Pair, Some(public), Some(private), true)
            .map(|_| ())
    }

    /// Writes `key` as the public half of `name`, overwriting any existing
    /// value.
    pub fn put_public(&mut self, name: &str, key: &PublicKey) -> Result<PutOutcome, KeyringError> {
        self.store(name, Half::Public, Some(key), None, false)
    }

    /// Writes `key` as the private half of `name`, overwriting any existing
    /// value.
    pub fn put_private(
        &mut self,
        name: &str,
        key: &PrivateKey,
    ) -> Result<PutOutcome, KeyringError> {
        self.store(name, Half::Private, None, Some(key), false)
    }

    /// Writes both halves of `name` atomically, overwriting either that
    /// already exists. The private half is written first.
    pub fn put_pair(
        &mut self,
        name: &str,
        public: &PublicKey,
        private: &PrivateKey,
    ) -> Result<PutOutcome, KeyringError> {
        self.store(name, Half::Pair, Some(public), Some(private), false)
    }

    fn store(
        &mut self,
        name: &str,
        half: Half,
        public: Option<&PublicKey>,
        private: Option<&PrivateKey>,
        reject_existing: bool,
    ) -> Result<PutOutcome, KeyringError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)
            .map_err(classify)?;
        let name_id = ensure_name(&tx, name)?;

        let mut outcome = PutOutcome::default();

        // Private half first: if a pair write's private half is rejected,
        // the public half must never be attempted.
        if matches!(half, Half::Private | Half::Pair) {
            let key = private.expect("private key must be provided for this half");
            if reject_existing && row_exists(&tx, "private_keys", name_id)? {
                return Err(KeyringError::PrivateOverwriteRejected(name.to_string()));
            }
            tx.execute(
                "INSERT INTO private_keys (name_id, blob) VALUES (?1, ?2)
                 ON CONFLICT(name_id) DO UPDATE SET blob = excluded.blob",
                rusqlite::params![name_id, key.as_bytes().as_slice()],
            )
            .map_err(classify)?;
            outcome.private_written = true;
        }

        if matches!(half, Half::Public | Half::Pair) {
            let key = public.expect("public key must be provided for this half");
            if reject_existing && row_exists(&tx, "public_keys", name_id)? {
                return Err(KeyringError::PublicOverwriteRejected(name.to_string()));
            }
            tx.execute(
                "INSERT INTO public_keys (name_id, blob) VALUES (?1, ?2)
                 ON CONFLICT(name_id) DO UPDATE SET blob = excluded.blob",
                rusqlite::params![name_id, key.as_bytes().as_slice()],
            )
            .map_err(classify)?;
            outcome.public_written = true;
        }

        tx.commit().map_err(classify)?;
        Ok(outcome)
    }

    pub fn delete_public(&mut self, name: &str, force: bool) -> Result<bool, KeyringError> {
        Ok(self.delete(name, Half::Public, force)?.public_existed)
    }

    pub fn delete_private(&mut self, name: &str, force: bool) -> Result<bool, KeyringError> {
        Ok(self.delete(name, Half::Private, force)?.private_existed)
    }

    pub fn delete_pair(
        &mut self,
        name: &str,
        force: bool,
    ) -> Result<DeleteOutcome, KeyringError> {
        self.delete(name, Half::Pair, force)
    }

    fn delete(
        &mut self,
        name: &str,
        half: Half,
        force: bool,
    ) -> Result<DeleteOutcome, KeyringError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Exclusive)
            .map_err(classify)?;
        let mut outcome = DeleteOutcome::default();

        if matches!(half, Half::Private | Half::Pair) {
            let n = tx
                .execute(
                    "DELETE FROM private_keys WHERE name_id =
                     (SELECT id FROM names WHERE name = ?1)",
                    [name],
                )
                .map_err(classify)?;
            outcome.private_existed = n > 0;
        }
        if matches!(half, Half::Public | Half::Pair) {
            let n = tx
                .execute(
                    "DELETE FROM public_keys WHERE name_id =
                     (SELECT id FROM names WHERE name = ?1)",
                    [name],
                )
                .map_err(classify)?;
            outcome.public_existed = n > 0;
        }

        let nothing_deleted = match half {
            Half::Public => !outcome.public_existed,
            Half::Private => !outcome.private_existed,
            Half::Pair => !outcome.public_existed && !outcome.private_existed,
        };
        if nothing_deleted && !force {
            return Err(KeyringError::NothingToDelete(name.to_string()));
        }

        tx.commit().map_err(classify)?;
        Ok(outcome)
    }

    /// Invokes `callback` once per named entry, in name order, passing
    /// whichever half(s) it owns. Stops early if `callback` returns
    /// [`ControlFlow::Break`].
    pub fn list(
        &self,
        mut callback: impl FnMut(&str, Option<&PublicKey>, Option<&PrivateKey>) -> ControlFlow<()>,
    ) -> Result<(), KeyringError> {
        let mut stmt = self.conn.prepare(
            "SELECT names.name, public_keys.blob, private_keys.blob
             FROM names
             LEFT JOIN public_keys ON public_keys.name_id = names.id
             LEFT JOIN private_keys ON private_keys.name_id = names.id
             ORDER BY names.name",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let public_blob: Option<Vec<u8>> = row.get(1)?;
            let private_blob: Option<Vec<u8>> = row.get(2)?;
            let public = public_blob.map(|b| to_public(&name, &b)).transpose()?;
            let private = private_blob.map(|b| to_private(&name, b)).transpose()?;
            if callback(&name, public.as_ref(), private.as_ref()).is_break() {
                break;
            }
        }
        Ok(())
    }
}

fn ensure_name(tx: &rusqlite::Transaction<'_>, name: &str) -> Result<i64, KeyringError> {
    tx.execute(
        "INSERT INTO names (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        [name],
    )
    .map_err(classify)?;
    tx.query_row("SELECT id FROM names WHERE name = ?1", [name], |row| row.get(0))
        .map_err(classify)
}

fn row_exists(
    tx: &rusqlite::Transaction<'_>,
    table: &str,
    name_id: i64,
) -> Result<bool, KeyringError> {
    let sql = format!("SELECT 1 FROM {table} WHERE name_id = ?1");
    tx.query_row(&sql, [name_id], |_| Ok(()))
        .optional()
        .map(|row| row.is_some())
        .map_err(classify)
}

fn to_public(name: &str, blob: &[u8]) -> Result<PublicKey, KeyringError> {
    crate::crypto::PublicKey::from_bytes(blob).map_err(|_| KeyringError::CorruptKeyLength {
        name: name.to_string(),
        role: "public",
        expected: PublicKey::LEN,
        actual: blob.len(),
    })
}

/// Takes ownership of the raw blob so it can be scrubbed once the key bytes
/// have been copied into the zeroize-on-drop `PrivateKey`, rather than
/// leaving the plaintext private-key bytes behind in a `Vec` the caller
/// drops ordinarily.
fn to_private(name: &str, mut blob: Vec<u8>) -> Result<PrivateKey, KeyringError> {
    let result =
        crate::crypto::PrivateKey::from_bytes(&blob).map_err(|_| KeyringError::CorruptKeyLength {
            name: name.to_string(),
            role: "private",
            expected: PrivateKey::LEN,
            actual: blob.len(),
        });
    use zeroize::Zeroize;
    blob.zeroize();
    result
}

/// Classifies a raw `rusqlite::Error` into the transient `Locked`/`Busy`
/// taxonomy where applicable, leaving everything else as a fatal `Storage`
/// error.
fn classify(err: rusqlite::Error) -> KeyringError {
    if let rusqlite::Error::SqliteFailure(sqlite_err, _) = &err {
        match sqlite_err.code {
            ErrorCode::DatabaseLocked => return KeyringError::Locked,
            ErrorCode::DatabaseBusy => return KeyringError::Busy,
            _ => {}
        }
    }
    KeyringError::Storage(err)
}
