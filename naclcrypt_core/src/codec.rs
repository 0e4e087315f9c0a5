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

//! The chunked authenticated-stream codec.
//!
//! A stream begins with a 72-byte header: a 24-byte box nonce, a 16-byte
//! box MAC, and a 32-byte box-sealed ephemeral symmetric key. Everything
//! after the header is a sequence of secretbox-sealed chunks, each at most
//! `CHUNK_LEN` bytes of plaintext, each MAC-prefixed on the wire, each
//! under a nonce built from an 8-byte big-endian counter zero-extended to
//! the secretbox's 24-byte nonce length.

use crate::crypto::{
    self, PrivateKey, PublicKey, Sealed, BOX_NONCE_LEN, MAC_LEN, SECRETBOX_NONCE_LEN,
};
use crate::error::CodecError;
use std::io::{Read, Write};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum plaintext length of one chunk (spec: `B`).
pub const CHUNK_LEN: usize = 131072;
/// Wire length of the header: nonce ‖ mac ‖ sealed_key.
pub const HEADER_LEN: usize = BOX_NONCE_LEN + MAC_LEN + 32;

/// The fresh symmetric key generated (or unsealed) for one stream. Zeroized
/// on drop so every exit path out of [`encrypt_stream`]/[`decrypt_stream`] —
/// success, `?`-propagated I/O error, or crypto failure alike — scrubs it,
/// rather than relying on an explicit wipe only on the success path.
#[derive(Zeroize, ZeroizeOnDrop)]
struct StreamKey([u8; 32]);

impl StreamKey {
    fn generate() -> Self {
        let mut buf = [0u8; 32];
        crypto::random_bytes(&mut buf);
        Self(buf)
    }

    fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

struct Header {
    nonce: [u8; BOX_NONCE_LEN],
    sealed_key: Sealed,
}

impl Header {
    fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != HEADER_LEN {
            return Err(CodecError::HeaderTruncated);
        }
        let mut nonce = [0u8; BOX_NONCE_LEN];
        nonce.copy_from_slice(&bytes[..BOX_NONCE_LEN]);
        let sealed_key = Sealed::from_mac_prefixed(&bytes[BOX_NONCE_LEN..])
            .map_err(|_| CodecError::HeaderTruncated)?;
        Ok(Self { nonce, sealed_key })
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.sealed_key.to_bytes());
        out
    }
}

fn counter_nonce(counter: u64) -> [u8; SECRETBOX_NONCE_LEN] {
    let mut nonce = [0u8; SECRETBOX_NONCE_LEN];
    nonce[..8].copy_from_slice(&counter.to_be_bytes());
    nonce
}

/// Encrypts everything read from `input` to `output`, sealed from `sender`
/// to `recipient`. A fresh ephemeral symmetric key is generated for this
/// stream and sealed into the header; the actual chunk payloads never use
/// the box keys directly.
pub fn encrypt_stream<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    sender: &PrivateKey,
    recipient: &PublicKey,
) -> Result<(), CodecError> {
    let stream_key = StreamKey::generate();

    let (header_nonce, sealed_key) = crypto::box_seal(sender, recipient, stream_key.as_bytes())?;
    let header = Header {
        nonce: header_nonce,
        sealed_key,
    };
    output.write_all(&header.to_bytes())?;

    let mut buf = vec![0u8; CHUNK_LEN];
    let mut counter: u64 = 0;
    loop {
        let n = read_fill(&mut input, &mut buf)?;
        let nonce = counter_nonce(counter);
        let sealed = crypto::secretbox_seal(stream_key.as_bytes(), &nonce, &buf[..n])?;
        output.write_all(&sealed.to_bytes())?;
        if n < CHUNK_LEN {
            break;
        }
        counter = counter.checked_add(1).ok_or(CodecError::CounterOverflow)?;
    }
    output.flush()?;
    Ok(())
}

/// Decrypts a stream produced by [`encrypt_stream`], reversing the roles:
/// `recipient` holds the private half, `sender` the public half that
/// authenticates who encrypted it.
pub fn decrypt_stream<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    recipient: &PrivateKey,
    sender: &PublicKey,
) -> Result<(), CodecError> {
    let mut header_buf = [0u8; HEADER_LEN];
    let n = read_fill(&mut input, &mut header_buf)?;
    if n != HEADER_LEN {
        return Err(CodecError::HeaderTruncated);
    }
    let header = Header::parse(&header_buf)?;
    // `Zeroizing` scrubs this buffer on every drop, including the early
    // return below, not just the path that reaches the end of the function.
    let stream_key_vec = zeroize::Zeroizing::new(
        crypto::box_open(recipient, sender, &header.nonce, &header.sealed_key)
            .map_err(|_| CodecError::HeaderCorrupt)?,
    );
    if stream_key_vec.len() != 32 {
        return Err(CodecError::HeaderCorrupt);
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&stream_key_vec);
    let stream_key = StreamKey(key_bytes);
    drop(stream_key_vec);

    let wire_chunk_len = CHUNK_LEN + MAC_LEN;
    let mut buf = vec![0u8; wire_chunk_len];
    let mut counter: u64 = 0;
    loop {
        let n = read_fill(&mut input, &mut buf)?;
        // The writer always emits a final chunk, even an empty-plaintext
        // one consisting of just its 16-byte MAC, so a short read here is
        // always a truncated stream, never a legitimate end marker.
        if n < MAC_LEN {
            return Err(CodecError::ChunkTruncated(counter));
        }
        let sealed = Sealed::from_mac_prefixed(&buf[..n]).expect("n >= MAC_LEN checked above");
        let nonce = counter_nonce(counter);
        let plaintext = crypto::secretbox_open(stream_key.as_bytes(), &nonce, &sealed)
            .map_err(|_| CodecError::ChunkAuthFailed(counter))?;
        output.write_all(&plaintext)?;
        if n < wire_chunk_len {
            break;
        }
        counter = counter.checked_add(1).ok_or(CodecError::CounterOverflow)?;
    }
    output.flush()?;
    Ok(())
}

/// Reads until `buf` is full or the reader is exhausted, returning the
/// number of bytes actually read. Unlike `Read::read`, a short read here
/// unambiguously means end of stream, matching the source's `feof`-driven
/// chunk loop.
fn read_fill<R: Read>(input: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match input.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::box_keypair;

    #[test]
    fn round_trips_small_plaintext() {
        let (sender_pk, sender_sk) = box_keypair();
        let (recipient_pk, recipient_sk) = box_keypair();
        let plaintext = b"hello".to_vec();

        let mut ciphertext = Vec::new();
        encrypt_stream(&plaintext[..], &mut ciphertext, &sender_sk, &recipient_pk).unwrap();

        let mut decrypted = Vec::new();
        decrypt_stream(&ciphertext[..], &mut decrypted, &recipient_sk, &sender_pk).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn round_trips_multi_chunk_plaintext() {
        let (sender_pk, sender_sk) = box_keypair();
        let (recipient_pk, recipient_sk) = box_keypair();
        let plaintext: Vec<u8> = (0..(CHUNK_LEN * 2 + 17)).map(|i| (i % 251) as u8).collect();

        let mut ciphertext = Vec::new();
        encrypt_stream(&plaintext[..], &mut ciphertext, &sender_sk, &recipient_pk).unwrap();

        let mut decrypted = Vec::new();
        decrypt_stream(&ciphertext[..], &mut decrypted, &recipient_sk, &sender_pk).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn round_trips_empty_plaintext() {
        let (sender_pk, sender_sk) = box_keypair();
        let (recipient_pk, recipient_sk) = box_keypair();

        let mut ciphertext = Vec::new();
        encrypt_stream(&b""[..], &mut ciphertext, &sender_sk, &recipient_pk).unwrap();
        assert_eq!(ciphertext.len(), HEADER_LEN + MAC_LEN);

        let mut decrypted = Vec::new();
        decrypt_stream(&ciphertext[..], &mut decrypted, &recipient_sk, &sender_pk).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn rejects_truncated_header() {
        let (_, recipient_sk) = box_keypair();
        let (sender_pk, _) = box_keypair();
        let short = vec![0u8; HEADER_LEN - 1];
        let mut out = Vec::new();
        assert!(matches!(
            decrypt_stream(&short[..], &mut out, &recipient_sk, &sender_pk),
            Err(CodecError::HeaderTruncated)
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn tampered_chunk_fails_without_emitting_plaintext() {
        let (sender_pk, sender_sk) = box_keypair();
        let (recipient_pk, recipient_sk) = box_keypair();
        let plaintext = b"authenticate me".to_vec();

        let mut ciphertext = Vec::new();
        encrypt_stream(&plaintext[..], &mut ciphertext, &sender_sk, &recipient_pk).unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xff;

        let mut decrypted = Vec::new();
        let err = decrypt_stream(&ciphertext[..], &mut decrypted, &recipient_sk, &sender_pk)
            .unwrap_err();
        assert!(matches!(err, CodecError::ChunkAuthFailed(0)));
        assert!(decrypted.is_empty());
    }

    #[test]
    fn wrong_key_pair_fails_at_header() {
        let (_, sender_sk) = box_keypair();
        let (recipient_pk, _) = box_keypair();
        let (mallory_pk, mallory_sk) = box_keypair();

        let mut ciphertext = Vec::new();
        encrypt_stream(&b"data"[..], &mut ciphertext, &sender_sk, &recipient_pk).unwrap();

        let mut out = Vec::new();
        assert!(matches!(
            decrypt_stream(&ciphertext[..], &mut out, &mallory_sk, &mallory_pk),
            Err(CodecError::HeaderCorrupt)
        ));
    }
}
