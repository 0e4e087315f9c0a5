use naclcrypt_core::codec::{decrypt_stream, encrypt_stream, CHUNK_LEN};
use naclcrypt_core::crypto::box_keypair;
use naclcrypt_core::CodecError;
use proptest::prelude::*;

fn round_trip(plaintext: &[u8]) -> Vec<u8> {
    let (sender_pk, sender_sk) = box_keypair();
    let (recipient_pk, recipient_sk) = box_keypair();

    let mut ciphertext = Vec::new();
    encrypt_stream(plaintext, &mut ciphertext, &sender_sk, &recipient_pk).unwrap();

    let mut decrypted = Vec::new();
    decrypt_stream(&ciphertext[..], &mut decrypted, &recipient_sk, &sender_pk).unwrap();
    decrypted
}

#[test]
fn chunk_boundary_exactly_one_chunk() {
    let plaintext = vec![0x42u8; CHUNK_LEN];
    assert_eq!(round_trip(&plaintext), plaintext);
}

#[test]
fn chunk_boundary_one_byte_over() {
    let plaintext = vec![0x42u8; CHUNK_LEN + 1];
    assert_eq!(round_trip(&plaintext), plaintext);
}

#[test]
fn truncated_stream_after_header_reports_truncated_chunk() {
    let (sender_pk, sender_sk) = box_keypair();
    let (recipient_pk, recipient_sk) = box_keypair();

    let mut ciphertext = Vec::new();
    encrypt_stream(&b"some data"[..], &mut ciphertext, &sender_sk, &recipient_pk).unwrap();
    ciphertext.truncate(ciphertext.len() - 2);

    let mut decrypted = Vec::new();
    let err = decrypt_stream(&ciphertext[..], &mut decrypted, &recipient_sk, &sender_pk)
        .unwrap_err();
    assert!(matches!(err, CodecError::ChunkTruncated(0)));
    assert!(decrypted.is_empty());
}

#[test]
fn bit_flip_anywhere_in_ciphertext_body_is_detected() {
    let (sender_pk, sender_sk) = box_keypair();
    let (recipient_pk, recipient_sk) = box_keypair();
    let plaintext = vec![7u8; CHUNK_LEN + 500];

    let mut ciphertext = Vec::new();
    encrypt_stream(&plaintext[..], &mut ciphertext, &sender_sk, &recipient_pk).unwrap();

    // Flip a byte well inside the first chunk's body, after the header.
    let flip_at = 100;
    ciphertext[flip_at] ^= 0x01;

    let mut decrypted = Vec::new();
    assert!(decrypt_stream(&ciphertext[..], &mut decrypted, &recipient_sk, &sender_pk).is_err());
    assert!(decrypted.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn decrypt_of_encrypt_is_identity(plaintext in prop::collection::vec(any::<u8>(), 0..8192)) {
        prop_assert_eq!(round_trip(&plaintext), plaintext);
    }
}
