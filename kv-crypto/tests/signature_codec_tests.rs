//! DER ⇄ raw conversion of ECDSA signatures

use assert_matches::assert_matches;
use kv_crypto::crypto::signature_codec::{to_der, to_raw};
use kv_crypto::Error;
use rand::Rng;

/// Coordinate lengths of ES256, ES256K, ES384 and ES512
const COORDINATE_LENGTHS: [usize; 4] = [32, 32, 48, 66];

fn random_raw(rng: &mut impl Rng, coord_len: usize, iteration: usize) -> Vec<u8> {
    let mut raw = vec![0u8; coord_len * 2];
    rng.fill(&mut raw[..]);
    match iteration % 4 {
        // both components need a sign byte
        0 => {
            raw[0] |= 0x80;
            raw[coord_len] |= 0x80;
        }
        // leading zero bytes shorten the integers
        1 => {
            raw[0] = 0;
            raw[1] &= 0x7f;
            raw[coord_len] = 0;
        }
        2 => raw[0] |= 0x80,
        _ => {}
    }
    raw
}

#[test]
fn test_randomized_round_trip_per_curve() {
    let mut rng = rand::thread_rng();
    for coord_len in COORDINATE_LENGTHS {
        for iteration in 0..1000 {
            let raw = random_raw(&mut rng, coord_len, iteration);
            let der = to_der(&raw, coord_len).unwrap();
            assert_eq!(der[0], 0x30);

            let decoded = to_raw(&der, coord_len).unwrap();
            assert_eq!(decoded, raw, "coord_len {} iteration {}", coord_len, iteration);

            // DER produced by the encoder is minimal and comes back unchanged
            assert_eq!(to_der(&decoded, coord_len).unwrap(), der);
        }
    }
}

#[test]
fn test_top_bit_forces_padding_byte() {
    let coord_len = 32;
    let raw = vec![0xffu8; 64];
    let der = to_der(&raw, coord_len).unwrap();
    // SEQUENCE, then INTEGER of 33 bytes starting with 0x00
    assert_eq!(&der[..5], &[0x30, 70, 0x02, 33, 0x00]);
    assert_eq!(der.len(), 72);
}

#[test]
fn test_every_truncation_is_rejected() {
    let mut rng = rand::thread_rng();
    for coord_len in COORDINATE_LENGTHS {
        let raw = random_raw(&mut rng, coord_len, 0);
        let der = to_der(&raw, coord_len).unwrap();
        for len in 0..der.len() {
            assert_matches!(
                to_raw(&der[..len], coord_len),
                Err(Error::MalformedSignature(_)),
                "truncated to {} bytes",
                len
            );
        }
    }
}

#[test]
fn test_wrong_tags_are_rejected() {
    let der = to_der(&[0x11u8; 64], 32).unwrap();

    let mut bad_sequence = der.clone();
    bad_sequence[0] = 0x31;
    assert_matches!(to_raw(&bad_sequence, 32), Err(Error::MalformedSignature(_)));

    let mut bad_integer = der.clone();
    bad_integer[2] = 0x03;
    assert_matches!(to_raw(&bad_integer, 32), Err(Error::MalformedSignature(_)));
}

#[test]
fn test_declared_length_past_buffer() {
    // sequence claims more content than present
    let der = [0x30, 0x08, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01];
    assert_matches!(to_raw(&der, 32), Err(Error::MalformedSignature(_)));

    // second integer claims more bytes than remain
    let der = [0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x05, 0x01];
    assert_matches!(to_raw(&der, 32), Err(Error::MalformedSignature(_)));

    // long-form length with its length octet cut off
    let der = [0x30, 0x81];
    assert_matches!(to_raw(&der, 66), Err(Error::MalformedSignature(_)));
}

#[test]
fn test_only_minimal_integers_decode() {
    // full-width r with the high bit set and no 0x00 sign byte
    let mut negative = vec![0x30, 0x25, 0x02, 0x20];
    negative.extend_from_slice(&[0x80; 32]);
    negative.extend_from_slice(&[0x02, 0x01, 0x01]);
    assert_matches!(to_raw(&negative, 32), Err(Error::MalformedSignature(_)));

    // s carries a redundant leading zero
    let padded = [0x30, 0x07, 0x02, 0x01, 0x01, 0x02, 0x02, 0x00, 0x7f];
    assert_matches!(to_raw(&padded, 32), Err(Error::MalformedSignature(_)));

    // 33 bytes without a sign byte cannot fit a 32-byte coordinate
    let mut oversized = vec![0x30, 0x26, 0x02, 0x21];
    oversized.extend_from_slice(&[0x01; 33]);
    oversized.extend_from_slice(&[0x02, 0x01, 0x01]);
    assert_matches!(to_raw(&oversized, 32), Err(Error::MalformedSignature(_)));
}

#[test]
fn test_arbitrary_bytes_never_panic() {
    let mut rng = rand::thread_rng();
    for _ in 0..2000 {
        let len = rng.gen_range(0..80);
        let mut bytes = vec![0u8; len];
        rng.fill(&mut bytes[..]);
        if len > 0 && rng.gen_bool(0.5) {
            bytes[0] = 0x30;
        }
        let _ = to_raw(&bytes, 32);
    }
}
