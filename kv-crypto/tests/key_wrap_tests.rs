//! AES key wrap through the cryptography client

use assert_matches::assert_matches;
use kv_crypto::algorithm::KeyWrapProvider;
use kv_crypto::{
    AlgorithmRegistry, CryptographyClient, CryptographyClientOptions, Error, JsonWebKey,
};

const KEY_DATA_128: &str = "00112233445566778899AABBCCDDEEFF";
const KEY_DATA_256: &str = "00112233445566778899AABBCCDDEEFF000102030405060708090A0B0C0D0E0F";

/// RFC 3394 §4.1, §4.2, §4.3 and §4.6
const VECTORS: [(&str, &str, &str, &str); 4] = [
    (
        "A128KW",
        "000102030405060708090A0B0C0D0E0F",
        KEY_DATA_128,
        "1FA68B0A8112B447AEF34BD8FB5A7B829D3E862371D2CFE5",
    ),
    (
        "A192KW",
        "000102030405060708090A0B0C0D0E0F1011121314151617",
        KEY_DATA_128,
        "96778B25AE6CA435F92B5B97C050AED2468AB8A17AD84E5D",
    ),
    (
        "A256KW",
        "000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F",
        KEY_DATA_128,
        "64E8C3F9CE0F5BA263E9777905818A2A93C8191E7D6E8AE7",
    ),
    (
        "A256KW",
        "000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F",
        KEY_DATA_256,
        "28C9F404C4B810F4CBCCB35CFB87F8263F5786E2D80ED326CBC7F0E71A99F43BFB988B9B7A02DD21",
    ),
];

fn client(kek: Vec<u8>, provider: KeyWrapProvider) -> CryptographyClient {
    CryptographyClient::new(
        JsonWebKey::from_oct(kek),
        None,
        CryptographyClientOptions::new().with_key_wrap_provider(provider),
    )
    .unwrap()
}

#[tokio::test]
async fn test_rfc3394_vectors_with_both_providers() {
    for provider in [KeyWrapProvider::Platform, KeyWrapProvider::Rfc3394] {
        for (alg, kek, data, wrapped) in VECTORS {
            let client = client(hex::decode(kek).unwrap(), provider);
            let data = hex::decode(data).unwrap();

            let result = client.wrap_key(alg, &data).await.unwrap();
            assert_eq!(hex::encode_upper(&result.encrypted_key), wrapped);

            let unwrapped = client
                .unwrap_key(alg, &result.encrypted_key)
                .await
                .unwrap();
            assert_eq!(unwrapped.key, data);
        }
    }
}

#[test]
fn test_key_lengths_outside_aes_sizes_rejected() {
    let registry = AlgorithmRegistry::with_defaults();
    let a128kw = registry.resolve_key_wrap("A128KW").unwrap();

    // 100, 150 and 200 bits, rounded up to whole bytes
    for len in [13, 19, 25] {
        let result = a128kw.create_encryptor(&vec![0u8; len], None, KeyWrapProvider::Platform);
        assert_matches!(result.err(), Some(Error::InvalidKeyMaterial { .. }), "{} bytes", len);
    }
}

#[tokio::test]
async fn test_wrong_kek_fails_authentication() {
    let data = hex::decode(KEY_DATA_128).unwrap();
    let wrapped = client(vec![1u8; 16], KeyWrapProvider::Platform)
        .wrap_key("A128KW", &data)
        .await
        .unwrap();

    for provider in [KeyWrapProvider::Platform, KeyWrapProvider::Rfc3394] {
        let result = client(vec![2u8; 16], provider)
            .unwrap_key("A128KW", &wrapped.encrypted_key)
            .await;
        assert_matches!(result, Err(Error::AuthenticationFailure { .. }));
    }
}

#[tokio::test]
async fn test_kek_shorter_than_algorithm() {
    let result = client(vec![0u8; 16], KeyWrapProvider::Platform)
        .wrap_key("A256KW", &[0u8; 16])
        .await;
    assert_matches!(result, Err(Error::InvalidKeyMaterial { .. }));
}
