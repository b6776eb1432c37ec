//! Envelope encryption with a local key-encryption key
//!
//! Generates a content key, encrypts a message with A256CBC-HS512, wraps the
//! content key with RSA-OAEP-256, then reverses both steps.
//!
//! Run with: cargo run --example envelope_encryption

use kv_crypto::{
    CryptographyClient, DecryptParameters, EncryptParameters, JsonWebKey, Result,
};

fn main() -> Result<()> {
    tokio_test::block_on(async {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();

        let kek = JsonWebKey::generate_rsa(2048)?.with_kid("kek-1");
        let kek_client = CryptographyClient::from_key(kek.clone())?;

        let cek = JsonWebKey::generate_oct(512)?;
        let content_key = cek.k.clone().unwrap_or_default();
        let content_client = CryptographyClient::from_key(cek)?;

        let encrypted = content_client
            .encrypt(
                EncryptParameters::new("A256CBC-HS512", b"Transfer 100 USDC to alice".to_vec())
                    .with_additional_authenticated_data(b"kek-1".to_vec()),
            )
            .await?;
        let wrapped = kek_client.wrap_key("RSA-OAEP-256", &content_key).await?;

        println!("ciphertext:  {} bytes", encrypted.ciphertext.len());
        println!("wrapped key: {} bytes", wrapped.encrypted_key.len());

        let unwrapped = kek_client
            .unwrap_key("RSA-OAEP-256", &wrapped.encrypted_key)
            .await?;
        let recovered = CryptographyClient::from_key(JsonWebKey::from_oct(unwrapped.key))?;
        let decrypted = recovered
            .decrypt(DecryptParameters::from_encrypt_result(&encrypted))
            .await?;

        println!("plaintext:   {}", String::from_utf8_lossy(&decrypted.plaintext));
        Ok(())
    })
}
