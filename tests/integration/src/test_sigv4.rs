//! Signature verification over the wire.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cybs3_core::{ClientError, Credentials, Region};
    use cybs3_client::{S3Client, S3ClientConfig};
    use cybs3_crypto::DataKey;
    use cybs3_s3_core::MemoryBackend;

    use crate::{bucket_name, spawn_s3_with, test_access_key, test_secret_key};

    async fn validating_endpoint() -> String {
        spawn_s3_with(Arc::new(MemoryBackend::new("us-east-1")), true).await
    }

    fn client_with_secret(endpoint: &str, secret: &str) -> S3Client {
        let config = S3ClientConfig::new(
            endpoint,
            Region::default(),
            Credentials::new(test_access_key(), secret),
        );
        S3Client::new(config, DataKey::generate()).expect("client")
    }

    #[tokio::test]
    async fn test_should_accept_correctly_signed_requests() {
        let endpoint = validating_endpoint().await;
        let client = client_with_secret(&endpoint, test_secret_key());
        let bucket = bucket_name("signed");

        client.create_bucket(&bucket).await.expect("create");
        client
            .put_object_buffered(&bucket, "signed.txt", b"verified payload")
            .await
            .expect("put");
        let fetched = client
            .get_object_buffered(&bucket, "signed.txt")
            .await
            .expect("get");
        assert_eq!(fetched, b"verified payload");
    }

    #[tokio::test]
    async fn test_should_reject_wrong_secret() {
        let endpoint = validating_endpoint().await;
        let client = client_with_secret(&endpoint, "WRONG_SECRET_KEY");

        let err = client.create_bucket(&bucket_name("forged")).await.unwrap_err();
        assert!(
            matches!(err, ClientError::InvalidCredentials),
            "expected InvalidCredentials, got {err}"
        );
    }

    #[tokio::test]
    async fn test_should_reject_unknown_access_key() {
        let endpoint = validating_endpoint().await;
        let config = S3ClientConfig::new(
            &endpoint,
            Region::default(),
            Credentials::new("UNKNOWN_AKID", test_secret_key()),
        );
        let client = S3Client::new(config, DataKey::generate()).expect("client");

        let err = client.head_bucket("whatever").await.unwrap_err();
        // HEAD has no error body, so the status is all the client sees.
        assert!(matches!(err, ClientError::HttpStatus(403)));
    }

    #[tokio::test]
    async fn test_should_verify_streaming_uploads_signed_as_unsigned_payload() {
        use bytes::Bytes;
        use futures::stream;

        let endpoint = validating_endpoint().await;
        let client = client_with_secret(&endpoint, test_secret_key());
        let bucket = bucket_name("streamsig");
        client.create_bucket(&bucket).await.expect("create");

        let plaintext = vec![7u8; 300_000];
        let pieces = vec![Ok::<_, cybs3_crypto::CryptoError>(Bytes::from(plaintext.clone()))];
        client
            .put_object(&bucket, "s.bin", stream::iter(pieces), plaintext.len() as u64)
            .await
            .expect("streaming put under signature validation");

        let fetched = client.get_object_buffered(&bucket, "s.bin").await.expect("get");
        assert_eq!(fetched, plaintext);
    }
}
