//! Encrypted object transport end-to-end.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use cybs3_core::ClientError;
    use cybs3_crypto::{CryptoError, DataKey, chunk};
    use futures::stream;

    use crate::{bucket_name, claimed_auth, make_client, make_client_with_key, spawn_s3};

    #[tokio::test]
    async fn test_should_roundtrip_buffered_object() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("obj");
        client.create_bucket(&bucket).await.expect("create");

        let plaintext = b"hello encrypted world".to_vec();
        let etag = client
            .put_object_buffered(&bucket, "greeting.txt", &plaintext)
            .await
            .expect("put");
        assert!(etag.starts_with('"'));

        let fetched = client
            .get_object_buffered(&bucket, "greeting.txt")
            .await
            .expect("get");
        assert_eq!(fetched, plaintext);
    }

    #[tokio::test]
    async fn test_should_stream_large_object_through_chunked_pipeline() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("stream");
        client.create_bucket(&bucket).await.expect("create");

        // 3 MiB of patterned data, fed to the client in ragged pieces.
        let plaintext: Vec<u8> = (0..3 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
        let pieces: Vec<Result<Bytes, CryptoError>> = plaintext
            .chunks(70_000)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        client
            .put_object(
                &bucket,
                "large.bin",
                stream::iter(pieces),
                plaintext.len() as u64,
            )
            .await
            .expect("streaming put");

        // The stored ciphertext carries the chunked-AEAD overhead.
        let info = client.head_object(&bucket, "large.bin").await.expect("head");
        let chunk_size = chunk::optimal_chunk_size(plaintext.len() as u64);
        assert_eq!(info.chunk_size, chunk_size);
        assert_eq!(
            info.ciphertext_size,
            chunk::encrypted_size(plaintext.len() as u64, chunk_size)
        );
        assert_eq!(info.plaintext_size, plaintext.len() as u64);

        let fetched = client
            .get_object_buffered(&bucket, "large.bin")
            .await
            .expect("get");
        assert_eq!(fetched, plaintext);
    }

    #[tokio::test]
    async fn test_should_store_ciphertext_not_plaintext_on_server() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("zero-knowledge");
        client.create_bucket(&bucket).await.expect("create");

        let plaintext = b"the server must never see this".to_vec();
        client
            .put_object_buffered(&bucket, "secret.bin", &plaintext)
            .await
            .expect("put");

        // Fetch the raw stored bytes without the decrypting client.
        let http = reqwest::Client::new();
        let raw = http
            .get(format!("{endpoint}/{bucket}/secret.bin"))
            .header("authorization", claimed_auth(crate::test_access_key()))
            .send()
            .await
            .expect("raw get")
            .bytes()
            .await
            .expect("raw body");

        assert_eq!(raw.len(), plaintext.len() + 28, "one sealed chunk");
        assert!(
            !raw.windows(plaintext.len()).any(|w| w == plaintext),
            "plaintext must not appear in the stored bytes"
        );
    }

    #[tokio::test]
    async fn test_should_fail_decryption_with_wrong_data_key() {
        let endpoint = spawn_s3().await;
        let bucket = bucket_name("wrongkey");

        let writer = make_client(&endpoint);
        writer.create_bucket(&bucket).await.expect("create");
        writer
            .put_object_buffered(&bucket, "k", b"sealed under writer's key")
            .await
            .expect("put");

        // A client with a different data key can fetch the ciphertext but
        // cannot open it.
        let reader = make_client_with_key(&endpoint, DataKey::generate());
        let err = reader.get_object_buffered(&bucket, "k").await.unwrap_err();
        assert!(matches!(err, ClientError::DecryptionFailed));
    }

    #[tokio::test]
    async fn test_should_handle_empty_object() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("empty");
        client.create_bucket(&bucket).await.expect("create");

        client
            .put_object_buffered(&bucket, "empty.bin", b"")
            .await
            .expect("put");
        let fetched = client
            .get_object_buffered(&bucket, "empty.bin")
            .await
            .expect("get");
        assert!(fetched.is_empty());
    }

    #[tokio::test]
    async fn test_should_list_objects_with_pagination() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("list");
        client.create_bucket(&bucket).await.expect("create");

        for i in 0..7 {
            client
                .put_object_buffered(&bucket, &format!("item-{i:02}"), b"x")
                .await
                .expect("put");
        }
        client
            .put_object_buffered(&bucket, "other/ignored", b"x")
            .await
            .expect("put");

        let entries = client
            .list_objects(&bucket, Some("item-"))
            .await
            .expect("list");
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            (0..7).map(|i| format!("item-{i:02}")).collect::<Vec<_>>()
        );

        let err = client
            .get_object_buffered(&bucket, "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoSuchKey { .. }));
    }
}
