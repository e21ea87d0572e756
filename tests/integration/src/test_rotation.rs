//! Key rotation end-to-end: the mnemonic changes, stored ciphertext
//! does not.

#[cfg(test)]
mod tests {
    use cybs3_crypto::{ConfigStore, Mnemonic};

    use crate::{bucket_name, claimed_auth, make_client_with_key, spawn_s3, test_access_key};

    const M1: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const M2: &str = "legal winner thank year wave sausage worth useful legal winner thank yellow";

    #[tokio::test]
    async fn test_should_keep_objects_readable_after_mnemonic_rotation() {
        let endpoint = spawn_s3().await;
        let bucket = bucket_name("rotate");

        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::new(dir.path().join("cfg"));
        let m1 = Mnemonic::parse(M1).expect("m1");
        let m2 = Mnemonic::parse(M2).expect("m2");

        // Create the config under M1 and upload a 100-byte object with
        // its data key.
        let config = store.load(&m1).await.expect("load");
        let plaintext = vec![0x5Au8; 100];
        let client = make_client_with_key(&endpoint, config.data_key());
        client.create_bucket(&bucket).await.expect("create");
        client
            .put_object_buffered(&bucket, "durable.bin", &plaintext)
            .await
            .expect("put");

        // Snapshot the stored ciphertext.
        let http = reqwest::Client::new();
        let raw_url = format!("{endpoint}/{bucket}/durable.bin");
        let before = http
            .get(&raw_url)
            .header("authorization", claimed_auth(test_access_key()))
            .send()
            .await
            .expect("raw get")
            .bytes()
            .await
            .expect("raw body");

        // Rotate M1 -> M2.
        store.rotate_key(&m1, &m2).await.expect("rotate");

        // Reload with M2: the data key is unchanged, the object decrypts.
        let rotated = store.load(&m2).await.expect("reload");
        assert_eq!(rotated.data_key, config.data_key);

        let client = make_client_with_key(&endpoint, rotated.data_key());
        let fetched = client
            .get_object_buffered(&bucket, "durable.bin")
            .await
            .expect("get after rotation");
        assert_eq!(fetched, plaintext);

        // The blob on storage was never touched.
        let after = http
            .get(&raw_url)
            .header("authorization", claimed_auth(test_access_key()))
            .send()
            .await
            .expect("raw get")
            .bytes()
            .await
            .expect("raw body");
        assert_eq!(before, after, "rotation must not rewrite stored ciphertext");
    }
}
