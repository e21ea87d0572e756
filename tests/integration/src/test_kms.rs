//! The KMS JSON-over-HTTP surface.

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;

    use crate::spawn_kms;

    async fn post(
        endpoint: &str,
        operation: &str,
        body: serde_json::Value,
    ) -> (u16, serde_json::Value) {
        let response = reqwest::Client::new()
            .post(format!("{endpoint}/{operation}"))
            .json(&body)
            .send()
            .await
            .expect("request");
        let status = response.status().as_u16();
        let body: serde_json::Value = response.json().await.expect("json body");
        (status, body)
    }

    #[tokio::test]
    async fn test_should_create_describe_and_list_keys() {
        let (endpoint, _kms, _dir) = spawn_kms().await;

        let (status, created) = post(
            &endpoint,
            "CreateKey",
            serde_json::json!({"Description": "integration key"}),
        )
        .await;
        assert_eq!(status, 200);
        let key_id = created["KeyMetadata"]["KeyId"].as_str().expect("key id").to_owned();
        assert_eq!(created["KeyMetadata"]["KeyState"], "Enabled");
        assert_eq!(created["KeyMetadata"]["Description"], "integration key");

        let (status, described) =
            post(&endpoint, "DescribeKey", serde_json::json!({"KeyId": key_id})).await;
        assert_eq!(status, 200);
        assert!(
            described["KeyMetadata"]["Arn"]
                .as_str()
                .expect("arn")
                .starts_with("arn:aws:kms:us-east-1:")
        );

        let (status, listed) = post(&endpoint, "ListKeys", serde_json::json!({})).await;
        assert_eq!(status, 200);
        assert_eq!(listed["Keys"].as_array().expect("keys").len(), 1);
    }

    #[tokio::test]
    async fn test_should_roundtrip_envelope_encryption_over_http() {
        let (endpoint, _kms, _dir) = spawn_kms().await;

        let (_, created) = post(&endpoint, "CreateKey", serde_json::json!({})).await;
        let key_id = created["KeyMetadata"]["KeyId"].as_str().expect("key id");

        let plaintext = BASE64.encode(b"data key material");
        let (status, encrypted) = post(
            &endpoint,
            "Encrypt",
            serde_json::json!({"KeyId": key_id, "Plaintext": plaintext}),
        )
        .await;
        assert_eq!(status, 200);
        let blob = encrypted["CiphertextBlob"].as_str().expect("blob");
        assert_eq!(encrypted["EncryptionAlgorithm"], "SYMMETRIC_DEFAULT");

        // Decrypt without naming the key: the service finds it.
        let (status, decrypted) = post(
            &endpoint,
            "Decrypt",
            serde_json::json!({"CiphertextBlob": blob}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(decrypted["KeyId"], key_id);
        assert_eq!(
            BASE64
                .decode(decrypted["Plaintext"].as_str().expect("plaintext"))
                .expect("base64"),
            b"data key material"
        );
    }

    #[tokio::test]
    async fn test_should_refuse_disabled_key_and_recover_on_enable() {
        let (endpoint, _kms, _dir) = spawn_kms().await;

        let (_, created) = post(&endpoint, "CreateKey", serde_json::json!({})).await;
        let key_id = created["KeyMetadata"]["KeyId"].as_str().expect("key id");

        let (status, disabled) =
            post(&endpoint, "DisableKey", serde_json::json!({"KeyId": key_id})).await;
        assert_eq!(status, 200);
        assert_eq!(disabled["KeyMetadata"]["KeyState"], "Disabled");

        let (status, error) = post(
            &endpoint,
            "Encrypt",
            serde_json::json!({"KeyId": key_id, "Plaintext": BASE64.encode(b"x")}),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(error["__type"], "KMSInvalidStateException");

        let (status, _) =
            post(&endpoint, "EnableKey", serde_json::json!({"KeyId": key_id})).await;
        assert_eq!(status, 200);
        let (status, _) = post(
            &endpoint,
            "Encrypt",
            serde_json::json!({"KeyId": key_id, "Plaintext": BASE64.encode(b"x")}),
        )
        .await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_should_schedule_key_deletion_with_window() {
        let (endpoint, _kms, _dir) = spawn_kms().await;

        let (_, created) = post(&endpoint, "CreateKey", serde_json::json!({})).await;
        let key_id = created["KeyMetadata"]["KeyId"].as_str().expect("key id");

        let (status, error) = post(
            &endpoint,
            "ScheduleKeyDeletion",
            serde_json::json!({"KeyId": key_id, "PendingWindowInDays": 3}),
        )
        .await;
        assert_eq!(status, 400, "window below 7 days is rejected: {error}");

        let (status, scheduled) = post(
            &endpoint,
            "ScheduleKeyDeletion",
            serde_json::json!({"KeyId": key_id, "PendingWindowInDays": 7}),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(scheduled["KeyState"], "PendingDeletion");
        assert_eq!(scheduled["PendingWindowInDays"], 7);
    }

    #[tokio::test]
    async fn test_should_return_not_found_for_unknown_key() {
        let (endpoint, _kms, _dir) = spawn_kms().await;
        let (status, error) = post(
            &endpoint,
            "DescribeKey",
            serde_json::json!({"KeyId": "no-such-key"}),
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(error["__type"], "NotFoundException");
    }

    #[tokio::test]
    async fn test_should_reject_unknown_operation() {
        let (endpoint, _kms, _dir) = spawn_kms().await;
        let (status, _) = post(&endpoint, "MintCoins", serde_json::json!({})).await;
        assert_eq!(status, 400);
    }
}
