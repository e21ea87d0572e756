//! Access control over the wire: policy deny vs ACL grants.

#[cfg(test)]
mod tests {
    use crate::{bucket_name, claimed_auth, make_client, spawn_s3, test_access_key};

    /// The spec's canonical scenario: a policy denies `GetObject` on one
    /// key while the object ACLs grant `AllUsers` read. The deny wins on
    /// that key and only that key.
    #[tokio::test]
    async fn test_should_let_policy_deny_beat_public_acl() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("policy");
        client.create_bucket(&bucket).await.expect("create");

        let http = reqwest::Client::new();
        let auth = claimed_auth(test_access_key());

        // Two public-read objects.
        for key in ["secret.txt", "other.txt"] {
            let response = http
                .put(format!("{endpoint}/{bucket}/{key}"))
                .header("authorization", &auth)
                .header("x-amz-acl", "public-read")
                .body("contents")
                .send()
                .await
                .expect("put");
            assert!(response.status().is_success());
        }

        // Deny GetObject on secret.txt for everyone.
        let policy = serde_json::json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Deny",
                "Principal": "*",
                "Action": "s3:GetObject",
                "Resource": format!("arn:aws:s3:::{bucket}/secret.txt"),
            }]
        });
        let response = http
            .put(format!("{endpoint}/{bucket}?policy"))
            .header("authorization", &auth)
            .body(policy.to_string())
            .send()
            .await
            .expect("put policy");
        assert!(response.status().is_success());

        // Anonymous GET of secret.txt: 403 despite the AllUsers grant.
        let response = http
            .get(format!("{endpoint}/{bucket}/secret.txt"))
            .send()
            .await
            .expect("get secret");
        assert_eq!(response.status(), 403);
        let body = response.text().await.expect("body");
        assert!(body.contains("<Code>AccessDenied</Code>"));

        // Anonymous GET of other.txt: permitted by the ACL.
        let response = http
            .get(format!("{endpoint}/{bucket}/other.txt"))
            .send()
            .await
            .expect("get other");
        assert_eq!(response.status(), 200);
        assert_eq!(response.bytes().await.expect("body").as_ref(), b"contents");
    }

    #[tokio::test]
    async fn test_should_deny_anonymous_access_to_private_objects() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("private");
        client.create_bucket(&bucket).await.expect("create");
        client
            .put_object_buffered(&bucket, "mine.txt", b"owner only")
            .await
            .expect("put");

        let http = reqwest::Client::new();
        let response = http
            .get(format!("{endpoint}/{bucket}/mine.txt"))
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), 403);
    }

    #[tokio::test]
    async fn test_should_return_404_for_missing_key_reads() {
        // Reads of a missing key must 404, not 403, regardless of grants.
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("missing");
        client.create_bucket(&bucket).await.expect("create");

        let http = reqwest::Client::new();
        let response = http
            .get(format!("{endpoint}/{bucket}/never-was"))
            .header("authorization", claimed_auth(test_access_key()))
            .send()
            .await
            .expect("get");
        assert_eq!(response.status(), 404);
        let body = response.text().await.expect("body");
        assert!(body.contains("<Code>NoSuchKey</Code>"));
    }

    #[tokio::test]
    async fn test_should_let_policy_allow_grant_access_to_other_principals() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("grant");
        client.create_bucket(&bucket).await.expect("create");
        client
            .put_object_buffered(&bucket, "shared.txt", b"for bob")
            .await
            .expect("put");

        let http = reqwest::Client::new();
        let policy = serde_json::json!({
            "Statement": [{
                "Effect": "Allow",
                "Principal": {"AWS": "BOBKEY"},
                "Action": "s3:GetObject",
                "Resource": format!("arn:aws:s3:::{bucket}/*"),
            }]
        });
        let response = http
            .put(format!("{endpoint}/{bucket}?policy"))
            .header("authorization", claimed_auth(test_access_key()))
            .body(policy.to_string())
            .send()
            .await
            .expect("put policy");
        assert!(response.status().is_success());

        // Bob may read (ciphertext; decryption is not his problem here).
        let response = http
            .get(format!("{endpoint}/{bucket}/shared.txt"))
            .header("authorization", claimed_auth("BOBKEY"))
            .send()
            .await
            .expect("get as bob");
        assert_eq!(response.status(), 200);

        // Carol may not.
        let response = http
            .get(format!("{endpoint}/{bucket}/shared.txt"))
            .header("authorization", claimed_auth("CAROLKEY"))
            .send()
            .await
            .expect("get as carol");
        assert_eq!(response.status(), 403);
    }
}
