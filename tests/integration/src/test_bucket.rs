//! Bucket lifecycle over the wire.

#[cfg(test)]
mod tests {
    use cybs3_core::ClientError;

    use crate::{bucket_name, make_client, spawn_s3};

    #[tokio::test]
    async fn test_should_create_head_and_delete_bucket() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("crud");

        client.create_bucket(&bucket).await.expect("create");
        client.head_bucket(&bucket).await.expect("head");
        client.delete_bucket(&bucket).await.expect("delete");

        let err = client.head_bucket(&bucket).await.unwrap_err();
        assert!(matches!(err, ClientError::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_should_reject_deleting_non_empty_bucket() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("nonempty");

        client.create_bucket(&bucket).await.expect("create");
        client
            .put_object_buffered(&bucket, "blocker.bin", b"data")
            .await
            .expect("put");

        let err = client.delete_bucket(&bucket).await.unwrap_err();
        assert!(matches!(err, ClientError::BucketNotEmpty { .. }));

        client.delete_object(&bucket, "blocker.bin").await.expect("delete object");
        client.delete_bucket(&bucket).await.expect("delete bucket");
    }

    #[tokio::test]
    async fn test_should_report_missing_bucket_as_no_such_bucket() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);

        let err = client
            .get_object_buffered("never-created", "key")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoSuchBucket { .. }));
    }
}
