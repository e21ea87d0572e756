//! Multipart upload end-to-end.

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use cybs3_core::ClientError;

    use crate::{bucket_name, claimed_auth, make_client, spawn_s3, test_access_key};

    #[tokio::test]
    async fn test_should_assemble_parts_submitted_out_of_order() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("mpu");
        client.create_bucket(&bucket).await.expect("create");

        let part1 = Bytes::from(vec![0x41u8; 5 * 1024 * 1024]);
        let part2 = Bytes::from(vec![0x42u8; 1024]);

        let upload_id = client
            .create_multipart_upload(&bucket, "assembled.bin")
            .await
            .expect("initiate");
        let e1 = client
            .upload_part(&bucket, "assembled.bin", &upload_id, 1, part1.clone())
            .await
            .expect("part 1");
        let e2 = client
            .upload_part(&bucket, "assembled.bin", &upload_id, 2, part2.clone())
            .await
            .expect("part 2");

        // Complete with the parts listed in reverse; the server sorts.
        let etag = client
            .complete_multipart_upload(
                &bucket,
                "assembled.bin",
                &upload_id,
                &[(2, e2), (1, e1)],
            )
            .await
            .expect("complete");
        assert!(etag.contains("-2"), "composite etag expected, got {etag}");

        // The assembled object is byte-identical to part1 ‖ part2.
        let http = reqwest::Client::new();
        let raw = http
            .get(format!("{endpoint}/{bucket}/assembled.bin"))
            .header("authorization", claimed_auth(test_access_key()))
            .send()
            .await
            .expect("get")
            .bytes()
            .await
            .expect("body");
        assert_eq!(raw.len(), part1.len() + part2.len());
        assert_eq!(&raw[..part1.len()], part1.as_ref());
        assert_eq!(&raw[part1.len()..], part2.as_ref());
    }

    #[tokio::test]
    async fn test_should_abort_upload_and_forget_parts() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("abort");
        client.create_bucket(&bucket).await.expect("create");

        let upload_id = client
            .create_multipart_upload(&bucket, "gone.bin")
            .await
            .expect("initiate");
        client
            .upload_part(&bucket, "gone.bin", &upload_id, 1, Bytes::from("partial"))
            .await
            .expect("part");

        client
            .abort_multipart_upload(&bucket, "gone.bin", &upload_id)
            .await
            .expect("abort");

        // Completing after abort fails; the bucket is deletable again.
        let err = client
            .complete_multipart_upload(&bucket, "gone.bin", &upload_id, &[(1, "\"x\"".to_owned())])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::HttpStatus(404)));

        client.delete_bucket(&bucket).await.expect("delete bucket");
    }

    #[tokio::test]
    async fn test_should_reject_completion_with_missing_part() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);
        let bucket = bucket_name("gap");
        client.create_bucket(&bucket).await.expect("create");

        let upload_id = client
            .create_multipart_upload(&bucket, "gappy.bin")
            .await
            .expect("initiate");
        let e1 = client
            .upload_part(&bucket, "gappy.bin", &upload_id, 1, Bytes::from("a"))
            .await
            .expect("part 1");
        let e3 = client
            .upload_part(&bucket, "gappy.bin", &upload_id, 3, Bytes::from("c"))
            .await
            .expect("part 3");

        let err = client
            .complete_multipart_upload(&bucket, "gappy.bin", &upload_id, &[(1, e1), (3, e3)])
            .await
            .unwrap_err();
        // InvalidPartOrder surfaces as a 400.
        assert!(matches!(err, ClientError::HttpStatus(400)));
    }
}
