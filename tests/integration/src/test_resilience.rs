//! Resilience behavior of the client against a dead endpoint.

#[cfg(test)]
mod tests {
    use cybs3_core::{BreakerConfig, ClientError, Credentials, Region, RetryPolicy};
    use cybs3_client::{S3Client, S3ClientConfig};
    use cybs3_crypto::DataKey;
    use tokio::net::TcpListener;

    use crate::{make_client, spawn_s3, test_access_key, test_secret_key};

    /// An address nothing listens on (bind, take the port, drop).
    async fn dead_endpoint() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        format!("http://{addr}")
    }

    fn fragile_client(endpoint: &str, threshold: u32) -> S3Client {
        let mut config = S3ClientConfig::new(
            endpoint,
            Region::default(),
            Credentials::new(test_access_key(), test_secret_key()),
        );
        config.retry = RetryPolicy::none();
        config.breaker = BreakerConfig {
            failure_threshold: threshold,
            reset_timeout: std::time::Duration::from_secs(60),
        };
        S3Client::new(config, DataKey::generate()).expect("client")
    }

    #[tokio::test]
    async fn test_should_trip_breaker_after_consecutive_transport_failures() {
        let endpoint = dead_endpoint().await;
        let client = fragile_client(&endpoint, 2);

        // Two transport failures trip the breaker.
        for _ in 0..2 {
            let err = client.head_bucket("b").await.unwrap_err();
            assert!(
                matches!(err, ClientError::Transport(_)),
                "expected transport error, got {err}"
            );
        }

        // The third call fails fast without touching the network.
        let err = client.head_bucket("b").await.unwrap_err();
        assert!(
            matches!(err, ClientError::CircuitOpen { .. }),
            "expected CircuitOpen, got {err}"
        );
    }

    #[tokio::test]
    async fn test_should_not_trip_breaker_on_application_errors() {
        let endpoint = spawn_s3().await;
        let client = make_client(&endpoint);

        // 404s are application errors: endpoint health is fine.
        for _ in 0..6 {
            let err = client.get_object_buffered("ghost-bucket", "k").await.unwrap_err();
            assert!(matches!(err, ClientError::NoSuchBucket { .. }));
        }

        let bucket = crate::bucket_name("healthy");
        client.create_bucket(&bucket).await.expect("breaker must still be closed");
    }

    #[tokio::test]
    async fn test_should_recover_after_manual_reset() {
        let endpoint = dead_endpoint().await;
        let client = fragile_client(&endpoint, 1);

        let _ = client.head_bucket("b").await;
        assert!(matches!(
            client.head_bucket("b").await.unwrap_err(),
            ClientError::CircuitOpen { .. }
        ));

        client.breaker().reset().await;
        // Closed again: the next call goes back out (and fails on
        // transport, not on the breaker).
        assert!(matches!(
            client.head_bucket("b").await.unwrap_err(),
            ClientError::Transport(_)
        ));
    }
}
