//! CybS3 server: an S3-compatible endpoint with a collocated
//! KMS-API-compatible key service.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:4566` | S3 bind address |
//! | `KMS_LISTEN` | `0.0.0.0:4599` | KMS bind address |
//! | `S3_DOMAIN` | `s3.localhost` | Virtual hosting domain |
//! | `SKIP_SIGNATURE_VALIDATION` | `true` | Skip SigV4 verification |
//! | `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` | *(unset)* | Credential pair for SigV4 |
//! | `AWS_REGION` | `us-east-1` | Region |
//! | `KMS_KEYSTORE_PATH` | `./cybs3-keystore.json` | Keystore file |
//! | `LOG_LEVEL` | `info` | Log filter (overridden by `RUST_LOG`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cybs3_kms::http::KmsHttpService;
use cybs3_kms::{Keystore, KmsService};
use cybs3_s3_core::MemoryBackend;
use cybs3_s3_http::{S3HttpConfig, S3HttpService};
use cybs3_sigv4::StaticCredentialProvider;

/// Server version reported in logs.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime configuration from the environment.
#[derive(Debug, Clone)]
struct ServerConfig {
    gateway_listen: String,
    kms_listen: String,
    s3_domain: String,
    skip_signature_validation: bool,
    region: String,
    keystore_path: String,
    log_level: String,
}

impl ServerConfig {
    fn from_env() -> Self {
        let env = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_owned())
        };
        Self {
            gateway_listen: env("GATEWAY_LISTEN", "0.0.0.0:4566"),
            kms_listen: env("KMS_LISTEN", "0.0.0.0:4599"),
            s3_domain: env("S3_DOMAIN", "s3.localhost"),
            skip_signature_validation: env("SKIP_SIGNATURE_VALIDATION", "true")
                .eq_ignore_ascii_case("true"),
            region: env("AWS_REGION", "us-east-1"),
            keystore_path: env("KMS_KEYSTORE_PATH", "./cybs3-keystore.json"),
            log_level: env("LOG_LEVEL", "info"),
        }
    }
}

/// Initialize tracing: `RUST_LOG` wins, `LOG_LEVEL` is the fallback.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
    Ok(())
}

/// Build the SigV4 credential provider from the environment, if a pair is
/// configured.
fn build_credential_provider() -> Option<Arc<dyn cybs3_sigv4::CredentialProvider>> {
    let access_key = std::env::var("AWS_ACCESS_KEY_ID").ok()?;
    let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok()?;
    info!(access_key = %access_key, "configured credential provider from environment");
    Some(Arc::new(StaticCredentialProvider::new(vec![(
        access_key, secret_key,
    )])))
}

/// Accept loop for one listener, with graceful drain on shutdown.
async fn serve<S, B>(listener: TcpListener, service: S, name: &'static str) -> Result<()>
where
    S: hyper::service::Service<
            hyper::Request<hyper::body::Incoming>,
            Response = hyper::Response<B>,
            Error = std::convert::Infallible,
        > + Clone
        + Send
        + 'static,
    S::Future: Send,
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!(service = name, "received shutdown signal, draining connections");
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(service = name, error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => break,
        }
    }

    graceful.shutdown().await;
    info!(service = name, "all connections drained");
    Ok(())
}

/// Probe the S3 health endpoint; exit 0 when healthy.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;
    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env();

    if std::env::args().any(|a| a == "--health-check") {
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        kms_listen = %config.kms_listen,
        s3_domain = %config.s3_domain,
        skip_signature_validation = config.skip_signature_validation,
        version = VERSION,
        "starting CybS3 server",
    );

    // KMS first: the S3 backend takes a handle for SSE-KMS.
    let keystore = Keystore::open(&config.keystore_path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot open keystore: {e}"))?;
    let kms = Arc::new(KmsService::new(keystore, config.region.clone()));

    let backend = Arc::new(MemoryBackend::new(config.region.clone()).with_kms(Arc::clone(&kms)));

    let s3_config = S3HttpConfig {
        domain: config.s3_domain.clone(),
        virtual_hosting: true,
        skip_signature_validation: config.skip_signature_validation,
        region: config.region.clone(),
        credential_provider: build_credential_provider(),
    };
    let s3_service = S3HttpService::new(backend, s3_config);
    let kms_service = KmsHttpService::new(kms);

    let s3_addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;
    let kms_addr: SocketAddr = config
        .kms_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.kms_listen))?;

    let s3_listener = TcpListener::bind(s3_addr)
        .await
        .with_context(|| format!("failed to bind to {s3_addr}"))?;
    let kms_listener = TcpListener::bind(kms_addr)
        .await
        .with_context(|| format!("failed to bind to {kms_addr}"))?;

    info!(%s3_addr, %kms_addr, "listening for connections");

    let (s3_result, kms_result) = tokio::join!(
        serve(s3_listener, s3_service, "s3"),
        serve(kms_listener, kms_service, "kms"),
    );
    s3_result?;
    kms_result?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_read_defaults_from_empty_env() {
        let config = ServerConfig::from_env();
        assert!(!config.gateway_listen.is_empty());
        assert!(!config.kms_listen.is_empty());
        assert!(!config.keystore_path.is_empty());
    }
}
