//! S3 HTTP surface for CybS3.
//!
//! Translates the S3 REST protocol into calls on a
//! [`cybs3_s3_core::StorageBackend`]:
//!
//! 1. [`router`] resolves bucket, key, and operation from the request.
//! 2. [`service`] collects the body, verifies SigV4 (unless disabled),
//!    runs the access-control check, and dispatches.
//! 3. [`dispatch`] maps each operation onto the backend and builds the
//!    response from [`xml`] documents.

pub mod body;
pub mod dispatch;
pub mod router;
pub mod service;
pub mod xml;

pub use body::S3ResponseBody;
pub use router::{RoutingContext, S3Router};
pub use service::{S3HttpConfig, S3HttpService};
