//! Server-side state: buckets, objects, versions, and multipart uploads.

pub mod bucket;
pub mod multipart;
pub mod object;
pub mod objectstore;
pub mod service;

pub use bucket::S3Bucket;
pub use multipart::{MultipartUpload, UploadPart};
pub use object::ObjectRecord;
pub use objectstore::ObjectStore;
pub use service::S3ServiceState;
