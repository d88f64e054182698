//! Staging module
//!
//! Moves serialized files into object storage through short-lived signed
//! URLs handed out by the service.

mod uploader;

pub use uploader::{staging_file_name, StagingUploader, UploadTarget};
