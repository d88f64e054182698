//! Signed-URL upload of staged files

use crate::error::{Error, Result};
use crate::http::{ApiClient, RequestConfig};
use crate::output::PARQUET_CONTENT_TYPE;
use crate::progress::ProgressObserver;
use crate::types::TableRef;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Method};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::debug;
use uuid::Uuid;

/// Read size for streaming uploads
const UPLOAD_CHUNK_SIZE: usize = 256 * 1024;

/// Signed write target returned by the service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    /// Short-lived URL accepting a single PUT
    pub presigned_url: String,
    /// Storage key referencing the uploaded object
    pub key: String,
}

/// Unique object name for a push into `table`
///
/// Format: `{database}_{schema}_{table}_{uuid}.parquet`
pub fn staging_file_name(table: &TableRef) -> String {
    let sanitized: String = table
        .to_string()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("{sanitized}_{}.parquet", Uuid::new_v4())
}

/// Uploads staged files to object storage
#[derive(Debug, Clone)]
pub struct StagingUploader {
    client: ApiClient,
}

impl StagingUploader {
    /// Create an uploader over the given channel
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Ask the service for a signed upload URL and storage key
    pub async fn request_upload_target(&self, file_name: &str, token: &str) -> Result<UploadTarget> {
        self.client
            .request_json(
                Method::GET,
                "/presigned-upload",
                RequestConfig::new().query("filename", file_name),
                Some(token),
                "request upload target",
            )
            .await
    }

    /// Stream a local file to a signed URL with a single PUT
    ///
    /// The body is streamed in chunks, so file size is not limited by
    /// memory. Any failure is an [`Error::Upload`] and is not retried.
    pub async fn upload(
        &self,
        url: &str,
        path: &Path,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<()> {
        let target = url::Url::parse(url)
            .map_err(|e| Error::upload(format!("invalid signed URL: {e}")))?;

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| Error::upload(format!("cannot open {}: {e}", path.display())))?;
        let total = file
            .metadata()
            .await
            .map_err(|e| Error::upload(format!("cannot stat {}: {e}", path.display())))?
            .len();

        let stream = futures::stream::try_unfold((file, 0u64), move |(mut file, sent)| {
            let observer = Arc::clone(&observer);
            async move {
                let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    return Ok::<_, std::io::Error>(None);
                }
                buf.truncate(n);
                let sent = sent + n as u64;
                observer.on_upload_progress(sent, total);
                Ok(Some((Bytes::from(buf), (file, sent))))
            }
        });

        debug!("Uploading {} bytes to {}", total, target.host_str().unwrap_or("?"));

        let response = self
            .client
            .storage()
            .put(target)
            .header(CONTENT_TYPE, PARQUET_CONTENT_TYPE)
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|e| Error::upload(format!("PUT to signed URL failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upload(format!(
                "storage rejected upload with HTTP {}: {body}",
                status.as_u16()
            )));
        }

        Ok(())
    }
}
