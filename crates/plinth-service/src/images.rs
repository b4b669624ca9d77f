//! Image storage client.
//!
//! Images live behind an external script endpoint reached over HTTP
//! multipart. Stored paths follow the `miniatures/{bucket}/{id}.webp`
//! convention, where the bucket is derived from the id, so display URLs
//! can be built without a round trip.

use async_trait::async_trait;
use reqwest::multipart;
use tracing::debug;

use plinth_core::{Error, Result};

/// Bucket directory an id's image lands in.
pub fn bucket_for(id: i64) -> i64 {
    id / 100
}

/// Relative storage path for a miniature's image.
pub fn storage_path(id: i64) -> String {
    format!("miniatures/{}/{}.webp", bucket_for(id), id)
}

/// Store for miniature images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload (or overwrite) the image for a miniature. Returns the
    /// stored path.
    async fn upload(&self, miniature_id: i64, bytes: Vec<u8>, filename: &str) -> Result<String>;

    /// Delete the image for a miniature.
    async fn delete(&self, miniature_id: i64) -> Result<()>;

    /// Public URL the image is served from. Pure path arithmetic; no
    /// network involved.
    fn display_url(&self, miniature_id: i64) -> String;
}

/// HTTP implementation talking to the external image script.
pub struct HttpImageStore {
    client: reqwest::Client,
    endpoint: String,
    base_url: String,
}

impl HttpImageStore {
    pub fn new(endpoint: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(&self, miniature_id: i64, bytes: Vec<u8>, filename: &str) -> Result<String> {
        let path = storage_path(miniature_id);
        let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = multipart::Form::new()
            .text("id", miniature_id.to_string())
            .text("path", path.clone())
            .part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Request(format!(
                "image upload failed with status {}",
                response.status()
            )));
        }

        debug!(
            subsystem = "images",
            op = "upload",
            miniature_id,
            path = %path,
            "image uploaded"
        );
        Ok(path)
    }

    async fn delete(&self, miniature_id: i64) -> Result<()> {
        let path = storage_path(miniature_id);
        let form = multipart::Form::new()
            .text("action", "delete")
            .text("path", path.clone());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Request(format!(
                "image delete failed with status {}",
                response.status()
            )));
        }

        debug!(
            subsystem = "images",
            op = "delete",
            miniature_id,
            path = %path,
            "image deleted"
        );
        Ok(())
    }

    fn display_url(&self, miniature_id: i64) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            storage_path(miniature_id)
        )
    }
}
