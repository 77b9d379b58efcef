//! # Result Retrieval
//!
//! Downloads the artifact an [`UpscaleResult`] points at and decodes it into
//! an [`OutputImage`]. Every call downloads again; nothing is cached.

use reqwest::Client;
use tracing::{debug, instrument};
use upscale_codec::{decode_embeddable, decode_from_bytes, is_embedded};

use crate::bitmap::OutputImage;
use crate::client::UpscaleResult;
use crate::error::{UpscalerError, UpscalerResult};

/// Downloads and decodes result images.
#[derive(Debug, Clone, Default)]
pub struct ResultFetcher {
    http: Client,
}

impl ResultFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// Retrieve and decode the result image.
    ///
    /// Fails with [`UpscalerError::Fetch`] on network errors or non-2xx
    /// responses and with [`UpscalerError::Decode`] when the bytes are not an
    /// image. `data:` references are decoded without any network access.
    #[instrument(skip_all, fields(request_id = %result.request_id))]
    pub async fn fetch(&self, result: &UpscaleResult) -> UpscalerResult<OutputImage> {
        let bytes = self.fetch_bytes(&result.image_url).await?;
        let image = decode_from_bytes(&bytes)
            .map_err(|e| UpscalerError::decode(display_reference(&result.image_url), e))?;
        debug!(width = image.width(), height = image.height(), "result decoded");
        Ok(OutputImage::new(image))
    }

    /// Raw bytes behind a reference.
    pub async fn fetch_bytes(&self, reference: &str) -> UpscalerResult<Vec<u8>> {
        if is_embedded(reference) {
            let (_, bytes) = decode_embeddable(reference)
                .map_err(|e| UpscalerError::decode("inline result", e))?;
            return Ok(bytes);
        }

        let response = self
            .http
            .get(reference)
            .send()
            .await
            .map_err(|e| UpscalerError::fetch(reference, None, Some(Box::new(e))))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpscalerError::fetch(reference, Some(status.as_u16()), None)
                .with_recovery_suggestion("The result may have expired; resubmit the image"));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| UpscalerError::fetch(reference, Some(status.as_u16()), Some(Box::new(e))))?;
        debug!(len = bytes.len(), "result downloaded");
        Ok(bytes.to_vec())
    }
}

/// `data:` URIs can be megabytes long; keep error messages readable.
fn display_reference(reference: &str) -> &str {
    if is_embedded(reference) {
        "inline result"
    } else {
        reference
    }
}
