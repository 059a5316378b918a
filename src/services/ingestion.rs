// src/services/ingestion.rs
use crate::errors::IngestionError;
use crate::models::EncodedImage;
use image::{GenericImageView, ImageFormat as ImgFormat};
use log::{debug, info};
use reqwest::{Client, StatusCode, Url};
use std::path::Path;

/// Turns a local file, an uploaded body or a remote URL into an `EncodedImage`.
pub struct ImageIngestor {
    client: Client,
    max_dimension: u32,
}

impl ImageIngestor {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            client: Client::new(),
            max_dimension,
        }
    }

    pub async fn from_file(&self, path: impl AsRef<Path>) -> Result<EncodedImage, IngestionError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            IngestionError::Unreadable(format!("failed to read {}: {}", path.display(), e))
        })?;

        self.from_bytes(&data)
    }

    pub async fn from_url(&self, url: &str) -> Result<EncodedImage, IngestionError> {
        let url = url.trim();

        if url.starts_with("data:") {
            let inline = EncodedImage::from_data_url(url)?;
            let data = inline
                .decode()
                .map_err(|e| IngestionError::Unreadable(e.to_string()))?;
            return self.from_bytes(&data);
        }

        let parsed = Url::parse(url)
            .map_err(|e| IngestionError::FetchFailed(format!("invalid URL `{}`: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(IngestionError::FetchFailed(format!(
                "unsupported URL scheme `{}`",
                parsed.scheme()
            )));
        }

        info!("Fetching image from {}", parsed);

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| IngestionError::FetchFailed(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if is_access_denied(status) {
            return Err(IngestionError::Blocked(format!(
                "{} answered HTTP {}",
                url, status
            )));
        }
        if !status.is_success() {
            return Err(IngestionError::FetchFailed(format!(
                "{} answered HTTP {}",
                url, status
            )));
        }

        let data = response.bytes().await.map_err(|e| {
            IngestionError::FetchFailed(format!("reading body from {} failed: {}", url, e))
        })?;

        self.from_bytes(&data)
    }

    /// Validates the bytes as an image and downscales anything larger than
    /// `max_dimension` on either side.
    pub fn from_bytes(&self, data: &[u8]) -> Result<EncodedImage, IngestionError> {
        if data.is_empty() {
            return Err(IngestionError::Unreadable("image is empty".to_string()));
        }

        let format = image::guess_format(data)
            .map_err(|e| IngestionError::Unreadable(format!("unrecognised image data: {}", e)))?;
        let mime_type = mime_for(format).ok_or_else(|| {
            IngestionError::Unreadable(format!("unsupported image format {:?}", format))
        })?;

        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| IngestionError::Unreadable(format!("Invalid image format: {}", e)))?;

        let (width, height) = img.dimensions();
        if width <= self.max_dimension && height <= self.max_dimension {
            return Ok(EncodedImage::from_bytes(mime_type, data));
        }

        let ratio = (self.max_dimension as f32 / width.max(height) as f32).min(1.0);
        let new_width = ((width as f32 * ratio) as u32).max(1);
        let new_height = ((height as f32 * ratio) as u32).max(1);
        debug!(
            "Downscaling {}x{} image to {}x{}",
            width, height, new_width, new_height
        );

        let resized = img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);

        let mut output = Vec::new();
        resized
            .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Png)
            .map_err(|e| {
                IngestionError::Unreadable(format!("Failed to encode resized image: {}", e))
            })?;

        Ok(EncodedImage::from_bytes("image/png", &output))
    }
}

/// Hosts that refuse us outright, as opposed to failing to serve.
fn is_access_denied(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::PROXY_AUTHENTICATION_REQUIRED
            | StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS
    )
}

fn mime_for(format: ImgFormat) -> Option<&'static str> {
    match format {
        ImgFormat::Png => Some("image/png"),
        ImgFormat::Jpeg => Some("image/jpeg"),
        ImgFormat::WebP => Some("image/webp"),
        ImgFormat::Gif => Some("image/gif"),
        ImgFormat::Bmp => Some("image/bmp"),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([200, 120, 40]),
    ));
    let mut out = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut out), ImgFormat::Png)
        .unwrap();
    out
}
