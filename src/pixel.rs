//! The 1×1 transparent beacon image

use axum::body::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::{Cursor, ErrorKind};
use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::errors::AppResult;

pub const PIXEL_CONTENT_TYPE: &str = "image/png";

/// Beacon image bytes, loaded once and shared by every response
#[derive(Debug, Clone)]
pub struct BeaconPixel {
    bytes: Bytes,
}

impl BeaconPixel {
    /// Encode a fresh 1×1 fully transparent PNG
    pub fn generate() -> AppResult<Vec<u8>> {
        let image = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 0]));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    /// Read the pixel file, writing a generated one first if it is missing
    pub async fn load_or_create(path: &Path) -> AppResult<Self> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Self::from_bytes(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let bytes = Self::generate()?;
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(path, &bytes).await?;
                info!(path = %path.display(), "Generated beacon pixel");
                Ok(Self::from_bytes(bytes))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }
}
