//! Output image format resolution.

use crate::error::TilerError;
use std::fmt;

/// Output image container, resolved from the request's file extension.
///
/// `jpg` maps to the JPEG encoder, `jp2` to the JP2OpenJPEG driver identity;
/// everything else passes through under its own name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
    Jp2,
}

impl ImageFormat {
    /// Resolve a request extension to an encoder identity.
    pub fn from_extension(ext: &str) -> Result<Self, TilerError> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            "webp" => Ok(ImageFormat::Webp),
            "jp2" => Ok(ImageFormat::Jp2),
            other => Err(TilerError::invalid_param(
                "ext",
                format!("Unsupported image format: {}", other),
            )),
        }
    }

    /// Encoder driver name (the `jp2` extension resolves to the OpenJPEG
    /// driver identity, mirroring GDAL naming).
    pub fn driver(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
            ImageFormat::Jp2 => "JP2OpenJPEG",
        }
    }

    /// MIME type for the response envelope.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Jp2 => "image/jp2",
        }
    }

    /// JPEG carries no alpha channel, so the validity mask must be
    /// flattened to opaque before encoding.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, ImageFormat::Jpeg)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.driver())
    }
}
