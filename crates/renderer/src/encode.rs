//! Image container encoding for rendered tiles.

use image::codecs::jpeg::JpegEncoder;

use tiler_common::error::{TilerError, TilerResult};
use tiler_common::tile::RenderedImage;
use tiler_common::ImageFormat;

use crate::png::encode_png;

/// Default JPEG quality, matching typical web-tile profiles.
const JPEG_QUALITY: u8 = 85;
/// Default WEBP quality.
const WEBP_QUALITY: f32 = 75.0;

/// Encode a rendered image into the requested container.
///
/// JPEG carries no alpha channel, so the validity mask is flattened to
/// opaque RGB there; PNG and WEBP keep the mask as alpha.
pub fn encode_image(image: &RenderedImage, format: ImageFormat) -> TilerResult<Vec<u8>> {
    let rgba = image.to_rgba();
    let width = image.width;
    let height = image.height;

    match format {
        ImageFormat::Png => encode_png(&rgba, width, height).map_err(TilerError::EncodeError),
        ImageFormat::Jpeg => {
            let rgb = flatten_to_rgb(&rgba);
            let mut out = Vec::new();
            JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
                .encode(
                    &rgb,
                    width as u32,
                    height as u32,
                    image::ColorType::Rgb8,
                )
                .map_err(|e| TilerError::EncodeError(e.to_string()))?;
            Ok(out)
        }
        ImageFormat::Webp => {
            let encoder = webp::Encoder::from_rgba(&rgba, width as u32, height as u32);
            Ok(encoder.encode(WEBP_QUALITY).to_vec())
        }
        ImageFormat::Jp2 => Err(TilerError::EncodeError(
            "JP2OpenJPEG encoder is not available in this deployment".into(),
        )),
    }
}

/// Drop the alpha channel for formats without transparency.
fn flatten_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiler_common::tile::Mask;

    fn checker(size: usize) -> RenderedImage {
        let n = size * size;
        let band: Vec<u8> = (0..n).map(|i| if i % 2 == 0 { 255 } else { 0 }).collect();
        RenderedImage {
            width: size,
            height: size,
            bands: vec![band.clone(), band.clone(), band],
            mask: Mask::all_valid(size, size),
        }
    }

    #[test]
    fn png_output_has_signature() {
        let bytes = encode_image(&checker(8), ImageFormat::Png).unwrap();
        assert_eq!(&bytes[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }

    #[test]
    fn jpeg_output_has_soi_marker() {
        let bytes = encode_image(&checker(8), ImageFormat::Jpeg).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn webp_output_has_riff_header() {
        let bytes = encode_image(&checker(8), ImageFormat::Webp).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn jp2_is_not_encodable_here() {
        assert!(matches!(
            encode_image(&checker(8), ImageFormat::Jp2),
            Err(TilerError::EncodeError(_))
        ));
    }

    #[test]
    fn flatten_drops_alpha() {
        assert_eq!(flatten_to_rgb(&[1, 2, 3, 4, 5, 6, 7, 8]), vec![1, 2, 3, 5, 6, 7]);
    }
}
