//! Color formula engine.
//!
//! Applies an ordered chain of parsed color operations to an 8-bit image.
//! The image is lifted into a unit-interval f32 working range once, the
//! operations run strictly in sequence (each sees the previous one's
//! output), and the result is scaled straight back to u8 with no
//! re-normalization against the data.

use tiler_common::error::{TilerError, TilerResult};
use tiler_common::params::{ColorChannels, ColorOperation};

/// Apply a parsed operation chain to 8-bit bands. An empty chain is the
/// identity transform.
pub fn apply_color_ops(bands: Vec<Vec<u8>>, ops: &[ColorOperation]) -> TilerResult<Vec<Vec<u8>>> {
    if ops.is_empty() {
        return Ok(bands);
    }

    let mut work: Vec<Vec<f32>> = bands
        .iter()
        .map(|b| b.iter().map(|&v| v as f32 / 255.0).collect())
        .collect();

    for op in ops {
        match op {
            ColorOperation::Gamma { channels, g } => apply_gamma(&mut work, *channels, *g),
            ColorOperation::Sigmoidal {
                channels,
                contrast,
                bias,
            } => apply_sigmoidal(&mut work, *channels, *contrast, *bias),
            ColorOperation::Saturation { s } => apply_saturation(&mut work, *s)?,
        }
    }

    Ok(work
        .into_iter()
        .map(|band| {
            band.into_iter()
                .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
                .collect()
        })
        .collect())
}

fn apply_gamma(bands: &mut [Vec<f32>], channels: ColorChannels, g: f32) {
    for (idx, band) in bands.iter_mut().enumerate() {
        if !channels.targets(idx) {
            continue;
        }
        for v in band.iter_mut() {
            *v = v.max(0.0).powf(1.0 / g);
        }
    }
}

/// S-curve contrast stretch, the `rio-color` sigmoidal formulation:
/// zero contrast is the identity, negative contrast applies the inverse
/// curve.
fn apply_sigmoidal(bands: &mut [Vec<f32>], channels: ColorChannels, contrast: f32, bias: f32) {
    if contrast == 0.0 {
        return;
    }
    let alpha = bias;
    let beta = contrast;

    for (idx, band) in bands.iter_mut().enumerate() {
        if !channels.targets(idx) {
            continue;
        }
        if beta > 0.0 {
            let offset = 1.0 / (1.0 + (beta * alpha).exp());
            let denom = 1.0 / (1.0 + (beta * (alpha - 1.0)).exp()) - offset;
            for v in band.iter_mut() {
                let num = 1.0 / (1.0 + (beta * (alpha - *v)).exp()) - offset;
                *v = (num / denom).clamp(0.0, 1.0);
            }
        } else {
            // Inverse sigmoidal: undoes the equivalent positive-contrast
            // stretch.
            let offset = 1.0 / (1.0 + (-beta * alpha).exp());
            let denom = 1.0 / (1.0 + (-beta * (alpha - 1.0)).exp()) - offset;
            for v in band.iter_mut() {
                let y = (v.clamp(0.0, 1.0) * denom + offset).clamp(1e-6, 1.0 - 1e-6);
                *v = (alpha - (1.0 / y - 1.0).ln() / -beta).clamp(0.0, 1.0);
            }
        }
    }
}

/// Global chroma scaling around per-pixel luminance. Only defined for a
/// three-band (RGB) image.
fn apply_saturation(bands: &mut [Vec<f32>], s: f32) -> TilerResult<()> {
    if bands.len() != 3 {
        return Err(TilerError::InvalidColorFormula(format!(
            "saturation requires an RGB image, got {} band(s)",
            bands.len()
        )));
    }
    let n = bands[0].len();
    for i in 0..n {
        let (r, g, b) = (bands[0][i], bands[1][i], bands[2][i]);
        // Rec.709 luma weights
        let lum = 0.2126 * r + 0.7152 * g + 0.0722 * b;
        bands[0][i] = (lum + (r - lum) * s).clamp(0.0, 1.0);
        bands[1][i] = (lum + (g - lum) * s).clamp(0.0, 1.0);
        bands[2][i] = (lum + (b - lum) * s).clamp(0.0, 1.0);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiler_common::params::parse_color_formula;

    fn rgb(v: u8) -> Vec<Vec<u8>> {
        vec![vec![v], vec![v], vec![v]]
    }

    #[test]
    fn empty_formula_is_identity() {
        let input = vec![vec![0u8, 37, 255], vec![1, 2, 3], vec![200, 100, 50]];
        let out = apply_color_ops(input.clone(), &[]).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn gamma_brightens_midtones() {
        let ops = parse_color_formula("gamma RGB 2.0").unwrap();
        let out = apply_color_ops(rgb(64), &ops).unwrap();
        // (64/255)^(1/2) * 255 ≈ 128
        assert!(out[0][0] > 64);
        assert_eq!(out[0][0], out[1][0]);
        assert_eq!(out[0][0], out[2][0]);
    }

    #[test]
    fn gamma_targets_only_named_channels() {
        let ops = parse_color_formula("gamma R 2.0").unwrap();
        let out = apply_color_ops(rgb(64), &ops).unwrap();
        assert!(out[0][0] > 64);
        assert_eq!(out[1][0], 64);
        assert_eq!(out[2][0], 64);
    }

    #[test]
    fn sigmoidal_preserves_endpoints() {
        let ops = parse_color_formula("sigmoidal RGB 15 0.35").unwrap();
        let input = vec![vec![0u8, 255], vec![0, 255], vec![0, 255]];
        let out = apply_color_ops(input, &ops).unwrap();
        assert_eq!(out[0][0], 0);
        assert_eq!(out[0][1], 255);
    }

    #[test]
    fn sigmoidal_zero_contrast_is_identity() {
        let ops = parse_color_formula("sigmoidal RGB 0 0.5").unwrap();
        let input = rgb(99);
        let out = apply_color_ops(input.clone(), &ops).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn saturation_zero_is_grayscale() {
        let ops = parse_color_formula("saturation 0").unwrap();
        let input = vec![vec![255u8], vec![0], vec![0]];
        let out = apply_color_ops(input, &ops).unwrap();
        assert_eq!(out[0][0], out[1][0]);
        assert_eq!(out[1][0], out[2][0]);
    }

    #[test]
    fn saturation_rejects_non_rgb() {
        let ops = parse_color_formula("saturation 1.5").unwrap();
        let err = apply_color_ops(vec![vec![10u8]], &ops).unwrap_err();
        assert!(matches!(err, TilerError::InvalidColorFormula(_)));
    }

    #[test]
    fn operations_compose_in_order() {
        let ops = parse_color_formula("gamma RGB 3.5 saturation 1.7 sigmoidal RGB 15 0.35").unwrap();
        let input = vec![vec![120u8], vec![80], vec![40]];
        let out = apply_color_ops(input.clone(), &ops).unwrap();
        assert_eq!(out.len(), 3);
        assert_ne!(out, input);
    }
}
