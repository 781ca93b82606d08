//! Request parameter resolution.
//!
//! Validates and normalizes tile-request parameters before any raster I/O is
//! issued. The render mode (band selection vs. expression vs. DEM encoding)
//! is resolved once into a tagged [`RenderMode`], so conflicting parameter
//! combinations are rejected here and invalid states cannot reach the
//! pipeline.

use crate::error::{TilerError, TilerResult};
use crate::format::ImageFormat;

/// Base tile edge length; requests scale this by an integer factor.
pub const BASE_TILE_SIZE: usize = 256;

/// Terrain-RGB encoding scheme for DEM mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemEncoding {
    /// Mapbox terrain-RGB: base offset -10000, interval 1.
    Mapbox,
    /// Mapzen terrarium: base offset 32768, fractional meters in blue.
    Mapzen,
}

impl DemEncoding {
    pub fn parse(value: &str) -> TilerResult<Self> {
        match value {
            "mapbox" => Ok(DemEncoding::Mapbox),
            "mapzen" => Ok(DemEncoding::Mapzen),
            _ => Err(TilerError::invalid_param("dem", "Invalid 'dem' mode")),
        }
    }
}

/// Channel target of a color operation. Parsed from strings like `RGB`,
/// `R`, or `bg` (case-insensitive, order-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorChannels {
    pub r: bool,
    pub g: bool,
    pub b: bool,
}

impl ColorChannels {
    pub const RGB: ColorChannels = ColorChannels {
        r: true,
        g: true,
        b: true,
    };

    pub fn parse(spec: &str) -> TilerResult<Self> {
        let mut ch = ColorChannels {
            r: false,
            g: false,
            b: false,
        };
        if spec.is_empty() {
            return Err(TilerError::InvalidColorFormula(
                "empty channel specifier".into(),
            ));
        }
        for c in spec.chars() {
            match c.to_ascii_lowercase() {
                'r' => ch.r = true,
                'g' => ch.g = true,
                'b' => ch.b = true,
                other => {
                    return Err(TilerError::InvalidColorFormula(format!(
                        "unknown channel '{}'",
                        other
                    )))
                }
            }
        }
        Ok(ch)
    }

    /// True if the operation targets band `idx` (0 = R, 1 = G, 2 = B).
    pub fn targets(&self, idx: usize) -> bool {
        match idx {
            0 => self.r,
            1 => self.g,
            2 => self.b,
            _ => false,
        }
    }
}

/// One parsed color operation. The formula string is a space-separated
/// stream of these, executed strictly in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorOperation {
    /// Power-law channel adjustment: `gamma RGB 3.5`.
    Gamma { channels: ColorChannels, g: f32 },
    /// Global chroma scaling: `saturation 1.7`.
    Saturation { s: f32 },
    /// S-curve contrast stretch: `sigmoidal RGB 15 0.35`.
    Sigmoidal {
        channels: ColorChannels,
        contrast: f32,
        bias: f32,
    },
}

/// Parse a color formula string into a typed instruction list.
///
/// An empty (or all-whitespace) formula parses to an empty list, which the
/// engine treats as the identity transform.
pub fn parse_color_formula(formula: &str) -> TilerResult<Vec<ColorOperation>> {
    let mut ops = Vec::new();
    let mut tokens = formula.split_whitespace().peekable();

    while let Some(name) = tokens.next() {
        let op = match name.to_ascii_lowercase().as_str() {
            "gamma" => {
                let channels = ColorChannels::parse(expect_arg(&mut tokens, "gamma")?)?;
                let g = parse_formula_number(expect_arg(&mut tokens, "gamma")?, "gamma")?;
                ColorOperation::Gamma { channels, g }
            }
            "saturation" => {
                let s = parse_formula_number(expect_arg(&mut tokens, "saturation")?, "saturation")?;
                ColorOperation::Saturation { s }
            }
            "sigmoidal" => {
                let channels = ColorChannels::parse(expect_arg(&mut tokens, "sigmoidal")?)?;
                let contrast =
                    parse_formula_number(expect_arg(&mut tokens, "sigmoidal")?, "sigmoidal")?;
                let bias = parse_formula_number(expect_arg(&mut tokens, "sigmoidal")?, "sigmoidal")?;
                ColorOperation::Sigmoidal {
                    channels,
                    contrast,
                    bias,
                }
            }
            other => {
                return Err(TilerError::InvalidColorFormula(format!(
                    "unknown operation '{}'",
                    other
                )))
            }
        };
        ops.push(op);
    }

    Ok(ops)
}

fn expect_arg<'a, I: Iterator<Item = &'a str>>(
    tokens: &mut I,
    op: &str,
) -> TilerResult<&'a str> {
    tokens.next().ok_or_else(|| {
        TilerError::InvalidColorFormula(format!("missing argument for '{}'", op))
    })
}

fn parse_formula_number(token: &str, op: &str) -> TilerResult<f32> {
    token.parse::<f32>().map_err(|_| {
        TilerError::InvalidColorFormula(format!("bad numeric argument '{}' for '{}'", token, op))
    })
}

/// The render mode, selected exactly once per request.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderMode {
    /// Named/indexed band selection, e.g. `5,3,2`.
    Bands(Vec<String>),
    /// Algebraic band expression, e.g. `(b5-b4)/(b5+b4)`.
    Expression(String),
    /// Terrain-RGB elevation encoding; bypasses rescale/formula/colormap.
    Dem(DemEncoding),
}

impl RenderMode {
    /// Resolve the mutually exclusive mode parameters. `band_param` names
    /// the band-selection query parameter for error messages (`bands` for
    /// scene endpoints, `indexes` for COG endpoints).
    pub fn resolve(
        bands: Option<&str>,
        expr: Option<&str>,
        dem: Option<&str>,
        band_param: &str,
    ) -> TilerResult<Self> {
        let selected =
            bands.is_some() as usize + expr.is_some() as usize + dem.is_some() as usize;
        if selected > 1 {
            // The historical message only ever named the bands/expression
            // pair; keep it for the common case.
            let msg = if bands.is_some() && expr.is_some() {
                format!("Cannot pass {} and expression", band_param)
            } else {
                format!("Cannot combine 'dem' with {} or expression", band_param)
            };
            return Err(TilerError::ConflictingParameters(msg));
        }

        if let Some(dem) = dem {
            return Ok(RenderMode::Dem(DemEncoding::parse(dem)?));
        }
        if let Some(expr) = expr {
            return Ok(RenderMode::Expression(expr.to_string()));
        }
        if let Some(bands) = bands {
            let names: Vec<String> = bands
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if names.is_empty() {
                return Err(TilerError::invalid_param(
                    band_param,
                    format!("Empty '{}' selection", band_param),
                ));
            }
            return Ok(RenderMode::Bands(names));
        }

        Err(TilerError::MissingParameters(
            "Need bands or expression".into(),
        ))
    }
}

/// Parse the `nodata` query parameter. The literal token `nan` maps to the
/// floating NaN sentinel.
pub fn parse_nodata(value: &str) -> TilerResult<f32> {
    if value.eq_ignore_ascii_case("nan") {
        return Ok(f32::NAN);
    }
    value
        .parse::<f32>()
        .map_err(|_| TilerError::invalid_param("nodata", format!("Invalid 'nodata' value '{}'", value)))
}

/// Parse a `rescale` parameter into one or more `(low, high)` pairs.
///
/// Supported forms:
/// - single pair: `0,255` or `-1,1`
/// - semicolon-separated pairs: `0,255;10,200`
/// - legacy dash-separated non-negative pairs: `0,16000-0,16000`
///
/// The single-pair form is tried first so negative bounds (`-1,1`) never
/// collide with the dash separator.
pub fn parse_rescale(value: &str) -> TilerResult<Vec<(f32, f32)>> {
    if let Ok(pair) = parse_range_pair(value) {
        return Ok(vec![pair]);
    }

    if value.contains(';') {
        return value
            .split(';')
            .map(|chunk| parse_range_pair(chunk.trim()))
            .collect();
    }

    // Legacy dash-separated form; only valid for non-negative pairs.
    let pairs = scan_unsigned_pairs(value);
    if pairs.is_empty() {
        return Err(TilerError::invalid_param(
            "rescale",
            format!("Invalid 'rescale' value '{}'", value),
        ));
    }
    Ok(pairs)
}

/// Parse a legacy `histo` parameter: dash-separated `min,max` pairs, one per
/// requested band. The per-band count check lives in the caller (it needs
/// the band count), surfacing as `BandCountMismatch`.
pub fn parse_histo(value: &str) -> TilerResult<Vec<(f32, f32)>> {
    let pairs = scan_unsigned_pairs(value);
    if pairs.is_empty() {
        return Err(TilerError::invalid_param(
            "histo",
            format!("Invalid 'histo' value '{}'", value),
        ));
    }
    Ok(pairs)
}

fn parse_range_pair(chunk: &str) -> TilerResult<(f32, f32)> {
    let mut it = chunk.split(',');
    let low = it.next().map(str::trim).unwrap_or("");
    let high = it.next().map(str::trim);
    if it.next().is_some() {
        return Err(TilerError::invalid_param(
            "rescale",
            format!("Invalid 'rescale' pair '{}'", chunk),
        ));
    }
    match (low.parse::<f32>(), high.map(str::parse::<f32>)) {
        (Ok(lo), Some(Ok(hi))) => Ok((lo, hi)),
        _ => Err(TilerError::invalid_param(
            "rescale",
            format!("Invalid 'rescale' pair '{}'", chunk),
        )),
    }
}

/// Scan `min,max` pairs of unsigned numbers out of a string, ignoring the
/// separators between them. Mirrors the original `\d+,\d+` extraction.
fn scan_unsigned_pairs(value: &str) -> Vec<(f32, f32)> {
    let mut pairs = Vec::new();
    for chunk in value.split(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.')) {
        if chunk.is_empty() {
            continue;
        }
        let nums: Vec<&str> = chunk.split(',').filter(|s| !s.is_empty()).collect();
        if nums.len() != 2 {
            continue;
        }
        if let (Ok(lo), Ok(hi)) = (nums[0].parse::<f32>(), nums[1].parse::<f32>()) {
            pairs.push((lo, hi));
        }
    }
    pairs
}

/// Configurable pipeline defaults. Historical revisions of the source
/// disagreed on default rescale ranges, so they are explicit here.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderDefaults {
    /// Default rescale for band mode; `None` means no stretch (raw clamp).
    pub band_rescale: Option<(f32, f32)>,
    /// Default rescale for expression/ratio mode.
    pub expression_rescale: (f32, f32),
    /// Default colormap for expression/ratio index products.
    pub expression_colormap: String,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            band_rescale: None,
            expression_rescale: (-1.0, 1.0),
            expression_colormap: "cfastie".to_string(),
        }
    }
}

/// Fully resolved tile-request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TileParams {
    pub mode: RenderMode,
    pub tile_size: usize,
    pub format: ImageFormat,
    pub rescale: Option<Vec<(f32, f32)>>,
    pub color_ops: Vec<ColorOperation>,
    pub color_map: Option<String>,
    pub nodata: Option<f32>,
}

/// Raw (pre-validation) tile request, as received from the routing layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTileRequest<'a> {
    pub scale: Option<i64>,
    pub ext: &'a str,
    pub bands: Option<&'a str>,
    pub expr: Option<&'a str>,
    pub dem: Option<&'a str>,
    pub rescale: Option<&'a str>,
    pub color_formula: Option<&'a str>,
    pub color_map: Option<&'a str>,
    pub nodata: Option<&'a str>,
    /// Name of the band-selection parameter for error messages.
    pub band_param: &'a str,
}

impl TileParams {
    /// Validate and normalize a raw request. Pure; performs no I/O.
    pub fn resolve(raw: RawTileRequest<'_>) -> TilerResult<Self> {
        let band_param = if raw.band_param.is_empty() {
            "bands"
        } else {
            raw.band_param
        };
        let mode = RenderMode::resolve(raw.bands, raw.expr, raw.dem, band_param)?;

        let scale = raw.scale.unwrap_or(1);
        if scale < 1 {
            return Err(TilerError::invalid_param(
                "scale",
                format!("Tile scale must be a positive integer, got {}", scale),
            ));
        }
        let tile_size = scale as usize * BASE_TILE_SIZE;

        let format = ImageFormat::from_extension(raw.ext)?;

        let rescale = raw.rescale.map(parse_rescale).transpose()?;
        let color_ops = raw
            .color_formula
            .map(parse_color_formula)
            .transpose()?
            .unwrap_or_default();
        let nodata = raw.nodata.map(parse_nodata).transpose()?;

        Ok(TileParams {
            mode,
            tile_size,
            format,
            rescale,
            color_ops,
            color_map: raw.color_map.map(str::to_string),
            nodata,
        })
    }
}

/// Expand rescale pairs to one per band: if fewer pairs than bands are
/// supplied, the last pair is reused for the remaining bands.
pub fn resolve_ranges(pairs: &[(f32, f32)], band_count: usize) -> Vec<(f32, f32)> {
    let last = *pairs.last().unwrap_or(&(0.0, 255.0));
    (0..band_count)
        .map(|i| *pairs.get(i).unwrap_or(&last))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_rescale_does_not_eat_negative_pairs() {
        assert_eq!(parse_rescale("-1,1").unwrap(), vec![(-1.0, 1.0)]);
        assert_eq!(
            parse_rescale("0,16000-0,12000").unwrap(),
            vec![(0.0, 16000.0), (0.0, 12000.0)]
        );
        assert_eq!(
            parse_rescale("0,255;10,200").unwrap(),
            vec![(0.0, 255.0), (10.0, 200.0)]
        );
    }

    #[test]
    fn ranges_broadcast_last_pair() {
        assert_eq!(
            resolve_ranges(&[(0.0, 100.0)], 3),
            vec![(0.0, 100.0); 3]
        );
        assert_eq!(
            resolve_ranges(&[(0.0, 1.0), (2.0, 3.0)], 3),
            vec![(0.0, 1.0), (2.0, 3.0), (2.0, 3.0)]
        );
    }
}
