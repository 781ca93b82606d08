//! End-to-end pipeline tests: raw tile + mask in, encoded image out.

use renderer::colormap::BuiltinPalettes;
use renderer::{encode_image, render};
use tiler_common::params::{RawTileRequest, RenderDefaults, TileParams};
use tiler_common::tile::{Mask, TileData};
use tiler_common::ImageFormat;

fn gradient_tile(bands: usize, size: usize, max: f32) -> (TileData, Mask) {
    let n = size * size;
    let plane: Vec<f32> = (0..n).map(|i| i as f32 / (n - 1) as f32 * max).collect();
    (
        TileData::new(size, size, vec![plane; bands]).unwrap(),
        Mask::all_valid(size, size),
    )
}

#[test]
fn landsat_style_rgb_tile_renders_and_encodes() {
    // scale=1, bands=5,3,2, full color formula: 256x256x3 output
    let params = TileParams::resolve(RawTileRequest {
        scale: Some(1),
        ext: "png",
        bands: Some("5,3,2"),
        rescale: Some("0,16000"),
        color_formula: Some("gamma RGB 3.5 saturation 1.7 sigmoidal RGB 15 0.35"),
        band_param: "bands",
        ..Default::default()
    })
    .unwrap();

    let (tile, mask) = gradient_tile(3, 256, 16000.0);
    let img = render(&params, Some((tile, mask)), &RenderDefaults::default(), &BuiltinPalettes)
        .unwrap();
    assert_eq!((img.width, img.height, img.band_count()), (256, 256, 3));

    let png = encode_image(&img, ImageFormat::Png).unwrap();
    assert_eq!(&png[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
}

#[test]
fn ndvi_ratio_tile_uses_index_colormap() {
    let params = TileParams::resolve(RawTileRequest {
        ext: "png",
        expr: Some("(b5-b4)/(b5+b4)"),
        rescale: Some("-1,1"),
        color_map: Some("cfastie"),
        band_param: "bands",
        ..Default::default()
    })
    .unwrap();

    // single ratio plane, promoted upstream to a one-band stack
    let n = 256 * 256;
    let plane: Vec<f32> = (0..n).map(|i| (i as f32 / n as f32) * 2.0 - 1.0).collect();
    let tile = TileData::from_plane(256, 256, plane).unwrap();
    let mask = Mask::all_valid(256, 256);

    let img = render(&params, Some((tile, mask)), &RenderDefaults::default(), &BuiltinPalettes)
        .unwrap();
    assert_eq!(img.band_count(), 4);
    assert!(encode_image(&img, ImageFormat::Png).is_ok());
}

#[test]
fn upscaled_tile_doubles_output_edge() {
    let params = TileParams::resolve(RawTileRequest {
        scale: Some(2),
        ext: "jpg",
        bands: Some("1"),
        rescale: Some("0,255"),
        band_param: "bands",
        ..Default::default()
    })
    .unwrap();
    assert_eq!(params.tile_size, 512);

    let (tile, mask) = gradient_tile(1, 512, 255.0);
    let img = render(&params, Some((tile, mask)), &RenderDefaults::default(), &BuiltinPalettes)
        .unwrap();
    assert_eq!(img.width, 512);

    // jpg resolved to the jpeg encoder; output carries the SOI marker
    let jpeg = encode_image(&img, params.format).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
}

#[test]
fn empty_upstream_tile_encodes_without_error() {
    let params = TileParams::resolve(RawTileRequest {
        ext: "png",
        bands: Some("4,3,2"),
        band_param: "bands",
        ..Default::default()
    })
    .unwrap();

    let img = render(&params, None, &RenderDefaults::default(), &BuiltinPalettes).unwrap();
    assert!(img.mask.is_empty());
    assert!(encode_image(&img, ImageFormat::Png).is_ok());
}

#[test]
fn masked_region_stays_black_through_the_pipeline() {
    let params = TileParams::resolve(RawTileRequest {
        ext: "png",
        bands: Some("1"),
        rescale: Some("0,1000"),
        color_formula: Some("gamma RGB 2.0"),
        band_param: "bands",
        ..Default::default()
    })
    .unwrap();

    let tile = TileData::from_plane(2, 1, vec![900.0, 900.0]).unwrap();
    let mask = Mask::new(2, 1, vec![255, 0]).unwrap();
    let img = render(&params, Some((tile, mask)), &RenderDefaults::default(), &BuiltinPalettes)
        .unwrap();
    assert!(img.bands[0][0] > 0);
    assert_eq!(img.bands[0][1], 0);
    assert_eq!(img.mask.data[1], 0);
}
