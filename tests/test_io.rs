// tests/test_io.rs -- Round-trip tests for the bitmap boundary.
//
// BMP and PNG are lossless for 8-bit RGB, so a save/load cycle must hand
// back the exact planes. Files go to the OS temp directory with the
// process id in the name so parallel test runs cannot collide.

use std::path::PathBuf;

use monobit::io::{load_planar, save_planar};
use monobit::planes::PlanarImage;
use monobit::threshold::binarize_planes;

fn temp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("monobit-test-{}-{name}", std::process::id()));
    p
}

fn sample_image() -> PlanarImage {
    let n = 12 * 9;
    let r: Vec<u8> = (0..n).map(|i| (i * 2) as u8).collect();
    let g: Vec<u8> = (0..n).map(|i| (255 - i) as u8).collect();
    let b: Vec<u8> = (0..n).map(|i| ((i * i) % 256) as u8).collect();
    PlanarImage::from_planes(12, 9, r, g, b).unwrap()
}

#[test]
fn bmp_round_trip_preserves_planes() {
    let img = sample_image();
    let path = temp_path("roundtrip.bmp");
    save_planar(&path, &img).expect("save failed");
    let loaded = load_planar(&path).expect("load failed");
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.width(), img.width());
    assert_eq!(loaded.height(), img.height());
    assert_eq!(loaded.to_interleaved_rgb(), img.to_interleaved_rgb());
}

#[test]
fn binarized_image_survives_encode() {
    // The end-to-end artifact: binarize, save, load, and the planes are
    // still binary and still equal across channels.
    let mut img = sample_image();
    binarize_planes(&mut img);
    let path = temp_path("binary.bmp");
    save_planar(&path, &img).expect("save failed");
    let loaded = load_planar(&path).expect("load failed");
    std::fs::remove_file(&path).ok();

    for i in 0..loaded.pixel_count() {
        let (r, g, b) = loaded.rgb_at(i);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert!(r == 0 || r == 255, "pixel {i} -> {r}");
    }
    assert_eq!(loaded.to_interleaved_rgb(), img.to_interleaved_rgb());
}

#[test]
fn load_missing_file_fails() {
    let err = load_planar(temp_path("does-not-exist.bmp")).unwrap_err();
    assert!(!err.to_string().is_empty());
}
