// threshold.rs -- CPU reference implementation of the binarization.
//
// This is the authoritative definition of the operation: every GPU strategy
// in `gpu::threshold` is validated against it pixel-for-pixel. The function
// is pure and elementwise (no cross-pixel dependency), which is the entire
// reason the data-parallel GPU dispatch needs no synchronisation.
//
// Numeric contract, preserved bit-for-bit by the WGSL kernel:
//   avg = (R + G + B) / 3        integer division, truncating
//   out = avg > 123 ? 255 : 0
//   R = G = B = out
//
// The comparison is strict `>`: an average of exactly 123 maps to black.

use crate::planes::PlanarImage;

/// Intensity cut. Averages strictly above this become white.
pub const THRESHOLD: u8 = 123;

/// Output value for pixels above the cut.
pub const WHITE: u8 = 255;

/// Output value for pixels at or below the cut.
pub const BLACK: u8 = 0;

/// Binarize one pixel from its three channel samples.
#[inline]
pub fn binarize_value(r: u8, g: u8, b: u8) -> u8 {
    // u32 arithmetic: the sum can reach 765, past u8's range.
    let avg = (r as u32 + g as u32 + b as u32) / 3;
    if avg > THRESHOLD as u32 {
        WHITE
    } else {
        BLACK
    }
}

/// Binarize all pixels of an image in place, sequentially, on the CPU.
///
/// After the call every pixel's R, G and B samples hold the same value,
/// either [`BLACK`] or [`WHITE`].
pub fn binarize_planes(img: &mut PlanarImage) {
    let n = img.pixel_count();
    let (r, g, b) = img.planes_mut();
    for i in 0..n {
        let out = binarize_value(r[i], g[i], b[i]);
        r[i] = out;
        g[i] = out;
        b[i] = out;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::PlanarImage;

    #[test]
    fn test_bright_pixel_is_white() {
        assert_eq!(binarize_value(200, 200, 200), WHITE);
    }

    #[test]
    fn test_dark_pixel_is_black() {
        assert_eq!(binarize_value(10, 10, 10), BLACK);
    }

    #[test]
    fn test_average_exactly_at_cut_is_black() {
        // Strict `>`: avg == 123 stays black.
        assert_eq!(binarize_value(123, 123, 123), BLACK);
        assert_eq!(binarize_value(124, 124, 124), WHITE);
    }

    #[test]
    fn test_truncating_division() {
        // 100 + 150 + 120 = 370; 370 / 3 = 123 (truncated), not 123.33.
        assert_eq!(binarize_value(100, 150, 120), BLACK);
        // 371 / 3 = 123 still; 372 / 3 = 124.
        assert_eq!(binarize_value(100, 150, 121), BLACK);
        assert_eq!(binarize_value(100, 150, 122), WHITE);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(binarize_value(0, 0, 0), BLACK);
        assert_eq!(binarize_value(255, 255, 255), WHITE);
    }

    #[test]
    fn test_output_is_always_binary() {
        // Sweep a lattice of channel combinations; every output must be
        // exactly BLACK or WHITE.
        for r in (0u16..=255).step_by(17) {
            for g in (0u16..=255).step_by(17) {
                for b in (0u16..=255).step_by(17) {
                    let out = binarize_value(r as u8, g as u8, b as u8);
                    assert!(out == BLACK || out == WHITE, "({r},{g},{b}) -> {out}");
                }
            }
        }
    }

    #[test]
    fn test_planes_channels_equal_after() {
        let mut img = PlanarImage::from_planes(
            2,
            2,
            vec![200, 10, 100, 123],
            vec![200, 10, 150, 123],
            vec![200, 10, 120, 123],
        )
        .unwrap();
        binarize_planes(&mut img);
        for i in 0..img.pixel_count() {
            let (r, g, b) = img.rgb_at(i);
            assert_eq!(r, g, "pixel {i}");
            assert_eq!(g, b, "pixel {i}");
        }
        assert_eq!(img.rgb_at(0), (WHITE, WHITE, WHITE));
        assert_eq!(img.rgb_at(1), (BLACK, BLACK, BLACK));
        assert_eq!(img.rgb_at(2), (BLACK, BLACK, BLACK)); // avg 123
        assert_eq!(img.rgb_at(3), (BLACK, BLACK, BLACK)); // avg 123
    }

    #[test]
    fn test_idempotent() {
        // Binarizing a binarized image changes nothing: 255 -> avg 255 ->
        // white, 0 -> avg 0 -> black.
        let mut img = PlanarImage::from_planes(
            2,
            1,
            vec![180, 40],
            vec![190, 50],
            vec![170, 60],
        )
        .unwrap();
        binarize_planes(&mut img);
        let first = img.to_interleaved_rgb();
        binarize_planes(&mut img);
        assert_eq!(img.to_interleaved_rgb(), first);
    }
}
