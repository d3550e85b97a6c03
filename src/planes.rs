// planes.rs -- Host-side planar RGB container.
//
// The codec side of the world speaks interleaved RGB (r0 g0 b0 r1 g1 b1 ...);
// the kernel side wants one contiguous plane per channel so each channel can
// be bound as its own storage buffer. `PlanarImage` is the meeting point:
// width, height, and three equal-length `Vec<u8>` planes, where index `i` in
// every plane refers to the same spatial location.
//
// Invariant: all three planes have length `width * height`. Constructors
// either establish it (`new`, `from_interleaved_rgb`) or check it and refuse
// (`from_planes`). Nothing downstream re-checks; every allocation and
// dispatch size in the gpu module is derived from `pixel_count()`.

use std::fmt;

/// A 2D RGB image stored as three separate channel planes.
pub struct PlanarImage {
    width: usize,
    height: usize,
    r: Vec<u8>,
    g: Vec<u8>,
    b: Vec<u8>,
}

impl PlanarImage {
    /// Create a zero-filled (black) image with the given dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        let n = width * height;
        PlanarImage {
            width,
            height,
            r: vec![0u8; n],
            g: vec![0u8; n],
            b: vec![0u8; n],
        }
    }

    /// Build an image from three existing channel planes.
    ///
    /// Refuses planes whose lengths disagree with each other or with
    /// `width * height`. This is the crate's safety policy for
    /// mismatched sizes: reject at construction, never truncate and
    /// never index out of bounds later.
    pub fn from_planes(
        width: usize,
        height: usize,
        r: Vec<u8>,
        g: Vec<u8>,
        b: Vec<u8>,
    ) -> Result<Self, PlanesError> {
        let expected = width * height;
        if r.len() != expected || g.len() != expected || b.len() != expected {
            return Err(PlanesError::PlaneSizeMismatch {
                expected,
                r: r.len(),
                g: g.len(),
                b: b.len(),
            });
        }
        Ok(PlanarImage { width, height, r, g, b })
    }

    /// Build an image from an interleaved RGB byte buffer (the layout
    /// produced by the `image` crate's `RgbImage::as_raw`).
    ///
    /// # Panics
    /// Panics if `data.len() != 3 * width * height`. Callers pass buffers
    /// straight from the codec, which guarantees the length.
    pub fn from_interleaved_rgb(width: usize, height: usize, data: &[u8]) -> Self {
        let n = width * height;
        assert_eq!(
            data.len(),
            3 * n,
            "interleaved buffer length ({}) must equal 3 * width * height ({})",
            data.len(),
            3 * n,
        );
        let mut r = Vec::with_capacity(n);
        let mut g = Vec::with_capacity(n);
        let mut b = Vec::with_capacity(n);
        for px in data.chunks_exact(3) {
            r.push(px[0]);
            g.push(px[1]);
            b.push(px[2]);
        }
        PlanarImage { width, height, r, g, b }
    }

    /// Re-interleave the planes into an RGB byte buffer for encoding.
    pub fn to_interleaved_rgb(&self) -> Vec<u8> {
        let n = self.pixel_count();
        let mut out = Vec::with_capacity(3 * n);
        for i in 0..n {
            out.push(self.r[i]);
            out.push(self.g[i]);
            out.push(self.b[i]);
        }
        out
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of samples per plane (`width * height`).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn r(&self) -> &[u8] {
        &self.r
    }

    #[inline]
    pub fn g(&self) -> &[u8] {
        &self.g
    }

    #[inline]
    pub fn b(&self) -> &[u8] {
        &self.b
    }

    /// Mutable access to all three planes at once.
    ///
    /// Returned in (R, G, B) order. Borrowing them together keeps the
    /// borrow checker happy when a caller writes all three in one pass.
    #[inline]
    pub fn planes_mut(&mut self) -> (&mut [u8], &mut [u8], &mut [u8]) {
        (&mut self.r, &mut self.g, &mut self.b)
    }

    /// The (R, G, B) triple at flat pixel index `i`.
    ///
    /// # Panics
    /// Panics if `i >= pixel_count()`.
    #[inline]
    pub fn rgb_at(&self, i: usize) -> (u8, u8, u8) {
        (self.r[i], self.g[i], self.b[i])
    }
}

impl Clone for PlanarImage {
    fn clone(&self) -> Self {
        PlanarImage {
            width: self.width,
            height: self.height,
            r: self.r.clone(),
            g: self.g.clone(),
            b: self.b.clone(),
        }
    }
}

impl fmt::Debug for PlanarImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlanarImage {{ {}x{}, {} samples/plane }}",
            self.width,
            self.height,
            self.pixel_count(),
        )
    }
}

// ============================================================
// Error type
// ============================================================

/// Errors from `PlanarImage` construction.
#[derive(Debug)]
pub enum PlanesError {
    /// Plane lengths disagree with each other or with `width * height`.
    PlaneSizeMismatch {
        expected: usize,
        r: usize,
        g: usize,
        b: usize,
    },
}

impl fmt::Display for PlanesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanesError::PlaneSizeMismatch { expected, r, g, b } => write!(
                f,
                "plane lengths (R={r}, G={g}, B={b}) must all equal width * height ({expected})"
            ),
        }
    }
}

impl std::error::Error for PlanesError {}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_zero_filled() {
        let img = PlanarImage::new(4, 3);
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 3);
        assert_eq!(img.pixel_count(), 12);
        assert!(img.r().iter().all(|&v| v == 0));
        assert!(img.g().iter().all(|&v| v == 0));
        assert!(img.b().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_from_planes_valid() {
        let img = PlanarImage::from_planes(2, 2, vec![1; 4], vec![2; 4], vec![3; 4]).unwrap();
        assert_eq!(img.rgb_at(0), (1, 2, 3));
        assert_eq!(img.rgb_at(3), (1, 2, 3));
    }

    #[test]
    fn test_from_planes_rejects_short_plane() {
        let err = PlanarImage::from_planes(2, 2, vec![0; 3], vec![0; 4], vec![0; 4]).unwrap_err();
        match err {
            PlanesError::PlaneSizeMismatch { expected, r, .. } => {
                assert_eq!(expected, 4);
                assert_eq!(r, 3);
            }
        }
    }

    #[test]
    fn test_from_planes_rejects_wrong_dimensions() {
        // Planes agree with each other but not with the claimed size.
        let err = PlanarImage::from_planes(3, 3, vec![0; 4], vec![0; 4], vec![0; 4]).unwrap_err();
        assert!(matches!(err, PlanesError::PlaneSizeMismatch { expected: 9, .. }));
    }

    #[test]
    fn test_interleaved_round_trip() {
        // 2x1 image: pixel 0 = (10, 20, 30), pixel 1 = (40, 50, 60).
        let data = vec![10u8, 20, 30, 40, 50, 60];
        let img = PlanarImage::from_interleaved_rgb(2, 1, &data);
        assert_eq!(img.r(), &[10, 40]);
        assert_eq!(img.g(), &[20, 50]);
        assert_eq!(img.b(), &[30, 60]);
        assert_eq!(img.to_interleaved_rgb(), data);
    }

    #[test]
    #[should_panic(expected = "interleaved buffer length")]
    fn test_interleaved_wrong_length() {
        let _ = PlanarImage::from_interleaved_rgb(2, 2, &[0u8; 11]);
    }

    #[test]
    fn test_planes_mut_writes_visible() {
        let mut img = PlanarImage::new(2, 1);
        {
            let (r, g, b) = img.planes_mut();
            r[1] = 7;
            g[0] = 8;
            b[1] = 9;
        }
        assert_eq!(img.rgb_at(0), (0, 8, 0));
        assert_eq!(img.rgb_at(1), (7, 0, 9));
    }
}
