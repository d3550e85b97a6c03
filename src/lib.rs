// monobit: RGB to black/white thresholding on a compute device.
//
// One pure elementwise operation (average the three channels, cut at 123)
// under three execution/memory strategies: a data-parallel kernel over
// scoped buffers, the same kernel over explicitly managed device arrays,
// and a single sequential kernel invocation. The CPU implementation in
// `threshold` is the authoritative reference; every GPU strategy is
// validated against it pixel-for-pixel.

pub mod gpu;
pub mod io;
pub mod planes;
pub mod threshold;
