// main.rs -- load a bitmap, binarize it on the GPU, save it back.
//
// USAGE
//   monobit [input] [output] [strategy]
//
//   input     image file to read            (default: Lenna.bmp)
//   output    image file to write           (default: binary.bmp)
//   strategy  parallel-scoped | parallel-explicit | sequential
//                                           (default: parallel-scoped)
//
// The reported time covers buffer setup, kernel submission and execution,
// and result visibility on the host; file I/O is excluded. Any failure
// prints a diagnostic and exits nonzero.

use std::process;
use std::time::Instant;

use monobit::gpu::device::GpuDevice;
use monobit::gpu::threshold::{Strategy, ThresholdKernel};
use monobit::io;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let input = args.get(1).map(String::as_str).unwrap_or("Lenna.bmp");
    let output = args.get(2).map(String::as_str).unwrap_or("binary.bmp");
    let strategy: Strategy = match args.get(3) {
        Some(s) => s.parse().unwrap_or_else(|e| {
            eprintln!("[monobit] {e}");
            process::exit(2);
        }),
        None => Strategy::ParallelScoped,
    };

    let mut img = io::load_planar(input).unwrap_or_else(|e| {
        eprintln!("[monobit] {input}: {e}");
        process::exit(1);
    });
    println!("w: {} h: {}", img.width(), img.height());

    let gpu = GpuDevice::new().unwrap_or_else(|e| {
        eprintln!("[monobit] {e}");
        process::exit(1);
    });
    println!("Running on {}", gpu.adapter_info);

    let kernel = ThresholdKernel::new(&gpu);

    let start = Instant::now();
    kernel.run(&gpu, &mut img, strategy).unwrap_or_else(|e| {
        eprintln!("[monobit] {strategy}: {e}");
        process::exit(1);
    });
    let elapsed = start.elapsed();
    println!(
        "Kernel submission + execution time: {} microsec",
        elapsed.as_micros()
    );

    io::save_planar(output, &img).unwrap_or_else(|e| {
        eprintln!("[monobit] {output}: {e}");
        process::exit(1);
    });
}
