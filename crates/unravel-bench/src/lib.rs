#![deny(clippy::all)]
#![warn(clippy::pedantic)]

//! Benchmark harness for unravel.
//!
//! Run benchmarks with: `cargo bench -p unravel-bench`
//!
//! The crate only holds criterion benchmarks for the two transforms.
