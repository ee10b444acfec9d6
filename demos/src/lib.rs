//! DSCNet Demos
//!
//! This crate provides the `dscnet` command line tool for the DSCNet backbone.
//!
//! ## Usage
//!
//! ```bash
//! # Print the output levels of the default configuration
//! cargo run --bin dscnet -- shapes
//!
//! # Run one forward pass on random input
//! cargo run --bin dscnet -- run --width 256 --height 256
//!
//! # Time repeated forward passes on the GPU
//! cargo run --release --no-default-features --features wgpu --bin dscnet -- bench --size 512
//!
//! # Write the default configuration
//! cargo run --bin dscnet -- init-config --output dscnet.json
//! ```

pub mod backend;
pub mod logging;

pub use backend::{create_device, get_backend_name, SelectedBackend, SelectedDevice};
pub use logging::init_tracing;
