//! gosh-freeze core library.
//!
//! The pipeline traces which files a Gauche script loads, rebuilds the load
//! nesting, generates a C program embedding every module in dependency order
//! and links it into a single static executable.

pub mod c_gen;
pub mod cli;
pub mod interrupt;
pub mod ir;
pub mod resolve;
pub mod runner;
pub mod trace;
