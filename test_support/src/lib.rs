//! Test utilities for gosh-freeze.
//!
//! Provides fake versions of every external tool the pipeline runs, plus a
//! helper for laying out Scheme module trees on disk.

pub mod fake_tools;
pub mod modules;

pub use fake_tools::{FAKE_FLAGS, FAKE_LIBS, FakeTool, FakeTools};
pub use modules::{ModuleTree, extension_line, module_line};
