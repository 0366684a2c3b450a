//! OS adapters: readiness multiplexer backends and descriptor output.

pub mod multiplexer;
pub mod output;

pub use multiplexer::{open, Backend, Events, Multiplexer, Readiness};
pub use output::FdWriter;
