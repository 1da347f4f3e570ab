//! Curve math and the resumable segment generator.
//!
//! These pieces are allocation-free on the render path and know nothing
//! about buffers or scheduling; the writer layers binding and notification
//! on top.

/// Segment list compiler: flat number lists to scaled segments.
pub mod compiler;
/// Block-resumable exponential segment generator.
pub mod generator;
/// Segment type and recursion coefficients.
pub mod segment;

pub use compiler::{compile, CompileCtx, SegmentList};
pub use generator::{CurveGenerator, PassOutcome};
pub use segment::{curve_coefficients, CurveSegment};
