pub mod config;
pub mod dsp; // Curve segments and the generator
pub mod engine; // Buffer store and scheduler seams
pub mod error;
pub mod io; // Inbound messages
pub mod writer;

pub use config::WriterConfig;
pub use error::CurveError;
pub use writer::CurveWriter;

/// Most segments a single list can describe.
pub const MAX_SEGMENTS: usize = 256;
