#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::segment::clamp_curvature;

/// Per-instance settings, captured when a writer is built.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct WriterConfig {
    /// Host sample rate in Hz. Converts milliseconds to hops and sizes
    /// empty buffers.
    pub sample_rate: f32,
    /// Output value before the first list arrives.
    pub initial_value: f32,
    /// Starting curvature for trailing partial segments.
    pub curvature_bias: f32,
    /// Slots in the deferred rebind queue.
    pub rebind_queue: usize,
}

impl WriterConfig {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    pub fn initial_value(mut self, value: f32) -> Self {
        self.initial_value = value;
        self
    }

    pub fn curvature_bias(mut self, bias: f32) -> Self {
        self.curvature_bias = clamp_curvature(bias);
        self
    }

    pub fn rebind_queue(mut self, slots: usize) -> Self {
        self.rebind_queue = slots.max(1);
        self
    }

    pub fn samples_per_ms(&self) -> f64 {
        self.sample_rate as f64 * 0.001
    }

    /// Frames in one second of audio; the size given to empty buffers.
    pub fn one_second_frames(&self) -> usize {
        self.sample_rate.max(1.0).round() as usize
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            initial_value: 0.0,
            curvature_bias: 0.0,
            rebind_queue: 16,
        }
    }
}
