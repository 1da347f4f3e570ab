use crate::dsp::compiler::SegmentList;

/*
Curve Generator
===============

Walks a SegmentList and writes one block of samples per call, carrying the
recursion state across calls so a segment longer than a block resumes exactly
where it stopped.

Per block:

    while samples remain in this block:
        if retarget pending:
            load the next segment (jump through 0-hop ones)
            nothing left?  hold the final value, list finished
        no segment in flight?  hold the current value
        write min(hops left, samples left) recursion samples
        segment done?  snap to target, retarget next time round or finish

A segment that ends exactly on the last sample of a block leaves the retarget
pending for the next call, so nothing is skipped and nothing is written twice.
*/

/// What happened during one [`CurveGenerator::render`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassOutcome {
    /// The last segment of the list finished during this block.
    pub completed: bool,
    /// Samples produced by the recursion (the rest were held flat).
    pub ramp_samples: usize,
}

/// Resumable exponential-segment generator.
#[derive(Debug, Clone)]
pub struct CurveGenerator {
    // Output state
    value: f32,  // last emitted value, start of the next segment
    target: f32, // target of the segment in flight

    // Segment cursor
    segments: SegmentList,
    next_segment: usize,
    retarget: bool,

    // Recursion state for the segment in flight
    remaining: usize,
    vv: f64,
    bb: f64,
    mm: f64,
    dy: f32,
    y0: f32,
}

impl CurveGenerator {
    pub fn new(initial_value: f32) -> Self {
        Self {
            value: initial_value,
            target: initial_value,
            segments: SegmentList::default(),
            next_segment: 0,
            retarget: false,
            remaining: 0,
            vv: 1.0,
            bb: 1.0,
            mm: 1.0,
            dy: 0.0,
            y0: initial_value,
        }
    }

    /// Replace the active list. The first segment is loaded on the next render.
    pub fn load(&mut self, segments: SegmentList) {
        self.target = segments.get(0).map_or(self.value, |s| s.target);
        self.segments = segments;
        self.next_segment = 0;
        self.retarget = true;
    }

    /// Fill `out` with the next block of the curve.
    pub fn render(&mut self, out: &mut [f32]) -> PassOutcome {
        let mut outcome = PassOutcome::default();

        if big_or_small(self.value) {
            self.value = 0.0;
        }

        let mut pos = 0;
        while pos < out.len() {
            if self.retarget && !self.retarget() {
                out[pos..].fill(self.value);
                outcome.completed = true;
                break;
            }

            if self.remaining == 0 {
                out[pos..].fill(self.value);
                break;
            }

            let take = self.remaining.min(out.len() - pos);
            let mut last = self.value;
            for sample in &mut out[pos..pos + take] {
                last = ((self.vv - self.bb) * self.dy as f64 + self.y0 as f64) as f32;
                *sample = last;
                self.vv *= self.mm;
            }
            pos += take;
            outcome.ramp_samples += take;
            self.remaining -= take;

            if self.remaining == 0 {
                self.value = self.target;
                if self.next_segment < self.segments.len() {
                    self.retarget = true;
                } else {
                    outcome.completed = true;
                }
            } else {
                self.value = last;
            }
        }

        outcome
    }

    /// Load the next segment with a non-zero hop count into the recursion
    /// state. Jump segments are applied on the way. Returns false once the
    /// list is exhausted.
    fn retarget(&mut self) -> bool {
        self.retarget = false;
        while let Some(segment) = self.segments.get(self.next_segment).copied() {
            self.next_segment += 1;
            self.target = segment.target;

            if segment.hops == 0 {
                self.value = segment.target;
                continue;
            }

            self.remaining = segment.hops;
            self.dy = segment.delta_from(self.value);
            self.y0 = self.value;
            self.bb = segment.b;
            self.mm = segment.m;
            self.vv = segment.b;
            return true;
        }

        self.remaining = 0;
        false
    }

    /// Last emitted value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Target of the segment in flight (or of the last segment).
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Hops left in the segment in flight.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Segments not yet started.
    pub fn pending_segments(&self) -> usize {
        self.segments.len().saturating_sub(self.next_segment)
    }

    /// True while a segment is in flight or queued.
    pub fn is_active(&self) -> bool {
        self.remaining > 0 || (self.retarget && self.pending_segments() > 0)
    }

    pub fn segments(&self) -> &SegmentList {
        &self.segments
    }
}

/// Values whose magnitude is at or above 2^64, below 2^-64 (zero included),
/// or NaN. The generator flushes them to zero before a block.
#[inline]
fn big_or_small(x: f32) -> bool {
    const BIG: f32 = 18_446_744_073_709_551_616.0; // 2^64
    const SMALL: f32 = 1.0 / BIG;
    let mag = x.abs();
    !(SMALL..BIG).contains(&mag)
}
