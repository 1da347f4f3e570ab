use crate::{dsp::segment::CurveSegment, MAX_SEGMENTS};

/// Everything the compiler needs to know about the destination.
#[derive(Debug, Clone, Copy)]
pub struct CompileCtx {
    /// Samples per millisecond at the instance's sample rate.
    pub samples_per_ms: f64,
    /// Length of the destination buffer in milliseconds.
    pub buffer_ms: f64,
    /// Curvature used for a trailing partial segment.
    pub curvature_bias: f32,
}

impl CompileCtx {
    pub fn new(sample_rate: f32, buffer_frames: usize, curvature_bias: f32) -> Self {
        let samples_per_ms = sample_rate as f64 * 0.001;
        let buffer_ms = if samples_per_ms > 0.0 {
            buffer_frames as f64 / samples_per_ms
        } else {
            0.0
        };
        Self {
            samples_per_ms,
            buffer_ms,
            curvature_bias,
        }
    }
}

/// Ordered segments built from one list message. Replaced wholesale, never
/// edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentList {
    segments: Vec<CurveSegment>,
    clamped: bool,
}

impl SegmentList {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CurveSegment> {
        self.segments.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CurveSegment> {
        self.segments.iter()
    }

    pub fn as_slice(&self) -> &[CurveSegment] {
        &self.segments
    }

    /// True if the input held more groups than [`MAX_SEGMENTS`] and was cut.
    pub fn was_clamped(&self) -> bool {
        self.clamped
    }

    /// Sum of all hop counts.
    pub fn total_hops(&self) -> usize {
        self.segments.iter().map(|s| s.hops).sum()
    }
}

/// Compile a flat `target, duration, curvature` list into segments.
///
/// Durations are relative: they are summed and rescaled so the whole list
/// spans `ctx.buffer_ms`. One or two trailing numbers form a partial segment
/// (`target` or `target, duration`) that takes `ctx.curvature_bias` as its
/// curvature. An empty list and a list of exactly three numbers produce
/// nothing.
pub fn compile(values: &[f32], ctx: &CompileCtx) -> Option<SegmentList> {
    let count = values.len();
    if count == 0 || count == 3 {
        return None;
    }

    let mut remainder = count % 3;
    let mut nsegs = count / 3 + usize::from(remainder != 0);
    let clamped = nsegs > MAX_SEGMENTS;
    if clamped {
        nsegs = MAX_SEGMENTS;
        remainder = 0;
    }
    let full = if remainder != 0 { nsegs - 1 } else { nsegs };

    let groups = &values[..full * 3];
    let partial = &values[full * 3..full * 3 + remainder];

    let mut total_length: f64 = groups.chunks_exact(3).map(|g| g[1] as f64).sum();
    if remainder == 2 {
        total_length += partial[1] as f64;
    }

    let scale = if total_length > 0.0 && total_length.is_finite() {
        ctx.buffer_ms / total_length
    } else {
        0.0
    };

    let mut segments = Vec::with_capacity(nsegs);
    for group in groups.chunks_exact(3) {
        segments.push(CurveSegment::new(
            group[0],
            group[1] as f64 * scale,
            group[2],
            ctx.samples_per_ms,
        ));
    }

    match partial {
        &[target, duration] => segments.push(CurveSegment::new(
            target,
            duration as f64 * scale,
            ctx.curvature_bias,
            ctx.samples_per_ms,
        )),
        &[target] => segments.push(CurveSegment::new(
            target,
            0.0,
            ctx.curvature_bias,
            ctx.samples_per_ms,
        )),
        _ => {}
    }

    Some(SegmentList { segments, clamped })
}
