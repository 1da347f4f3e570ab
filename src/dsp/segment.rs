#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Exponential Curve Segments
==========================

A curve is a chain of segments. Each segment moves the output from wherever
the previous one stopped to its own `target`, over a fixed number of hops
(samples), bending the path according to a curvature value in [-1, 1].

Vocabulary
----------

  hop         One output sample inside a segment. A segment of 0 hops is a
              jump: the output collapses straight to the target.

  curvature   Shape control. 0 is (almost exactly) a straight line, positive
              values ease in slowly and finish fast, negative values leave
              fast and settle slowly.

  b, m        Recursion coefficients. The generator keeps `v`, starts it at
              `b` and multiplies it by `m` every hop.


The Recursion
-------------

For every hop the generator emits

    out = (v - b) * dy + y0
    v   = v * m

where `y0` is the starting value and `dy` the signed distance to the target.
The coefficients are chosen so that after exactly `hops` multiplications
`v - b` has travelled from 0 to +1 (or to -1 for negative curvature, where
`dy` is flipped as well). That makes the segment land on its target by
construction, whatever the hop count.

The shape parameter comes from the curvature:

    h   = ((c + C1) * C2) ^ C3 * C4          c >= 0
    h   = ((C1 - c) * C2) ^ C3 * C4          c <  0
    f   = h / (1 - h)
    eff = e^f - 1
    gh  = (e^(f/2) - 1) / eff

and for c >= 0

    b = gh^2 / (1 - 2 gh)            (== 1 / eff)
    m = (e^(f/hops) - 1) / (eff b) + 1      (== e^(f/hops))

so b * (m^hops - 1) == 1. Negative curvature mirrors this: `m` is inverted
and `b` is shifted up by one, so `v` decays instead of growing and the bend
flips direction rather than just flipping sign.

    Value
    1.0 ┤             ╭─     ╭──────      ╱
        │            ╱      ╱            ╱
        │          ╭╯      │            ╱
        │       ╭──╯      ╱            ╱
    0.0 ┼───────╯       ╱╯            ╱
        c > 0        c < 0         c = 0
*/

// definitions for curve coefficients
pub const CURVE_C1: f64 = 1e-20;
pub const CURVE_C2: f64 = 1.2;
pub const CURVE_C3: f64 = 0.41;
pub const CURVE_C4: f64 = 0.91;

/// One leg of a multi-segment ramp.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSegment {
    /// Value the output reaches at the end of the segment.
    pub target: f32,
    /// Segment length in samples. Zero means jump.
    pub hops: usize,
    /// Curvature as requested. Its sign also selects the direction of `dy`.
    pub curvature: f32,
    pub b: f64,
    pub m: f64,
}

impl CurveSegment {
    /// Build a segment from a duration in milliseconds, deriving hop count
    /// and coefficients together.
    pub fn new(target: f32, duration_ms: f64, curvature: f32, samples_per_ms: f64) -> Self {
        let hops = hops_for(duration_ms, samples_per_ms);
        let (b, m) = curve_coefficients(hops, curvature as f64);
        Self {
            target,
            hops,
            curvature,
            b,
            m,
        }
    }

    /// Signed distance the recursion scales by when starting from `from`.
    #[inline]
    pub fn delta_from(&self, from: f32) -> f32 {
        if self.curvature < 0.0 {
            from - self.target
        } else {
            self.target - from
        }
    }
}

/// Convert a duration to a hop count: rounded to the nearest sample, never
/// negative. NaN durations collapse to zero hops.
#[inline]
pub fn hops_for(duration_ms: f64, samples_per_ms: f64) -> usize {
    let hops = (duration_ms * samples_per_ms + 0.5).floor();
    if hops > 0.0 {
        hops as usize
    } else {
        0
    }
}

/// Clamp a curvature value into [-1, 1].
#[inline]
pub fn clamp_curvature(curvature: f32) -> f32 {
    if curvature < -1.0 {
        -1.0
    } else if curvature > 1.0 {
        1.0
    } else {
        curvature
    }
}

/// Derive `(b, m)` for a segment of `hops` samples and the given curvature.
pub fn curve_coefficients(hops: usize, curvature: f64) -> (f64, f64) {
    if hops == 0 {
        return if curvature < 0.0 { (2.0, 1.0) } else { (1.0, 1.0) };
    }

    let inv_hops = 1.0 / hops as f64;

    if curvature < 0.0 {
        let c = curvature.max(-1.0);
        let ff = shape_factor(CURVE_C1 - c);
        let eff = ff.exp() - 1.0;
        let gh = ((ff * 0.5).exp() - 1.0) / eff;
        let b = gh * (gh / (1.0 - (gh + gh)));
        let m = 1.0 / ((((ff * inv_hops).exp() - 1.0) / (eff * b)) + 1.0);
        (b + 1.0, m)
    } else {
        let c = curvature.min(1.0);
        let ff = shape_factor(c + CURVE_C1);
        let eff = ff.exp() - 1.0;
        let gh = ((ff * 0.5).exp() - 1.0) / eff;
        let b = gh * (gh / (1.0 - (gh + gh)));
        let m = (((ff * inv_hops).exp() - 1.0) / (eff * b)) + 1.0;
        (b, m)
    }
}

#[inline]
fn shape_factor(offset: f64) -> f64 {
    let hh = (offset * CURVE_C2).powf(CURVE_C3) * CURVE_C4;
    hh / (1.0 - hh)
}
