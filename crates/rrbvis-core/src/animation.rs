#![forbid(unsafe_code)]

//! Composable animation primitives.
//!
//! Time-based animations driven by an explicit `tick(dt)`; nothing here
//! sleeps or owns a clock. The host advances every live animation once per
//! frame and reads the interpolated state back.
//!
//! [`Tween`] is the workhorse of the reconciler: it moves any [`Lerp`] value
//! (positions, opacities, the viewport) from a start to a target and can be
//! retargeted mid-flight, restarting from wherever it currently is.

use std::time::Duration;

use crate::geometry::{Point, Rect};

// ---------------------------------------------------------------------------
// Easing functions
// ---------------------------------------------------------------------------

/// Cubic ease-in-out, used for every tree transition.
#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

// ---------------------------------------------------------------------------
// Animation trait
// ---------------------------------------------------------------------------

/// A time-based animation advanced by the host.
pub trait Animation {
    /// Advance the animation by `dt`.
    fn tick(&mut self, dt: Duration);

    /// Whether the animation has reached its end.
    fn is_complete(&self) -> bool;
}

fn nonzero(duration: Duration) -> Duration {
    if duration.is_zero() {
        Duration::from_nanos(1)
    } else {
        duration
    }
}

fn progress(elapsed: Duration, duration: Duration) -> f32 {
    let t = elapsed.as_secs_f64() / duration.as_secs_f64();
    (t as f32).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tween
// ---------------------------------------------------------------------------

/// Values that can be linearly interpolated.
pub trait Lerp: Copy {
    fn lerp(self, to: Self, t: f64) -> Self;
}

impl Lerp for f64 {
    #[inline]
    fn lerp(self, to: Self, t: f64) -> Self {
        self + (to - self) * t.clamp(0.0, 1.0)
    }
}

impl Lerp for Point {
    #[inline]
    fn lerp(self, to: Self, t: f64) -> Self {
        Point::lerp(self, to, t)
    }
}

impl Lerp for Rect {
    #[inline]
    fn lerp(self, to: Self, t: f64) -> Self {
        Rect::lerp(&self, &to, t)
    }
}

/// Interpolates a [`Lerp`] value between `from` and `to` over a duration.
#[derive(Debug, Clone, Copy)]
pub struct Tween<T> {
    from: T,
    to: T,
    elapsed: Duration,
    duration: Duration,
}

impl<T: Lerp> Tween<T> {
    /// Create a tween from `from` to `to` over `duration` with cubic in-out easing.
    pub fn new(from: T, to: T, duration: Duration) -> Self {
        Self {
            from,
            to,
            elapsed: Duration::ZERO,
            duration: nonzero(duration),
        }
    }

    /// A tween already resting at `value`.
    pub fn settled(value: T) -> Self {
        let mut tween = Self::new(value, value, Duration::ZERO);
        tween.elapsed = tween.duration;
        tween
    }

    /// Current interpolated value.
    pub fn current(&self) -> T {
        let t = ease_in_out_cubic(progress(self.elapsed, self.duration));
        self.from.lerp(self.to, f64::from(t))
    }

    /// Target value.
    pub fn target(&self) -> T {
        self.to
    }

    /// Restart toward `to` from the current interpolated value.
    ///
    /// An in-flight transition is never queued behind; the new one replaces it.
    pub fn retarget(&mut self, to: T, duration: Duration) {
        self.from = self.current();
        self.to = to;
        self.elapsed = Duration::ZERO;
        self.duration = nonzero(duration);
    }
}

impl<T: Lerp> Animation for Tween<T> {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
