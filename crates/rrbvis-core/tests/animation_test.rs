//! Integration tests for the animation module.

use proptest::prelude::*;
use rrbvis_core::animation::*;
use rrbvis_core::geometry::Point;
use std::time::Duration;

const MS_100: Duration = Duration::from_millis(100);

#[test]
fn tween_duration_tracking() {
    let mut tween = Tween::new(Point::ZERO, Point::new(10.0, 10.0), Duration::from_secs(1));
    for _ in 0..1000 {
        tween.tick(Duration::from_millis(1));
    }
    assert!(tween.is_complete(), "1000x1ms should complete 1s tween");
    assert_eq!(tween.current(), Point::new(10.0, 10.0));
}

#[test]
fn repeated_retarget_never_jumps() {
    let mut tween = Tween::new(0.0_f64, 100.0, MS_100);
    for i in 0..20 {
        tween.tick(Duration::from_millis(10));
        let before = tween.current();
        let target = if i % 2 == 0 { -100.0 } else { 100.0 };
        tween.retarget(target, MS_100);
        assert!(
            (tween.current() - before).abs() < 1e-9,
            "retarget must continue from the current value"
        );
    }
    assert!(tween.current().is_finite());
}

#[test]
fn easing_is_monotonic() {
    let mut prev = 0.0f32;
    for i in 0..=100 {
        let t = i as f32 / 100.0;
        let v = ease_in_out_cubic(t);
        assert!(v >= prev - 0.001, "easing should be monotonic at t={}", t);
        prev = v;
    }
}

proptest! {
    #[test]
    fn easing_outputs_bounded(t in -10.0f32..10.0f32) {
        let v = ease_in_out_cubic(t);
        prop_assert!(
            (0.0..=1.0).contains(&v),
            "easing output out of range: t={t} v={v}"
        );
    }

    #[test]
    fn tween_completes_when_tick_ge_duration(duration_ms in 1u64..5000, extra_ms in 0u64..5000) {
        let mut tween = Tween::new(0.0_f64, 1.0, Duration::from_millis(duration_ms));
        tween.tick(Duration::from_millis(duration_ms + extra_ms));
        prop_assert!(tween.is_complete());
        prop_assert!((tween.current() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn tween_stays_between_endpoints(
        from in -1000.0f64..1000.0,
        to in -1000.0f64..1000.0,
        elapsed_ms in 0u64..600,
    ) {
        let mut tween = Tween::new(from, to, Duration::from_millis(500));
        tween.tick(Duration::from_millis(elapsed_ms));
        let v = tween.current();
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        prop_assert!(v >= lo - 1e-6 && v <= hi + 1e-6, "v={v} outside [{lo}, {hi}]");
    }
}
