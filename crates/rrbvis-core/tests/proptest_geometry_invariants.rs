//! Property-based invariant tests for geometry primitives (Point, Rect).
//!
//! 1. Union is commutative.
//! 2. Union contains both inputs.
//! 3. Lerp at 0 and 1 returns the endpoints.
//! 4. Rect lerp stays between its endpoints' extents.

use proptest::prelude::*;
use rrbvis_core::geometry::{Point, Rect};

fn rect_strategy() -> impl Strategy<Value = Rect> {
    (-500.0f64..500.0, -500.0f64..500.0, 1.0f64..500.0, 1.0f64..500.0)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

fn point_strategy() -> impl Strategy<Value = Point> {
    (-1e4f64..1e4, -1e4f64..1e4).prop_map(|(x, y)| Point::new(x, y))
}

proptest! {
    #[test]
    fn union_commutative(a in rect_strategy(), b in rect_strategy()) {
        prop_assert_eq!(a.union(&b), b.union(&a));
    }

    #[test]
    fn union_contains_inputs(a in rect_strategy(), b in rect_strategy()) {
        let u = a.union(&b);
        for r in [a, b] {
            prop_assert!(u.left() <= r.left());
            prop_assert!(u.top() <= r.top());
            prop_assert!(u.right() >= r.right() - 1e-9);
            prop_assert!(u.bottom() >= r.bottom() - 1e-9);
        }
    }

    #[test]
    fn lerp_endpoints(a in point_strategy(), b in point_strategy()) {
        prop_assert_eq!(a.lerp(b, 0.0), a);
        prop_assert!(a.lerp(b, 1.0).approx_eq(b, 1e-9));
    }

    #[test]
    fn rect_lerp_between_extents(a in rect_strategy(), b in rect_strategy(), t in 0.0f64..=1.0) {
        let r = a.lerp(&b, t);
        prop_assert!(r.width >= a.width.min(b.width) - 1e-9);
        prop_assert!(r.width <= a.width.max(b.width) + 1e-9);
        prop_assert!(r.left() >= a.left().min(b.left()) - 1e-9);
        prop_assert!(r.left() <= a.left().max(b.left()) + 1e-9);
    }
}
