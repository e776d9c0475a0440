#![forbid(unsafe_code)]

//! Debounced hover affordance.
//!
//! Drives a transient overlay (the "split here" button) anchored to whatever
//! the pointer rests on. Showing waits for the pointer to settle on a target;
//! hiding waits the same delay so the pointer can travel from the target onto
//! the overlay itself, which then pins it until the pointer leaves.
//!
//! # States
//!
//! ```text
//!            enter(t)                 timer
//!   Idle ────────────▶ PendingShow(t) ──────▶ Shown(t)
//!    ▲                   │ leave(t)            │ leave(t) / overlay_leave
//!    │                   ▼                     ▼
//!    └──────────────── Idle ◀──── timer ── PendingHide(t)
//!                                              │ enter(t) / overlay_enter
//!                                              ▼
//!                                           Shown(t)
//! ```
//!
//! # Invariants
//!
//! 1. At most one timer is armed; arming a new one invalidates the old token.
//! 2. A timer only fires for the state that armed it (stale tokens are ignored).
//! 3. `Show` is only emitted for the most recently entered target.
//! 4. While the overlay is engaged, leaving the target does not hide it.
//!
//! # Failure Modes
//!
//! - A target that disappears between arming and firing: the host calls
//!   [`HoverAffordance::forget`], which returns to `Idle` without emitting.
//! - Clock skew: `poll` with a time before the deadline is a no-op.

use std::time::Duration;

use web_time::Instant;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timing for the hover affordance.
#[derive(Debug, Clone)]
pub struct HoverConfig {
    /// Delay between resting on a target and showing the overlay.
    /// Default: 256ms
    pub show_delay: Duration,

    /// Delay between leaving the target (or overlay) and hiding the overlay.
    /// Default: 256ms
    pub hide_delay: Duration,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            show_delay: Duration::from_millis(256),
            hide_delay: Duration::from_millis(256),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Handle identifying one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

/// Affordance state for target type `T`.
#[derive(Debug, Clone, PartialEq)]
pub enum HoverState<T> {
    Idle,
    PendingShow {
        target: T,
        token: TimerToken,
        deadline: Instant,
    },
    Shown {
        target: T,
        /// Pointer is over the overlay itself.
        engaged: bool,
    },
    PendingHide {
        target: T,
        token: TimerToken,
        deadline: Instant,
    },
}

/// What the host must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverEvent<T> {
    Show(T),
    Hide(T),
}

/// Debounced show/hide state machine for one interactive surface.
#[derive(Debug)]
pub struct HoverAffordance<T> {
    config: HoverConfig,
    state: HoverState<T>,
    generation: u64,
}

impl<T: Clone + PartialEq> HoverAffordance<T> {
    #[must_use]
    pub fn new(config: HoverConfig) -> Self {
        Self {
            config,
            state: HoverState::Idle,
            generation: 0,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> &HoverState<T> {
        &self.state
    }

    /// Target the overlay is currently displayed for, if any.
    pub fn shown(&self) -> Option<&T> {
        match &self.state {
            HoverState::Shown { target, .. } | HoverState::PendingHide { target, .. } => {
                Some(target)
            }
            _ => None,
        }
    }

    /// Deadline of the armed timer, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match &self.state {
            HoverState::PendingShow { deadline, .. } | HoverState::PendingHide { deadline, .. } => {
                Some(*deadline)
            }
            _ => None,
        }
    }

    /// Token of the armed timer, if any.
    pub fn armed_token(&self) -> Option<TimerToken> {
        match &self.state {
            HoverState::PendingShow { token, .. } | HoverState::PendingHide { token, .. } => {
                Some(*token)
            }
            _ => None,
        }
    }

    #[inline]
    pub fn config(&self) -> &HoverConfig {
        &self.config
    }

    fn arm(&mut self) -> TimerToken {
        self.generation = self.generation.wrapping_add(1);
        TimerToken(self.generation)
    }

    /// Pointer entered `target`.
    pub fn enter(&mut self, target: T, now: Instant) -> Option<HoverEvent<T>> {
        match std::mem::replace(&mut self.state, HoverState::Idle) {
            HoverState::Shown { target: cur, engaged } if cur == target => {
                self.state = HoverState::Shown {
                    target: cur,
                    engaged,
                };
                None
            }
            HoverState::PendingHide { target: cur, .. } if cur == target => {
                self.state = HoverState::Shown {
                    target: cur,
                    engaged: false,
                };
                None
            }
            HoverState::Shown { target: cur, .. } | HoverState::PendingHide { target: cur, .. } => {
                self.pending_show(target, now);
                Some(HoverEvent::Hide(cur))
            }
            HoverState::Idle | HoverState::PendingShow { .. } => {
                self.pending_show(target, now);
                None
            }
        }
    }

    fn pending_show(&mut self, target: T, now: Instant) {
        let token = self.arm();
        self.state = HoverState::PendingShow {
            target,
            token,
            deadline: now + self.config.show_delay,
        };
    }

    fn pending_hide(&mut self, target: T, now: Instant) {
        let token = self.arm();
        self.state = HoverState::PendingHide {
            target,
            token,
            deadline: now + self.config.hide_delay,
        };
    }

    /// Pointer left `target`. Leaving anything but the current target is ignored.
    pub fn leave(&mut self, target: &T, now: Instant) {
        match &self.state {
            HoverState::PendingShow { target: cur, .. } if cur == target => {
                self.state = HoverState::Idle;
            }
            HoverState::Shown {
                target: cur,
                engaged: false,
            } if cur == target => {
                let cur = cur.clone();
                self.pending_hide(cur, now);
            }
            _ => {}
        }
    }

    /// Pointer entered the overlay.
    pub fn overlay_enter(&mut self) {
        if let HoverState::Shown { target, .. } | HoverState::PendingHide { target, .. } =
            &self.state
        {
            self.state = HoverState::Shown {
                target: target.clone(),
                engaged: true,
            };
        }
    }

    /// Pointer left the overlay.
    pub fn overlay_leave(&mut self, now: Instant) {
        if let HoverState::Shown {
            target,
            engaged: true,
        } = &self.state
        {
            let target = target.clone();
            self.pending_hide(target, now);
        }
    }

    /// A timer armed with `token` fired at `now`. Stale or early firings are ignored.
    pub fn fire(&mut self, token: TimerToken, now: Instant) -> Option<HoverEvent<T>> {
        if self.armed_token() != Some(token) {
            return None;
        }
        self.poll(now)
    }

    /// Fire whichever timer is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<HoverEvent<T>> {
        match &self.state {
            HoverState::PendingShow {
                target, deadline, ..
            } if now >= *deadline => {
                let target = target.clone();
                self.state = HoverState::Shown {
                    target: target.clone(),
                    engaged: false,
                };
                Some(HoverEvent::Show(target))
            }
            HoverState::PendingHide {
                target, deadline, ..
            } if now >= *deadline => {
                let target = target.clone();
                self.state = HoverState::Idle;
                Some(HoverEvent::Hide(target))
            }
            _ => None,
        }
    }

    /// Hide immediately (e.g. after the overlay was clicked).
    pub fn dismiss(&mut self) -> Option<HoverEvent<T>> {
        let shown = self.shown().cloned();
        self.state = HoverState::Idle;
        shown.map(HoverEvent::Hide)
    }

    /// Drop any state referring to a target that no longer exists. Silent.
    pub fn forget(&mut self, mut gone: impl FnMut(&T) -> bool) {
        let stale = match &self.state {
            HoverState::Idle => false,
            HoverState::PendingShow { target, .. }
            | HoverState::Shown { target, .. }
            | HoverState::PendingHide { target, .. } => gone(target),
        };
        if stale {
            self.state = HoverState::Idle;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
