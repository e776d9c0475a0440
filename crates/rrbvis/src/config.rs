#![forbid(unsafe_code)]

//! Visualization configuration.
//!
//! Defaults reproduce the stock diagram (branching factor 4, 16×20 cells,
//! 250 ms transitions). Every field can be overridden from the environment:
//!
//! | Variable                     | Field              |
//! |------------------------------|--------------------|
//! | `RRBVIS_BRANCHING_FACTOR`    | `branching_factor` |
//! | `RRBVIS_CELL_WIDTH`          | `cell_width`       |
//! | `RRBVIS_CELL_HEIGHT`         | `cell_height`      |
//! | `RRBVIS_LEVEL_SPACING`       | `level_spacing`    |
//! | `RRBVIS_WIDTH`               | `width`            |
//! | `RRBVIS_TRANSITION_MS`       | `transition`       |
//! | `RRBVIS_SLOW_TRANSITION_MS`  | `slow_transition`  |
//! | `RRBVIS_HOVER_DELAY_MS`      | `hover_delay`      |
//! | `RRBVIS_PALETTE`             | `palette` (comma-separated `#rrggbb`) |

use std::env;
use std::fmt;
use std::time::Duration;

use rrbvis_core::geometry::{Point, Sides};
use rrbvis_core::hover::HoverConfig;
use rrbvis_layout::{LayoutConfig, Separation};

use crate::color::{Color, DEFAULT_PALETTE};

pub const ENV_BRANCHING_FACTOR: &str = "RRBVIS_BRANCHING_FACTOR";
pub const ENV_CELL_WIDTH: &str = "RRBVIS_CELL_WIDTH";
pub const ENV_CELL_HEIGHT: &str = "RRBVIS_CELL_HEIGHT";
pub const ENV_LEVEL_SPACING: &str = "RRBVIS_LEVEL_SPACING";
pub const ENV_WIDTH: &str = "RRBVIS_WIDTH";
pub const ENV_TRANSITION_MS: &str = "RRBVIS_TRANSITION_MS";
pub const ENV_SLOW_TRANSITION_MS: &str = "RRBVIS_SLOW_TRANSITION_MS";
pub const ENV_HOVER_DELAY_MS: &str = "RRBVIS_HOVER_DELAY_MS";
pub const ENV_PALETTE: &str = "RRBVIS_PALETTE";

/// Everything the session needs to lay out and animate diagrams.
#[derive(Debug, Clone, PartialEq)]
pub struct VisConfig {
    pub branching_factor: usize,
    pub cell_width: f64,
    pub cell_height: f64,
    pub level_spacing: f64,
    /// Minimum viewport width.
    pub width: f64,
    pub margin: Sides,
    pub transition: Duration,
    /// Used when a gesture asks for slow motion.
    pub slow_transition: Duration,
    pub hover_delay: Duration,
    pub palette: Vec<Color>,
}

impl Default for VisConfig {
    fn default() -> Self {
        let width = 1392.0;
        Self {
            branching_factor: 4,
            cell_width: 16.0,
            cell_height: 20.0,
            level_spacing: width / 28.0,
            width,
            margin: Sides::new(32.0, 120.0, 42.0, 512.0),
            transition: Duration::from_millis(250),
            slow_transition: Duration::from_millis(2500),
            hover_delay: Duration::from_millis(256),
            palette: DEFAULT_PALETTE.to_vec(),
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct VisConfigParse {
    pub config: VisConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl VisConfig {
    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> VisConfig {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> VisConfigParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Parse config through an arbitrary lookup (tests pass a map).
    pub fn from_env_with<F>(mut get: F) -> VisConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = VisConfig::default();
        let mut errors = Vec::new();

        if let Some(value) = get(ENV_BRANCHING_FACTOR) {
            match parse_usize(&value) {
                Some(parsed) => config.branching_factor = parsed,
                None => errors.push(ConfigError::new(
                    "branching_factor",
                    value,
                    "expected positive integer",
                )),
            }
        }

        for (key, field, slot) in [
            (ENV_CELL_WIDTH, "cell_width", &mut config.cell_width),
            (ENV_CELL_HEIGHT, "cell_height", &mut config.cell_height),
            (ENV_LEVEL_SPACING, "level_spacing", &mut config.level_spacing),
            (ENV_WIDTH, "width", &mut config.width),
        ] {
            if let Some(value) = get(key) {
                match parse_f64(&value) {
                    Some(parsed) => *slot = parsed,
                    None => errors.push(ConfigError::new(field, value, "expected number")),
                }
            }
        }

        for (key, field, slot) in [
            (ENV_TRANSITION_MS, "transition", &mut config.transition),
            (
                ENV_SLOW_TRANSITION_MS,
                "slow_transition",
                &mut config.slow_transition,
            ),
            (ENV_HOVER_DELAY_MS, "hover_delay", &mut config.hover_delay),
        ] {
            if let Some(value) = get(key) {
                match parse_usize(&value) {
                    Some(ms) => *slot = Duration::from_millis(ms as u64),
                    None => errors.push(ConfigError::new(
                        field,
                        value,
                        "expected milliseconds",
                    )),
                }
            }
        }

        if let Some(value) = get(ENV_PALETTE) {
            let parsed: Option<Vec<Color>> = value
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(Color::parse_hex)
                .collect();
            match parsed {
                Some(colors) if !colors.is_empty() => config.palette = colors,
                _ => errors.push(ConfigError::new(
                    "palette",
                    value,
                    "expected comma-separated #rrggbb colours",
                )),
            }
        }

        if let Err(mut validation) = config.validate() {
            errors.append(&mut validation);
        }

        VisConfigParse { config, errors }
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.branching_factor < 2 {
            errors.push(ConfigError::new(
                "branching_factor",
                self.branching_factor.to_string(),
                "must be >= 2",
            ));
        }
        validate_positive("cell_width", self.cell_width, &mut errors);
        validate_positive("cell_height", self.cell_height, &mut errors);
        validate_positive("level_spacing", self.level_spacing, &mut errors);
        validate_positive("width", self.width, &mut errors);
        if self.palette.is_empty() {
            errors.push(ConfigError::new("palette", "", "must not be empty"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Geometry handed to the layout engine.
    pub fn layout(&self) -> LayoutConfig {
        LayoutConfig {
            cell_width: self.cell_width,
            cell_height: self.cell_height,
            branching_factor: self.branching_factor,
            level_spacing: self.level_spacing,
            margin: self.margin,
            min_width: self.width,
            size_table_gap: self.cell_width,
            tail_origin: Point::new(-self.margin.left + self.cell_width * 2.0, 0.0),
            separation: Separation::default(),
        }
    }

    /// Hover timing for the split affordance.
    pub fn hover(&self) -> HoverConfig {
        HoverConfig {
            show_delay: self.hover_delay,
            hide_delay: self.hover_delay,
        }
    }

    /// Transition length for a render pass.
    pub fn transition_for(&self, slow_motion: bool) -> Duration {
        if slow_motion {
            self.slow_transition
        } else {
            self.transition
        }
    }
}

#[inline]
fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}

#[inline]
fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn validate_positive(field: &'static str, value: f64, errors: &mut Vec<ConfigError>) {
    if value <= 0.0 {
        errors.push(ConfigError::new(field, value.to_string(), "must be > 0"));
    }
}
