#![forbid(unsafe_code)]

//! Origin colours.
//!
//! Each physical node address gets a colour the first time any instance
//! renders it and keeps it for the rest of the session. After a split or a
//! concatenation, shared sub-trees therefore show which vector they came
//! from, while freshly allocated nodes pick up the next palette entry.

use std::collections::HashMap;
use std::fmt;

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Parse `#rrggbb` or `rrggbb`.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Self)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0 & 0x00ff_ffff)
    }
}

/// Ten-colour categorical palette.
pub const DEFAULT_PALETTE: [Color; 10] = [
    Color(0x1f77b4),
    Color(0xff7f0e),
    Color(0x2ca02c),
    Color(0xd62728),
    Color(0x9467bd),
    Color(0x8c564b),
    Color(0xe377c2),
    Color(0x7f7f7f),
    Color(0xbcbd22),
    Color(0x17becf),
];

/// Memoized address → colour map, owned by the session.
#[derive(Debug, Clone)]
pub struct ColorTracker {
    palette: Vec<Color>,
    assigned: HashMap<u64, Color>,
    next: usize,
}

impl Default for ColorTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PALETTE.to_vec())
    }
}

impl ColorTracker {
    /// An empty palette falls back to [`DEFAULT_PALETTE`].
    pub fn new(palette: Vec<Color>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.to_vec()
        } else {
            palette
        };
        Self {
            palette,
            assigned: HashMap::new(),
            next: 0,
        }
    }

    /// Colour of `address`, assigning the next palette entry on first sight.
    pub fn color_for(&mut self, address: u64) -> Color {
        if let Some(&color) = self.assigned.get(&address) {
            return color;
        }
        let color = self.palette[self.next % self.palette.len()];
        self.next += 1;
        self.assigned.insert(address, color);
        color
    }

    /// Colour already assigned to `address`, if any.
    pub fn get(&self, address: u64) -> Option<Color> {
        self.assigned.get(&address).copied()
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Forget every assignment and restart the palette.
    pub fn reset(&mut self) {
        self.assigned.clear();
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sight_assigns_in_order() {
        let mut colors = ColorTracker::default();
        assert_eq!(colors.color_for(10), DEFAULT_PALETTE[0]);
        assert_eq!(colors.color_for(20), DEFAULT_PALETTE[1]);
        assert_eq!(colors.color_for(10), DEFAULT_PALETTE[0]);
        assert_eq!(colors.len(), 2);
    }

    #[test]
    fn palette_cycles() {
        let mut colors = ColorTracker::new(vec![Color(1), Color(2)]);
        assert_eq!(colors.color_for(1), Color(1));
        assert_eq!(colors.color_for(2), Color(2));
        assert_eq!(colors.color_for(3), Color(1));
    }

    #[test]
    fn reset_restarts_palette() {
        let mut colors = ColorTracker::default();
        colors.color_for(5);
        colors.color_for(6);
        colors.reset();
        assert!(colors.is_empty());
        assert_eq!(colors.color_for(6), DEFAULT_PALETTE[0]);
    }

    #[test]
    fn hex_round_trip() {
        let c = Color::parse_hex("#2ca02c").unwrap();
        assert_eq!(c, Color::rgb(0x2c, 0xa0, 0x2c));
        assert_eq!(c.to_string(), "#2ca02c");
        assert!(Color::parse_hex("#12345").is_none());
        assert!(Color::parse_hex("zzzzzz").is_none());
    }
}
