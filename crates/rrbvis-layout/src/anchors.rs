#![forbid(unsafe_code)]

//! Link anchor offsets.
//!
//! A node's array is drawn with one cell per child, centred on the node. A
//! link into child `i` leaves from the middle of cell `i`, so its horizontal
//! offset from the node centre depends on both the child count and the index.

/// Horizontal offset of cell `index` in an array of `count` cells.
///
/// Returns `None` when `index >= count`.
#[inline]
pub fn anchor_offset(count: usize, index: usize, cell_width: f64) -> Option<f64> {
    if index >= count {
        return None;
    }
    let centre = (count as f64 - 1.0) / 2.0;
    Some((index as f64 - centre) * cell_width)
}

/// Precomputed offsets for every `(count, index)` with `count <= branching_factor`.
#[derive(Debug, Clone)]
pub struct AnchorTable {
    cell_width: f64,
    /// `rows[count - 1][index]`.
    rows: Vec<Vec<f64>>,
}

impl AnchorTable {
    #[must_use]
    pub fn new(cell_width: f64, branching_factor: usize) -> Self {
        let rows = (1..=branching_factor)
            .map(|count| {
                (0..count)
                    .filter_map(|index| anchor_offset(count, index, cell_width))
                    .collect()
            })
            .collect();
        Self { cell_width, rows }
    }

    /// Offset for child `index` of a parent with `count` children.
    ///
    /// Counts beyond the table are computed directly.
    pub fn get(&self, count: usize, index: usize) -> Option<f64> {
        match count.checked_sub(1).and_then(|row| self.rows.get(row)) {
            Some(row) => row.get(index).copied(),
            None => anchor_offset(count, index, self.cell_width),
        }
    }

    /// The offsets for a parent with `count` children.
    pub fn row(&self, count: usize) -> Option<&[f64]> {
        count
            .checked_sub(1)
            .and_then(|row| self.rows.get(row))
            .map(Vec::as_slice)
    }
}
