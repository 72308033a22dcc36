/// Soldier formation: how a soldier count is laid out as a marching block.
///
/// Columns grow with the square root of the count and cap at five, so small
/// squads look square and large armies become long columns.

pub const MAX_COLUMNS: u32 = 5;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Formation {
    pub columns: u32,
    /// Rows actually drawn (capped by the caller's `max_rows`).
    pub rows: u32,
    /// Soldiers in the last drawn row (1..=columns), 0 for an empty army.
    pub last_row: u32,
    /// Soldiers that did not fit in `max_rows`.
    pub hidden: u32,
}

pub fn columns_for(soldiers: u32) -> u32 {
    if soldiers == 0 {
        return 0;
    }
    let root = (soldiers as f64).sqrt().ceil() as u32;
    root.min(MAX_COLUMNS)
}

/// Lay out `soldiers` in at most `max_rows` rows.
pub fn layout(soldiers: u32, max_rows: u32) -> Formation {
    let columns = columns_for(soldiers);
    if columns == 0 || max_rows == 0 {
        return Formation { columns, rows: 0, last_row: 0, hidden: soldiers };
    }
    let full_rows = soldiers.div_ceil(columns);
    let rows = full_rows.min(max_rows);
    let shown = (rows * columns).min(soldiers);
    let last_row = shown - (rows - 1) * columns;
    Formation { columns, rows, last_row, hidden: soldiers - shown }
}

impl Formation {
    /// Soldiers in row `r` (0 = front).
    pub fn row_len(&self, r: u32) -> u32 {
        if r + 1 < self.rows {
            self.columns
        } else if r + 1 == self.rows {
            self.last_row
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_follow_square_root() {
        assert_eq!(columns_for(0), 0);
        assert_eq!(columns_for(1), 1);
        assert_eq!(columns_for(4), 2);
        assert_eq!(columns_for(10), 4);
        assert_eq!(columns_for(200), 5);
    }

    #[test]
    fn ten_soldiers_fill_three_rows() {
        let f = layout(10, 8);
        assert_eq!(f.columns, 4);
        assert_eq!(f.rows, 3);
        assert_eq!(f.last_row, 2);
        assert_eq!(f.hidden, 0);
        assert_eq!(f.row_len(0), 4);
        assert_eq!(f.row_len(2), 2);
        assert_eq!(f.row_len(3), 0);
    }

    #[test]
    fn overflow_is_counted() {
        let f = layout(60, 4);
        assert_eq!(f.columns, 5);
        assert_eq!(f.rows, 4);
        assert_eq!(f.last_row, 5);
        assert_eq!(f.hidden, 40);
    }

    #[test]
    fn empty_army() {
        let f = layout(0, 4);
        assert_eq!(f.rows, 0);
        assert_eq!(f.hidden, 0);
    }
}
