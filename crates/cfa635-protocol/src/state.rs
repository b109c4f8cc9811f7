//! LCD contents and minimal-update diffing.
//!
//! A [`DisplayState`] is a snapshot of all 80 character cells. Callers keep
//! the snapshot they last sent, build the next one, and let
//! [`diff_and_apply`] issue the fewest row writes that turn one into the
//! other: at most one contiguous write per row, spanning from the first to
//! the last changed cell.

use std::convert::Infallible;

use crate::constants::*;

/// Something that can place bytes on the LCD at a position.
///
/// Implemented by the driver's `Module`; also implemented by
/// [`DisplayState`] itself and by `Vec<RowWrite>` so updates can be
/// simulated or recorded.
pub trait DisplayWriter {
    type Error;

    /// Write `data` starting at `col` on `row`, truncating at the end of
    /// the row.
    fn write(&mut self, col: usize, row: usize, data: &[u8]) -> Result<(), Self::Error>;
}

/// One write produced by [`diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowWrite {
    /// First column written.
    pub col: usize,
    /// Row written.
    pub row: usize,
    /// Device codepoints for the changed span.
    pub data: Vec<u8>,
}

impl DisplayWriter for Vec<RowWrite> {
    type Error = Infallible;

    fn write(&mut self, col: usize, row: usize, data: &[u8]) -> Result<(), Infallible> {
        self.push(RowWrite {
            col,
            row,
            data: data.to_vec(),
        });
        Ok(())
    }
}

/// Contents of every LCD cell, as device codepoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayState {
    cells: [[u8; COLUMNS]; ROWS],
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::cleared()
    }
}

impl DisplayState {
    /// The state after a clear: every cell is a space.
    pub fn cleared() -> Self {
        DisplayState {
            cells: [[SPACE; COLUMNS]; ROWS],
        }
    }

    /// Build a state from raw rows.
    pub fn from_rows(cells: [[u8; COLUMNS]; ROWS]) -> Self {
        DisplayState { cells }
    }

    /// All rows, top to bottom.
    pub fn rows(&self) -> &[[u8; COLUMNS]; ROWS] {
        &self.cells
    }

    /// One row, or `None` past the bottom of the display.
    pub fn row(&self, row: usize) -> Option<&[u8; COLUMNS]> {
        self.cells.get(row)
    }

    /// The byte at a cell, or `None` off the display.
    pub fn get(&self, col: usize, row: usize) -> Option<u8> {
        self.cells.get(row)?.get(col).copied()
    }

    /// Set one cell. Returns `false` if the position is off the display.
    pub fn set(&mut self, col: usize, row: usize, byte: u8) -> bool {
        match self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(cell) => {
                *cell = byte;
                true
            }
            None => false,
        }
    }

    /// Copy `data` into `row` starting at `col`, truncating at the end of the
    /// row. Returns the number of bytes placed.
    pub fn put(&mut self, col: usize, row: usize, data: &[u8]) -> usize {
        let Some(cells) = self.cells.get_mut(row) else {
            return 0;
        };
        if col >= COLUMNS {
            return 0;
        }
        let n = data.len().min(COLUMNS - col);
        cells[col..col + n].copy_from_slice(&data[..n]);
        n
    }

    /// Like [`put`](Self::put), but continues at column 0 of the following
    /// rows until `data` or the display runs out.
    pub fn put_wrapped(&mut self, mut col: usize, mut row: usize, mut data: &[u8]) -> usize {
        let mut placed = 0;
        while row < ROWS && !data.is_empty() {
            let n = self.put(col, row, data);
            if n == 0 {
                break;
            }
            placed += n;
            data = &data[n..];
            col = 0;
            row += 1;
        }
        placed
    }

    /// Fill an entire row with one byte.
    pub fn fill_row(&mut self, row: usize, byte: u8) {
        if let Some(cells) = self.cells.get_mut(row) {
            *cells = [byte; COLUMNS];
        }
    }

    /// Reset an entire row to spaces.
    pub fn clear_row(&mut self, row: usize) {
        self.fill_row(row, SPACE);
    }
}

impl DisplayWriter for DisplayState {
    type Error = Infallible;

    fn write(&mut self, col: usize, row: usize, data: &[u8]) -> Result<(), Infallible> {
        self.put(col, row, data);
        Ok(())
    }
}

/// The changed span of one row, as `(first, last_exclusive)`.
fn changed_span(old: &[u8; COLUMNS], new: &[u8; COLUMNS]) -> Option<(usize, usize)> {
    let first = old.iter().zip(new).position(|(a, b)| a != b)?;
    let last = (first..COLUMNS).rev().find(|&i| old[i] != new[i])?;
    Some((first, last + 1))
}

/// Compute the writes that turn `old` into `new`, at most one per row.
pub fn diff(old: &DisplayState, new: &DisplayState) -> Vec<RowWrite> {
    let mut writes = Vec::new();
    // Recording into a Vec cannot fail.
    let _ = diff_and_apply(old, new, &mut writes);
    writes
}

/// Issue the writes that turn `old` into `new` through `writer`.
///
/// Rows are handled top to bottom. An unchanged row produces no write; a
/// changed row produces exactly one write covering the first through last
/// differing cell. The first writer error stops the update.
pub fn diff_and_apply<W>(old: &DisplayState, new: &DisplayState, writer: &mut W) -> Result<(), W::Error>
where
    W: DisplayWriter + ?Sized,
{
    if old == new {
        return Ok(());
    }

    for (row, (old_row, new_row)) in old.cells.iter().zip(&new.cells).enumerate() {
        if let Some((start, end)) = changed_span(old_row, new_row) {
            writer.write(start, row, &new_row[start..end])?;
        }
    }
    Ok(())
}

/// Fit `src` into `width` cells, replacing the last visible cell with
/// `ellipsis` when it does not fit.
pub fn ellipsize(src: &[u8], ellipsis: u8, width: usize) -> Vec<u8> {
    if src.len() <= width {
        return src.to_vec();
    }
    if width == 0 {
        return Vec::new();
    }
    let mut out = src[..width - 1].to_vec();
    out.push(ellipsis);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state_with(col: usize, row: usize, text: &[u8]) -> DisplayState {
        let mut s = DisplayState::cleared();
        s.put(col, row, text);
        s
    }

    #[test]
    fn test_cleared_is_all_spaces() {
        let s = DisplayState::cleared();
        assert!(s.rows().iter().flatten().all(|&b| b == SPACE));
        assert_eq!(s, DisplayState::default());
    }

    #[test]
    fn test_identical_states_issue_no_writes() {
        let s = state_with(3, 2, b"steady");
        assert!(diff(&s, &s).is_empty());
        assert!(diff(&DisplayState::cleared(), &DisplayState::cleared()).is_empty());
    }

    #[test]
    fn test_single_row_change_trims_prefix_and_suffix() {
        let old = state_with(0, 1, b"Track 01 of 12");
        let new = state_with(0, 1, b"Track 02 of 12");
        assert_eq!(
            diff(&old, &new),
            vec![RowWrite {
                col: 7,
                row: 1,
                data: b"2".to_vec()
            }]
        );
    }

    #[test]
    fn test_interior_matches_are_rewritten() {
        let old = state_with(0, 0, b"abcdef");
        let new = state_with(0, 0, b"xbcdey");
        assert_eq!(
            diff(&old, &new),
            vec![RowWrite {
                col: 0,
                row: 0,
                data: b"xbcdey".to_vec()
            }]
        );
    }

    #[test]
    fn test_change_at_last_column() {
        let old = DisplayState::cleared();
        let new = state_with(19, 3, b"!");
        assert_eq!(
            diff(&old, &new),
            vec![RowWrite {
                col: 19,
                row: 3,
                data: b"!".to_vec()
            }]
        );
    }

    #[test]
    fn test_multiple_rows_in_order() {
        let old = DisplayState::cleared();
        let mut new = DisplayState::cleared();
        new.put(5, 3, b"d");
        new.put(0, 0, b"a");
        let writes = diff(&old, &new);
        assert_eq!(writes.len(), 2);
        assert_eq!((writes[0].row, writes[1].row), (0, 3));
    }

    #[test]
    fn test_diff_applied_to_old_yields_new() {
        let old = state_with(0, 0, b"12:34");
        let mut new = old;
        new.put_wrapped(15, 1, b"0123456789");
        let mut device = old;
        diff_and_apply(&old, &new, &mut device).unwrap();
        assert_eq!(device, new);
    }

    #[test]
    fn test_writer_error_stops_update() {
        struct Failing(usize);
        impl DisplayWriter for Failing {
            type Error = ();
            fn write(&mut self, _: usize, _: usize, _: &[u8]) -> Result<(), ()> {
                self.0 += 1;
                Err(())
            }
        }

        let old = DisplayState::cleared();
        let mut new = old;
        new.fill_row(0, b'#');
        new.fill_row(1, b'#');
        let mut writer = Failing(0);
        assert_eq!(diff_and_apply(&old, &new, &mut writer), Err(()));
        assert_eq!(writer.0, 1);
    }

    #[test]
    fn test_put_truncates_without_wrapping() {
        let mut s = DisplayState::cleared();
        assert_eq!(s.put(17, 0, b"abcdef"), 3);
        assert_eq!(&s.row(0).unwrap()[17..], b"abc");
        assert_eq!(s.row(1).unwrap(), &[SPACE; COLUMNS]);
        assert_eq!(s.put(20, 0, b"x"), 0);
        assert_eq!(s.put(0, 4, b"x"), 0);
    }

    #[test]
    fn test_put_wrapped() {
        let mut s = DisplayState::cleared();
        let text = [b'x'; 30];
        assert_eq!(s.put_wrapped(15, 2, &text), 25);
        assert_eq!(&s.row(2).unwrap()[15..], b"xxxxx");
        assert_eq!(s.row(3).unwrap(), &[b'x'; COLUMNS]);
    }

    #[test]
    fn test_get_set() {
        let mut s = DisplayState::cleared();
        assert!(s.set(4, 2, 0x01));
        assert_eq!(s.get(4, 2), Some(0x01));
        assert!(!s.set(20, 0, 0x01));
        assert_eq!(s.get(0, 4), None);
        s.clear_row(2);
        assert_eq!(s.get(4, 2), Some(SPACE));
    }

    #[test]
    fn test_ellipsize() {
        assert_eq!(ellipsize(b"short", b'~', 10), b"short".to_vec());
        assert_eq!(ellipsize(b"much too long", b'~', 5), b"much~".to_vec());
        assert_eq!(ellipsize(b"abc", b'~', 0), Vec::<u8>::new());
    }

    proptest! {
        #[test]
        fn prop_diff_covers_exactly_changed_span(
            base in proptest::array::uniform20(any::<u8>()),
            row in 0..ROWS,
            a in 0..COLUMNS,
            len in 1..=COLUMNS,
            fill in proptest::array::uniform20(any::<u8>()),
        ) {
            let b = (a + len).min(COLUMNS);
            let old = DisplayState::from_rows([base; ROWS]);
            let mut new = old;
            new.put(a, row, &fill[..b - a]);

            let writes = diff(&old, &new);
            let span = changed_span(&old.rows()[row], &new.rows()[row]);
            match span {
                None => prop_assert!(writes.is_empty()),
                Some((start, end)) => {
                    prop_assert_eq!(writes.len(), 1);
                    let w = &writes[0];
                    prop_assert_eq!(w.row, row);
                    prop_assert!(a <= start && end <= b);
                    prop_assert_eq!(w.col, start);
                    prop_assert_eq!(&w.data[..], &new.rows()[row][start..end]);
                    prop_assert_ne!(old.rows()[row][start], new.rows()[row][start]);
                    prop_assert_ne!(old.rows()[row][end - 1], new.rows()[row][end - 1]);
                }
            }
        }

        #[test]
        fn prop_diff_is_idempotent(cells in proptest::array::uniform4(proptest::array::uniform20(any::<u8>()))) {
            let s = DisplayState::from_rows(cells);
            prop_assert!(diff(&s, &s).is_empty());
        }
    }
}
