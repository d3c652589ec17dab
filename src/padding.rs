//! Padding of dataset columns to a whole number of batches.
//!
//! Padding repeats the column's own leading entries, never synthetic rows, so every batch
//! consists of observed samples. When the column is shorter than the number of rows
//! required, the prefix wraps around and repeats again.

use log::warn;

/// Number of rows that must be appended to `len` rows to reach a multiple of `batch_size`.
///
/// # Panics
///
/// Panics if `batch_size` is zero.
#[must_use]
pub fn pad_count(len: usize, batch_size: usize) -> usize {
    assert!(batch_size > 0, "batch_size must be greater than zero");
    match len % batch_size {
        0 => 0,
        remainder => batch_size - remainder,
    }
}

/// Appends `count` rows taken cyclically from the start of `column`.
///
/// An empty column is left untouched.
pub fn extend_cyclic<T: Clone>(column: &mut Vec<T>, count: usize) {
    let len = column.len();
    if count == 0 || len == 0 {
        return;
    }
    if count > len {
        warn!("padding {count} rows onto a column of {len}; the prefix repeats");
    }
    column.reserve(count);
    for idx in 0..count {
        let value = column[idx % len].clone();
        column.push(value);
    }
}

/// Pads `column` to the smallest multiple of `batch_size` not below its length.
///
/// # Panics
///
/// Panics if `batch_size` is zero.
/// [`Split::pad_to_batch_size`](crate::dataset::Split::pad_to_batch_size) reports that case
/// as an error instead.
#[must_use]
pub fn pad_to_batch_size<T: Clone>(mut column: Vec<T>, batch_size: usize) -> Vec<T> {
    let count = pad_count(column.len(), batch_size);
    extend_cyclic(&mut column, count);
    column
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_prefix_for_partial_batch() {
        assert_eq!(pad_to_batch_size(vec![1, 2, 3, 4, 5], 3), vec![1, 2, 3, 4, 5, 1]);
    }

    #[test]
    fn full_batches_are_unchanged() {
        let column = vec![1, 2, 3, 4, 5, 6];
        assert_eq!(pad_to_batch_size(column.clone(), 3), column);
        let padded = pad_to_batch_size(vec![7, 8, 9, 10], 3);
        assert_eq!(pad_to_batch_size(padded.clone(), 3), padded);
    }

    #[test]
    fn original_rows_remain_a_prefix() {
        for len in 0..20usize {
            let column: Vec<usize> = (0..len).collect();
            let padded = pad_to_batch_size(column.clone(), 8);
            assert_eq!(padded.len(), len.div_ceil(8) * 8);
            assert_eq!(&padded[..len], column.as_slice());
        }
    }

    #[test]
    fn short_columns_wrap_around() {
        assert_eq!(
            pad_to_batch_size(vec!['a', 'b'], 5),
            vec!['a', 'b', 'a', 'b', 'a']
        );
    }

    #[test]
    fn empty_column_stays_empty() {
        assert!(pad_to_batch_size(Vec::<u8>::new(), 256).is_empty());
        assert_eq!(pad_count(0, 256), 0);
    }
}
