//! Row-range chunking for [`crate::types::DataSet`].

use std::ops::Range;

/// Split `total_rows` into contiguous ranges of at most `chunk_size` rows.
///
/// Produces `ceil(total_rows / chunk_size)` ranges; zero rows produce none. Callers must reject a
/// `chunk_size` of zero before calling (it yields no ranges here).
pub fn chunk_ranges(total_rows: usize, chunk_size: usize) -> Vec<Range<usize>> {
    if chunk_size == 0 {
        return Vec::new();
    }

    (0..total_rows)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(total_rows))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::chunk_ranges;

    #[test]
    fn chunk_count_is_ceiling_of_rows_over_size() {
        for (rows, size) in [(0, 3), (1, 3), (3, 3), (4, 3), (10, 1), (7, 30_000)] {
            let ranges = chunk_ranges(rows, size);
            assert_eq!(ranges.len(), rows.div_ceil(size), "rows={rows} size={size}");
            assert!(ranges.iter().all(|r| r.len() <= size));
        }
    }

    #[test]
    fn ranges_are_contiguous_and_cover_all_rows() {
        let ranges = chunk_ranges(10, 4);
        assert_eq!(ranges, vec![0..4, 4..8, 8..10]);
    }

    #[test]
    fn zero_chunk_size_yields_nothing() {
        assert!(chunk_ranges(5, 0).is_empty());
    }
}
