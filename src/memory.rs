use std::collections::BTreeMap;

use crate::cyacd::FlashRecord;

/// Rows of one flash array, keyed by row id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashArray {
    rows: BTreeMap<u16, Vec<u8>>,
}

impl FlashArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` at `row_id`, returning the row it replaced.
    pub fn insert(&mut self, row_id: u16, data: Vec<u8>) -> Option<Vec<u8>> {
        self.rows.insert(row_id, data)
    }

    pub fn get(&self, row_id: u16) -> Option<&[u8]> {
        self.rows.get(&row_id).map(Vec::as_slice)
    }

    pub fn rows(&self) -> &BTreeMap<u16, Vec<u8>> {
        &self.rows
    }

    /// Row ids present in ascending order.
    pub fn present_rows(&self) -> impl Iterator<Item = u16> + '_ {
        self.rows.keys().copied()
    }

    pub fn max_row(&self) -> Option<u16> {
        self.rows.keys().next_back().copied()
    }

    /// Width of the lowest present row.
    pub fn row_width(&self) -> Option<usize> {
        self.rows.values().next().map(Vec::len)
    }

    /// Number of rows the image of this array spans, gaps included.
    pub fn row_count(&self) -> usize {
        self.max_row().map_or(0, |max| max as usize + 1)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// All flash arrays, in the order their ids were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashMemory {
    arrays: Vec<(u8, FlashArray)>,
}

impl FlashMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins: returns the previous data when the row was already present.
    pub fn insert(&mut self, record: FlashRecord) -> Option<Vec<u8>> {
        let FlashRecord {
            array_id,
            row_id,
            data,
        } = record;
        self.array_mut(array_id).insert(row_id, data)
    }

    fn array_mut(&mut self, array_id: u8) -> &mut FlashArray {
        let idx = match self.arrays.iter().position(|(id, _)| *id == array_id) {
            Some(idx) => idx,
            None => {
                self.arrays.push((array_id, FlashArray::new()));
                self.arrays.len() - 1
            }
        };
        &mut self.arrays[idx].1
    }

    pub fn array(&self, array_id: u8) -> Option<&FlashArray> {
        self.arrays
            .iter()
            .find(|(id, _)| *id == array_id)
            .map(|(_, a)| a)
    }

    pub fn array_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.arrays.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &FlashArray)> {
        self.arrays.iter().map(|(id, a)| (*id, a))
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.arrays.iter().map(|(_, a)| a.len()).sum()
    }
}

/// Formats row ids as ascending runs, e.g. `0-2, 5, 7-9`.
pub fn compact_rows_string<I>(row_ids: I) -> String
where
    I: IntoIterator<Item = u16>,
{
    let mut ids: Vec<u16> = row_ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    let mut runs: Vec<String> = Vec::new();
    let mut iter = ids.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };

    let (mut start, mut end) = (first, first);
    for id in iter {
        if id == end + 1 {
            end = id;
            continue;
        }
        runs.push(format_run(start, end));
        start = id;
        end = id;
    }
    runs.push(format_run(start, end));

    runs.join(", ")
}

fn format_run(start: u16, end: u16) -> String {
    if start == end {
        format!("{start}")
    } else {
        format!("{start}-{end}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(array_id: u8, row_id: u16, data: &[u8]) -> FlashRecord {
        FlashRecord {
            array_id,
            row_id,
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_compact_rows_string() {
        assert_eq!(compact_rows_string([0, 1, 2, 5, 7, 8, 9]), "0-2, 5, 7-9");
        assert_eq!(compact_rows_string([9, 8, 7, 5, 2, 1, 0]), "0-2, 5, 7-9");
        assert_eq!(compact_rows_string([4]), "4");
        assert_eq!(compact_rows_string([0, 2, 4]), "0, 2, 4");
        assert_eq!(compact_rows_string([u16::MAX - 1, u16::MAX]), "65534-65535");
        assert_eq!(compact_rows_string(std::iter::empty()), "");
    }

    #[test]
    fn test_arrays_keep_first_seen_order() {
        let mut mem = FlashMemory::new();
        mem.insert(rec(3, 0, &[1]));
        mem.insert(rec(0, 0, &[2]));
        mem.insert(rec(3, 1, &[3]));
        mem.insert(rec(1, 0, &[4]));

        assert_eq!(mem.array_ids().collect::<Vec<_>>(), vec![3, 0, 1]);
        assert_eq!(mem.len(), 3);
        assert_eq!(mem.total_rows(), 4);
        assert_eq!(mem.array(3).map(FlashArray::len), Some(2));
        assert!(mem.array(2).is_none());
    }

    #[test]
    fn test_duplicate_row_last_write_wins() {
        let mut mem = FlashMemory::new();
        assert_eq!(mem.insert(rec(0, 4, &[0xAA, 0xAA])), None);
        assert_eq!(
            mem.insert(rec(0, 4, &[0xBB, 0xBB])),
            Some(vec![0xAA, 0xAA])
        );

        let array = mem.array(0).unwrap();
        assert_eq!(array.get(4), Some(&[0xBB, 0xBB][..]));
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn test_array_queries() {
        let mut array = FlashArray::new();
        assert!(array.is_empty());
        assert_eq!(array.max_row(), None);
        assert_eq!(array.row_count(), 0);

        for row in [7u16, 0, 2] {
            array.insert(row, vec![row as u8; 4]);
        }
        assert_eq!(array.present_rows().collect::<Vec<_>>(), vec![0, 2, 7]);
        assert_eq!(array.max_row(), Some(7));
        assert_eq!(array.row_count(), 8);
        assert_eq!(array.row_width(), Some(4));
    }
}
