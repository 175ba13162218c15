use std::io::{self, Write};

use serde::Serialize;
use thiserror::Error;

use crate::memory::FlashArray;

/// Byte written for every row the update file never touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillByte {
    #[default]
    Zero,
    Ones,
}

impl FillByte {
    /// Expands a single bit value (0 or 1) to a whole byte.
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            FillByte::Ones
        } else {
            FillByte::Zero
        }
    }

    pub fn value(self) -> u8 {
        match self {
            FillByte::Zero => 0x00,
            FillByte::Ones => 0xFF,
        }
    }
}

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("flash array has no rows")]
    EmptyArray,

    #[error("row {row_id} is {actual} bytes wide, expected {expected}")]
    InconsistentRowWidth {
        row_id: u16,
        expected: usize,
        actual: usize,
    },

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

/// Shape of one array's image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArrayLayout {
    pub row_width: usize,
    pub row_count: usize,
    pub present_rows: usize,
}

impl ArrayLayout {
    pub fn image_len(&self) -> usize {
        self.row_width * self.row_count
    }

    pub fn missing_rows(&self) -> usize {
        self.row_count - self.present_rows
    }
}

/// Checks that the array has rows and that every row has the same width.
pub fn layout(array: &FlashArray) -> Result<ArrayLayout, ImageError> {
    let (row_width, row_count) = match (array.row_width(), array.max_row()) {
        (Some(w), Some(max)) => (w, max as usize + 1),
        _ => return Err(ImageError::EmptyArray),
    };

    if let Some((&row_id, data)) = array.rows().iter().find(|(_, d)| d.len() != row_width) {
        return Err(ImageError::InconsistentRowWidth {
            row_id,
            expected: row_width,
            actual: data.len(),
        });
    }

    Ok(ArrayLayout {
        row_width,
        row_count,
        present_rows: array.len(),
    })
}

/// Writes rows `0..=max_row` back to back, filling absent rows with `fill`.
/// Returns the number of bytes written.
pub fn write_array<W: Write>(
    array: &FlashArray,
    sink: &mut W,
    fill: FillByte,
) -> Result<usize, ImageError> {
    let layout = layout(array)?;
    Ok(write_with_layout(array, &layout, sink, fill)?)
}

/// Like [`write_array`], for a layout already returned by [`layout`] for `array`.
pub fn write_with_layout<W: Write>(
    array: &FlashArray,
    layout: &ArrayLayout,
    sink: &mut W,
    fill: FillByte,
) -> io::Result<usize> {
    let filler = vec![fill.value(); layout.row_width];

    for row_id in 0..layout.row_count {
        // row_count <= u16::MAX + 1, so every index fits
        match array.get(row_id as u16) {
            Some(data) => sink.write_all(data)?,
            None => sink.write_all(&filler)?,
        }
    }

    Ok(layout.image_len())
}
