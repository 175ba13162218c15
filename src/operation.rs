use std::path::PathBuf;

use crate::cyacd::Header;
use crate::image::ArrayLayout;

#[derive(Debug, Clone)]
pub enum ConversionEvent {
    HeaderDecoded {
        header: Header,
    },
    /// The header names a checksum type that record verification does not implement.
    ChecksumTypeUnsupported {
        header: Header,
    },
    DuplicateRow {
        line_no: usize,
        array_id: u8,
        row_id: u16,
    },
    MemoryAssembled {
        arrays: usize,
        records: usize,
        /// Shape of the first array, used for the one-line summary.
        first: Option<ArrayLayout>,
    },
    ArrayStart {
        array_id: u8,
        layout: ArrayLayout,
        present_rows: String,
    },
    ArrayWritten {
        array_id: u8,
        bytes: usize,
    },
    Done {
        output: PathBuf,
        bytes: usize,
    },
}
