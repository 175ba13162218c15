use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use same_file::is_same_file;
use tempfile::Builder;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    cyacd::{self, ChecksumType, Header, HeaderError, RecordError},
    image::{self, ArrayLayout, FillByte, ImageError},
    memory::{compact_rows_string, FlashMemory},
    operation::ConversionEvent,
};

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Output path (None = `<input>.bin`).
    pub output: Option<PathBuf>,

    /// Value of rows absent from the input.
    pub fill: FillByte,

    /// Fail instead of letting a later record overwrite an earlier row.
    pub deny_duplicate_rows: bool,

    /// Fail when the header declares a checksum type records are not verified with.
    pub strict_checksum_type: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConvertErrorKind {
    MalformedHeader,
    MalformedRecord,
    ChecksumMismatch,
    SameInputOutputFile,
    EmptyArray,
    InvalidLayout,
    Io,
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failed at line {line_no}: {source}")]
    ReadLine {
        line_no: usize,
        #[source]
        source: io::Error,
    },

    #[error("input is not a text CYACD file (invalid UTF-8 at line {line_no})")]
    NotText { line_no: usize },

    #[error("input is empty (missing header line)")]
    MissingHeader,

    #[error("malformed header {line:?}: {source}")]
    MalformedHeader {
        line: String,
        #[source]
        source: HeaderError,
    },

    #[error("malformed record at line {line_no} {line:?}: {source}")]
    MalformedRecord {
        line_no: usize,
        line: String,
        #[source]
        source: RecordError,
    },

    #[error("line {line_no}: {source}")]
    ChecksumMismatch {
        line_no: usize,
        line: String,
        #[source]
        source: RecordError,
    },

    #[error("checksum type {checksum_type} is not supported for record verification")]
    UnsupportedChecksumType { checksum_type: ChecksumType },

    #[error("duplicate row at line {line_no}: array {array_id} row {row_id} already present")]
    DuplicateRow {
        line_no: usize,
        array_id: u8,
        row_id: u16,
    },

    #[error("input contains no flash rows")]
    NoRecords,

    #[error("array {array_id}: {source}")]
    Image {
        array_id: u8,
        #[source]
        source: ImageError,
    },

    #[error("input and output are the same file: {path}")]
    SameInputOutputFile { path: PathBuf },

    #[error("unable to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConvertError {
    pub fn kind(&self) -> ConvertErrorKind {
        match self {
            ConvertError::Read { .. }
            | ConvertError::ReadLine { .. }
            | ConvertError::Write { .. } => ConvertErrorKind::Io,
            ConvertError::MissingHeader | ConvertError::MalformedHeader { .. } => {
                ConvertErrorKind::MalformedHeader
            }
            ConvertError::NotText { .. } | ConvertError::MalformedRecord { .. } => {
                ConvertErrorKind::MalformedRecord
            }
            ConvertError::ChecksumMismatch { .. } => ConvertErrorKind::ChecksumMismatch,
            ConvertError::UnsupportedChecksumType { .. }
            | ConvertError::DuplicateRow { .. }
            | ConvertError::NoRecords => ConvertErrorKind::InvalidLayout,
            ConvertError::Image { source, .. } => match source {
                ImageError::EmptyArray => ConvertErrorKind::EmptyArray,
                ImageError::InconsistentRowWidth { .. } => ConvertErrorKind::InvalidLayout,
                ImageError::Io(_) => ConvertErrorKind::Io,
            },
            ConvertError::SameInputOutputFile { .. } => ConvertErrorKind::SameInputOutputFile,
        }
    }
}

/// A fully decoded update file.
#[derive(Debug, Clone)]
pub struct Cyacd {
    pub header: Header,
    pub memory: FlashMemory,
    /// Number of row records decoded, duplicates included.
    pub records: usize,
}

pub struct ConversionPlan {
    pub header: Header,
    pub output: PathBuf,
    pub arrays: Vec<(u8, ArrayLayout)>,
    pub records: usize,
}

impl ConversionPlan {
    pub fn image_len(&self) -> usize {
        self.arrays.iter().map(|(_, l)| l.image_len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub header: Header,
    pub output: PathBuf,
    pub arrays: usize,
    pub bytes: usize,
}

/// `<input>.bin`, keeping the original extension.
pub fn default_output_path(input: &Path) -> PathBuf {
    let mut s = input.as_os_str().to_owned();
    s.push(".bin");
    PathBuf::from(s)
}

/// Decodes the header line and every record line from `reader`.
pub fn load_cyacd<R, F>(
    reader: R,
    opts: &ConvertOptions,
    mut on_event: F,
) -> Result<Cyacd, ConvertError>
where
    R: BufRead,
    F: FnMut(ConversionEvent),
{
    let mut lines = reader.lines().enumerate();

    let header_line = match lines.next() {
        Some((_, line)) => read_line(line, 1)?,
        None => return Err(ConvertError::MissingHeader),
    };
    let header_line = header_line.trim();
    let header =
        cyacd::decode_header(header_line).map_err(|e| ConvertError::MalformedHeader {
            line: header_line.to_string(),
            source: e,
        })?;
    on_event(ConversionEvent::HeaderDecoded { header });

    if !header.checksum_type.is_supported() {
        if opts.strict_checksum_type {
            return Err(ConvertError::UnsupportedChecksumType {
                checksum_type: header.checksum_type,
            });
        }
        warn!(
            checksum_type = %header.checksum_type,
            "header checksum type not implemented; verifying rows with 2's complement summation"
        );
        on_event(ConversionEvent::ChecksumTypeUnsupported { header });
    }

    let mut memory = FlashMemory::new();
    let mut records = 0usize;

    for (line_idx, line) in lines {
        let line_no = line_idx + 1;
        let line = read_line(line, line_no)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let hex = line.trim_start_matches(':').trim();
        let record = cyacd::decode_record(hex).map_err(|e| match e {
            RecordError::ChecksumMismatch { .. } => ConvertError::ChecksumMismatch {
                line_no,
                line: line.to_string(),
                source: e,
            },
            _ => ConvertError::MalformedRecord {
                line_no,
                line: line.to_string(),
                source: e,
            },
        })?;
        debug!(
            line_no,
            array_id = record.array_id,
            row_id = record.row_id,
            len = record.data.len(),
            "row decoded"
        );

        let (array_id, row_id) = (record.array_id, record.row_id);
        if memory.insert(record).is_some() {
            if opts.deny_duplicate_rows {
                return Err(ConvertError::DuplicateRow {
                    line_no,
                    array_id,
                    row_id,
                });
            }
            warn!(line_no, array_id, row_id, "duplicate row overwrites earlier record");
            on_event(ConversionEvent::DuplicateRow {
                line_no,
                array_id,
                row_id,
            });
        }
        records += 1;
    }

    if memory.is_empty() {
        return Err(ConvertError::NoRecords);
    }

    let first = memory
        .iter()
        .next()
        .and_then(|(_, array)| image::layout(array).ok());
    on_event(ConversionEvent::MemoryAssembled {
        arrays: memory.len(),
        records,
        first,
    });

    Ok(Cyacd {
        header,
        memory,
        records,
    })
}

pub fn load_cyacd_file<F>(
    path: &Path,
    opts: &ConvertOptions,
    on_event: F,
) -> Result<Cyacd, ConvertError>
where
    F: FnMut(ConversionEvent),
{
    let f = File::open(path).map_err(|e| ConvertError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    load_cyacd(BufReader::new(f), opts, on_event)
}

/// Validates every array's layout without materializing any bytes.
pub fn array_layouts(memory: &FlashMemory) -> Result<Vec<(u8, ArrayLayout)>, ConvertError> {
    memory
        .iter()
        .map(|(array_id, array)| {
            image::layout(array)
                .map(|l| (array_id, l))
                .map_err(|e| ConvertError::Image {
                    array_id,
                    source: e,
                })
        })
        .collect()
}

/// Concatenates the image of every array, in first-seen order.
pub fn render_image<F>(
    memory: &FlashMemory,
    fill: FillByte,
    mut on_event: F,
) -> Result<Vec<u8>, ConvertError>
where
    F: FnMut(ConversionEvent),
{
    let layouts = array_layouts(memory)?;
    let mut out = Vec::with_capacity(layouts.iter().map(|(_, l)| l.image_len()).sum());

    for ((array_id, layout), (_, array)) in layouts.into_iter().zip(memory.iter()) {
        on_event(ConversionEvent::ArrayStart {
            array_id,
            layout,
            present_rows: compact_rows_string(array.present_rows()),
        });

        let bytes = image::write_with_layout(array, &layout, &mut out, fill).map_err(|e| {
            ConvertError::Image {
                array_id,
                source: ImageError::Io(e),
            }
        })?;
        on_event(ConversionEvent::ArrayWritten { array_id, bytes });
    }

    Ok(out)
}

/// Decodes and validates `input` without creating the output file.
pub fn plan_conversion<F>(
    input: &Path,
    opts: &ConvertOptions,
    on_event: F,
) -> Result<ConversionPlan, ConvertError>
where
    F: FnMut(ConversionEvent),
{
    let output = resolve_output(input, opts)?;
    let cyacd = load_cyacd_file(input, opts, on_event)?;
    let arrays = array_layouts(&cyacd.memory)?;

    Ok(ConversionPlan {
        header: cyacd.header,
        output,
        arrays,
        records: cyacd.records,
    })
}

/// Converts `input` into a flat binary image.
///
/// Nothing is written unless the whole input decodes; the image lands in a
/// temporary file next to the output and is renamed into place.
#[instrument(skip_all, fields(input = %input.display()))]
pub fn convert_file<F>(
    input: &Path,
    opts: &ConvertOptions,
    mut on_event: F,
) -> Result<ConversionReport, ConvertError>
where
    F: FnMut(ConversionEvent),
{
    let output = resolve_output(input, opts)?;
    let cyacd = load_cyacd_file(input, opts, &mut on_event)?;
    let image = render_image(&cyacd.memory, opts.fill, &mut on_event)?;

    write_atomically(&output, &image)?;
    info!(output = %output.display(), bytes = image.len(), "image written");

    let output = fs::canonicalize(&output).unwrap_or(output);
    on_event(ConversionEvent::Done {
        output: output.clone(),
        bytes: image.len(),
    });

    Ok(ConversionReport {
        header: cyacd.header,
        output,
        arrays: cyacd.memory.len(),
        bytes: image.len(),
    })
}

fn resolve_output(input: &Path, opts: &ConvertOptions) -> Result<PathBuf, ConvertError> {
    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(input));
    ensure_distinct(input, &output)?;
    Ok(output)
}

fn ensure_distinct(input: &Path, output: &Path) -> Result<(), ConvertError> {
    fs::metadata(input).map_err(|e| ConvertError::Read {
        path: input.to_path_buf(),
        source: e,
    })?;
    // A missing output cannot alias the input. Hard links and symlinks compare by file identity.
    if output.exists() && is_same_file(input, output).unwrap_or_default() {
        return Err(ConvertError::SameInputOutputFile {
            path: output.to_path_buf(),
        });
    }
    Ok(())
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let write_err = |e: io::Error| ConvertError::Write {
        path: path.to_path_buf(),
        source: e,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    #[allow(unused_mut)]
    let mut builder = Builder::new();
    // Subject to the umask, like a plain create.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(dir).map_err(write_err)?;
    if let Ok(existing) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(write_err)?;
    }
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

fn read_line(line: io::Result<String>, line_no: usize) -> Result<String, ConvertError> {
    match line {
        Ok(s) => Ok(s),
        Err(e) if e.kind() == io::ErrorKind::InvalidData => Err(ConvertError::NotText { line_no }),
        Err(e) => Err(ConvertError::ReadLine {
            line_no,
            source: e,
        }),
    }
}
