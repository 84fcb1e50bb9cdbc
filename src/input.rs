//! Address sources: `.csv` or `.xlsx` with an `email` column, `.txt` with
//! one address per line, or any line reader (stdin).

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use calamine::{Reader, Xlsx, XlsxError};
use thiserror::Error;

pub const EMAIL_COLUMN: &str = "email";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("unsupported input format: {}", .0.display())]
    Unsupported(PathBuf),
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed CSV in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("malformed spreadsheet {}: {source}", .path.display())]
    Xlsx {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
    #[error("{} has no 'email' column", .0.display())]
    MissingColumn(PathBuf),
    #[error("cannot read input lines: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Txt,
    Xlsx,
}

impl InputFormat {
    /// Picks the reader from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, InputError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("txt") => Ok(Self::Txt),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(InputError::Unsupported(path.to_path_buf())),
        }
    }
}

/// Loads every address from `path`. The format is checked before the file is
/// opened, so an unsupported extension fails even when the file is missing.
pub fn read_addresses(path: &Path) -> Result<Vec<String>, InputError> {
    let format = InputFormat::from_path(path)?;
    let file = File::open(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let addresses = match format {
        InputFormat::Txt => read_lines(BufReader::new(file)).map_err(|err| match err {
            InputError::Io(source) => InputError::Read {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?,
        InputFormat::Csv => read_csv(file, path)?,
        InputFormat::Xlsx => read_xlsx(BufReader::new(file), path)?,
    };
    tracing::debug!(path = %path.display(), count = addresses.len(), "addresses loaded");
    Ok(addresses)
}

/// One address per line, trimmed. Blank lines stay as empty addresses so
/// row N of the report matches line N of the input.
pub fn read_lines<R: BufRead>(reader: R) -> Result<Vec<String>, InputError> {
    let mut out = Vec::new();
    for line in reader.lines() {
        out.push(line?.trim().to_string());
    }
    Ok(out)
}

fn read_csv<R: Read>(reader: R, path: &Path) -> Result<Vec<String>, InputError> {
    let csv_error = |source: csv::Error| InputError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let column = rdr
        .headers()
        .map_err(csv_error)?
        .iter()
        .position(|h| h.trim().trim_start_matches('\u{feff}') == EMAIL_COLUMN)
        .ok_or_else(|| InputError::MissingColumn(path.to_path_buf()))?;

    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_error)?;
        // short rows count as an empty cell
        out.push(record.get(column).unwrap_or_default().trim().to_string());
    }
    Ok(out)
}

/// First worksheet only; the header is the first row of its used range.
fn read_xlsx<R: Read + Seek>(reader: R, path: &Path) -> Result<Vec<String>, InputError> {
    let xlsx_error = |source: XlsxError| InputError::Xlsx {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = Xlsx::new(reader).map_err(xlsx_error)?;
    let Some(sheet) = workbook.worksheet_range_at(0) else {
        return Err(InputError::MissingColumn(path.to_path_buf()));
    };
    let sheet = sheet.map_err(xlsx_error)?;

    let mut rows = sheet.rows();
    let column = rows
        .next()
        .and_then(|header| {
            header
                .iter()
                .position(|cell| cell.to_string().trim() == EMAIL_COLUMN)
        })
        .ok_or_else(|| InputError::MissingColumn(path.to_path_buf()))?;

    Ok(rows
        .map(|row| {
            row.get(column)
                .map(|cell| cell.to_string().trim().to_string())
                .unwrap_or_default()
        })
        .collect())
}
