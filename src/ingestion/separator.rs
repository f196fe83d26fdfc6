//! Field delimiter sniffing.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Serialize;

use crate::error::{LoadError, LoadResult};

/// Number of leading lines inspected when sniffing the delimiter.
pub const DETECTION_LINES: usize = 5;

const CHUNK_SIZE: usize = 64 * 1024;

/// Field delimiter of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    /// `,` (default when nothing else is found).
    #[default]
    Comma,
    /// `;`
    Semicolon,
    /// `\t`
    Tab,
}

impl Separator {
    /// The delimiter byte handed to the CSV reader.
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Comma => b',',
            Self::Semicolon => b';',
            Self::Tab => b'\t',
        }
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Comma => "comma",
            Self::Semicolon => "semicolon",
            Self::Tab => "tab",
        };
        f.write_str(name)
    }
}

/// Sniff the delimiter of a file from its first [`DETECTION_LINES`] lines.
///
/// The file is read in chunks until the buffered text splits into at least
/// [`DETECTION_LINES`] newline-separated segments or the file ends, so a little more than five
/// lines may be buffered. See [`separator_for_text`] for the decision rule.
pub fn detect_separator(path: impl AsRef<Path>) -> LoadResult<Separator> {
    let path = path.as_ref();
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    detect_separator_from_reader(file).map_err(io_err)
}

/// Sniff the delimiter from any reader. See [`detect_separator`].
pub fn detect_separator_from_reader<R: Read>(mut reader: R) -> io::Result<Separator> {
    let mut buffered: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        buffered.extend_from_slice(&chunk[..n]);

        let segments = buffered
            .split(|b| *b == b'\n')
            .take(DETECTION_LINES)
            .count();
        if segments >= DETECTION_LINES {
            break;
        }
    }

    Ok(separator_for_text(&String::from_utf8_lossy(&buffered)))
}

/// Decide the delimiter from the first [`DETECTION_LINES`] lines of `text`.
///
/// Lines are checked in order. A line containing `;` selects [`Separator::Semicolon`]; a line
/// containing a tab then selects [`Separator::Tab`], so tab wins within a single line and the
/// last line carrying either character wins overall. Falls back to [`Separator::Comma`].
pub fn separator_for_text(text: &str) -> Separator {
    let mut detected = Separator::Comma;
    for line in text.split('\n').take(DETECTION_LINES) {
        if line.contains(';') {
            detected = Separator::Semicolon;
        }
        if line.contains('\t') {
            detected = Separator::Tab;
        }
    }
    detected
}
