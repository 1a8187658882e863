use memchr::memmem;
use std::io::{BufRead, BufReader, Read};

use crate::error::ImportError;

pub const SMALL_BUFFER_SIZE: usize = 64 * 1024;
pub const MEDIUM_BUFFER_SIZE: usize = 256 * 1024;

/// Substring identifying a row-insertion line in a dump file.
pub const INSERT_MARKER: &[u8] = b"INSERT INTO";

/// Literal delimiter between an INSERT statement's column list and its
/// value tuple in mysqldump output. The final byte is the parenthesis that
/// opens the tuple.
pub const VALUES_DELIMITER: &[u8] = b"`) VALUES (";

/// Streams lines from a reader without loading the whole file.
///
/// Lines are returned as raw bytes with the `\n` terminator stripped; a
/// trailing `\r` is stripped as well so CRLF dumps parse the same as LF
/// dumps. A final line without a terminator is still returned.
pub struct LineReader<R: Read> {
    reader: BufReader<R>,
    line_buffer: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(SMALL_BUFFER_SIZE, reader)
    }

    pub fn with_capacity(buffer_size: usize, reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(buffer_size, reader),
            line_buffer: Vec::with_capacity(1024),
        }
    }

    /// Read the next line, or `None` at end of input.
    ///
    /// The returned slice is valid until the next call.
    pub fn next_line(&mut self) -> std::io::Result<Option<&[u8]>> {
        self.line_buffer.clear();

        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                if self.line_buffer.is_empty() {
                    return Ok(None);
                }
                break;
            }

            match memchr::memchr(b'\n', buf) {
                Some(pos) => {
                    self.line_buffer.extend_from_slice(&buf[..pos]);
                    self.reader.consume(pos + 1);
                    break;
                }
                None => {
                    self.line_buffer.extend_from_slice(buf);
                    let len = buf.len();
                    self.reader.consume(len);
                }
            }
        }

        if self.line_buffer.last() == Some(&b'\r') {
            self.line_buffer.pop();
        }

        Ok(Some(&self.line_buffer))
    }
}

/// A single-row INSERT statement split at the column-list delimiter.
///
/// `header` is everything before the delimiter match and ends inside the
/// column list, without the closing backtick. `values` is the parenthesized
/// value tuple, including both parentheses, without the `;` terminator.
/// Rebuilding a full statement is `header + "`) VALUES " + values`.
#[derive(Debug, PartialEq, Eq)]
pub struct InsertLine<'a> {
    pub header: &'a [u8],
    pub values: &'a [u8],
}

/// Whether a line carries a row-insertion statement.
pub fn is_insert_line(line: &[u8]) -> bool {
    memmem::find(line, INSERT_MARKER).is_some()
}

/// Split an INSERT line into header and value tuple.
///
/// Fails with `MalformedInsertLine` when the delimiter or the trailing `;`
/// terminator is missing, rather than slicing at a fixed offset and
/// producing corrupt SQL.
pub fn split_insert_line(line: &[u8]) -> Result<InsertLine<'_>, ImportError> {
    let pos = memmem::find(line, VALUES_DELIMITER)
        .ok_or_else(|| ImportError::MalformedInsertLine(line_preview(line)))?;

    let header = &line[..pos];
    // Keep the delimiter's final byte so the tuple starts at its opening
    // parenthesis.
    let rest = trim_ascii_end(&line[pos + VALUES_DELIMITER.len() - 1..]);
    let values = rest
        .strip_suffix(b";")
        .ok_or_else(|| ImportError::MalformedInsertLine(line_preview(line)))?;

    Ok(InsertLine { header, values })
}

pub fn determine_buffer_size(file_size: u64) -> usize {
    if file_size > 1024 * 1024 * 1024 {
        MEDIUM_BUFFER_SIZE
    } else {
        SMALL_BUFFER_SIZE
    }
}

/// Lossy, truncated rendering of a line for error messages.
pub fn line_preview(line: &[u8]) -> String {
    const MAX: usize = 120;
    let text = String::from_utf8_lossy(line);
    if text.len() > MAX {
        let mut cut = MAX;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &text[..cut])
    } else {
        text.into_owned()
    }
}

#[inline]
fn trim_ascii_end(data: &[u8]) -> &[u8] {
    let end = data
        .iter()
        .rposition(|&b| !matches!(b, b' ' | b'\t' | b'\r'))
        .map_or(0, |p| p + 1);
    &data[..end]
}
