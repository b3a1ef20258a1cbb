//! Shared winnow-based parsing utilities used by the MOD parser.

use thiserror::Error;
use winnow::Parser;
use winnow::binary::le_f32;
use winnow::combinator::repeat;
use winnow::error::ContextError;
use winnow::token::take;

/// Common result type for winnow parsers.
pub type WResult<T> = Result<T, winnow::error::ErrMode<ContextError>>;

/// Errors that can occur while parsing a MOD file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("bad magic {found:02X?}, expected \"MOD\\0\"")]
    BadMagic { found: [u8; 4] },
    #[error("unsupported MOD version {version}, only 156 is supported")]
    UnsupportedVersion { version: u8 },
    #[error("section '{section}' at 0x{offset:X} is truncated: {detail}")]
    Truncated {
        section: &'static str,
        offset: usize,
        detail: String,
    },
}

/// Run `parser` over `input`, turning a winnow failure into a [`ParseError`]
/// that names the section and the absolute offset it started at.
pub fn parse_section<'a, T>(
    file_data: &'a [u8],
    input: &mut &'a [u8],
    section: &'static str,
    parser: impl FnOnce(&mut &'a [u8]) -> WResult<T>,
) -> Result<T, ParseError> {
    let offset = file_data.len() - input.len();
    parser(input).map_err(|e| ParseError::Truncated {
        section,
        offset,
        detail: format!("{e}"),
    })
}

/// Parse `N` consecutive little-endian floats.
pub fn parse_f32_array<const N: usize>(input: &mut &[u8]) -> WResult<[f32; N]> {
    let mut out = [0f32; N];
    for value in out.iter_mut() {
        *value = le_f32.parse_next(input)?;
    }
    Ok(out)
}

/// Parse `N` raw bytes into a fixed array.
pub fn parse_byte_array<const N: usize>(input: &mut &[u8]) -> WResult<[u8; N]> {
    let bytes: &[u8] = take(N).parse_next(input)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

/// Parse `count` bytes into an owned buffer.
pub fn parse_bytes(count: usize) -> impl FnMut(&mut &[u8]) -> WResult<Vec<u8>> {
    move |input: &mut &[u8]| {
        let bytes: &[u8] = take(count).parse_next(input)?;
        Ok(bytes.to_vec())
    }
}

/// Parse `count` records with `record`.
pub fn parse_records<'a, T>(
    count: usize,
    mut record: impl FnMut(&mut &'a [u8]) -> WResult<T>,
) -> impl FnMut(&mut &'a [u8]) -> WResult<Vec<T>> {
    move |input: &mut &'a [u8]| repeat(count, |i: &mut &'a [u8]| record(i)).parse_next(input)
}

/// Read a NUL-padded fixed-width string.
///
/// Bytes after the first NUL are ignored. Non-UTF-8 content is replaced lossily.
pub fn read_fixed_string(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
