//! STOMP 1.1 header escaping.
//!
//! Header names and values may contain the frame-delimiting bytes `:`, LF
//! and CR, so they travel escaped: `\` as `\\`, `:` as `\c`, LF as `\n` and
//! CR as `\r`. Encoding applies the table to every command except CONNECT
//! and CONNECTED; decoding always reverses it.

use std::borrow::Cow;

use super::error::DecodeError;

/// Escapes frame-delimiting characters in a header name or value.
///
/// Returns the input unchanged (borrowed) when nothing needs escaping.
#[must_use]
pub fn escape(input: &str) -> Cow<'_, str> {
    let mut escaped: Option<String> = None;
    for (index, ch) in input.char_indices() {
        let replacement = match ch {
            '\\' => Some("\\\\"),
            ':' => Some("\\c"),
            '\n' => Some("\\n"),
            '\r' => Some("\\r"),
            _ => None,
        };
        match (replacement, escaped.as_mut()) {
            (Some(replacement), Some(out)) => out.push_str(replacement),
            (Some(replacement), None) => {
                let mut out = String::with_capacity(input.len() + 4);
                out.push_str(&input[..index]);
                out.push_str(replacement);
                escaped = Some(out);
            }
            (None, Some(out)) => out.push(ch),
            (None, None) => {}
        }
    }
    match escaped {
        Some(out) => Cow::Owned(out),
        None => Cow::Borrowed(input),
    }
}

/// Reverses [`escape`].
///
/// # Errors
///
/// Returns [`DecodeError::BadEscape`] for a trailing backslash or an
/// unknown escape code, reporting the byte index of the backslash.
pub fn unescape(input: &str) -> Result<String, DecodeError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    let mut offset = 0;
    while let Some(idx) = rest.find('\\') {
        output.push_str(&rest[..idx]);
        let index = offset + idx;
        let unescaped = match rest.as_bytes().get(idx + 1) {
            Some(b'r') => '\r',
            Some(b'n') => '\n',
            Some(b'c') => ':',
            Some(b'\\') => '\\',
            _ => {
                return Err(DecodeError::BadEscape {
                    index,
                    input: input.to_owned(),
                });
            }
        };
        output.push(unescaped);
        rest = &rest[idx + 2..];
        offset = index + 2;
    }
    output.push_str(rest);
    Ok(output)
}
