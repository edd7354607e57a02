//! C string literal escaping for embedded module text.

use std::fmt::{self, Display, Formatter};

/// Escape `bytes` for use inside a C string literal.
///
/// Newline, carriage return, tab, backslash and double quote use their short
/// escapes; printable ASCII passes through; every other byte becomes a
/// three-digit octal escape so the result is plain ASCII and a following
/// digit can never extend the escape.
///
/// # Examples
///
/// ```
/// use gosh_freeze::c_gen::escape_c_bytes;
/// assert_eq!(escape_c_bytes(b"(display \"hi\")\n"), "(display \\\"hi\\\")\\n");
/// assert_eq!(escape_c_bytes("λ1".as_bytes()), "\\316\\2731");
/// ```
#[must_use]
pub fn escape_c_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &byte in bytes {
        push_escaped(&mut out, byte);
    }
    out
}

fn push_escaped(out: &mut String, byte: u8) {
    match byte {
        b'\\' => out.push_str("\\\\"),
        b'"' => out.push_str("\\\""),
        b'\n' => out.push_str("\\n"),
        b'\r' => out.push_str("\\r"),
        b'\t' => out.push_str("\\t"),
        0x20..=0x7E => out.push(char::from(byte)),
        _ => {
            out.push('\\');
            for shift in [6, 3, 0] {
                out.push(char::from(b'0' + ((byte >> shift) & 0o7)));
            }
        }
    }
}

/// Module text rendered as adjacent C string literals, one per source line.
///
/// Adjacent literals concatenate at compile time, so the embedded bytes are
/// exactly the input. Empty input renders as `""`.
pub struct CLiteral<'a> {
    bytes: &'a [u8],
    indent: &'a str,
}

impl<'a> CLiteral<'a> {
    /// Render `bytes`, prefixing every line after the first with `indent`.
    #[must_use]
    pub const fn new(bytes: &'a [u8], indent: &'a str) -> Self {
        Self { bytes, indent }
    }
}

impl Display for CLiteral<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.bytes.is_empty() {
            return f.write_str("\"\"");
        }
        for (idx, line) in self.bytes.split_inclusive(|&b| b == b'\n').enumerate() {
            if idx > 0 {
                write!(f, "\n{}", self.indent)?;
            }
            write!(f, "\"{}\"", escape_c_bytes(line))?;
        }
        Ok(())
    }
}
