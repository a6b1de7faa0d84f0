//! JSON text output.

use std::fmt::{self, Write};
use std::io;

use crate::parser::escape_code;
use crate::value::{as_integer, ArrayRef, ObjectRef, TypedValue, ValueRef};

/// Layout of printed JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// One element per line, nested levels indented by `indent` spaces.
    Pretty { indent: usize },
    /// No insignificant whitespace at all.
    Compact,
}

impl Default for Style {
    fn default() -> Self {
        Style::Pretty { indent: 4 }
    }
}

/// Recursive writer over a value tree.
pub struct Printer<W> {
    out: W,
    style: Style,
    level: usize,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, style: Style) -> Self {
        Printer {
            out,
            style,
            level: 0,
        }
    }

    /// Write `value` and everything below it.
    pub fn value(&mut self, value: ValueRef<'_>) -> fmt::Result {
        match value.typed() {
            TypedValue::Object(obj) => self.object(obj),
            TypedValue::Array(arr) => self.array(arr),
            TypedValue::String(s) => self.string(s),
            TypedValue::Number(n) => self.number(n),
            TypedValue::Bool(true) => self.out.write_str("true"),
            TypedValue::Bool(false) => self.out.write_str("false"),
            TypedValue::Null => self.out.write_str("null"),
        }
    }

    /// Write `root` as a whole document, which ends in a newline.
    pub fn document(&mut self, root: ValueRef<'_>) -> fmt::Result {
        self.value(root)?;
        self.out.write_char('\n')
    }

    fn object(&mut self, obj: ObjectRef<'_>) -> fmt::Result {
        if obj.is_empty() {
            return self.out.write_str("{}");
        }

        self.out.write_char('{')?;
        self.level += 1;
        for (i, (key, value)) in obj.iter().enumerate() {
            if i > 0 {
                self.out.write_char(',')?;
            }
            self.line_break()?;
            self.string(key)?;
            self.out.write_char(':')?;
            if self.is_pretty() {
                self.out.write_char(' ')?;
            }
            self.value(value)?;
        }
        self.level -= 1;
        self.line_break()?;
        self.out.write_char('}')
    }

    fn array(&mut self, arr: ArrayRef<'_>) -> fmt::Result {
        if arr.is_empty() {
            return self.out.write_str("[]");
        }

        self.out.write_char('[')?;
        self.level += 1;
        for (i, item) in arr.iter().enumerate() {
            if i > 0 {
                self.out.write_char(',')?;
            }
            self.line_break()?;
            self.value(item)?;
        }
        self.level -= 1;
        self.line_break()?;
        self.out.write_char(']')
    }

    fn string(&mut self, s: &str) -> fmt::Result {
        self.out.write_char('"')?;
        let mut run = 0;
        for (i, b) in s.bytes().enumerate() {
            if let Some(code) = escape_code(b) {
                self.out.write_str(&s[run..i])?;
                self.out.write_char('\\')?;
                self.out.write_char(code as char)?;
                run = i + 1;
            } else if b < 0x20 {
                // unreachable through the public API, which rejects such characters
                self.out.write_str(&s[run..i])?;
                write!(self.out, "\\u{:04x}", b)?;
                run = i + 1;
            }
        }
        self.out.write_str(&s[run..])?;
        self.out.write_char('"')
    }

    fn number(&mut self, n: f64) -> fmt::Result {
        match as_integer(n) {
            Some(i) => write!(self.out, "{i}"),
            // `Display` for f64 is the shortest text that reads back to the same value, and
            // never uses exponent notation
            None => write!(self.out, "{n}"),
        }
    }

    fn is_pretty(&self) -> bool {
        matches!(self.style, Style::Pretty { .. })
    }

    fn line_break(&mut self) -> fmt::Result {
        if let Style::Pretty { indent } = self.style {
            write!(self.out, "\n{:width$}", "", width = indent * self.level)?;
        }
        Ok(())
    }
}

/// Adapts an [`io::Write`] sink to [`fmt::Write`], keeping the first I/O error so it can be
/// reported instead of the opaque [`fmt::Error`].
pub(crate) struct IoWriter<W> {
    inner: W,
    pub(crate) error: Option<io::Error>,
}

impl<W: io::Write> IoWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        IoWriter { inner, error: None }
    }
}

impl<W: io::Write> Write for IoWriter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.inner.write_all(s.as_bytes()).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    fn pretty(text: &str) -> String {
        Document::parse(text).unwrap().to_string_pretty().unwrap()
    }

    fn compact(text: &str) -> String {
        Document::parse(text).unwrap().to_string_compact().unwrap()
    }

    #[test]
    fn pretty_layout() {
        assert_eq!(
            pretty(r#"{"a":1,"b":[true,null],"c":{}}"#),
            "{\n    \"a\": 1,\n    \"b\": [\n        true,\n        null\n    ],\n    \"c\": {}\n}\n"
        );
    }

    #[test]
    fn compact_layout() {
        assert_eq!(
            compact("{ \"a\" : [ 1 , { } , [ ] ] , \"b\" : \"x\" }"),
            r#"{"a":[1,{},[]],"b":"x"}"#
        );
    }

    #[test]
    fn custom_indent() {
        let doc = Document::parse("[1]").unwrap();
        let mut out = String::new();
        Printer::new(&mut out, Style::Pretty { indent: 2 })
            .value(doc.root().unwrap())
            .unwrap();
        assert_eq!(out, "[\n  1\n]");
    }

    #[test]
    fn escapes_are_reversed() {
        assert_eq!(
            compact(r#"["a\"b\\c\/d\b\f\n\r\t", "/"]"#),
            r#"["a\"b\\c\/d\b\f\n\r\t","\/"]"#
        );
    }

    #[test]
    fn non_ascii_is_written_verbatim() {
        assert_eq!(compact(r#"["héllo ✓"]"#), r#"["héllo ✓"]"#);
    }

    #[test]
    fn integers_print_without_fraction() {
        assert_eq!(compact("[3.0, -0, 1e3, 100000]"), "[3,0,1000,100000]");
    }

    #[test]
    fn fractions_print_in_fixed_notation() {
        assert_eq!(compact("[3.5, -0.25, 1e-7]"), "[3.5,-0.25,0.0000001]");
    }

    #[test]
    fn io_writer_surfaces_errors() {
        struct Broken;
        impl io::Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut writer = IoWriter::new(Broken);
        assert!(writer.write_str("x").is_err());
        assert_eq!(
            writer.error.map(|e| e.kind()),
            Some(io::ErrorKind::BrokenPipe)
        );
    }
}
