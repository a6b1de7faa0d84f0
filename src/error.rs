//! Error types for document loading, access and output.
//!
//! Nothing in this crate exits the process. Grammar violations surface as [`ParseError`], which
//! carries enough positional context to render a diagnostic; misuse of the typed accessors or
//! mutation API surfaces as the other [`Error`] variants. Whether any of these is fatal is the
//! caller's decision.

use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

use ariadne::{Color, Fmt, Label, Report, ReportKind};
use thiserror::Error;

use crate::span::Span;
use crate::value::Kind;

pub type DiagnosticReport<'a> = Report<'a, (&'a String, Range<usize>)>;

/// What went wrong while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unknown token, expected {0}")]
    ExpectedToken(&'static str),
    #[error("unknown token, expected \"{0}\"")]
    ExpectedLiteral(&'static str),
    #[error("unknown token, expected value")]
    ExpectedValue,
    #[error("unknown token, expected string")]
    ExpectedString,
    #[error("expected digit")]
    ExpectedDigit,
    #[error("leading zeros are not allowed in numbers")]
    LeadingZero,
    #[error("number out of range")]
    NumberOutOfRange,
    #[error("string ended unexpectedly")]
    UnterminatedString,
    #[error("control character {0:#04x} must be escaped inside a string")]
    ControlCharacter(u8),
    #[error("unicode escape sequences are not supported")]
    UnicodeEscape,
    #[error("unknown character escape: {0:?}")]
    InvalidEscape(char),
    #[error("invalid json root, expected an object or an array")]
    InvalidRoot,
    #[error("unexpected trailing characters after the root value")]
    TrailingCharacters,
    #[error("nesting deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// A grammar violation with its location in the source text.
///
/// `line` and `column` are 1-based; `column` counts characters, not bytes. The offending line is
/// kept so the error can still be rendered after the source text is gone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} (line {line}, column {column})")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub line: usize,
    pub column: usize,
    source_line: String,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, text: &str, offset: usize) -> Self {
        let offset = offset.min(text.len());
        let mut line = 1;
        let mut line_start = 0;
        for (i, b) in text.as_bytes()[..offset].iter().enumerate() {
            if *b == b'\n' {
                line += 1;
                line_start = i + 1;
            }
        }

        let line_end = text[line_start..]
            .find('\n')
            .map_or(text.len(), |n| line_start + n);
        let column = text
            .get(line_start..offset)
            .map_or(offset - line_start, |prefix| prefix.chars().count())
            + 1;

        ParseError {
            kind,
            span: Span::at_char(text, offset),
            line,
            column,
            source_line: text[line_start..line_end].trim_end_matches('\r').to_owned(),
        }
    }

    /// Byte offset of the failing cursor.
    pub fn offset(&self) -> usize {
        self.span.lo
    }

    /// The full source line containing the error.
    pub fn source_line(&self) -> &str {
        &self.source_line
    }

    /// Plain-text excerpt of the offending line with a caret under the failing column:
    ///
    /// ```text
    ///      1 | {"a": }
    ///        |       ^
    /// ```
    pub fn context(&self) -> String {
        format!(
            "{:>6} | {}\n{:>6} | {:>width$}\n",
            self.line,
            self.source_line,
            "",
            "^",
            width = self.column
        )
    }

    /// Build an `ariadne` report for this error. `path` names the source in the rendered output;
    /// print it with `(path, Source::from(text))`.
    pub fn report<'a>(&self, path: &'a String) -> DiagnosticReport<'a> {
        let mut report = Report::build(ReportKind::Error, path, self.span.lo)
            .with_message(format!("failed to parse JSON: {}", self.kind))
            .with_label(
                Label::new((path, self.span.into_range()))
                    .with_message(self.kind.to_string())
                    .with_color(Color::Red),
            );
        match &self.kind {
            ParseErrorKind::UnicodeEscape => report.set_help(format!(
                "write the character directly as UTF-8 instead of using {}",
                "\\u".fg(Color::Blue)
            )),
            ParseErrorKind::TooDeep { .. } => report.set_help(format!(
                "raise {} if this document is trusted",
                "max_depth".fg(Color::Blue)
            )),
            ParseErrorKind::TrailingCharacters => {
                report.set_help("a document holds exactly one root value")
            }
            _ => {}
        }
        report.finish()
    }
}

/// Error type for document operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A value was cast to a kind it does not have.
    #[error("attempted to cast {found} to {expected}")]
    TypeMismatch { expected: Kind, found: Kind },
    /// A typed getter was asked for a key the object does not contain.
    #[error("key \"{0}\" not found")]
    MissingKey(String),
    #[error("popped from an array of size zero")]
    EmptyArray,
    #[error("document has no root value")]
    NoRoot,
    #[error("cannot encode non-finite number {0} as JSON")]
    NonFiniteNumber(f64),
    /// Strings may only contain control characters that have a short JSON escape.
    #[error("character {0:?} has no JSON escape and cannot be stored in a string")]
    UnescapableCharacter(char),
    #[error("attaching value would make the document cyclic")]
    Cycle,
    #[error("document text is not valid UTF-8")]
    NotUtf8(#[source] std::str::Utf8Error),
    #[error("could not open file: \"{}\"", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write document")]
    Write(#[source] std::io::Error),
    #[error("failed to format document")]
    Format(#[from] fmt::Error),
}

impl Error {
    pub(crate) fn mismatch(expected: Kind, found: Kind) -> Self {
        Error::TypeMismatch { expected, found }
    }
}

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_and_column_are_one_based() {
        let text = "{\n  \"a\": ,\n}";
        let err = ParseError::new(ParseErrorKind::ExpectedValue, text, 9);
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 8);
        assert_eq!(err.source_line(), "  \"a\": ,");
    }

    #[test]
    fn context_places_caret_under_column() {
        let text = "{\"a\": }";
        let err = ParseError::new(ParseErrorKind::ExpectedValue, text, 6);
        assert_eq!(err.column, 7);
        assert_eq!(err.context(), "     1 | {\"a\": }\n       |       ^\n");
    }

    #[test]
    fn column_counts_characters() {
        let text = "[\"é\" x]";
        let err = ParseError::new(ParseErrorKind::ExpectedToken("`,` or `]`"), text, 6);
        assert_eq!(err.column, 6);
    }

    #[test]
    fn error_at_end_of_input() {
        let text = "[1,";
        let err = ParseError::new(ParseErrorKind::ExpectedValue, text, 3);
        assert_eq!((err.line, err.column), (1, 4));
        assert!(err.span.is_empty());
    }

    #[test]
    fn display_includes_location() {
        let err = ParseError::new(ParseErrorKind::InvalidRoot, "  42", 2);
        assert_eq!(
            err.to_string(),
            "invalid json root, expected an object or an array (line 1, column 3)"
        );
    }
}
