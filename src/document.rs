//! The document: one arena, at most one root, and the operations that read and mutate the tree.

use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use tracing::*;

use crate::arena::{Arena, ArenaStats, Pages};
use crate::array::DynArray;
use crate::config::Options;
use crate::error::{Error, Result};
use crate::map::ObjectMap;
use crate::parser::{escape_code, Parser};
use crate::printer::{IoWriter, Printer, Style};
use crate::value::{Kind, Value, ValueId, ValueRef};

/// A JSON value tree together with the arena that owns all of it.
///
/// Values are created by parsing or by the `new_*` builders, and addressed by [`ValueId`].
/// Nothing is freed until the document is dropped: a value removed from its parent stays in the
/// arena, detached.
///
/// Ids from another document must not be passed in: the methods taking a [`ValueId`] panic on
/// an id past the end of this document's arena.
#[derive(Debug)]
pub struct Document {
    arena: Arena,
    root: Option<ValueId>,
    options: Options,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document with no root.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Document {
            arena: Arena::with_page_size(options.page_size),
            root: None,
            options,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with_options(text, Options::default())
    }

    /// Parse `text` into a new document. Empty or all-whitespace text yields a document with no
    /// root; otherwise the root must be an object or an array.
    #[instrument(level = "debug", skip_all, fields(len = text.len()))]
    pub fn parse_with_options(text: &str, options: Options) -> Result<Self> {
        let mut doc = Self::with_options(options);
        debug!("parsing document");

        doc.root = Parser::new(text, &mut doc.arena, &doc.options).parse_root()?;

        let stats = doc.arena.stats();
        debug!(
            values = stats.values,
            pages = stats.pages,
            has_root = doc.root.is_some(),
            "parsed document"
        );
        Ok(doc)
    }

    /// Parse a byte buffer. The text ends at the first NUL byte, if there is one.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(bytes, Options::default())
    }

    pub fn from_bytes_with_options(bytes: &[u8], options: Options) -> Result<Self> {
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        let text = std::str::from_utf8(&bytes[..end]).map_err(Error::NotUtf8)?;
        Self::parse_with_options(text, options)
    }

    /// Read and parse the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_options(path, Options::default())
    }

    pub fn load_with_options(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        let path = path.as_ref();
        debug!(?path, "loading document");
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_bytes_with_options(&bytes, options)
    }

    pub fn root(&self) -> Option<ValueRef<'_>> {
        self.root.map(|id| self.value(id))
    }

    pub fn root_id(&self) -> Option<ValueId> {
        self.root
    }

    /// View of any value in this document, attached or not.
    ///
    /// Panics if `id` was not allocated by this document.
    pub fn value(&self, id: ValueId) -> ValueRef<'_> {
        ValueRef::new(&self.arena, id)
    }

    /// Make `id` the root. The root must be an object or an array.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this document.
    pub fn set_root(&mut self, id: ValueId) -> Result<()> {
        match self.arena.get(id).kind() {
            Kind::Object | Kind::Array => {
                self.root = Some(id);
                Ok(())
            }
            found => Err(Error::mismatch(Kind::Object, found)),
        }
    }

    pub fn stats(&self) -> ArenaStats {
        self.arena.stats()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn new_object(&mut self) -> ValueId {
        let map = ObjectMap::with_capacity(self.options.container_capacity);
        self.arena.alloc(Value::Object(map))
    }

    pub fn new_array(&mut self) -> ValueId {
        let items = DynArray::with_capacity(self.options.container_capacity);
        self.arena.alloc(Value::Array(items))
    }

    /// Copy `s` into the arena as a new string value.
    pub fn new_string(&mut self, s: &str) -> Result<ValueId> {
        check_printable(s)?;
        let s = self.arena.alloc_str(s);
        Ok(self.arena.alloc(Value::String(s)))
    }

    pub fn new_number(&mut self, n: f64) -> Result<ValueId> {
        if !n.is_finite() {
            return Err(Error::NonFiniteNumber(n));
        }
        Ok(self.arena.alloc(Value::Number(n)))
    }

    pub fn new_bool(&mut self, b: bool) -> ValueId {
        self.arena.alloc(Value::from_bool(b))
    }

    pub fn new_null(&mut self) -> ValueId {
        self.arena.alloc(Value::Null)
    }

    /// Insert `value` under `key`, or overwrite the value already there without moving the key.
    /// Returns the value that was replaced.
    ///
    /// # Panics
    ///
    /// Panics if `object` or `value` was not allocated by this document.
    pub fn put(&mut self, object: ValueId, key: &str, value: ValueId) -> Result<Option<ValueId>> {
        self.expect_kind(object, Kind::Object)?;
        check_printable(key)?;
        self.check_acyclic(object, value)?;

        let (map, pages) = self.object_mut(object)?;
        if let Some(old) = map.replace(pages, key, value) {
            return Ok(Some(old));
        }

        let key = self.arena.alloc_str(key);
        let (map, pages) = self.object_mut(object)?;
        Ok(map.insert(pages, key, value))
    }

    /// Remove `key` in O(1) by moving the last key into its place.
    pub fn remove(&mut self, object: ValueId, key: &str) -> Result<Option<ValueId>> {
        let (map, pages) = self.object_mut(object)?;
        Ok(map.swap_remove(pages, key))
    }

    /// Remove `key` keeping the order of the remaining keys. O(n).
    pub fn remove_ordered(&mut self, object: ValueId, key: &str) -> Result<Option<ValueId>> {
        let (map, pages) = self.object_mut(object)?;
        Ok(map.shift_remove(pages, key))
    }

    /// Append `value` to `array`.
    ///
    /// # Panics
    ///
    /// Panics if `array` or `value` was not allocated by this document.
    pub fn push(&mut self, array: ValueId, value: ValueId) -> Result<()> {
        self.expect_kind(array, Kind::Array)?;
        self.check_acyclic(array, value)?;
        self.array_mut(array)?.push(value);
        Ok(())
    }

    /// Detach the last element of `array`. The element stays readable through its id.
    pub fn pop(&mut self, array: ValueId) -> Result<ValueId> {
        self.array_mut(array)?.pop().ok_or(Error::EmptyArray)
    }

    pub fn peek(&self, array: ValueId) -> Result<Option<ValueRef<'_>>> {
        let items = self.value(array).as_array()?;
        Ok(items.len().checked_sub(1).and_then(|last| items.get(last)))
    }

    /// Write the document followed by a newline.
    pub fn write_to<W: Write>(&self, mut out: W, style: Style) -> Result<()> {
        let root = self.root().ok_or(Error::NoRoot)?;

        let mut writer = IoWriter::new(&mut out);
        let result = Printer::new(&mut writer, style).document(root);
        if let Err(fmt::Error) = result {
            return Err(match writer.error.take() {
                Some(e) => Error::Write(e),
                None => Error::Format(fmt::Error),
            });
        }

        out.flush().map_err(Error::Write)
    }

    /// Pretty-print the document to stdout.
    pub fn print(&self) -> Result<()> {
        self.write_to(io::stdout().lock(), self.options.pretty())
    }

    /// Pretty text, ending in a newline.
    pub fn to_string_pretty(&self) -> Result<String> {
        let root = self.root().ok_or(Error::NoRoot)?;
        let mut out = String::new();
        Printer::new(&mut out, self.options.pretty()).document(root)?;
        Ok(out)
    }

    /// Compact text without any insignificant whitespace.
    pub fn to_string_compact(&self) -> Result<String> {
        let root = self.root().ok_or(Error::NoRoot)?;
        let mut out = String::new();
        Printer::new(&mut out, Style::Compact).value(root)?;
        Ok(out)
    }

    fn expect_kind(&self, id: ValueId, expected: Kind) -> Result<()> {
        match self.arena.get(id).kind() {
            found if found == expected => Ok(()),
            found => Err(Error::mismatch(expected, found)),
        }
    }

    fn object_mut(&mut self, id: ValueId) -> Result<(&mut ObjectMap, &Pages)> {
        match self.arena.get_mut_with_pages(id) {
            (Value::Object(map), pages) => Ok((map, pages)),
            (other, _) => Err(Error::mismatch(Kind::Object, other.kind())),
        }
    }

    fn array_mut(&mut self, id: ValueId) -> Result<&mut DynArray<ValueId>> {
        match self.arena.get_mut(id) {
            Value::Array(items) => Ok(items),
            other => Err(Error::mismatch(Kind::Array, other.kind())),
        }
    }

    /// Attaching `child` under `parent` must not make `parent` reachable from itself.
    fn check_acyclic(&self, parent: ValueId, child: ValueId) -> Result<()> {
        let mut stack = vec![child];
        while let Some(id) = stack.pop() {
            if id == parent {
                trace!(?parent, ?child, "rejecting cyclic attachment");
                return Err(Error::Cycle);
            }
            match self.arena.get(id) {
                Value::Object(map) => stack.extend(map.values()),
                Value::Array(items) => stack.extend(items.iter().copied()),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Text the printer can write back: every control character needs a short escape.
fn check_printable(s: &str) -> Result<()> {
    match s
        .chars()
        .find(|c| (*c as u32) < 0x20 && escape_code(*c as u8).is_none())
    {
        Some(c) => Err(Error::UnescapableCharacter(c)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    #[test]
    #[should_panic]
    fn foreign_ids_panic_on_push() {
        let mut other = Document::new();
        for _ in 0..4 {
            other.new_null();
        }
        let foreign = other.new_null();

        let mut doc = Document::new();
        let array = doc.new_array();
        let _ = doc.push(array, foreign);
    }

    #[test]
    #[should_panic]
    fn foreign_ids_panic_on_put() {
        let mut other = Document::new();
        other.new_null();
        let foreign = other.new_object();

        let mut doc = Document::new();
        let object = doc.new_object();
        let _ = doc.put(object, "k", foreign);
    }

    #[test]
    fn built_subnormals_round_trip() {
        let mut doc = Document::new();
        let array = doc.new_array();
        for n in [1e-310, -1e-310, f64::MIN_POSITIVE] {
            let value = doc.new_number(n).unwrap();
            doc.push(array, value).unwrap();
        }
        doc.set_root(array).unwrap();

        let back = Document::parse(&doc.to_string_compact().unwrap()).unwrap();
        let items = back.root().unwrap().as_array().unwrap();
        let numbers: Vec<f64> = items.iter().map(|v| v.as_number().unwrap()).collect();
        assert_eq!(numbers, [1e-310, -1e-310, f64::MIN_POSITIVE]);
    }

    #[test]
    fn empty_document_has_no_root() {
        let doc = Document::parse("  \n").unwrap();
        assert!(doc.root().is_none());
        assert!(matches!(doc.to_string_pretty(), Err(Error::NoRoot)));
        assert!(matches!(Document::new().to_string_compact(), Err(Error::NoRoot)));
    }

    #[test]
    fn parse_errors_are_typed() {
        match Document::parse("{\"a\": }") {
            Err(Error::Parse(err)) => {
                assert_eq!(err.kind, ParseErrorKind::ExpectedValue);
                assert_eq!(err.column, 7);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn bytes_end_at_nul() {
        let doc = Document::from_bytes(b"[1, 2]\0garbage").unwrap();
        assert_eq!(doc.to_string_compact().unwrap(), "[1,2]");
        assert!(Document::from_bytes(b"\0[1]").unwrap().root().is_none());
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert!(matches!(
            Document::from_bytes(b"[\"\xff\"]"),
            Err(Error::NotUtf8(_))
        ));
    }

    #[test]
    fn build_from_scratch() {
        let mut doc = Document::new();
        let root = doc.new_object();
        let name = doc.new_string("arena").unwrap();
        let list = doc.new_array();
        let one = doc.new_number(1.0).unwrap();
        let yes = doc.new_bool(true);
        let nothing = doc.new_null();

        doc.push(list, one).unwrap();
        doc.push(list, yes).unwrap();
        doc.push(list, nothing).unwrap();
        doc.put(root, "name", name).unwrap();
        doc.put(root, "list", list).unwrap();
        doc.set_root(root).unwrap();

        assert_eq!(
            doc.to_string_compact().unwrap(),
            r#"{"name":"arena","list":[1,true,null]}"#
        );
    }

    #[test]
    fn put_overwrites_in_place() {
        let mut doc = Document::parse(r#"{"a": 1, "b": 2}"#).unwrap();
        let root = doc.root_id().unwrap();
        let three = doc.new_number(3.0).unwrap();
        let old = doc.put(root, "a", three).unwrap().unwrap();

        assert_eq!(doc.value(old).as_number().unwrap(), 1.0);
        assert_eq!(doc.to_string_compact().unwrap(), r#"{"a":3,"b":2}"#);
    }

    #[test]
    fn put_requires_an_object() {
        let mut doc = Document::parse("[]").unwrap();
        let root = doc.root_id().unwrap();
        let v = doc.new_null();
        assert!(matches!(
            doc.put(root, "a", v),
            Err(Error::TypeMismatch {
                expected: Kind::Object,
                found: Kind::Array
            })
        ));
        assert!(matches!(doc.pop(v), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn unescapable_text_is_rejected() {
        let mut doc = Document::new();
        let obj = doc.new_object();
        let v = doc.new_null();
        assert!(matches!(
            doc.new_string("a\u{1}b"),
            Err(Error::UnescapableCharacter('\u{1}'))
        ));
        assert!(matches!(
            doc.put(obj, "\u{7f}ok\u{0}", v),
            Err(Error::UnescapableCharacter('\u{0}'))
        ));
        assert!(doc.new_string("tab\tand newline\n").is_ok());
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let mut doc = Document::new();
        assert!(matches!(doc.new_number(f64::NAN), Err(Error::NonFiniteNumber(_))));
        assert!(matches!(
            doc.new_number(f64::INFINITY),
            Err(Error::NonFiniteNumber(_))
        ));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut doc = Document::new();
        let outer = doc.new_array();
        let inner = doc.new_object();
        doc.push(outer, inner).unwrap();

        assert!(matches!(doc.push(outer, outer), Err(Error::Cycle)));
        assert!(matches!(doc.put(inner, "up", outer), Err(Error::Cycle)));

        // sharing a value is fine as long as it does not loop
        let leaf = doc.new_array();
        doc.push(outer, leaf).unwrap();
        doc.put(inner, "leaf", leaf).unwrap();
    }

    #[test]
    fn push_pop_peek() {
        let mut doc = Document::parse("[1, 2]").unwrap();
        let root = doc.root_id().unwrap();

        assert_eq!(doc.peek(root).unwrap().unwrap().as_number().unwrap(), 2.0);
        let two = doc.pop(root).unwrap();
        assert_eq!(doc.value(two).as_number().unwrap(), 2.0);
        doc.pop(root).unwrap();

        assert!(doc.peek(root).unwrap().is_none());
        assert!(matches!(doc.pop(root), Err(Error::EmptyArray)));
        assert_eq!(doc.to_string_compact().unwrap(), "[]");
    }

    #[test]
    fn remove_variants() {
        let mut doc = Document::parse(r#"{"a": 1, "b": 2, "c": 3, "d": 4}"#).unwrap();
        let root = doc.root_id().unwrap();

        assert!(doc.remove_ordered(root, "b").unwrap().is_some());
        assert_eq!(doc.to_string_compact().unwrap(), r#"{"a":1,"c":3,"d":4}"#);

        assert!(doc.remove(root, "a").unwrap().is_some());
        assert_eq!(doc.to_string_compact().unwrap(), r#"{"d":4,"c":3}"#);

        assert!(doc.remove(root, "zzz").unwrap().is_none());
    }

    #[test]
    fn set_root_requires_a_container() {
        let mut doc = Document::new();
        let n = doc.new_number(1.0).unwrap();
        assert!(doc.set_root(n).is_err());
        assert!(doc.root().is_none());
    }

    #[test]
    fn write_to_uses_the_given_style() {
        let doc = Document::parse(r#"{"a": [1]}"#).unwrap();
        let mut out = Vec::new();
        doc.write_to(&mut out, Style::Compact).unwrap();
        assert_eq!(out, b"{\"a\":[1]}\n");

        let mut out = Vec::new();
        doc.write_to(&mut out, Style::Pretty { indent: 1 }).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\n \"a\": [\n  1\n ]\n}\n");
    }

    #[test]
    fn options_flow_into_the_arena() {
        let options = Options {
            page_size: 32,
            indent: 2,
            ..Options::default()
        };
        let doc = Document::parse_with_options("[\"a\", [true]]", options).unwrap();
        assert_eq!(doc.stats().page_size, 32);
        assert_eq!(doc.to_string_pretty().unwrap(), "[\n  \"a\",\n  [\n    true\n  ]\n]\n");
    }
}
