//! Values and borrowed views over them.
//!
//! A [`Value`] is what the arena stores. Readers go through [`ValueRef`], a copyable view that
//! pairs a [`ValueId`] with the arena it lives in, much like a pointer that cannot dangle:
//! views borrow the document, so they cannot outlive it.
//!
//! # Typed access
//!
//! ```
//! use arenajson::{Document, TypedValue};
//!
//! let doc = Document::parse(r#"{"name": "ghh", "tags": ["a", "b"], "n": 3}"#).unwrap();
//! let root = doc.root().unwrap();
//!
//! assert_eq!(root.get_str("name").unwrap(), "ghh");
//! assert_eq!(root.get_array("tags").unwrap().len(), 2);
//!
//! match root.get("n").unwrap().unwrap().typed() {
//!     TypedValue::Number(n) => assert_eq!(n, 3.0),
//!     other => panic!("expected number, got {other:?}"),
//! }
//! ```

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::arena::{Arena, StrRef};
use crate::array::DynArray;
use crate::error::{Error, Result};
use crate::map::ObjectMap;
use crate::printer::{Printer, Style};

index_vec::define_index_type! {
    /// Handle to a value stored in a document's arena.
    pub struct ValueId = u32;
}

/// A JSON value as stored in the arena.
#[derive(Debug, Clone)]
pub enum Value {
    Object(ObjectMap),
    Array(DynArray<ValueId>),
    String(StrRef),
    Number(f64),
    True,
    False,
    Null,
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Object(_) => Kind::Object,
            Value::Array(_) => Kind::Array,
            Value::String(_) => Kind::String,
            Value::Number(_) => Kind::Number,
            Value::True | Value::False => Kind::Bool,
            Value::Null => Kind::Null,
        }
    }

    pub fn from_bool(b: bool) -> Self {
        if b {
            Value::True
        } else {
            Value::False
        }
    }
}

/// The shape of a value, used in type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Object,
    Array,
    String,
    Number,
    Bool,
    Null,
}

impl Kind {
    pub fn desc(&self) -> &'static str {
        match self {
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Bool => "bool",
            Kind::Null => "null",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.desc())
    }
}

/// A typed view of a value for pattern matching.
#[derive(Debug, Clone, Copy)]
pub enum TypedValue<'a> {
    Object(ObjectRef<'a>),
    Array(ArrayRef<'a>),
    String(&'a str),
    Number(f64),
    Bool(bool),
    Null,
}

/// A borrowed view of one value in a document.
#[derive(Clone, Copy)]
pub struct ValueRef<'a> {
    arena: &'a Arena,
    id: ValueId,
}

impl<'a> ValueRef<'a> {
    pub(crate) fn new(arena: &'a Arena, id: ValueId) -> Self {
        ValueRef { arena, id }
    }

    #[inline]
    pub fn id(&self) -> ValueId {
        self.id
    }

    #[inline]
    fn value(&self) -> &'a Value {
        self.arena.get(self.id)
    }

    #[inline]
    pub fn kind(&self) -> Kind {
        self.value().kind()
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value(), Value::Null)
    }

    pub fn typed(&self) -> TypedValue<'a> {
        match self.value() {
            Value::Object(map) => TypedValue::Object(ObjectRef {
                arena: self.arena,
                map,
                id: self.id,
            }),
            Value::Array(items) => TypedValue::Array(ArrayRef {
                arena: self.arena,
                items,
                id: self.id,
            }),
            Value::String(s) => TypedValue::String(self.arena.str(*s)),
            Value::Number(n) => TypedValue::Number(*n),
            Value::True => TypedValue::Bool(true),
            Value::False => TypedValue::Bool(false),
            Value::Null => TypedValue::Null,
        }
    }

    pub fn as_object(&self) -> Result<ObjectRef<'a>> {
        match self.typed() {
            TypedValue::Object(obj) => Ok(obj),
            _ => Err(Error::mismatch(Kind::Object, self.kind())),
        }
    }

    pub fn as_array(&self) -> Result<ArrayRef<'a>> {
        match self.typed() {
            TypedValue::Array(arr) => Ok(arr),
            _ => Err(Error::mismatch(Kind::Array, self.kind())),
        }
    }

    pub fn as_str(&self) -> Result<&'a str> {
        match self.value() {
            Value::String(s) => Ok(self.arena.str(*s)),
            other => Err(Error::mismatch(Kind::String, other.kind())),
        }
    }

    pub fn as_number(&self) -> Result<f64> {
        match self.value() {
            Value::Number(n) => Ok(*n),
            other => Err(Error::mismatch(Kind::Number, other.kind())),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self.value() {
            Value::True => Ok(true),
            Value::False => Ok(false),
            other => Err(Error::mismatch(Kind::Bool, other.kind())),
        }
    }

    /// Fetch the child stored under `key`. Fails if this value is not an object.
    pub fn get(&self, key: &str) -> Result<Option<ValueRef<'a>>> {
        Ok(self.as_object()?.get(key))
    }

    fn child(&self, key: &str) -> Result<ValueRef<'a>> {
        self.get(key)?.ok_or_else(|| Error::MissingKey(key.to_owned()))
    }

    pub fn get_object(&self, key: &str) -> Result<ObjectRef<'a>> {
        self.child(key)?.as_object()
    }

    pub fn get_array(&self, key: &str) -> Result<ArrayRef<'a>> {
        self.child(key)?.as_array()
    }

    pub fn get_str(&self, key: &str) -> Result<&'a str> {
        self.child(key)?.as_str()
    }

    pub fn get_number(&self, key: &str) -> Result<f64> {
        self.child(key)?.as_number()
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.child(key)?.as_bool()
    }
}

impl fmt::Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueRef")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .finish()
    }
}

/// `{}` renders compact JSON, `{:#}` renders the pretty form.
impl fmt::Display for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = if f.alternate() {
            Style::default()
        } else {
            Style::Compact
        };
        Printer::new(f, style).value(*self)
    }
}

/// A borrowed view of an object.
#[derive(Clone, Copy)]
pub struct ObjectRef<'a> {
    arena: &'a Arena,
    map: &'a ObjectMap,
    id: ValueId,
}

impl<'a> ObjectRef<'a> {
    pub fn as_value(&self) -> ValueRef<'a> {
        ValueRef::new(self.arena, self.id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<ValueRef<'a>> {
        self.map
            .get(self.arena.pages(), key)
            .map(|id| ValueRef::new(self.arena, id))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(self.arena.pages(), key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &'a str> + 'a {
        let (arena, map) = (self.arena, self.map);
        map.keys().map(move |k| arena.str(k))
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, ValueRef<'a>)> + 'a {
        let (arena, map) = (self.arena, self.map);
        map.iter()
            .map(move |(key, id)| (arena.str(key), ValueRef::new(arena, id)))
    }
}

impl fmt::Debug for ObjectRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// A borrowed view of an array.
#[derive(Clone, Copy)]
pub struct ArrayRef<'a> {
    arena: &'a Arena,
    items: &'a DynArray<ValueId>,
    id: ValueId,
}

impl<'a> ArrayRef<'a> {
    pub fn as_value(&self) -> ValueRef<'a> {
        ValueRef::new(self.arena, self.id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ValueRef<'a>> {
        self.items
            .get(index)
            .map(|id| ValueRef::new(self.arena, *id))
    }

    pub fn iter(&self) -> impl Iterator<Item = ValueRef<'a>> + 'a {
        let (arena, items) = (self.arena, self.items);
        items.iter().map(move |id| ValueRef::new(arena, *id))
    }
}

impl fmt::Debug for ArrayRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Whole numbers within `i64` range, which the printer writes without a fraction.
pub(crate) fn as_integer(n: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if n.trunc() == n && (-LIMIT..LIMIT).contains(&n) {
        Some(n as i64)
    } else {
        None
    }
}

impl Serialize for ValueRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.typed() {
            TypedValue::Object(obj) => {
                let mut map = serializer.serialize_map(Some(obj.len()))?;
                for (key, value) in obj.iter() {
                    map.serialize_entry(key, &value)?;
                }
                map.end()
            }
            TypedValue::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for value in arr.iter() {
                    seq.serialize_element(&value)?;
                }
                seq.end()
            }
            TypedValue::String(s) => serializer.serialize_str(s),
            TypedValue::Number(n) => match as_integer(n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(n),
            },
            TypedValue::Bool(b) => serializer.serialize_bool(b),
            TypedValue::Null => serializer.serialize_unit(),
        }
    }
}
