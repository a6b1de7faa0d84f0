//! Arena-backed JSON documents.
//!
//! A [`Document`] owns one [`Arena`](arena::Arena) and every value parsed into or built on it.
//! Objects are open-addressing hash tables that remember insertion order; arrays and objects
//! grow and shrink with hysteresis so that a length hovering near a boundary does not resize on
//! every operation. The whole tree is released at once when the document is dropped.
//!
//! ```
//! use arenajson::Document;
//!
//! let mut doc = Document::parse(r#"{"name": "arena", "tags": ["a"]}"#).unwrap();
//! let root = doc.root_id().unwrap();
//!
//! let version = doc.new_number(2.0).unwrap();
//! doc.put(root, "version", version).unwrap();
//!
//! assert_eq!(
//!     doc.to_string_compact().unwrap(),
//!     r#"{"name":"arena","tags":["a"],"version":2}"#
//! );
//! ```

pub mod arena;
pub mod array;
pub mod config;
mod document;
pub mod error;
pub mod map;
mod parser;
pub mod printer;
pub mod span;
pub mod value;

pub use arena::{Arena, ArenaStats};
pub use config::Options;
pub use document::Document;
pub use error::{Error, ParseError, ParseErrorKind, Result};
pub use printer::Style;
pub use value::{ArrayRef, Kind, ObjectRef, TypedValue, Value, ValueId, ValueRef};
