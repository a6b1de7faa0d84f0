use std::path::Path;

use confique::Config as DeriveConfig;

use crate::arena::DEFAULT_PAGE_SIZE;
use crate::printer::Style;

/// Tuning knobs for loading and printing documents.
///
/// Every field can be set from a TOML file or from an `ARENAJSON_*` environment variable;
/// [`Options::default`] gives the same values without touching either.
#[derive(Debug, Clone, PartialEq, Eq, DeriveConfig)]
pub struct Options {
    /// Size in bytes of each arena page. Strings at least this long get a page of their own.
    #[config(env = "ARENAJSON_PAGE_SIZE", default = 65536)]
    pub page_size: usize,

    /// Starting (and minimum) capacity of every object and array built by the parser.
    #[config(env = "ARENAJSON_CONTAINER_CAPACITY", default = 8)]
    pub container_capacity: usize,

    /// Deepest nesting of objects and arrays the parser accepts.
    #[config(env = "ARENAJSON_MAX_DEPTH", default = 512)]
    pub max_depth: usize,

    /// Spaces per level in pretty output.
    #[config(env = "ARENAJSON_INDENT", default = 4)]
    pub indent: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            page_size: DEFAULT_PAGE_SIZE,
            container_capacity: 8,
            max_depth: 512,
            indent: 4,
        }
    }
}

impl Options {
    /// Load options from the environment, then from `path` if given, falling back to defaults.
    /// Environment variables win over the file.
    pub fn load(path: Option<&Path>) -> Result<Self, confique::Error> {
        let mut builder = Self::builder().env();
        if let Some(path) = path {
            builder = builder.file(path);
        }
        builder.load()
    }

    /// The pretty style with this configuration's indent.
    pub fn pretty(&self) -> Style {
        Style::Pretty {
            indent: self.indent,
        }
    }
}
