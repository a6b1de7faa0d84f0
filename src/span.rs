/// A [`Span`] represents a contiguous region of the input text, in bytes. Parse errors carry one
/// so callers can point at the offending source. An invariant to be maintained is that
/// `lo <= hi`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub lo: usize,
    pub hi: usize,
}

impl Span {
    /// Construct a new span. Will panic if `lo > hi`. Prefer this constructor to construct a new
    /// [`Span`] over using direct struct initialization.
    pub const fn new(lo: usize, hi: usize) -> Self {
        assert!(lo <= hi, "`lo` must not be larger than `hi`");
        Span { lo, hi }
    }

    /// Span covering the character starting at `lo` in `text`, or an empty span at the end of
    /// input.
    pub fn at_char(text: &str, lo: usize) -> Self {
        let width = text
            .get(lo..)
            .and_then(|rest| rest.chars().next())
            .map_or(0, char::len_utf8);
        Span::new(lo, lo + width)
    }

    pub fn len(&self) -> usize {
        self.hi - self.lo
    }

    pub fn is_empty(&self) -> bool {
        self.lo == self.hi
    }

    pub fn into_range(self) -> std::ops::Range<usize> {
        self.lo..self.hi
    }
}
