use alloc::vec::Vec;

/// A predicate over the head of a haystack.
///
/// Matchers are the primitive acceptors that NFA transitions carry. Each one
/// consumes either zero bytes (`Epsilon`) or exactly one byte (everything
/// else). The AST reuses them as its leaf nodes, so a character class built
/// by the parser flows unchanged into the automaton.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Matcher {
    /// Consumes nothing and always matches.
    Epsilon,
    /// Consumes any one byte. This is `.` in the pattern syntax.
    Universal,
    /// Consumes one byte equal to the given byte.
    Char(u8),
    /// Consumes one byte covered (or, when negated, not covered) by a set
    /// of ranges. This is `[...]` in the pattern syntax.
    Class(Class),
}

impl Matcher {
    /// Returns the number of bytes this matcher consumes: 0 or 1.
    pub(crate) fn len(&self) -> usize {
        match *self {
            Matcher::Epsilon => 0,
            Matcher::Universal | Matcher::Char(_) | Matcher::Class(_) => 1,
        }
    }

    /// Returns true if the first `len()` bytes of `haystack` satisfy this
    /// matcher. A matcher that consumes a byte never matches an empty
    /// haystack.
    pub(crate) fn is_match(&self, haystack: &[u8]) -> bool {
        match *self {
            Matcher::Epsilon => true,
            Matcher::Universal => !haystack.is_empty(),
            Matcher::Char(byte) => haystack.first() == Some(&byte),
            Matcher::Class(ref class) => {
                haystack.first().map_or(false, |&byte| class.matches(byte))
            }
        }
    }

    pub(crate) fn is_epsilon(&self) -> bool {
        matches!(*self, Matcher::Epsilon)
    }
}

/// A set of byte ranges, possibly negated.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Class {
    pub(crate) ranges: Vec<ClassRange>,
    pub(crate) negated: bool,
}

impl Class {
    /// Returns true if the given byte is covered by this class, taking
    /// negation into account.
    pub(crate) fn matches(&self, byte: u8) -> bool {
        self.negated ^ self.contains(byte)
    }

    fn contains(&self, byte: u8) -> bool {
        self.ranges.iter().any(|r| r.start <= byte && byte <= r.end)
    }

    /// Converts this class into its normal form: each range has ordered
    /// endpoints, ranges are sorted by their start and no two ranges overlap
    /// or touch. Normalizing a class never changes its language.
    pub(crate) fn normalize(&mut self) {
        if self.ranges.is_empty() {
            return;
        }
        for range in self.ranges.iter_mut() {
            if range.start > range.end {
                core::mem::swap(&mut range.start, &mut range.end);
            }
        }
        self.ranges.sort();
        let mut merged = 0;
        for i in 1..self.ranges.len() {
            let range = self.ranges[i];
            if u16::from(range.start) <= u16::from(self.ranges[merged].end) + 1
            {
                let end = &mut self.ranges[merged].end;
                *end = core::cmp::max(*end, range.end);
            } else {
                merged += 1;
                self.ranges[merged] = range;
            }
        }
        self.ranges.truncate(merged + 1);
    }

    /// Returns true if this class covers no byte at all. Such classes are
    /// rejected at parse time.
    pub(crate) fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// If this class covers exactly one byte and is not negated, returns
    /// that byte. The parser replaces such a class with a plain `Char`.
    pub(crate) fn as_single(&self) -> Option<u8> {
        match (self.negated, self.ranges.as_slice()) {
            (false, &[ClassRange { start, end }]) if start == end => {
                Some(start)
            }
            _ => None,
        }
    }
}

/// A single inclusive range of bytes in a class.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub(crate) struct ClassRange {
    pub(crate) start: u8,
    pub(crate) end: u8,
}
