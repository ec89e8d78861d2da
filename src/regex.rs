use core::fmt;

use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use crate::{
    ast::{self, parse::Parser},
    backtrack::{self, Span},
    error::Error,
    nfa::NFA,
    powerset,
};

/// A compiled regular expression.
///
/// A `Regex` decides membership of whole byte strings: the pattern either
/// anchors itself with `^`/`$` or is padded with an implicit `.*` on the
/// unanchored ends. [`Regex::is_match`] answers acceptance via a subset
/// construction simulation; [`Regex::captures`] recovers capture groups via
/// backtracking.
///
/// Capturing groups are written `<...>`; `(...)` only groups.
///
/// # Example
///
/// ```
/// use regex_nfa::Regex;
///
/// let re = Regex::new(r"^<[0-9]{4}>-<[0-9]{2}>$").unwrap();
/// let caps = re.captures(b"2023-07").unwrap();
/// assert_eq!(b"2023", &caps[1]);
/// assert_eq!(b"07", &caps[2]);
/// ```
#[derive(Clone)]
pub struct Regex {
    pattern: String,
    nfa: NFA,
}

impl Regex {
    /// Compiles a pattern with the default configuration: both the AST and
    /// the NFA optimization passes enabled.
    ///
    /// ```
    /// use regex_nfa::Regex;
    ///
    /// let re = Regex::new("(a|b)*c").unwrap();
    /// assert!(re.is_match(b"abac"));
    /// assert!(!re.is_match(b"abab"));
    /// ```
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        RegexBuilder::new(pattern).build()
    }

    /// Returns true if the haystack belongs to the language of this
    /// pattern. Runs the subset-construction simulation: linear in the
    /// haystack, no backtracking.
    pub fn is_match(&self, haystack: &[u8]) -> bool {
        powerset::accepts(&self.nfa, haystack)
    }

    /// Runs the backtracking simulation and returns the bytes bound by
    /// each capture group, or `None` if the haystack does not match.
    ///
    /// This returns `Some` exactly when [`Regex::is_match`] returns true.
    ///
    /// ```
    /// use regex_nfa::Regex;
    ///
    /// // A lazy counted repetition binds as little as it can.
    /// let re = Regex::new("a{2,4}?").unwrap();
    /// let caps = re.captures(b"aaaa").unwrap();
    /// assert_eq!(b"aa", &caps[0]);
    /// ```
    pub fn captures<'h>(&self, haystack: &'h [u8]) -> Option<Captures<'h>> {
        let spans = backtrack::find(&self.nfa, haystack)?;
        Some(Captures { haystack, spans })
    }

    /// Returns the pattern string this regex was compiled from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns the number of capture groups, counting the implicit group 0
    /// that spans the whole match.
    pub fn captures_len(&self) -> usize {
        self.nfa.group_len()
    }

    /// Returns true if this pattern accepts the empty input.
    ///
    /// ```
    /// use regex_nfa::Regex;
    ///
    /// assert!(Regex::new("a*").unwrap().is_match_empty());
    /// assert!(!Regex::new("a+").unwrap().is_match_empty());
    /// ```
    pub fn is_match_empty(&self) -> bool {
        self.nfa.is_match_empty()
    }
}

impl fmt::Display for Regex {
    /// Shows the original pattern string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Regex").field(&self.pattern).finish()
    }
}

impl core::str::FromStr for Regex {
    type Err = Error;

    fn from_str(pattern: &str) -> Result<Regex, Error> {
        Regex::new(pattern)
    }
}

/// A builder for a [`Regex`], for when the default configuration is not
/// wanted.
///
/// The only knob is `optimize`: with it off, the pattern is lowered
/// exactly as parsed, with no AST rewrites and no NFA splicing. The
/// language and the bytes bound to group 0 are the same either way; the
/// unoptimized form mostly serves to cross-check the optimizers.
#[derive(Clone, Debug)]
pub struct RegexBuilder {
    pattern: String,
    optimize: bool,
}

impl RegexBuilder {
    /// Creates a new builder with the default configuration for the given
    /// pattern.
    pub fn new(pattern: &str) -> RegexBuilder {
        RegexBuilder { pattern: pattern.to_string(), optimize: true }
    }

    /// Enables or disables the optimization passes. Enabled by default.
    pub fn optimize(&mut self, yes: bool) -> &mut RegexBuilder {
        self.optimize = yes;
        self
    }

    /// Compiles the pattern given to `RegexBuilder::new` with the
    /// configuration set on this builder.
    pub fn build(&self) -> Result<Regex, Error> {
        let mut parsed = Parser::new(&self.pattern).parse()?;
        if self.optimize {
            ast::optimize(&mut parsed);
        }
        let nfa = NFA::new(&parsed, self.optimize);
        Ok(Regex { pattern: self.pattern.clone(), nfa })
    }
}

/// The bytes bound by a single capture group in a single match.
#[derive(Clone, Copy)]
pub struct Match<'h> {
    haystack: &'h [u8],
    start: usize,
    end: usize,
}

impl<'h> Match<'h> {
    /// The starting byte offset of the group in the haystack.
    pub fn start(&self) -> usize {
        self.start
    }

    /// The ending byte offset of the group, exclusive.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Returns true if this group bound no bytes.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The number of bytes this group bound.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// The range of the group, in byte offsets.
    pub fn range(&self) -> core::ops::Range<usize> {
        self.start..self.end
    }

    /// The bytes bound by the group.
    pub fn as_bytes(&self) -> &'h [u8] {
        &self.haystack[self.start..self.end]
    }
}

impl<'h> fmt::Debug for Match<'h> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("bytes", &self.as_bytes())
            .finish()
    }
}

/// The result of a successful backtracking run: one entry per capture
/// group. Group 0 spans the whole match; a group inside an alternative or
/// an option that was not taken has no entry.
#[derive(Clone)]
pub struct Captures<'h> {
    haystack: &'h [u8],
    spans: Vec<Option<Span>>,
}

impl<'h> Captures<'h> {
    /// Returns the match of the group at the given index, or `None` if the
    /// group exists but did not participate in the match or the index is
    /// out of range.
    pub fn get(&self, index: usize) -> Option<Match<'h>> {
        let &(start, end) = self.spans.get(index)?.as_ref()?;
        Some(Match { haystack: self.haystack, start, end })
    }

    /// The number of capture groups, participating or not. This always
    /// equals [`Regex::captures_len`] on the regex that produced these
    /// captures.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Returns true if there are no groups at all. Group 0 always exists,
    /// so this is never true for captures produced by a match.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Iterates over all groups in index order, yielding `None` for groups
    /// that did not participate.
    pub fn iter<'c>(&'c self) -> SubCaptures<'c, 'h> {
        SubCaptures { captures: self, index: 0 }
    }
}

impl<'h> fmt::Debug for Captures<'h> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Returns the bytes of the group at the given index.
///
/// # Panics
///
/// Panics if the group did not participate in the match or the index is
/// out of range. Use [`Captures::get`] for the checked variant.
impl<'h> core::ops::Index<usize> for Captures<'h> {
    type Output = [u8];

    fn index(&self, index: usize) -> &[u8] {
        self.get(index)
            .map(|m| m.as_bytes())
            .unwrap_or_else(|| panic!("no group at index '{}'", index))
    }
}

/// An iterator over the groups of one [`Captures`] value.
#[derive(Clone, Debug)]
pub struct SubCaptures<'c, 'h> {
    captures: &'c Captures<'h>,
    index: usize,
}

impl<'c, 'h> Iterator for SubCaptures<'c, 'h> {
    type Item = Option<Match<'h>>;

    fn next(&mut self) -> Option<Option<Match<'h>>> {
        if self.index >= self.captures.len() {
            return None;
        }
        let item = self.captures.get(self.index);
        self.index += 1;
        Some(item)
    }
}
