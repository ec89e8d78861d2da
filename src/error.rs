/// An error that occurred during parsing a regular expression.
///
/// A parse error occurs when the syntax of the regex pattern is not valid.
/// Compilation of a parsed pattern to an NFA cannot fail.
///
/// Callers that need to distinguish grouping mistakes from everything else
/// can inspect [`Error::kind`]. Beyond that, the only thing you can do with
/// an error is convert it to a string as a human readable message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    msg: &'static str,
}

/// The category of a parse error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A malformed pattern: a bad character class, a bad counted repetition,
    /// a dangling escape and so on.
    Syntax,
    /// A grouping mistake: an unclosed group, a close without an open, or an
    /// open and close that disagree on capturing.
    UnbalancedBrackets,
}

impl Error {
    pub(crate) fn syntax(msg: &'static str) -> Error {
        Error { kind: ErrorKind::Syntax, msg }
    }

    pub(crate) fn unbalanced_brackets(msg: &'static str) -> Error {
        Error { kind: ErrorKind::UnbalancedBrackets, msg }
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.msg)
    }
}
