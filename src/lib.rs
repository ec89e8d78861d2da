/*!
A small regex engine that compiles a pattern into a non-deterministic finite
automaton and runs it over byte strings.

A pattern is matched against the *whole* input: `^` and `$` only pin the
match when they appear at the very ends of the pattern, and an unanchored
end behaves as if the pattern were padded with `.*`. Capturing groups are
written `<...>` while `(...)` groups without capturing.

```
use regex_nfa::Regex;

let re = Regex::new(r"<[a-z.]+>@<[a-z.]+>").unwrap();
assert!(re.is_match(b"john.doe@example.com"));

let caps = re.captures(b"john.doe@example.com").unwrap();
assert_eq!(&caps[1], b"john.doe");
assert_eq!(&caps[2], b"example.com");
```

Two execution strategies back the public API: [`Regex::is_match`] runs a
subset-construction simulation that answers acceptance in time linear in the
input, while [`Regex::captures`] runs a depth-first backtracking walk that
recovers the bytes bound by each capture group.
*/

#![no_std]
// I'm not ideologically opposed to allowing non-safe code in this crate, but
// IMO it needs really excellent justification. Everything here is vectors,
// integers and recursion over them, so there is no obvious candidate.
#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[cfg(not(feature = "std"))]
compile_error!("'std' is currently a required feature, please file an issue");

extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

pub use self::{
    ast::escape,
    error::{Error, ErrorKind},
    regex::*,
};

mod ast;
mod backtrack;
mod error;
mod matcher;
mod nfa;
mod powerset;
mod regex;
