use core::mem;

use alloc::{boxed::Box, vec, vec::Vec};

use crate::{
    ast::{Ast, Node},
    error::Error,
    matcher::{Class, ClassRange, Matcher},
};

// These are all of the errors that can occur while parsing a pattern. By
// convention, we use each of these messages in exactly one place, so that
// given a message one can precisely identify which branch of the parser
// reported it.
const ERR_CLASS_NESTED: &str = "character classes cannot be nested";
const ERR_CLASS_UNOPENED: &str = "found ']' without a preceding '['";
const ERR_CLASS_EMPTY: &str = "empty character classes are not allowed";
const ERR_CLASS_DASH_FIRST: &str =
    "character class range has no starting endpoint";
const ERR_CLASS_DASH_DANGLING: &str =
    "character class range has no ending endpoint";
const ERR_CLASS_UNCLOSED: &str = "found unclosed character class";
const ERR_REPEAT_ESCAPE: &str =
    "escape sequences are not allowed inside counted repetition";
const ERR_REPEAT_DOUBLE_COMMA: &str =
    "counted repetition has more than one comma";
const ERR_REPEAT_BAD_BYTE: &str =
    "counted repetition may only contain digits, a comma and spaces";
const ERR_REPEAT_UNOPENED: &str = "found '}' without a preceding '{'";
const ERR_REPEAT_INVERTED: &str =
    "counted repetition has a max smaller than its min";
const ERR_REPEAT_UNCLOSED: &str = "found unclosed counted repetition";
const ERR_DANGLING_ESCAPE: &str = "pattern ends with a dangling escape";
const ERR_GROUP_OVERCLOSED: &str =
    "found group closing delimiter without a matching opener";
const ERR_GROUP_MISMATCHED: &str =
    "group delimiters disagree on whether the group captures";
const ERR_GROUP_UNCLOSED: &str =
    "found open group without a closing delimiter";

/// One step of the path from the root of the tree to the active node.
///
/// The parser keeps no parent pointers in the tree. Instead it carries the
/// position where the next element must be placed as an explicit path of
/// child edges, and "climbing" for associativity is popping this path.
#[derive(Clone, Copy, Debug)]
enum Slot {
    /// Descend into the single child of a quantifier or group.
    Sub,
    /// Descend into the i-th child of a concatenation or alternation.
    Child(usize),
}

fn node_at<'n>(mut node: &'n Node, path: &[Slot]) -> &'n Node {
    for slot in path.iter() {
        node = match (node, slot) {
            (
                Node::Star { sub, .. }
                | Node::Plus { sub, .. }
                | Node::Quest { sub, .. }
                | Node::Repeat { sub, .. }
                | Node::Group { sub, .. },
                Slot::Sub,
            ) => &**sub,
            (Node::Concat(subs) | Node::Alternate(subs), Slot::Child(i)) => {
                &subs[*i]
            }
            _ => unreachable!("slot path disagrees with the tree shape"),
        };
    }
    node
}

fn node_at_mut<'n>(mut node: &'n mut Node, path: &[Slot]) -> &'n mut Node {
    for slot in path.iter() {
        node = match (node, slot) {
            (
                Node::Star { sub, .. }
                | Node::Plus { sub, .. }
                | Node::Quest { sub, .. }
                | Node::Repeat { sub, .. }
                | Node::Group { sub, .. },
                Slot::Sub,
            ) => &mut **sub,
            (Node::Concat(subs) | Node::Alternate(subs), Slot::Child(i)) => {
                &mut subs[*i]
            }
            _ => unreachable!("slot path disagrees with the tree shape"),
        };
    }
    node
}

/// The in-progress state of a `[...]` environment.
#[derive(Debug)]
struct ClassBuilder {
    class: Class,
    /// Set between the `-` of a range and its ending endpoint.
    pending_range: bool,
}

/// The in-progress state of a `{...}` environment. The digits themselves
/// accumulate directly into the `Repeat` node sitting at the active slot.
#[derive(Debug)]
struct RepeatBuilder {
    /// Whether the comma separating min from max has been seen.
    comma: bool,
    /// Whether any digit has been seen after the comma.
    max_digits: bool,
}

/// A single forward pass over the pattern string.
///
/// The pattern is consumed byte by byte; `[...]` and `{...}` run as small
/// sub-environments, everything else manipulates the tree through the slot
/// path. Anchors are consumed positionally before the scan starts.
#[derive(Debug)]
pub(crate) struct Parser<'p> {
    pattern: &'p str,
    root: Node,
    path: Vec<Slot>,
    /// Opened minus closed groups so far. Going negative is an error.
    open_groups: isize,
    /// The next byte is taken literally.
    escaped: bool,
    /// A `?` in this position flips the preceding quantifier to lazy.
    lazy_suffix: bool,
    class: Option<ClassBuilder>,
    repeat: Option<RepeatBuilder>,
}

impl<'p> Parser<'p> {
    pub(crate) fn new(pattern: &'p str) -> Parser<'p> {
        Parser {
            pattern,
            root: Node::epsilon(),
            path: vec![],
            open_groups: 0,
            escaped: false,
            lazy_suffix: false,
            class: None,
            repeat: None,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Ast, Error> {
        let mut bytes = self.pattern.as_bytes();
        let mut anchor_start = false;
        let mut anchor_end = false;
        if !bytes.is_empty() {
            anchor_start = bytes[0] == b'^';
            anchor_end = bytes[bytes.len() - 1] == b'$';
            if anchor_start {
                bytes = &bytes[1..];
            }
            if anchor_end {
                bytes = &bytes[..bytes.len() - 1];
            }
        }
        for &byte in bytes.iter() {
            self.step(byte)?;
        }
        if self.open_groups != 0 {
            return Err(Error::unbalanced_brackets(ERR_GROUP_UNCLOSED));
        }
        if self.class.is_some() {
            return Err(Error::syntax(ERR_CLASS_UNCLOSED));
        }
        if self.repeat.is_some() {
            return Err(Error::syntax(ERR_REPEAT_UNCLOSED));
        }
        if self.escaped {
            return Err(Error::syntax(ERR_DANGLING_ESCAPE));
        }
        Ok(Ast { root: self.root, anchor_start, anchor_end })
    }

    /// The node the next concatenated or quantified element applies to.
    fn active(&self) -> &Node {
        node_at(&self.root, &self.path)
    }

    fn active_mut(&mut self) -> &mut Node {
        node_at_mut(&mut self.root, &self.path)
    }

    /// The parent of the active node, if the active node is not the root.
    fn parent(&self) -> Option<&Node> {
        match self.path.len() {
            0 => None,
            n => Some(node_at(&self.root, &self.path[..n - 1])),
        }
    }

    /// Replaces the active node with a wrapper built around it.
    fn wrap_active(&mut self, wrap: impl FnOnce(Box<Node>) -> Node) {
        let slot = self.active_mut();
        let sub = mem::replace(slot, Node::epsilon());
        *slot = wrap(Box::new(sub));
    }

    fn step(&mut self, byte: u8) -> Result<(), Error> {
        if byte == b'\\' && !self.escaped {
            self.lazy_suffix = false;
            self.escaped = true;
            return Ok(());
        }

        // Inside [...], bytes accumulate into the class. An unescaped ']'
        // falls through: the finished class concatenates like any atom.
        if let Some(ref mut builder) = self.class {
            debug_assert!(self.repeat.is_none() && !self.lazy_suffix);
            if byte == b'[' && !self.escaped {
                return Err(Error::syntax(ERR_CLASS_NESTED));
            }
            if !(byte == b']' && !self.escaped) {
                if byte == b'^' && !self.escaped {
                    builder.class.negated = true;
                } else if byte == b'-' && !self.escaped {
                    if builder.class.ranges.is_empty() {
                        return Err(Error::syntax(ERR_CLASS_DASH_FIRST));
                    }
                    builder.pending_range = true;
                } else if builder.pending_range {
                    let range = builder
                        .class
                        .ranges
                        .last_mut()
                        .expect("a range start precedes every dash");
                    range.end = byte;
                    builder.pending_range = false;
                } else {
                    builder
                        .class
                        .ranges
                        .push(ClassRange { start: byte, end: byte });
                }
                self.escaped = false;
                return Ok(());
            }
        }

        if byte == b'[' && !self.escaped {
            self.class =
                Some(ClassBuilder { class: Class::default(), pending_range: false });
            self.lazy_suffix = false;
            return Ok(());
        } else if byte == b']' && !self.escaped {
            match self.class {
                None => return Err(Error::syntax(ERR_CLASS_UNOPENED)),
                Some(ref builder) if builder.pending_range => {
                    return Err(Error::syntax(ERR_CLASS_DASH_DANGLING));
                }
                // The class is finished; it concatenates below.
                Some(_) => {}
            }
        }

        // Inside {...}, digits accumulate into the wrapped Repeat node.
        if self.repeat.is_some() {
            debug_assert!(self.class.is_none() && !self.lazy_suffix);
            if self.escaped {
                return Err(Error::syntax(ERR_REPEAT_ESCAPE));
            }
            if byte != b'}' {
                match byte {
                    b',' => {
                        let state = self
                            .repeat
                            .as_mut()
                            .expect("repeat environment is open");
                        if state.comma {
                            return Err(Error::syntax(ERR_REPEAT_DOUBLE_COMMA));
                        }
                        state.comma = true;
                    }
                    b'0'..=b'9' => {
                        let comma = self
                            .repeat
                            .as_ref()
                            .map_or(false, |state| state.comma);
                        if comma {
                            if let Some(state) = self.repeat.as_mut() {
                                state.max_digits = true;
                            }
                        }
                        let digit = u32::from(byte - b'0');
                        let Node::Repeat { min, max, .. } = self.active_mut()
                        else {
                            unreachable!(
                                "the active node was wrapped when '{{' opened"
                            )
                        };
                        let bound = if comma { max } else { min };
                        *bound = bound.saturating_mul(10).saturating_add(digit);
                    }
                    b' ' => {}
                    _ => return Err(Error::syntax(ERR_REPEAT_BAD_BYTE)),
                }
                return Ok(());
            }
        }

        if byte == b'{' && !self.escaped {
            self.repeat = Some(RepeatBuilder { comma: false, max_digits: false });
            self.wrap_active(|sub| Node::Repeat {
                sub,
                min: 0,
                max: 0,
                unbounded: false,
                greedy: true,
            });
            self.lazy_suffix = false;
            return Ok(());
        } else if byte == b'}' && !self.escaped {
            let Some(state) = self.repeat.take() else {
                return Err(Error::syntax(ERR_REPEAT_UNOPENED));
            };
            let Node::Repeat { min, max, unbounded, .. } = self.active_mut()
            else {
                unreachable!("the active node was wrapped when '{{' opened")
            };
            if !state.comma {
                // {m} means exactly m.
                *max = *min;
            } else if state.max_digits {
                if *max < *min {
                    return Err(Error::syntax(ERR_REPEAT_INVERTED));
                }
            } else {
                // {m,} means at least m.
                *unbounded = true;
            }
            self.lazy_suffix = true;
            return Ok(());
        }

        if !self.escaped && (byte == b')' || byte == b'>') {
            self.close_group(byte)?;
            self.lazy_suffix = false;
        } else if byte == b'*' && !self.escaped {
            self.wrap_active(|sub| Node::Star { sub, greedy: true });
            self.lazy_suffix = true;
        } else if byte == b'+' && !self.escaped {
            self.wrap_active(|sub| Node::Plus { sub, greedy: true });
            self.lazy_suffix = true;
        } else if byte == b'?' && !self.escaped && !self.lazy_suffix {
            self.wrap_active(|sub| Node::Quest { sub, greedy: true });
            self.lazy_suffix = true;
        } else if byte == b'?' && self.lazy_suffix {
            debug_assert!(!self.escaped);
            match self.active_mut() {
                Node::Star { greedy, .. }
                | Node::Plus { greedy, .. }
                | Node::Quest { greedy, .. }
                | Node::Repeat { greedy, .. } => *greedy = false,
                _ => {}
            }
            self.lazy_suffix = false;
        } else if byte == b'|' && !self.escaped {
            self.alternate();
            self.lazy_suffix = false;
        } else {
            let atom = if !self.escaped && (byte == b'(' || byte == b'<') {
                self.open_groups += 1;
                Node::Group {
                    sub: Box::new(Node::epsilon()),
                    capture: byte == b'<',
                }
            } else if byte == b']' && !self.escaped {
                let builder = self
                    .class
                    .take()
                    .expect("the class environment got us here");
                let mut class = builder.class;
                class.normalize();
                if class.is_empty() {
                    return Err(Error::syntax(ERR_CLASS_EMPTY));
                }
                match class.as_single() {
                    Some(single) => Node::Leaf(Matcher::Char(single)),
                    None => Node::Leaf(Matcher::Class(class)),
                }
            } else if byte == b'.' && !self.escaped {
                Node::Leaf(Matcher::Universal)
            } else {
                Node::Leaf(Matcher::Char(byte))
            };
            self.concatenate(atom);
            self.lazy_suffix = false;
        }

        self.escaped = false;
        Ok(())
    }

    /// Closes the innermost open group. Non-capturing groups are spliced
    /// out on the spot: their child takes their place in the tree.
    fn close_group(&mut self, byte: u8) -> Result<(), Error> {
        self.open_groups -= 1;
        if self.open_groups < 0 {
            return Err(Error::unbalanced_brackets(ERR_GROUP_OVERCLOSED));
        }
        loop {
            self.path.pop();
            if self.path.is_empty()
                || matches!(self.active(), Node::Group { .. })
            {
                break;
            }
        }
        let capture = match self.active() {
            Node::Group { capture, .. } => *capture,
            _ => unreachable!("an open group is always on the slot path"),
        };
        if (capture && byte == b')') || (!capture && byte == b'>') {
            return Err(Error::unbalanced_brackets(ERR_GROUP_MISMATCHED));
        }
        if !capture {
            let slot = self.active_mut();
            let sub = match mem::replace(slot, Node::epsilon()) {
                Node::Group { sub, .. } => sub,
                _ => unreachable!("just observed a group at this slot"),
            };
            *slot = *sub;
        }
        Ok(())
    }

    /// Handles `|`: climbs to the alternation this branch belongs to, or
    /// builds one, then opens a fresh empty branch.
    fn alternate(&mut self) {
        while !self.path.is_empty()
            && !matches!(self.active(), Node::Alternate(_))
            && !matches!(self.parent(), Some(Node::Group { .. }))
        {
            self.path.pop();
        }
        if matches!(self.active(), Node::Alternate(_)) {
            let end = {
                let Node::Alternate(subs) = self.active_mut() else {
                    unreachable!("just observed an alternation here")
                };
                subs.push(Node::epsilon());
                subs.len() - 1
            };
            self.path.push(Slot::Child(end));
        } else {
            self.wrap_active(|sub| {
                Node::Alternate(vec![*sub, Node::epsilon()])
            });
            self.path.push(Slot::Child(1));
        }
    }

    /// Places an atom after the active node, extending or creating the
    /// enclosing concatenation.
    fn concatenate(&mut self, atom: Node) {
        if matches!(self.parent(), Some(Node::Concat(_))) {
            self.path.pop();
        }
        if matches!(self.active(), Node::Leaf(Matcher::Epsilon)) {
            *self.active_mut() = atom;
        } else if matches!(self.active(), Node::Concat(_)) {
            let end = {
                let Node::Concat(subs) = self.active_mut() else {
                    unreachable!("just observed a concatenation here")
                };
                subs.push(atom);
                subs.len() - 1
            };
            self.path.push(Slot::Child(end));
        } else {
            self.wrap_active(|sub| Node::Concat(vec![*sub, atom]));
            self.path.push(Slot::Child(1));
        }
        // Entering a group: the next atom lands inside it.
        if matches!(self.active(), Node::Group { .. }) {
            self.path.push(Slot::Sub);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::ToString, vec::Vec};

    use super::*;
    use crate::error::ErrorKind;

    fn p(pattern: &str) -> Ast {
        Parser::new(pattern).parse().unwrap()
    }

    fn perr(pattern: &str) -> Error {
        Parser::new(pattern).parse().unwrap_err()
    }

    fn lit(byte: u8) -> Node {
        Node::Leaf(Matcher::Char(byte))
    }

    fn cat(subs: Vec<Node>) -> Node {
        Node::Concat(subs)
    }

    fn alt(subs: Vec<Node>) -> Node {
        Node::Alternate(subs)
    }

    fn star(sub: Node, greedy: bool) -> Node {
        Node::Star { sub: Box::new(sub), greedy }
    }

    fn plus(sub: Node, greedy: bool) -> Node {
        Node::Plus { sub: Box::new(sub), greedy }
    }

    fn quest(sub: Node, greedy: bool) -> Node {
        Node::Quest { sub: Box::new(sub), greedy }
    }

    fn group(sub: Node) -> Node {
        Node::Group { sub: Box::new(sub), capture: true }
    }

    fn class(ranges: &[(u8, u8)], negated: bool) -> Node {
        Node::Leaf(Matcher::Class(Class {
            ranges: ranges
                .iter()
                .map(|&(start, end)| ClassRange { start, end })
                .collect(),
            negated,
        }))
    }

    #[test]
    fn literals() {
        assert_eq!(Node::epsilon(), p("").root);
        assert_eq!(lit(b'a'), p("a").root);
        assert_eq!(cat(vec![lit(b'a'), lit(b'b')]), p("ab").root);
        assert_eq!(
            cat(vec![lit(b'a'), lit(b'b'), lit(b'c')]),
            p("abc").root,
        );
    }

    #[test]
    fn escaped_literals() {
        assert_eq!(lit(b'*'), p(r"\*").root);
        assert_eq!(lit(b'\\'), p(r"\\").root);
        assert_eq!(
            cat(vec![lit(b'a'), lit(b'|'), lit(b'b')]),
            p(r"a\|b").root,
        );
        assert_eq!(cat(vec![lit(b'{'), lit(b'}')]), p(r"\{\}").root);
    }

    #[test]
    fn anchors_at_the_ends() {
        let ast = p("^a$");
        assert!(ast.anchor_start);
        assert!(ast.anchor_end);
        assert_eq!(lit(b'a'), ast.root);

        let ast = p("^");
        assert!(ast.anchor_start);
        assert!(!ast.anchor_end);
        assert_eq!(Node::epsilon(), ast.root);

        let ast = p("$");
        assert!(!ast.anchor_start);
        assert!(ast.anchor_end);
        assert_eq!(Node::epsilon(), ast.root);

        let ast = p("^$");
        assert!(ast.anchor_start && ast.anchor_end);
        assert_eq!(Node::epsilon(), ast.root);
    }

    #[test]
    fn anchors_elsewhere_are_literals() {
        assert_eq!(
            cat(vec![lit(b'a'), lit(b'^'), lit(b'b')]),
            p("a^b").root,
        );
        assert_eq!(
            cat(vec![lit(b'a'), lit(b'$'), lit(b'b')]),
            p("a$b").root,
        );
    }

    #[test]
    fn alternation_is_flat() {
        assert_eq!(
            alt(vec![lit(b'a'), lit(b'b'), lit(b'c')]),
            p("a|b|c").root,
        );
        assert_eq!(
            alt(vec![
                cat(vec![lit(b'a'), lit(b'b')]),
                cat(vec![lit(b'c'), lit(b'd')]),
            ]),
            p("ab|cd").root,
        );
        assert_eq!(alt(vec![Node::epsilon(), lit(b'a')]), p("|a").root);
        assert_eq!(alt(vec![lit(b'a'), Node::epsilon()]), p("a|").root);
    }

    #[test]
    fn quantifiers_bind_tightest() {
        assert_eq!(
            cat(vec![lit(b'a'), star(lit(b'b'), true)]),
            p("ab*").root,
        );
        assert_eq!(
            alt(vec![lit(b'a'), star(lit(b'b'), true)]),
            p("a|b*").root,
        );
        assert_eq!(star(Node::epsilon(), true), p("*").root);
        assert_eq!(star(star(lit(b'a'), true), true), p("a**").root);
    }

    #[test]
    fn lazy_suffix() {
        assert_eq!(star(lit(b'a'), false), p("a*?").root);
        assert_eq!(plus(lit(b'a'), false), p("a+?").root);
        assert_eq!(quest(lit(b'a'), false), p("a??").root);
        // The suffix applies once; a third '?' starts a new quantifier.
        assert_eq!(quest(quest(lit(b'a'), false), true), p("a???").root);
        // A quantifier right after a group close is a new quantifier.
        assert_eq!(quest(star(lit(b'a'), true), true), p("(a*)?").root);
        assert_eq!(star(quest(lit(b'a'), false), true), p("a??*").root);
    }

    #[test]
    fn counted_repetition() {
        let repeat = |min, max, unbounded, greedy| Node::Repeat {
            sub: Box::new(lit(b'a')),
            min,
            max,
            unbounded,
            greedy,
        };
        assert_eq!(repeat(2, 2, false, true), p("a{2}").root);
        assert_eq!(repeat(2, 0, true, true), p("a{2,}").root);
        assert_eq!(repeat(2, 4, false, true), p("a{2,4}").root);
        assert_eq!(repeat(2, 4, false, false), p("a{2,4}?").root);
        assert_eq!(repeat(2, 4, false, true), p("a{ 2 , 4 }").root);
        // Spaces are ignored even between digits.
        assert_eq!(repeat(12, 12, false, true), p("a{1 2}").root);
        assert_eq!(repeat(0, 0, false, true), p("a{}").root);
        // The repetition wraps whatever came just before it.
        assert_eq!(
            cat(vec![lit(b'a'), repeat(3, 3, false, true)]),
            p("aa{3}").root,
        );
        assert_eq!(
            Node::Repeat {
                sub: Box::new(Node::epsilon()),
                min: 2,
                max: 2,
                unbounded: false,
                greedy: true,
            },
            p("{2}").root,
        );
    }

    #[test]
    fn groups() {
        assert_eq!(cat(vec![lit(b'a'), lit(b'b')]), p("(ab)").root);
        assert_eq!(group(cat(vec![lit(b'a'), lit(b'b')])), p("<ab>").root);
        assert_eq!(Node::epsilon(), p("()").root);
        assert_eq!(group(Node::epsilon()), p("<>").root);
        assert_eq!(
            cat(vec![
                lit(b'a'),
                group(cat(vec![lit(b'b'), lit(b'c')])),
                lit(b'd'),
            ]),
            p("a<bc>d").root,
        );
        assert_eq!(
            group(cat(vec![lit(b'a'), group(lit(b'b')), lit(b'c')])),
            p("<a<b>c>").root,
        );
        // A quantifier after a close binds to the whole group.
        assert_eq!(
            Node::Repeat {
                sub: Box::new(cat(vec![lit(b'a'), lit(b'b')])),
                min: 2,
                max: 2,
                unbounded: false,
                greedy: true,
            },
            p("(ab){2}").root,
        );
        // Alternation stays inside its group.
        assert_eq!(
            cat(vec![alt(vec![lit(b'a'), lit(b'b')]), lit(b'c')]),
            p("(a|b)c").root,
        );
    }

    #[test]
    fn classes() {
        assert_eq!(class(&[(b'a', b'c')], false), p("[a-c]").root);
        assert_eq!(class(&[(b'a', b'z')], true), p("[^a-z]").root);
        // Endpoints are reordered during normalization.
        assert_eq!(class(&[(b'a', b'z')], false), p("[z-a]").root);
        // Touching ranges merge.
        assert_eq!(class(&[(b'a', b'd')], false), p("[a-cb-d]").root);
        // A class of one byte degrades to that byte.
        assert_eq!(lit(b'a'), p("[a]").root);
        assert_eq!(lit(b'-'), p(r"[\-]").root);
        // '.' has no special meaning inside a class.
        assert_eq!(lit(b'.'), p("[.]").root);
        // An escaped dash is an ordinary set member.
        assert_eq!(
            class(&[(b'-', b'-'), (b'a', b'a'), (b'z', b'z')], false),
            p(r"[a\-z]").root,
        );
        // A negation may appear anywhere in the class.
        assert_eq!(class(&[(b'a', b'a')], true), p("[a^]").root);
        // The strange range-after-range form keeps the first start.
        assert_eq!(class(&[(b'a', b'e')], false), p("[a-c-e]").root);
    }

    #[test]
    fn class_quantified() {
        assert_eq!(
            star(class(&[(b'0', b'9')], false), false),
            p("[0-9]*?").root,
        );
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(ErrorKind::Syntax, perr("[a[b]").kind());
        assert_eq!(ErrorKind::Syntax, perr("a]").kind());
        assert_eq!(ErrorKind::Syntax, perr("[]").kind());
        assert_eq!(ErrorKind::Syntax, perr("[-a]").kind());
        assert_eq!(ErrorKind::Syntax, perr("[a-]").kind());
        assert_eq!(ErrorKind::Syntax, perr("[ab").kind());
        assert_eq!(ErrorKind::Syntax, perr(r"a{\2}").kind());
        assert_eq!(ErrorKind::Syntax, perr("a{1,2,3}").kind());
        assert_eq!(ErrorKind::Syntax, perr("a{x}").kind());
        assert_eq!(ErrorKind::Syntax, perr("a}").kind());
        assert_eq!(ErrorKind::Syntax, perr("a{4,2}").kind());
        assert_eq!(ErrorKind::Syntax, perr("a{2").kind());
        assert_eq!(ErrorKind::Syntax, perr("a\\").kind());
        // A trailing '$' is consumed as an anchor first, which can leave
        // an escape with nothing to escape.
        assert_eq!(ErrorKind::Syntax, perr(r"a\$").kind());
    }

    #[test]
    fn unbalanced_errors() {
        assert_eq!(ErrorKind::UnbalancedBrackets, perr("(a").kind());
        assert_eq!(ErrorKind::UnbalancedBrackets, perr("<a").kind());
        assert_eq!(ErrorKind::UnbalancedBrackets, perr("a)").kind());
        assert_eq!(ErrorKind::UnbalancedBrackets, perr("a>").kind());
        assert_eq!(ErrorKind::UnbalancedBrackets, perr("(a>").kind());
        assert_eq!(ErrorKind::UnbalancedBrackets, perr("<a)").kind());
        assert_eq!(ErrorKind::UnbalancedBrackets, perr("(a))").kind());
    }

    #[test]
    fn error_messages_are_stable() {
        assert_eq!(ERR_CLASS_EMPTY, perr("[]").to_string());
        assert_eq!(ERR_GROUP_UNCLOSED, perr("(a").to_string());
        assert_eq!(ERR_GROUP_MISMATCHED, perr("<a)").to_string());
    }
}
