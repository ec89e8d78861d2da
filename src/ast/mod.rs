use core::fmt;
use core::mem;

use alloc::{boxed::Box, string::String, vec::Vec};

use crate::matcher::Matcher;

pub(crate) mod parse;

/// Escapes all regular expression meta characters in `pattern`.
///
/// The string returned may be safely used as a literal in a regular
/// expression.
pub fn escape(pattern: &str) -> String {
    let mut buf = String::new();
    buf.reserve(pattern.len());
    for ch in pattern.chars() {
        if is_meta_character(ch) {
            buf.push('\\');
        }
        buf.push(ch);
    }
    buf
}

/// Returns true if the given character has significance in a regex.
///
/// These are the only characters which must be escaped in order to match
/// their literal meaning. Note that `-` is not included: it only carries
/// meaning between two characters inside a class, and a bare `-` outside a
/// class already matches itself.
fn is_meta_character(c: char) -> bool {
    matches!(
        c,
        '.' | '|'
            | '*'
            | '+'
            | '?'
            | '('
            | ')'
            | '<'
            | '>'
            | '['
            | ']'
            | '{'
            | '}'
            | '\\'
            | '^'
            | '$'
    )
}

/// A parsed pattern: the root of the operator tree plus the two anchor
/// flags consumed from the ends of the pattern string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Ast {
    pub(crate) root: Node,
    pub(crate) anchor_start: bool,
    pub(crate) anchor_end: bool,
}

/// A single node of the operator tree.
///
/// Leaves are [`Matcher`]s, so the character classes assembled by the parser
/// are carried unchanged into the automaton. Every quantifier owns a greedy
/// bit; greediness has no effect on the language, only on which bytes the
/// capture groups bind.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Node {
    Leaf(Matcher),
    /// `*`: zero or more repetitions.
    Star { sub: Box<Node>, greedy: bool },
    /// `+`: one or more repetitions.
    Plus { sub: Box<Node>, greedy: bool },
    /// `?`: zero or one occurrence.
    Quest { sub: Box<Node>, greedy: bool },
    /// `{min}`, `{min,}` or `{min,max}`.
    Repeat { sub: Box<Node>, min: u32, max: u32, unbounded: bool, greedy: bool },
    /// `(...)` or `<...>`. Non-capturing groups are spliced out when the
    /// parser closes them, but the variant still carries the flag so that a
    /// tree built by hand lowers correctly.
    Group { sub: Box<Node>, capture: bool },
    /// Two or more nodes matched one after the other.
    Concat(Vec<Node>),
    /// Two or more alternatives, preferred left to right.
    Alternate(Vec<Node>),
}

impl Node {
    pub(crate) fn epsilon() -> Node {
        Node::Leaf(Matcher::Epsilon)
    }

    /// Returns true if this node accepts the empty string.
    pub(crate) fn accept_epsilon(&self) -> bool {
        match *self {
            Node::Leaf(ref matcher) => matcher.len() == 0,
            Node::Star { .. } | Node::Quest { .. } => true,
            Node::Plus { ref sub, .. } => sub.accept_epsilon(),
            Node::Repeat { ref sub, min, .. } => {
                min == 0 || sub.accept_epsilon()
            }
            Node::Group { ref sub, .. } => sub.accept_epsilon(),
            Node::Concat(ref subs) => {
                subs.iter().all(Node::accept_epsilon)
            }
            Node::Alternate(ref subs) => {
                subs.iter().any(Node::accept_epsilon)
            }
        }
    }

    /// The binding strength of this node's operator, used to decide where
    /// the printer must add grouping. Lower is tighter.
    fn priority(&self) -> usize {
        match *self {
            Node::Leaf(_) | Node::Group { .. } => 0,
            Node::Star { .. }
            | Node::Plus { .. }
            | Node::Quest { .. }
            | Node::Repeat { .. } => 1,
            Node::Concat(_) => 2,
            Node::Alternate(_) => 3,
        }
    }
}

/// Rewrites the tree into a smaller equivalent one: nested associative
/// nodes are flattened, counted repetitions collapse into their primitive
/// forms where possible, and directly nested `*`/`+`/`?` pairs merge.
///
/// The rewrites never change the language of the pattern nor the bytes
/// bound by capture group 0.
pub(crate) fn optimize(ast: &mut Ast) {
    optimize_node(&mut ast.root);
}

fn optimize_node(node: &mut Node) {
    match node {
        Node::Leaf(_) => {}
        Node::Star { sub, .. }
        | Node::Plus { sub, .. }
        | Node::Quest { sub, .. }
        | Node::Repeat { sub, .. }
        | Node::Group { sub, .. } => optimize_node(sub),
        Node::Concat(subs) | Node::Alternate(subs) => {
            for sub in subs.iter_mut() {
                optimize_node(sub);
            }
        }
    }
    flatten(node);
    collapse_repeat(node);
    collapse_quantifiers(node);
}

/// Splices the children of a concatenation into a parent concatenation,
/// and likewise for alternations. Scanning right to left keeps earlier
/// positions valid while splicing.
fn flatten(node: &mut Node) {
    let (subs, concat) = match node {
        Node::Concat(subs) => (subs, true),
        Node::Alternate(subs) => (subs, false),
        _ => return,
    };
    let mut i = subs.len();
    while i > 0 {
        i -= 1;
        let same = matches!(
            (&subs[i], concat),
            (Node::Concat(_), true) | (Node::Alternate(_), false)
        );
        if !same {
            continue;
        }
        let inner = match subs.remove(i) {
            Node::Concat(inner) | Node::Alternate(inner) => inner,
            _ => unreachable!("checked to be an associative node"),
        };
        subs.splice(i..i, inner);
    }
}

/// `x{m}{n}` becomes `x{m*n}`, `x{0,}` becomes `x*`, `x{1,}` becomes `x+`
/// and `x{0}` becomes the empty pattern.
fn collapse_repeat(node: &mut Node) {
    if let Node::Repeat { sub, min, max, unbounded, .. } = node {
        if !*unbounded && min == max {
            if let Node::Repeat {
                sub: inner_sub,
                min: inner_min,
                max: inner_max,
                unbounded: false,
                ..
            } = &mut **sub
            {
                if inner_min == inner_max {
                    *min = min.saturating_mul(*inner_min);
                    *max = *min;
                    **sub = take(inner_sub);
                }
            }
        }
    }
    let replacement = match node {
        Node::Repeat { sub, min: 0, unbounded: true, greedy, .. } => {
            Node::Star { sub: Box::new(take(sub)), greedy: *greedy }
        }
        Node::Repeat { sub, min: 1, unbounded: true, greedy, .. } => {
            Node::Plus { sub: Box::new(take(sub)), greedy: *greedy }
        }
        Node::Repeat { min: 0, max: 0, unbounded: false, .. } => {
            Node::epsilon()
        }
        _ => return,
    };
    *node = replacement;
}

/// Merges directly nested `*`/`+`/`?` pairs into a single quantifier,
/// repeating until no pair is left. The greedy bit of the result follows
/// from the pair: both quantifiers must agree to stay greedy, except that
/// `+` keeps its own preference when it can still loop.
fn collapse_quantifiers(node: &mut Node) {
    while merge_quantifier_pair(node) {}
}

fn merge_quantifier_pair(node: &mut Node) -> bool {
    let replacement = match node {
        Node::Star { sub, greedy } => match &mut **sub {
            Node::Star { sub: inner, greedy: inner_greedy } => {
                star(take(inner), *greedy && *inner_greedy)
            }
            // The inner `+` is absorbed; only the star's preference stays.
            Node::Plus { sub: inner, .. } => star(take(inner), *greedy),
            Node::Quest { sub: inner, greedy: inner_greedy } => {
                star(take(inner), *greedy && *inner_greedy)
            }
            _ => return false,
        },
        Node::Plus { sub, greedy } => match &mut **sub {
            Node::Plus { sub: inner, greedy: inner_greedy } => Node::Plus {
                greedy: *greedy || *inner_greedy,
                sub: Box::new(take(inner)),
            },
            Node::Star { sub: inner, greedy: inner_greedy } => {
                star(take(inner), *inner_greedy)
            }
            Node::Quest { sub: inner, greedy: inner_greedy } => {
                if *greedy || !*inner_greedy {
                    star(take(inner), *greedy && *inner_greedy)
                } else {
                    return false;
                }
            }
            _ => return false,
        },
        Node::Quest { sub, greedy } => match &mut **sub {
            Node::Quest { sub: inner, greedy: inner_greedy } => Node::Quest {
                greedy: *greedy && *inner_greedy,
                sub: Box::new(take(inner)),
            },
            Node::Star { sub: inner, greedy: inner_greedy } => {
                star(take(inner), *greedy && *inner_greedy)
            }
            Node::Plus { sub: inner, greedy: inner_greedy } => {
                if !*greedy || *inner_greedy {
                    star(take(inner), *greedy && *inner_greedy)
                } else {
                    return false;
                }
            }
            _ => return false,
        },
        _ => return false,
    };
    *node = replacement;
    true
}

fn star(sub: Node, greedy: bool) -> Node {
    Node::Star { sub: Box::new(sub), greedy }
}

fn take(sub: &mut Node) -> Node {
    mem::replace(sub, Node::epsilon())
}

// Characters the printer escapes, whether or not escaping is strictly
// required in the position at hand. Keep it sorted: lookup is by binary
// search.
const ESCAPED_BY_PRINTER: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^{|}";

fn write_literal(f: &mut fmt::Formatter<'_>, byte: u8) -> fmt::Result {
    if ESCAPED_BY_PRINTER.binary_search(&byte).is_ok() {
        f.write_str("\\")?;
    }
    write!(f, "{}", byte as char)
}

fn write_grouped(
    f: &mut fmt::Formatter<'_>,
    sub: &Node,
    priority: usize,
) -> fmt::Result {
    if sub.priority() > priority {
        write!(f, "({})", sub)
    } else {
        write!(f, "{}", sub)
    }
}

/// A `?` suffix after a quantifier reads as a lazy modifier, so a `?`
/// quantifier applied to a greedy quantifier needs explicit grouping to
/// survive a round trip through the printer.
fn needs_lazy_guard(sub: &Node) -> bool {
    matches!(
        *sub,
        Node::Star { greedy: true, .. }
            | Node::Plus { greedy: true, .. }
            | Node::Quest { greedy: true, .. }
            | Node::Repeat { greedy: true, .. }
    )
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Node::Leaf(Matcher::Epsilon) => Ok(()),
            Node::Leaf(Matcher::Universal) => f.write_str("."),
            Node::Leaf(Matcher::Char(byte)) => write_literal(f, byte),
            Node::Leaf(Matcher::Class(ref class)) => {
                f.write_str("[")?;
                if class.negated {
                    f.write_str("^")?;
                }
                for range in class.ranges.iter() {
                    write_literal(f, range.start)?;
                    if range.start != range.end {
                        f.write_str("-")?;
                        write_literal(f, range.end)?;
                    }
                }
                f.write_str("]")
            }
            Node::Star { ref sub, greedy } => {
                write_grouped(f, sub, self.priority())?;
                write!(f, "*{}", if greedy { "" } else { "?" })
            }
            Node::Plus { ref sub, greedy } => {
                write_grouped(f, sub, self.priority())?;
                write!(f, "+{}", if greedy { "" } else { "?" })
            }
            Node::Quest { ref sub, greedy } => {
                if needs_lazy_guard(sub) {
                    write!(f, "({})", sub)?;
                } else {
                    write_grouped(f, sub, self.priority())?;
                }
                write!(f, "?{}", if greedy { "" } else { "?" })
            }
            Node::Repeat { ref sub, min, max, unbounded, greedy } => {
                if needs_lazy_guard(sub) {
                    write!(f, "({})", sub)?;
                } else {
                    write_grouped(f, sub, self.priority())?;
                }
                write!(f, "{{{}", min)?;
                if unbounded {
                    f.write_str(",")?;
                } else if min != max {
                    write!(f, ",{}", max)?;
                }
                write!(f, "}}{}", if greedy { "" } else { "?" })
            }
            Node::Group { ref sub, capture } => {
                if capture {
                    write!(f, "<{}>", sub)
                } else {
                    write!(f, "({})", sub)
                }
            }
            Node::Concat(ref subs) => {
                for sub in subs.iter() {
                    write_grouped(f, sub, self.priority())?;
                }
                Ok(())
            }
            Node::Alternate(ref subs) => {
                for (i, sub) in subs.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write_grouped(f, sub, self.priority())?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use alloc::string::ToString;

        if self.anchor_start {
            f.write_str("^")?;
        }
        let root = self.root.to_string();
        // A pattern ending in an escaped '$' would lose that '$' to the
        // positional anchor strip when re-parsed; shield it with a
        // throwaway group.
        if !self.anchor_end && ends_with_escaped_dollar(&root) {
            write!(f, "({})", root)?;
        } else {
            f.write_str(&root)?;
        }
        if self.anchor_end {
            f.write_str("$")?;
        }
        Ok(())
    }
}

fn ends_with_escaped_dollar(pattern: &str) -> bool {
    if !pattern.ends_with('$') {
        return false;
    }
    let backslashes = pattern[..pattern.len() - 1]
        .bytes()
        .rev()
        .take_while(|&byte| byte == b'\\')
        .count();
    backslashes % 2 == 1
}

#[cfg(test)]
mod tests {
    use alloc::{
        string::{String, ToString},
        vec,
    };

    use super::*;
    use crate::matcher::{Class, ClassRange};

    fn p(pattern: &str) -> Ast {
        parse::Parser::new(pattern).parse().unwrap()
    }

    fn opt(pattern: &str) -> Ast {
        let mut ast = p(pattern);
        optimize(&mut ast);
        ast
    }

    fn lit(byte: u8) -> Node {
        Node::Leaf(Matcher::Char(byte))
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

    fn repeat(sub: Node, min: u32, max: u32) -> Node {
        Node::Repeat {
            sub: Box::new(sub),
            min,
            max,
            unbounded: false,
            greedy: true,
        }
    }

    #[test]
    fn flatten_concat_from_groups() {
        assert_eq!(
            Node::Concat(vec![lit(b'a'), lit(b'b'), lit(b'c'), lit(b'd')]),
            opt("(ab)(cd)").root,
        );
        assert_eq!(
            Node::Concat(vec![lit(b'a'), lit(b'b'), lit(b'c')]),
            opt("a(bc)").root,
        );
    }

    #[test]
    fn flatten_alternate_from_groups() {
        assert_eq!(
            Node::Alternate(vec![lit(b'a'), lit(b'b'), lit(b'c')]),
            opt("a|(b|c)").root,
        );
        assert_eq!(
            Node::Alternate(vec![lit(b'a'), lit(b'b'), lit(b'c')]),
            opt("(a|b)|c").root,
        );
    }

    #[test]
    fn repeat_exact_collapse() {
        assert_eq!(repeat(lit(b'a'), 6, 6), opt("a{2}{3}").root);
        assert_eq!(repeat(lit(b'a'), 24, 24), opt("a{2}{3}{4}").root);
        // Only exact pairs collapse.
        assert_eq!(
            repeat(repeat(lit(b'a'), 2, 3), 2, 2),
            opt("a{2,3}{2}").root,
        );
    }

    #[test]
    fn repeat_to_primitive() {
        assert_eq!(star(lit(b'a'), true), opt("a{0,}").root);
        assert_eq!(star(lit(b'a'), false), opt("a{0,}?").root);
        assert_eq!(plus(lit(b'a'), true), opt("a{1,}").root);
        assert_eq!(plus(lit(b'a'), false), opt("a{1,}?").root);
        assert_eq!(Node::epsilon(), opt("a{0}").root);
        // An exact single repetition is left alone.
        assert_eq!(repeat(lit(b'a'), 1, 1), opt("a{1}").root);
    }

    #[test]
    fn star_absorbs_inner_quantifiers() {
        assert_eq!(star(lit(b'a'), true), opt("(a*)*").root);
        assert_eq!(star(lit(b'a'), false), opt("(a*?)*").root);
        assert_eq!(star(lit(b'a'), false), opt("(a*)*?").root);
        // An inner plus is absorbed without voting on greediness.
        assert_eq!(star(lit(b'a'), true), opt("(a+?)*").root);
        assert_eq!(star(lit(b'a'), false), opt("(a+)*?").root);
        assert_eq!(star(lit(b'a'), true), opt("(a?)*").root);
        assert_eq!(star(lit(b'a'), false), opt("(a??)*").root);
    }

    #[test]
    fn plus_pairs() {
        assert_eq!(plus(lit(b'a'), true), opt("(a+)+").root);
        assert_eq!(plus(lit(b'a'), true), opt("(a+)+?").root);
        assert_eq!(plus(lit(b'a'), true), opt("(a+?)+").root);
        assert_eq!(plus(lit(b'a'), false), opt("(a+?)+?").root);
        // The outer plus defers to the star it wraps.
        assert_eq!(star(lit(b'a'), true), opt("(a*)+").root);
        assert_eq!(star(lit(b'a'), false), opt("(a*?)+").root);
        assert_eq!(star(lit(b'a'), false), opt("(a*?)+?").root);
    }

    #[test]
    fn quest_pairs() {
        assert_eq!(quest(lit(b'a'), true), opt("(a?)?").root);
        assert_eq!(quest(lit(b'a'), false), opt("(a??)?").root);
        assert_eq!(star(lit(b'a'), true), opt("(a*)?").root);
        assert_eq!(star(lit(b'a'), false), opt("(a*)??").root);
    }

    #[test]
    fn asymmetric_pairs() {
        // ? over + merges only when the pair cannot be told apart from a
        // star with the combined preference.
        assert_eq!(star(lit(b'a'), true), opt("(a+)?").root);
        assert_eq!(star(lit(b'a'), false), opt("(a+?)??").root);
        assert_eq!(
            quest(plus(lit(b'a'), false), true),
            opt("(a+?)?").root,
        );
        // + over ? is the mirror image.
        assert_eq!(star(lit(b'a'), true), opt("(a?)+").root);
        assert_eq!(star(lit(b'a'), false), opt("(a??)+").root);
        assert_eq!(
            plus(quest(lit(b'a'), true), false),
            opt("(a?)+?").root,
        );
    }

    #[test]
    fn cascading_collapse() {
        assert_eq!(star(lit(b'a'), true), opt("((a*)*)*").root);
        assert_eq!(star(lit(b'a'), true), opt("((a+)?)*").root);
    }

    #[test]
    fn collapse_stops_at_captures() {
        assert_eq!(
            star(
                Node::Group {
                    sub: Box::new(star(lit(b'a'), true)),
                    capture: true
                },
                true
            ),
            opt("<a*>*").root,
        );
    }

    #[test]
    fn accept_epsilon_basics() {
        assert!(p("").root.accept_epsilon());
        assert!(p("a*").root.accept_epsilon());
        assert!(p("a?").root.accept_epsilon());
        assert!(p("a{0,3}").root.accept_epsilon());
        assert!(p("a*b*").root.accept_epsilon());
        assert!(p("a|b*").root.accept_epsilon());
        assert!(p("<a*>").root.accept_epsilon());
        assert!(!p("a").root.accept_epsilon());
        assert!(!p(".").root.accept_epsilon());
        assert!(!p("a+").root.accept_epsilon());
        assert!(!p("a{1,3}").root.accept_epsilon());
        assert!(!p("a*b").root.accept_epsilon());
        assert!(!p("a|b").root.accept_epsilon());
        assert!(p("(a+)*").root.accept_epsilon());
    }

    #[test]
    fn escape_round_trip() {
        assert_eq!(r"a\.b", escape("a.b"));
        assert_eq!(r"\<\[\\", escape(r"<[\"));
        let ast = p(&escape(r"1+1=2? (maybe)"));
        assert_eq!(ast, p(r"1\+1=2\? \(maybe\)"));
    }

    fn round_trip(pattern: &str) {
        let first = opt(pattern);
        let printed = first.to_string();
        let mut second = p(&printed);
        optimize(&mut second);
        assert_eq!(printed, second.to_string(), "pattern: {}", pattern);
        assert_eq!(first, second, "pattern: {}", pattern);
    }

    #[test]
    fn print_round_trips() {
        round_trip("");
        round_trip("abc");
        round_trip("^a|bc*$");
        round_trip("a*?b+?c??");
        round_trip("(a*)?");
        round_trip("(a+?)?");
        round_trip("<a|b>*c");
        round_trip("a{2}b{3,}c{4,5}?");
        round_trip("[a-zA-Z0-9._%+\\-]+");
        round_trip("[^a-f][\\^a]");
        round_trip(r"\.\*\(\)\<\>\{\}\\");
        round_trip(r"a^b");
        round_trip(r"a(\$)");
        round_trip(r"<[a-zA-Z0-9._%+\-]+>@<[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}>");
        round_trip(
            r"^<[_a-zA-Z0-9\-]+>://(<[^@:/]+>(:<[^@:/]+>)?@)?<[^@:/]+\.[^@:/]+>(:<[0-9]+>)?(/<.*?>(\?<.*>)?)?$",
        );
    }

    #[test]
    fn print_escapes_trailing_dollar() {
        let ast = p(r"a(\$)");
        assert_eq!(
            Node::Concat(vec![lit(b'a'), lit(b'$')]),
            ast.root,
        );
        assert_eq!(r"(a\$)", ast.to_string());
    }

    #[test]
    fn print_class_forms() {
        assert_eq!("[a-z]", opt("[a-z]").root.to_string());
        assert_eq!("[a-z]", opt("[z-a]").root.to_string());
        assert_eq!("[^0-9a]", opt("[^a0-9]").root.to_string());
        // A one byte class prints as the byte itself.
        assert_eq!("a", opt("[a]").root.to_string());
        assert_eq!(r"\[", opt(r"[\[]").root.to_string());
    }

    #[test]
    fn print_disambiguates_lazy_suffix() {
        assert_eq!("(a*)?", quest(star(lit(b'a'), true), true).to_string());
        assert_eq!("a*??", quest(star(lit(b'a'), false), false).to_string());
        assert_eq!(
            "(a{2})?",
            quest(repeat(lit(b'a'), 2, 2), true).to_string(),
        );
    }

    quickcheck::quickcheck! {
        fn qc_print_round_trip(seed: Vec<u8>) -> quickcheck::TestResult {
            const ALPHABET: &[u8] = b"ab01.*+?|()<>[]{}^$-,\\";
            let pattern: String = seed
                .iter()
                .take(12)
                .map(|&b| ALPHABET[usize::from(b) % ALPHABET.len()] as char)
                .collect();
            let mut first = match parse::Parser::new(&pattern).parse() {
                Ok(ast) => ast,
                Err(_) => return quickcheck::TestResult::discard(),
            };
            optimize(&mut first);
            let printed = first.to_string();
            let mut second = match parse::Parser::new(&printed).parse() {
                Ok(ast) => ast,
                Err(_) => panic!("printed pattern failed to parse: {:?}", printed),
            };
            optimize(&mut second);
            quickcheck::TestResult::from_bool(
                first == second && printed == second.to_string(),
            )
        }
    }

    #[test]
    fn class_helpers_see_normal_form() {
        let Node::Leaf(Matcher::Class(class)) = opt("[a-cb-d]").root else {
            panic!("expected a class leaf");
        };
        assert_eq!(
            Class {
                ranges: vec![ClassRange { start: b'a', end: b'd' }],
                negated: false,
            },
            class,
        );
    }
}
