use core::fmt;

use alloc::{vec, vec::Vec};

use log::{debug, trace};

use crate::{
    ast::{Ast, Node},
    matcher::Matcher,
};

pub(crate) type StateID = u32;
pub(crate) type MatcherID = u32;

/// The capture-group boundaries attached to a transition: traversing the
/// transition begins the capture of every group in `opens` and ends the
/// capture of every group in `closes`. A transition carries an annotation
/// only if at least one of the two sets is non-empty.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Annotation {
    pub(crate) opens: Vec<u32>,
    pub(crate) closes: Vec<u32>,
}

/// One half of a transition. In a state's `transitions` list, `state` is
/// the target; in a state's `reverse` list, `state` is the source. The two
/// lists mirror each other exactly, across the whole automaton.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Link {
    pub(crate) matcher: MatcherID,
    pub(crate) state: StateID,
    pub(crate) annotation: Option<Annotation>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct State {
    pub(crate) initial: bool,
    pub(crate) accepting: bool,
    /// Outgoing transitions, in preference order. The backtracking walker
    /// tries them front to back, so this order is what makes a quantifier
    /// greedy or lazy.
    pub(crate) transitions: Vec<Link>,
    /// The mirror image of every transition pointing at this state.
    pub(crate) reverse: Vec<Link>,
}

/// A non-deterministic finite automaton with capture annotations.
///
/// States are addressed by dense index. Matchers live in a side table and
/// transitions refer to them by index; every transition owns a distinct
/// entry, so a matcher index also identifies its transition uniquely.
#[derive(Clone)]
pub(crate) struct NFA {
    states: Vec<State>,
    matchers: Vec<Matcher>,
    group_len: u32,
    is_match_empty: bool,
}

impl NFA {
    /// Lowers a parsed pattern into an automaton with exactly one initial
    /// and one accepting state. Group 0 wraps the whole pattern; a missing
    /// anchor turns into a `.` self-loop on the corresponding end.
    pub(crate) fn new(ast: &Ast, optimize: bool) -> NFA {
        let mut nfa = NFA {
            states: vec![],
            matchers: vec![],
            group_len: 1,
            is_match_empty: ast.root.accept_epsilon(),
        };
        let begin = nfa.add_state();
        let end = nfa.add_state();
        nfa.states[begin as usize].initial = true;
        nfa.states[end as usize].accepting = true;
        nfa.compile_node(&ast.root, begin, end, &[0], &[0]);
        if !ast.anchor_start {
            nfa.add_transition(Matcher::Universal, begin, begin, &[], &[]);
        }
        if !ast.anchor_end {
            nfa.add_transition(Matcher::Universal, end, end, &[], &[]);
        }
        trace!(
            "lowered pattern to {} states and {} groups",
            nfa.states.len(),
            nfa.group_len,
        );
        if optimize {
            let removed = nfa.optimize();
            debug!(
                "NFA optimization removed {} states, {} remain",
                removed,
                nfa.states.len(),
            );
        }
        if cfg!(debug_assertions) {
            nfa.check();
        }
        nfa
    }

    pub(crate) fn state(&self, id: StateID) -> &State {
        &self.states[id as usize]
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn matcher(&self, id: MatcherID) -> &Matcher {
        &self.matchers[id as usize]
    }

    /// The total number of capture groups, including group 0.
    pub(crate) fn group_len(&self) -> usize {
        self.group_len as usize
    }

    /// Whether the pattern behind this NFA accepts the empty input.
    pub(crate) fn is_match_empty(&self) -> bool {
        self.is_match_empty
    }

    fn add_state(&mut self) -> StateID {
        let id = u32::try_from(self.states.len())
            .expect("state count fits in u32");
        self.states.push(State::default());
        id
    }

    fn add_transition(
        &mut self,
        matcher: Matcher,
        from: StateID,
        to: StateID,
        opens: &[u32],
        closes: &[u32],
    ) {
        let annotation = if opens.is_empty() && closes.is_empty() {
            None
        } else {
            Some(Annotation {
                opens: opens.to_vec(),
                closes: closes.to_vec(),
            })
        };
        let id = u32::try_from(self.matchers.len())
            .expect("matcher count fits in u32");
        self.matchers.push(matcher);
        self.states[from as usize].transitions.push(Link {
            matcher: id,
            state: to,
            annotation: annotation.clone(),
        });
        self.states[to as usize].reverse.push(Link {
            matcher: id,
            state: from,
            annotation,
        });
    }

    fn compile_node(
        &mut self,
        node: &Node,
        from: StateID,
        to: StateID,
        opens: &[u32],
        closes: &[u32],
    ) {
        match *node {
            Node::Leaf(ref matcher) => {
                self.add_transition(matcher.clone(), from, to, opens, closes);
            }
            Node::Concat(ref subs) => {
                let mut cur = from;
                for (i, sub) in subs.iter().enumerate() {
                    let last = i == subs.len() - 1;
                    let next = if last { to } else { self.add_state() };
                    let o = if i == 0 { opens } else { &[] };
                    let c = if last { closes } else { &[] };
                    self.compile_node(sub, cur, next, o, c);
                    cur = next;
                }
            }
            Node::Alternate(ref subs) => {
                for sub in subs.iter() {
                    self.compile_node(sub, from, to, opens, closes);
                }
            }
            Node::Star { ref sub, greedy } => {
                self.compile_star(sub, greedy, from, to, opens, closes);
            }
            Node::Plus { ref sub, greedy } => {
                self.compile_plus(sub, greedy, from, to, opens, closes);
            }
            Node::Quest { ref sub, greedy } => {
                if greedy {
                    self.compile_node(sub, from, to, opens, closes);
                    self.add_transition(
                        Matcher::Epsilon,
                        from,
                        to,
                        opens,
                        closes,
                    );
                } else {
                    self.add_transition(
                        Matcher::Epsilon,
                        from,
                        to,
                        opens,
                        closes,
                    );
                    self.compile_node(sub, from, to, opens, closes);
                }
            }
            Node::Repeat { ref sub, min, max, unbounded, greedy } => {
                self.compile_repeat(
                    sub, min, max, unbounded, greedy, from, to, opens, closes,
                );
            }
            Node::Group { ref sub, capture } => {
                if capture {
                    let group = self.group_len;
                    self.group_len += 1;
                    let mut o = opens.to_vec();
                    o.push(group);
                    let mut c = closes.to_vec();
                    c.push(group);
                    self.compile_node(sub, from, to, &o, &c);
                } else {
                    self.compile_node(sub, from, to, opens, closes);
                }
            }
        }
    }

    /// Zero or more repetitions. A sub-pattern that accepts the empty
    /// string gets dedicated entry and exit states, so that the loop body
    /// cannot swallow the group boundaries carried on the outer edges.
    fn compile_star(
        &mut self,
        sub: &Node,
        greedy: bool,
        from: StateID,
        to: StateID,
        opens: &[u32],
        closes: &[u32],
    ) {
        if sub.accept_epsilon() {
            let before = self.add_state();
            let after = self.add_state();
            if greedy {
                self.add_transition(Matcher::Epsilon, from, before, opens, &[]);
                self.add_transition(Matcher::Epsilon, from, to, opens, closes);
            } else {
                self.add_transition(Matcher::Epsilon, from, to, opens, closes);
                self.add_transition(Matcher::Epsilon, from, before, opens, &[]);
            }
            self.compile_node(sub, before, after, &[], &[]);
            if greedy {
                self.add_transition(Matcher::Epsilon, after, before, &[], &[]);
                self.add_transition(Matcher::Epsilon, after, to, &[], closes);
            } else {
                self.add_transition(Matcher::Epsilon, after, to, &[], closes);
                self.add_transition(Matcher::Epsilon, after, before, &[], &[]);
            }
        } else {
            let mid = self.add_state();
            self.add_transition(Matcher::Epsilon, from, mid, opens, &[]);
            if greedy {
                self.compile_node(sub, mid, mid, &[], &[]);
                self.add_transition(Matcher::Epsilon, mid, to, &[], closes);
            } else {
                self.add_transition(Matcher::Epsilon, mid, to, &[], closes);
                self.compile_node(sub, mid, mid, &[], &[]);
            }
        }
    }

    /// One or more repetitions.
    fn compile_plus(
        &mut self,
        sub: &Node,
        greedy: bool,
        from: StateID,
        to: StateID,
        opens: &[u32],
        closes: &[u32],
    ) {
        let before = self.add_state();
        let after = self.add_state();
        self.add_transition(Matcher::Epsilon, from, before, opens, &[]);
        self.compile_node(sub, before, after, &[], &[]);
        if greedy {
            self.add_transition(Matcher::Epsilon, after, before, &[], &[]);
            self.add_transition(Matcher::Epsilon, after, to, &[], closes);
        } else {
            self.add_transition(Matcher::Epsilon, after, to, &[], closes);
            self.add_transition(Matcher::Epsilon, after, before, &[], &[]);
        }
    }

    /// Counted repetition: a chain of `min` copies followed by either a
    /// loop (unbounded) or early exits up to `max` copies. The AST
    /// optimizer rewrites the 0- and 1-minimum unbounded shapes away, but
    /// the unoptimized path still reaches them here.
    #[allow(clippy::too_many_arguments)]
    fn compile_repeat(
        &mut self,
        sub: &Node,
        min: u32,
        max: u32,
        unbounded: bool,
        greedy: bool,
        from: StateID,
        to: StateID,
        opens: &[u32],
        closes: &[u32],
    ) {
        if unbounded && min == 0 {
            return self.compile_star(sub, greedy, from, to, opens, closes);
        }
        if unbounded && min == 1 {
            return self.compile_plus(sub, greedy, from, to, opens, closes);
        }

        let mut cur = from;
        let mut i = 0;
        if min != 0 {
            while i < min - 1 {
                let next = self.add_state();
                let o = if i == 0 { opens } else { &[] };
                self.compile_node(sub, cur, next, o, &[]);
                cur = next;
                i += 1;
            }
        }

        if !unbounded && min == max {
            if min != 0 {
                let o = if i == 0 { opens } else { &[] };
                self.compile_node(sub, cur, to, o, closes);
            } else {
                // Exactly zero repetitions: only the boundaries remain.
                self.add_transition(Matcher::Epsilon, cur, to, opens, closes);
            }
        } else if unbounded {
            // min is at least 2 here, so the chain above consumed `opens`.
            let next = self.add_state();
            self.compile_node(sub, cur, next, &[], &[]);
            if greedy {
                self.add_transition(Matcher::Epsilon, next, cur, &[], &[]);
                self.add_transition(Matcher::Epsilon, next, to, &[], closes);
            } else {
                self.add_transition(Matcher::Epsilon, next, to, &[], closes);
                self.add_transition(Matcher::Epsilon, next, cur, &[], &[]);
            }
        } else {
            // Bounded and not exact: every position from min up gets an
            // exit to `to`, ordered against the next copy by greediness.
            while i < max - 1 {
                let next = self.add_state();
                let o = if i == 0 { opens } else { &[] };
                if greedy {
                    self.compile_node(sub, cur, next, o, &[]);
                    if i >= min {
                        self.add_transition(
                            Matcher::Epsilon,
                            cur,
                            to,
                            o,
                            closes,
                        );
                    }
                } else {
                    if i >= min {
                        self.add_transition(
                            Matcher::Epsilon,
                            cur,
                            to,
                            o,
                            closes,
                        );
                    }
                    self.compile_node(sub, cur, next, o, &[]);
                }
                cur = next;
                i += 1;
            }
            let o = if i == 0 { opens } else { &[] };
            if greedy {
                self.compile_node(sub, cur, to, o, closes);
                self.add_transition(Matcher::Epsilon, cur, to, o, closes);
            } else {
                self.add_transition(Matcher::Epsilon, cur, to, o, closes);
                self.compile_node(sub, cur, to, o, closes);
            }
        }
    }

    fn is_plain_epsilon(&self, link: &Link) -> bool {
        link.annotation.is_none()
            && self.matchers[link.matcher as usize].is_epsilon()
    }

    /// Shrinks the automaton without changing its language, its capture
    /// behavior or the preference order of transitions. Two right-to-left
    /// sweeps: fold states whose only incoming edge is a bare epsilon into
    /// their predecessor, then fold states whose only outgoing edge is a
    /// bare epsilon into their successor. Unreachable and dead-end states
    /// are dropped along the way.
    ///
    /// Returns the number of states removed.
    fn optimize(&mut self) -> usize {
        let before = self.states.len();

        let mut i = self.states.len();
        while i > 0 {
            i -= 1;
            let state = &self.states[i];
            if state.initial {
                continue;
            }
            if state.reverse.is_empty() {
                self.remove_state(i, i);
                continue;
            }
            if state.reverse.len() != 1 {
                continue;
            }
            let link = state.reverse[0].clone();
            let j = link.state as usize;
            if j == i || !self.is_plain_epsilon(&link) {
                continue;
            }
            // Replace the predecessor's epsilon edge with this state's
            // transitions, at the same position so preference order holds.
            let moved = self.states[i].transitions.clone();
            let pos = self.states[j]
                .transitions
                .iter()
                .position(|t| t.matcher == link.matcher && t.state as usize == i)
                .expect("forward half of the mirrored epsilon transition");
            self.states[j].transitions.splice(pos..pos + 1, moved);
            self.remove_state(i, j);
        }

        let mut i = self.states.len();
        while i > 0 {
            i -= 1;
            let state = &self.states[i];
            if state.accepting {
                continue;
            }
            if state.transitions.is_empty() {
                self.remove_state(i, i);
                continue;
            }
            if state.transitions.len() != 1 {
                continue;
            }
            let link = state.transitions[0].clone();
            let j = link.state as usize;
            if j == i || !self.is_plain_epsilon(&link) {
                continue;
            }
            let moved = self.states[i].reverse.clone();
            let pos = self.states[j]
                .reverse
                .iter()
                .position(|r| r.matcher == link.matcher && r.state as usize == i)
                .expect("reverse half of the mirrored epsilon transition");
            self.states[j].reverse.remove(pos);
            self.states[j].reverse.extend(moved);
            self.remove_state(i, j);
        }

        before - self.states.len()
    }

    /// Deletes state `i`, re-routing every link that referenced it to `j`
    /// and shifting all higher indices down by one. When `i == j` the
    /// state is simply dropped together with any links that mention it.
    fn remove_state(&mut self, i: usize, j: usize) {
        let unique = i == j;
        self.states.remove(i);
        let j = if j > i { j - 1 } else { j };
        for state in self.states.iter_mut() {
            if unique {
                state.transitions.retain(|link| link.state as usize != i);
                state.reverse.retain(|link| link.state as usize != i);
            }
            for link in
                state.transitions.iter_mut().chain(state.reverse.iter_mut())
            {
                let s = link.state as usize;
                if s > i {
                    link.state = (s - 1) as u32;
                } else if s == i {
                    link.state = j as u32;
                }
            }
        }
    }

    /// Asserts every structural invariant of the automaton: link targets
    /// and matcher indices in range, group indices in range, annotations
    /// non-empty, exactly one initial state, at least one accepting state,
    /// and a perfect mirror between transitions and reverse links.
    pub(crate) fn check(&self) {
        let mut initial = 0;
        let mut accepting = 0;
        for (sid, state) in self.states.iter().enumerate() {
            if state.initial {
                initial += 1;
            }
            if state.accepting {
                accepting += 1;
            }
            for link in state.transitions.iter() {
                self.check_link(link);
                let mirrored = self.states[link.state as usize]
                    .reverse
                    .iter()
                    .filter(|r| {
                        r.matcher == link.matcher
                            && r.state as usize == sid
                            && r.annotation == link.annotation
                    })
                    .count();
                assert_eq!(
                    1, mirrored,
                    "transition {} -> {} must have exactly one mirror",
                    sid, link.state,
                );
            }
            for link in state.reverse.iter() {
                self.check_link(link);
                let mirrored = self.states[link.state as usize]
                    .transitions
                    .iter()
                    .filter(|t| {
                        t.matcher == link.matcher
                            && t.state as usize == sid
                            && t.annotation == link.annotation
                    })
                    .count();
                assert_eq!(
                    1, mirrored,
                    "reverse link {} <- {} must have exactly one mirror",
                    sid, link.state,
                );
            }
        }
        assert_eq!(1, initial, "automaton must have exactly one initial state");
        assert!(accepting >= 1, "automaton must have an accepting state");
    }

    fn check_link(&self, link: &Link) {
        assert!(
            (link.state as usize) < self.states.len(),
            "link state index out of range",
        );
        assert!(
            (link.matcher as usize) < self.matchers.len(),
            "link matcher index out of range",
        );
        if let Some(ref annotation) = link.annotation {
            assert!(
                !annotation.opens.is_empty() || !annotation.closes.is_empty(),
                "present annotations may not be empty",
            );
            for &group in
                annotation.opens.iter().chain(annotation.closes.iter())
            {
                assert!(group < self.group_len, "group index out of range");
            }
        }
    }
}

impl fmt::Debug for NFA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NFA(")?;
        for (sid, state) in self.states.iter().enumerate() {
            let marker = match (state.initial, state.accepting) {
                (true, true) => ">*",
                (true, false) => "> ",
                (false, true) => " *",
                (false, false) => "  ",
            };
            writeln!(f, "{}{:04}:", marker, sid)?;
            for link in state.transitions.iter() {
                write!(
                    f,
                    "      -> {:04}: {:?}",
                    link.state,
                    self.matchers[link.matcher as usize],
                )?;
                if let Some(ref annotation) = link.annotation {
                    write!(
                        f,
                        " opens={:?} closes={:?}",
                        annotation.opens, annotation.closes,
                    )?;
                }
                writeln!(f)?;
            }
        }
        writeln!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, parse::Parser};

    fn compile(pattern: &str, optimize: bool) -> NFA {
        let mut ast = Parser::new(pattern).parse().unwrap();
        if optimize {
            ast::optimize(&mut ast);
        }
        NFA::new(&ast, optimize)
    }

    #[test]
    fn invariants_hold_across_patterns() {
        let patterns = [
            "",
            "a",
            "abc",
            "a|b|c",
            "a*",
            "a*?",
            "a+b?c*",
            "(a|b)*c",
            "<a+>b",
            "<a|b>|<c>",
            "a{3}",
            "a{2,}",
            "a{2,4}?",
            "a{0,2}",
            "^a$",
            "^<ab*>$",
            r"<[a-zA-Z0-9._%+\-]+>@<[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}>",
        ];
        for pattern in patterns {
            for optimize in [false, true] {
                compile(pattern, optimize).check();
            }
        }
    }

    #[test]
    fn group_allocation_in_construction_order() {
        assert_eq!(1, compile("ab", true).group_len());
        assert_eq!(2, compile("<a>b", true).group_len());
        assert_eq!(3, compile("<a<b>>", true).group_len());
        // Non-capturing groups never allocate.
        assert_eq!(1, compile("(a)(b)", true).group_len());
        assert_eq!(
            3,
            compile(r"<[a-z.]+>@<[a-z.]+>", true).group_len(),
        );
    }

    #[test]
    fn anchors_control_self_loops() {
        let free = compile("a", false);
        // The initial state carries the `.` loop after the `a` edge.
        let begin = free.state(0);
        assert!(begin.initial);
        assert_eq!(2, begin.transitions.len());
        assert!(!free.matcher(begin.transitions[0].matcher).is_epsilon());
        assert_eq!(
            &Matcher::Universal,
            free.matcher(begin.transitions[1].matcher),
        );

        let anchored = compile("^a$", false);
        assert_eq!(1, anchored.state(0).transitions.len());
    }

    #[test]
    fn optimization_splices_bare_epsilons() {
        let unopt = compile("a*b", false);
        let opt = compile("a*b", true);
        assert!(opt.len() < unopt.len());
        opt.check();
    }

    #[test]
    fn exact_repetition_chains_states() {
        let nfa = compile("^a{3}$", true);
        // begin, end and two interior chain states; nothing to splice.
        assert_eq!(4, nfa.len());
    }

    #[test]
    fn greediness_orders_transitions() {
        // Greedy star: the loop body is preferred over the exit.
        let greedy = compile("^a*$", false);
        let mid = greedy.state(2);
        assert!(!greedy.matcher(mid.transitions[0].matcher).is_epsilon());
        assert!(greedy.matcher(mid.transitions[1].matcher).is_epsilon());
        // Lazy star: the exit comes first.
        let lazy = compile("^a*?$", false);
        let mid = lazy.state(2);
        assert!(lazy.matcher(mid.transitions[0].matcher).is_epsilon());
        assert!(!lazy.matcher(mid.transitions[1].matcher).is_epsilon());
    }

    #[test]
    fn zero_repetition_is_a_single_epsilon() {
        let nfa = compile("^a{0}$", false);
        let begin = nfa.state(0);
        assert_eq!(1, begin.transitions.len());
        let link = &begin.transitions[0];
        assert!(nfa.matcher(link.matcher).is_epsilon());
        let annotation = link.annotation.as_ref().unwrap();
        assert_eq!([0u32].as_slice(), annotation.opens.as_slice());
        assert_eq!([0u32].as_slice(), annotation.closes.as_slice());
    }

    #[test]
    fn capture_annotations_nest() {
        // In `<<a>>`, the first transition opens and closes all of group
        // 0, 1 and 2 around the single `a` edge.
        let nfa = compile("^<<a>>$", true);
        let begin = nfa.state(0);
        assert_eq!(1, begin.transitions.len());
        let annotation = begin.transitions[0].annotation.as_ref().unwrap();
        assert_eq!([0u32, 1, 2].as_slice(), annotation.opens.as_slice());
        assert_eq!([0u32, 1, 2].as_slice(), annotation.closes.as_slice());
    }
}
