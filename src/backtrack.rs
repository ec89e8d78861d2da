use alloc::{collections::BTreeSet, vec, vec::Vec};

use crate::nfa::{StateID, NFA};

/// The half-open byte range bound to one capture group.
pub(crate) type Span = (usize, usize);

/// Runs the automaton over the whole haystack by depth-first backtracking,
/// recording capture-group boundaries along the way.
///
/// Returns one span per group on success, `None` on no match. A group that
/// never participated in the accepting path stays unset. Transitions are
/// tried in their declared order, which is what gives greedy and lazy
/// quantifiers their meaning.
pub(crate) fn find(nfa: &NFA, haystack: &[u8]) -> Option<Vec<Option<Span>>> {
    let mut search = Search {
        nfa,
        haystack,
        visited: BTreeSet::new(),
        captures: vec![None; nfa.group_len()],
    };
    for sid in 0..nfa.len() as StateID {
        if nfa.state(sid).initial && search.explore(sid, 0) {
            return Some(search.captures);
        }
    }
    None
}

struct Search<'n, 'h> {
    nfa: &'n NFA,
    haystack: &'h [u8],
    /// Frontier entries already expanded in this search. A failed entry can
    /// never lead to acceptance, so pruning here keeps epsilon cycles from
    /// looping and caps the walk at states x (input length + 1) entries.
    visited: BTreeSet<(StateID, usize)>,
    captures: Vec<Option<Span>>,
}

impl<'n, 'h> Search<'n, 'h> {
    fn explore(&mut self, sid: StateID, at: usize) -> bool {
        let nfa = self.nfa;
        let state = nfa.state(sid);
        if at == self.haystack.len() && state.accepting {
            return true;
        }
        if !self.visited.insert((sid, at)) {
            return false;
        }
        for link in state.transitions.iter() {
            let matcher = nfa.matcher(link.matcher);
            if !matcher.is_match(&self.haystack[at..]) {
                continue;
            }
            let next_at = at + matcher.len();
            // Group boundaries only change under an annotation, so that is
            // the only case needing a snapshot to restore on failure.
            let saved = match link.annotation {
                None => None,
                Some(ref annotation) => {
                    let snapshot = self.captures.clone();
                    for &group in annotation.opens.iter() {
                        self.captures[group as usize] = Some((at, at));
                    }
                    for &group in annotation.closes.iter() {
                        let start = self.captures[group as usize]
                            .map_or(at, |(start, _)| start);
                        self.captures[group as usize] = Some((start, next_at));
                    }
                    Some(snapshot)
                }
            };
            if self.explore(link.state, next_at) {
                return true;
            }
            if let Some(snapshot) = saved {
                self.captures = snapshot;
            }
        }
        false
    }
}
