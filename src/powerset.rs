use alloc::{collections::BTreeSet, vec::Vec};

use crate::nfa::{StateID, NFA};

/// Decides acceptance of the whole haystack by subset construction: carry
/// the set of reachable states across the input, one byte at a time.
///
/// Capture annotations are transparent here. This runs in time linear in
/// the haystack for a fixed automaton and never backtracks, which makes it
/// the cheap way to answer yes/no questions.
pub(crate) fn accepts(nfa: &NFA, haystack: &[u8]) -> bool {
    let mut current: BTreeSet<StateID> = (0..nfa.len() as StateID)
        .filter(|&sid| nfa.state(sid).initial)
        .collect();
    for &byte in haystack.iter() {
        epsilon_closure(nfa, &mut current);
        let mut next = BTreeSet::new();
        for &sid in current.iter() {
            for link in nfa.state(sid).transitions.iter() {
                let matcher = nfa.matcher(link.matcher);
                if matcher.len() == 1 && matcher.is_match(&[byte]) {
                    next.insert(link.state);
                }
            }
        }
        current = next;
    }
    epsilon_closure(nfa, &mut current);
    current.iter().any(|&sid| nfa.state(sid).accepting)
}

/// Extends the set with every state reachable through epsilon transitions
/// alone.
fn epsilon_closure(nfa: &NFA, set: &mut BTreeSet<StateID>) {
    let mut stack: Vec<StateID> = set.iter().copied().collect();
    while let Some(sid) = stack.pop() {
        for link in nfa.state(sid).transitions.iter() {
            if nfa.matcher(link.matcher).is_epsilon() && set.insert(link.state)
            {
                stack.push(link.state);
            }
        }
    }
}
