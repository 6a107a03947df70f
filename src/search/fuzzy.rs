use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, DFA};

/// Automaton for fuzzy matching with edit distance
pub struct FuzzyAutomaton {
    /// Leading characters that must match exactly
    prefix: String,

    /// Maximum allowed edit distance (0-2)
    max_edit_distance: u8,

    /// DFA over the part of the term after `prefix`
    dfa: DFA,
}

impl FuzzyAutomaton {
    /// Transpositions count as a single edit (teh -> the).
    pub fn new(term: &str, max_edit_distance: u8, prefix_length: u8) -> Self {
        let split = term
            .char_indices()
            .nth(prefix_length as usize)
            .map(|(idx, _)| idx)
            .unwrap_or(term.len());
        let (prefix, suffix) = term.split_at(split);

        let builder = LevenshteinAutomatonBuilder::new(max_edit_distance, true);

        Self {
            prefix: prefix.to_string(),
            max_edit_distance,
            dfa: builder.build_dfa(suffix),
        }
    }

    /// Edit distance to `candidate`, if within the limit.
    pub fn distance(&self, candidate: &str) -> Option<u8> {
        let rest = candidate.strip_prefix(self.prefix.as_str())?;

        let mut state = self.dfa.initial_state();
        for &byte in rest.as_bytes() {
            state = self.dfa.transition(state, byte);
        }

        match self.dfa.distance(state) {
            Distance::Exact(d) if d <= self.max_edit_distance => Some(d),
            _ => None,
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.distance(candidate).is_some()
    }
}

/// Score multiplier for a match at `edits` distance.
pub fn edit_penalty(edits: u8) -> f32 {
    1.0 - 0.2 * edits as f32
}
