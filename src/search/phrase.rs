/// True if the terms occur in order, each at its expected distance from the
/// previous one plus at most `slop` extra positions.
///
/// `term_positions[i]` are the sorted positions of the i-th phrase term in a
/// document; `gaps[i]` is the distance from term i-1 to term i in the query
/// (ignored for i = 0).
pub fn phrase_matches(term_positions: &[&[u32]], gaps: &[u32], slop: u32) -> bool {
    let Some((first, rest)) = term_positions.split_first() else {
        return false;
    };

    'start: for &start_pos in first.iter() {
        let mut current_pos = start_pos;

        for (i, positions) in rest.iter().enumerate() {
            let gap = gaps.get(i + 1).copied().unwrap_or(1);
            let min_pos = current_pos + gap;
            let max_pos = min_pos + slop;

            match positions.iter().find(|&&p| p >= min_pos && p <= max_pos) {
                Some(&next_pos) => current_pos = next_pos,
                None => continue 'start,
            }
        }

        return true;
    }

    false
}

/// Distances between consecutive query token positions.
pub fn position_gaps(positions: &[u32]) -> Vec<u32> {
    let mut gaps = Vec::with_capacity(positions.len());
    let mut previous = positions.first().copied().unwrap_or(0);

    for &pos in positions {
        gaps.push(pos.saturating_sub(previous));
        previous = pos;
    }

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_phrase() {
        let a: &[u32] = &[0, 5];
        let b: &[u32] = &[1];
        assert!(phrase_matches(&[a, b], &[0, 1], 0));
        assert!(!phrase_matches(&[b, a], &[0, 1], 0));
    }

    #[test]
    fn test_slop_allows_gap() {
        let a: &[u32] = &[0];
        let b: &[u32] = &[3];
        assert!(!phrase_matches(&[a, b], &[0, 1], 1));
        assert!(phrase_matches(&[a, b], &[0, 1], 2));
    }

    #[test]
    fn test_query_gaps_from_removed_stop_words() {
        // "run of bull" with "of" removed: bull expected two after run
        let run: &[u32] = &[1];
        let bull: &[u32] = &[3];
        let gaps = position_gaps(&[0, 2]);
        assert_eq!(gaps, vec![0, 2]);
        assert!(phrase_matches(&[run, bull], &gaps, 0));
    }
}
