use crate::store::Record;

/// Rows with any value containing `term`, case-insensitively, in their original order.
///
/// An empty term is "no filter" and keeps every row.
#[must_use]
pub fn filter(rows: &[Record], term: &str) -> Vec<Record> {
    if term.is_empty() {
        return rows.to_vec();
    }

    let needle = term.to_lowercase();
    rows.iter()
        .filter(|row| record_matches(row, &needle))
        .cloned()
        .collect()
}

fn record_matches(row: &Record, lowered_term: &str) -> bool {
    row.values
        .iter()
        .any(|value| value.to_lowercase().contains(lowered_term))
}

#[cfg(test)]
mod tests {
    use super::filter;
    use crate::store::Record;

    fn genres() -> Vec<Record> {
        vec![
            ["1", "Sci-Fi"].into_iter().collect(),
            ["2", "Mystery"].into_iter().collect(),
        ]
    }

    fn books() -> Vec<Record> {
        vec![
            ["1", "Dune", "3"].into_iter().collect(),
            ["2", "Neuromancer", "5"].into_iter().collect(),
            ["3", "Children of Dune", "3"].into_iter().collect(),
            ["4", "Hyperion", "8"].into_iter().collect(),
        ]
    }

    #[test]
    fn matches_values_case_insensitively() {
        let matched = filter(&genres(), "sci");
        assert_eq!(matched, vec![["1", "Sci-Fi"].into_iter().collect::<Record>()]);

        let shouted = filter(&genres(), "MYST");
        assert_eq!(shouted.len(), 1);
        assert_eq!(shouted[0].get(1), Some("Mystery"));
    }

    #[test]
    fn unmatched_term_yields_no_rows() {
        assert!(filter(&genres(), "Z").is_empty());
    }

    #[test]
    fn empty_term_keeps_every_row() {
        assert_eq!(filter(&books(), ""), books());
    }

    #[test]
    fn result_preserves_original_order() {
        let matched = filter(&books(), "dune");
        let ids = matched
            .iter()
            .filter_map(|row| row.get(0))
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn result_is_a_subsequence_for_every_term() {
        let rows = books();
        for term in ["", "d", "3", "ION", "x", "e"] {
            let matched = filter(&rows, term);
            let mut cursor = rows.iter();
            for row in &matched {
                assert!(
                    cursor.any(|candidate| candidate == row),
                    "`{term}` reordered or invented rows"
                );
            }
        }
    }

    #[test]
    fn column_names_are_not_searched() {
        let rows = vec![["7", "Ursula"].into_iter().collect::<Record>()];
        assert!(filter(&rows, "AuthorID").is_empty());
    }
}
