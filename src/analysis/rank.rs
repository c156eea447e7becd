/// Change-minimizing region ordering.
///
/// Regions sort ascending by rank key with a stable sort over a tie-break
/// basis. The basis starts as the selection order and takes on every computed
/// order, so equal keys never trade places and a region joining late slots in
/// at its selection position. Regions outside the selection are appended in the
/// order they are supplied.
#[derive(Debug, Default)]
pub struct Ranker {
    basis: Vec<String>,
    emitted: Option<Vec<String>>,
}

impl Ranker {
    /// A ranker whose ties fall back to `selection` until an order exists.
    pub fn with_selection<I, S>(selection: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            basis: selection.into_iter().map(Into::into).collect(),
            emitted: None,
        }
    }

    /// The last emitted order, if any.
    pub fn current(&self) -> Option<&[String]> {
        self.emitted.as_deref()
    }

    /// Recompute the order from `(region, rank_key)` pairs.
    ///
    /// Returns the new order only when it differs from the last one emitted.
    pub fn recompute<'a, I>(&mut self, entries: I) -> Option<Vec<String>>
    where
        I: IntoIterator<Item = (&'a str, u64)>,
    {
        let entries: Vec<(&str, u64)> = entries.into_iter().collect();
        for &(region, _) in &entries {
            if !self.basis.iter().any(|id| id == region) {
                self.basis.push(region.to_string());
            }
        }

        // Slots in the basis held by the regions being ranked.
        let mut slots = Vec::with_capacity(entries.len());
        let mut order: Vec<(&str, u64)> = Vec::with_capacity(entries.len());
        for (slot, id) in self.basis.iter().enumerate() {
            if let Some(&entry) = entries.iter().find(|(region, _)| *region == id.as_str()) {
                slots.push(slot);
                order.push(entry);
            }
        }

        order.sort_by_key(|&(_, key)| key);
        let ids: Vec<String> = order.into_iter().map(|(id, _)| id.to_string()).collect();
        for (slot, id) in slots.into_iter().zip(&ids) {
            self.basis[slot].clone_from(id);
        }

        if self.emitted.as_ref() == Some(&ids) {
            return None;
        }
        self.emitted = Some(ids.clone());
        Some(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SENTINEL;

    #[test]
    fn test_sorts_ascending_with_sentinel_last() {
        let mut ranker = Ranker::default();
        let order = ranker
            .recompute([("eeur", SENTINEL), ("wnam", 300), ("enam", 41)])
            .unwrap();
        assert_eq!(order, ["enam", "wnam", "eeur"]);
    }

    #[test]
    fn test_unchanged_input_is_not_reemitted() {
        let mut ranker = Ranker::default();
        let input = [("eeur", 41), ("wnam", 302)];
        let first = ranker.recompute(input).unwrap();
        assert!(ranker.recompute(input).is_none());
        assert_eq!(ranker.current().unwrap(), first.as_slice());
    }

    #[test]
    fn test_ties_keep_initial_selection_order() {
        let mut ranker = Ranker::default();
        let order = ranker
            .recompute([("weur", SENTINEL), ("apac", SENTINEL), ("oc", SENTINEL)])
            .unwrap();
        assert_eq!(order, ["weur", "apac", "oc"]);
    }

    #[test]
    fn test_ties_keep_previous_emitted_order() {
        let mut ranker = Ranker::default();
        ranker.recompute([("a", 50), ("b", 40)]).unwrap(); // b, a

        // Now equal: b stays ahead because it was ahead last time.
        let order = ranker.recompute([("a", 40), ("b", 40)]);
        assert!(order.is_none());
        assert_eq!(ranker.current().unwrap(), ["b", "a"]);

        let order = ranker.recompute([("a", 10), ("b", 40)]).unwrap();
        assert_eq!(order, ["a", "b"]);
    }

    #[test]
    fn test_new_regions_join_in_selection_order() {
        let mut ranker = Ranker::default();
        ranker.recompute([("eeur", 41)]).unwrap();

        let order = ranker
            .recompute([("eeur", 41), ("wnam", SENTINEL), ("enam", SENTINEL)])
            .unwrap();
        assert_eq!(order, ["eeur", "wnam", "enam"]);
    }

    #[test]
    fn test_late_joiners_take_their_selection_slot() {
        let mut ranker = Ranker::with_selection(["eeur", "wnam", "enam", "oc"]);
        assert_eq!(ranker.recompute([("oc", SENTINEL)]).unwrap(), ["oc"]);
        assert_eq!(
            ranker
                .recompute([("oc", SENTINEL), ("wnam", SENTINEL)])
                .unwrap(),
            ["wnam", "oc"]
        );
        assert_eq!(
            ranker
                .recompute([("oc", 90), ("wnam", SENTINEL), ("eeur", SENTINEL)])
                .unwrap(),
            ["oc", "eeur", "wnam"]
        );
        // enam lands in its own selection slot, between eeur and wnam.
        assert_eq!(
            ranker
                .recompute([
                    ("oc", 90),
                    ("wnam", SENTINEL),
                    ("eeur", SENTINEL),
                    ("enam", SENTINEL)
                ])
                .unwrap(),
            ["oc", "eeur", "enam", "wnam"]
        );
    }

    #[test]
    fn test_output_is_a_permutation() {
        let mut ranker = Ranker::default();
        let input = [("a", 3), ("b", 1), ("c", SENTINEL), ("d", 1), ("e", 2)];
        let mut order = ranker.recompute(input).unwrap();
        assert_eq!(order, ["b", "d", "e", "a", "c"]);

        order.sort();
        assert_eq!(order, ["a", "b", "c", "d", "e"]);
    }
}
