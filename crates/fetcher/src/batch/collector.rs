//! Index-addressed result buffer
//!
//! One slot per input item, filled once by whichever task owns that index.
//! Completion order does not matter; the finished set follows input order.

use tracing::warn;

use crate::core::{FetchError, Item, ItemResult, Outcome, ResultSet};

#[derive(Debug)]
pub struct ResultCollector {
    slots: Vec<Option<Outcome>>,
}

impl ResultCollector {
    pub fn new(len: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(len).collect(),
        }
    }

    /// Store the outcome for `index`
    ///
    /// Returns `false` and keeps the existing value if the slot was already
    /// filled or `index` is out of range.
    pub fn fill(&mut self, index: usize, outcome: Outcome) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(outcome);
                true
            }
            Some(_) => {
                warn!("Result slot {} already filled, ignoring {}", index, outcome);
                false
            }
            None => {
                warn!("Result slot {} out of range ({} slots)", index, self.slots.len());
                false
            }
        }
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Pair every slot with its input item
    ///
    /// A slot nobody filled still yields a result, so the set is always
    /// the same length as `items`.
    pub fn finish(self, items: Vec<Item>) -> ResultSet {
        let results = items
            .into_iter()
            .zip(self.slots.into_iter().chain(std::iter::repeat_with(|| None)))
            .map(|(item, slot)| {
                let outcome = slot.unwrap_or_else(|| {
                    Outcome::failed(FetchError::TaskFailed {
                        reason: "no outcome was reported".to_string(),
                    })
                });
                ItemResult { item, outcome }
            })
            .collect();

        ResultSet::from_results(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn items(n: usize) -> Vec<Item> {
        (0..n)
            .map(|i| Item::new(i.to_string(), format!("Item {i}"), format!("http://host/{i}.pdf"), String::new()))
            .collect()
    }

    #[test]
    fn out_of_order_fills_keep_input_order() {
        let mut collector = ResultCollector::new(3);
        assert!(collector.fill(2, Outcome::Cancelled));
        assert!(collector.fill(0, Outcome::MissingSource));
        assert!(collector.fill(
            1,
            Outcome::Succeeded {
                written_path: PathBuf::from("1.pdf"),
            }
        ));
        assert_eq!(collector.filled(), 3);

        let results = collector.finish(items(3));
        assert_eq!(results.len(), 3);
        assert!(matches!(results[0].outcome, Outcome::MissingSource));
        assert!(results[1].outcome.is_succeeded());
        assert!(results[2].outcome.is_cancelled());
        assert_eq!(results[2].item.id, "2");
    }

    #[test]
    fn slots_are_written_once() {
        let mut collector = ResultCollector::new(1);
        assert!(collector.fill(0, Outcome::Cancelled));
        assert!(!collector.fill(0, Outcome::MissingSource));
        assert!(!collector.fill(5, Outcome::MissingSource));

        let results = collector.finish(items(1));
        assert!(results[0].outcome.is_cancelled());
    }

    #[test]
    fn unfilled_slots_still_produce_results() {
        let collector = ResultCollector::new(2);
        let results = collector.finish(items(2));

        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(matches!(
                result.outcome.error(),
                Some(FetchError::TaskFailed { .. })
            ));
        }
    }

    #[test]
    fn empty_batch() {
        let results = ResultCollector::new(0).finish(Vec::new());
        assert!(results.is_empty());
    }
}
