use std::collections::{BTreeMap, BTreeSet};

use crate::models::{AnswerEntry, QuestionType};

/// Selected option indexes per question.
///
/// A question whose selection was emptied keeps its entry: it is left out of the
/// submitted list but still counts as "touched" for [`AnswerStore::has_any_answers`].
#[derive(Debug, Clone, Default)]
pub struct AnswerStore {
    selections: BTreeMap<String, BTreeSet<usize>>,
    disabled: bool,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the store is disabled and nothing changed.
    pub fn select_option(
        &mut self,
        question_id: &str,
        option_index: usize,
        question_type: QuestionType,
    ) -> bool {
        if self.disabled {
            return false;
        }

        let selection = self.selections.entry(question_id.to_string()).or_default();
        if question_type.is_exclusive() {
            selection.clear();
            selection.insert(option_index);
        } else if !selection.remove(&option_index) {
            selection.insert(option_index);
        }
        true
    }

    pub fn selection(&self, question_id: &str) -> Vec<usize> {
        self.selections
            .get(question_id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_any_answers(&self) -> bool {
        !self.selections.is_empty()
    }

    pub fn answered_count(&self) -> usize {
        self.selections.values().filter(|s| !s.is_empty()).count()
    }

    /// Owned copy for transmission, ordered by question id, empty selections omitted.
    pub fn snapshot(&self) -> Vec<AnswerEntry> {
        self.selections
            .iter()
            .filter(|(_, selected)| !selected.is_empty())
            .map(|(question_id, selected)| AnswerEntry {
                question_id: question_id.clone(),
                selected_option_indexes: selected.iter().copied().collect(),
            })
            .collect()
    }

    pub fn as_map(&self) -> BTreeMap<String, Vec<usize>> {
        self.selections
            .iter()
            .map(|(id, selected)| (id.clone(), selected.iter().copied().collect()))
            .collect()
    }

    pub fn disable(&mut self) {
        self.disabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_choice_toggles() {
        let mut store = AnswerStore::new();
        store.select_option("q1", 1, QuestionType::MultipleChoice);
        store.select_option("q1", 3, QuestionType::MultipleChoice);
        assert_eq!(store.selection("q1"), vec![1, 3]);

        store.select_option("q1", 1, QuestionType::MultipleChoice);
        assert_eq!(store.selection("q1"), vec![3]);
    }

    #[test]
    fn toggling_twice_restores_selection() {
        let mut store = AnswerStore::new();
        store.select_option("q1", 0, QuestionType::MultipleChoice);
        let before = store.selection("q1");

        for k in 0..4 {
            store.select_option("q1", k, QuestionType::MultipleChoice);
            store.select_option("q1", k, QuestionType::MultipleChoice);
            assert_eq!(store.selection("q1"), before);
        }
    }

    #[test]
    fn exclusive_types_keep_last_selection() {
        let mut store = AnswerStore::new();
        for question_type in [QuestionType::SingleChoice, QuestionType::TrueFalse] {
            let id = format!("{:?}", question_type);
            for k in [2, 0, 3, 3, 1] {
                store.select_option(&id, k, question_type);
                assert!(store.selection(&id).len() <= 1);
            }
            assert_eq!(store.selection(&id), vec![1]);
        }
    }

    #[test]
    fn snapshot_omits_empty_selections() {
        let mut store = AnswerStore::new();
        store.select_option("q2", 0, QuestionType::MultipleChoice);
        store.select_option("q2", 0, QuestionType::MultipleChoice);
        store.select_option("q1", 1, QuestionType::SingleChoice);

        let snapshot = store.snapshot();
        assert_eq!(
            snapshot,
            vec![AnswerEntry {
                question_id: "q1".to_string(),
                selected_option_indexes: vec![1],
            }]
        );
        assert!(store.has_any_answers());
        assert_eq!(store.answered_count(), 1);
    }

    #[test]
    fn emptied_selection_still_counts_as_touched() {
        let mut store = AnswerStore::new();
        assert!(!store.has_any_answers());
        store.select_option("q1", 2, QuestionType::MultipleChoice);
        store.select_option("q1", 2, QuestionType::MultipleChoice);
        assert!(store.has_any_answers());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn disabled_store_ignores_selection() {
        let mut store = AnswerStore::new();
        store.select_option("q1", 0, QuestionType::SingleChoice);
        store.disable();

        assert!(!store.select_option("q1", 2, QuestionType::SingleChoice));
        assert!(!store.select_option("q2", 1, QuestionType::MultipleChoice));
        assert_eq!(store.selection("q1"), vec![0]);
        assert!(store.selection("q2").is_empty());
    }
}
