use std::collections::BTreeSet;

/// Bookmarked questions. Never sent to the grading collaborator.
#[derive(Debug, Clone, Default)]
pub struct FlagStore {
    flagged: BTreeSet<String>,
    disabled: bool,
}

impl FlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_flag(&mut self, question_id: &str) -> bool {
        if self.disabled {
            return false;
        }
        if !self.flagged.remove(question_id) {
            self.flagged.insert(question_id.to_string());
        }
        true
    }

    pub fn is_flagged(&self, question_id: &str) -> bool {
        self.flagged.contains(question_id)
    }

    pub fn flagged(&self) -> Vec<String> {
        self.flagged.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.flagged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flagged.is_empty()
    }

    pub fn disable(&mut self) {
        self.disabled = true;
    }
}
