use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Prompts typed during one input phase.
///
/// There is always exactly one blank entry, the last one, for the next
/// prompt. Editing keeps that shape: filling the last slot opens a new one,
/// and clearing an earlier slot removes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PromptSet {
    entries: Vec<String>,
    max_chars: usize,
}

impl PromptSet {
    pub fn new(max_chars: usize) -> Self {
        Self {
            entries: vec![String::new()],
            max_chars,
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Index of the open slot.
    pub fn next_slot(&self) -> usize {
        self.entries.len() - 1
    }

    pub fn edit(&mut self, index: usize, text: &str) -> Result<(), ValidationError> {
        if index >= self.entries.len() {
            return Err(ValidationError::PromptIndexOutOfRange(index));
        }
        if text.chars().count() > self.max_chars {
            return Err(ValidationError::PromptTooLong {
                max: self.max_chars,
            });
        }

        self.entries[index] = text.to_string();
        self.normalize();
        Ok(())
    }

    fn normalize(&mut self) {
        self.entries.retain(|entry| !is_blank(entry));
        self.entries.push(String::new());
    }

    /// Stops editing: trims every entry and keeps the non-empty ones in order.
    pub fn freeze(self) -> FrozenPromptSet {
        FrozenPromptSet {
            prompts: self
                .entries
                .into_iter()
                .map(|entry| entry.trim().to_string())
                .filter(|entry| !entry.is_empty())
                .collect(),
        }
    }
}

/// The prompt collection after time ran out. No longer editable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FrozenPromptSet {
    prompts: Vec<String>,
}

impl FrozenPromptSet {
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn contains(&self, prompt: &str) -> bool {
        self.prompts.iter().any(|candidate| candidate == prompt)
    }

    /// Checks a selection against the set. An empty set needs no selection.
    pub fn validate_selection(
        &self,
        selection: Option<&str>,
    ) -> Result<Option<String>, ValidationError> {
        if self.is_empty() {
            return Ok(None);
        }
        match selection {
            None => Err(ValidationError::NoSelection),
            Some(choice) if choice.is_empty() => Err(ValidationError::NoSelection),
            Some(choice) if self.contains(choice) => Ok(Some(choice.to_string())),
            Some(_) => Err(ValidationError::SelectionNotInSet),
        }
    }
}
