use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const RATING_MAX: u8 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RatingDimension {
    Creativity,
    Intention,
}

/// Two ordinal scores on the 0-4 scale. Both must be set before submitting.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub creativity: Option<u8>,
    pub intention: Option<u8>,
}

impl Rating {
    pub fn set(&mut self, dimension: RatingDimension, value: u8) -> Result<(), ValidationError> {
        if value > RATING_MAX {
            return Err(ValidationError::RatingOutOfRange(value));
        }
        match dimension {
            RatingDimension::Creativity => self.creativity = Some(value),
            RatingDimension::Intention => self.intention = Some(value),
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.creativity.is_some() && self.intention.is_some()
    }
}
