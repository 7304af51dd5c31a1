use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenAiExperience {
    None,
    Basic,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TextToImageExperience {
    Never,
    Rarely,
    Sometimes,
    Often,
    VeryOften,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolsUsed {
    #[serde(default)]
    pub dall_e: bool,
    #[serde(default)]
    pub midjourney: bool,
    #[serde(default)]
    pub stable_diffusion: bool,
    #[serde(default)]
    pub other: bool,
}

/// The survey as the form holds it, before required fields are checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SurveyForm {
    pub gen_ai_experience: Option<GenAiExperience>,
    pub text_to_image_experience: Option<TextToImageExperience>,
    pub tools_used: ToolsUsed,
    pub other_tools: Option<String>,
}

/// A complete experience survey, ready to submit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub gen_ai_experience: GenAiExperience,
    pub text_to_image_experience: TextToImageExperience,
    pub tools_used: ToolsUsed,
    pub other_tools: Option<String>,
}

impl SurveyForm {
    pub fn validate(self) -> Result<Survey, ValidationError> {
        let gen_ai_experience = self
            .gen_ai_experience
            .ok_or(ValidationError::MissingSurveyField("genAiExperience"))?;
        let text_to_image_experience = self
            .text_to_image_experience
            .ok_or(ValidationError::MissingSurveyField("textToImageExperience"))?;

        // Free text only travels when "other" is ticked.
        let other_tools = if self.tools_used.other {
            let named = self
                .other_tools
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .ok_or(ValidationError::MissingOtherTools)?;
            Some(named)
        } else {
            None
        };

        Ok(Survey {
            gen_ai_experience,
            text_to_image_experience,
            tools_used: self.tools_used,
            other_tools,
        })
    }
}
