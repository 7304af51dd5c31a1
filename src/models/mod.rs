pub mod image;
pub mod prompts;
pub mod rating;
pub mod session;
pub mod survey;
pub mod trial;

pub use image::GeneratedImage;
pub use prompts::{FrozenPromptSet, PromptSet};
pub use rating::{Rating, RatingDimension, RATING_MAX};
pub use session::Session;
pub use survey::{GenAiExperience, Survey, SurveyForm, TextToImageExperience, ToolsUsed};
pub use trial::{Condition, ConditionOrder, TrialParams};
