//! Fixed instruction templates for each analysis mode.
//!
//! Both prompts ask the model for enumerated observations, their spatial or
//! contextual detail, practical guidance, and a markdown-structured answer.

use crate::model::AnalysisMode;

/// Instruction sent with the image for [`AnalysisMode::SafetyNavigation`].
pub const SAFETY_NAVIGATION_PROMPT: &str = r#"Analyze this image for safety and navigation purposes. Please provide:
1. A list of all visible objects and potential obstacles
2. Their approximate locations in the scene
3. Any potential safety hazards or concerns
4. Specific navigation guidance considering the identified objects

Format your response in clear sections using markdown."#;

/// Instruction sent with the image for [`AnalysisMode::DailyTasks`].
pub const DAILY_TASKS_PROMPT: &str = r#"Analyze this image to provide assistance with daily tasks. Please:
1. Identify any text or labels visible in the image
2. Describe the items and their potential uses
3. Provide relevant context-specific information
4. Suggest any helpful tips for interacting with the identified items

Format your response in clear sections using markdown."#;

/// Optional system preamble, framing the model as an accessibility assistant.
pub const ASSISTANT_PREAMBLE: &str = "You are a careful visual assistant helping people with low or no vision understand their surroundings. Be concrete, mention positions relative to the viewer, and put safety-relevant information first.";

pub fn prompt_for(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::SafetyNavigation => SAFETY_NAVIGATION_PROMPT,
        AnalysisMode::DailyTasks => DAILY_TASKS_PROMPT,
    }
}

/// Heading shown above the model's answer
pub fn title_for(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::SafetyNavigation => "Safety & Navigation Analysis",
        AnalysisMode::DailyTasks => "Daily Tasks Assistance",
    }
}

/// Follow-up tip shown after a successful analysis
pub fn tip_for(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::SafetyNavigation => {
            "Take note of any highlighted hazards and follow the navigation guidance carefully."
        }
        AnalysisMode::DailyTasks => {
            "Save or bookmark this analysis for future reference when performing similar tasks."
        }
    }
}
