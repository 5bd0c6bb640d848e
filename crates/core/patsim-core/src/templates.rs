//! Template engine for prompt generation

use crate::types::{ConversationContext, PatientPersona, PromptKind};
use crate::{PatsimError, Result};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Template engine wrapper with the three pipeline prompts pre-registered
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// Create a new template engine holding the default prompts
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();

        // Every placeholder must be supplied; prompts are plain text, not HTML
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);

        let mut engine = Self { handlebars };
        engine.register_template(template_name(PromptKind::MoodValidation), MOOD_VALIDATION_TEMPLATE)?;
        engine.register_template(
            template_name(PromptKind::ReplyGeneration),
            REPLY_GENERATION_TEMPLATE,
        )?;
        engine.register_template(
            template_name(PromptKind::ReplyEvaluation),
            REPLY_EVALUATION_TEMPLATE,
        )?;
        Ok(engine)
    }

    /// Render an ad-hoc template with data
    pub fn render(
        &self,
        template: &str,
        data: &HashMap<String, serde_json::Value>,
    ) -> Result<String> {
        self.handlebars
            .render_template(template, data)
            .map_err(|e| PatsimError::template(e.to_string()))
    }

    /// Register (or replace) a template
    pub fn register_template(&mut self, name: &str, template: &str) -> Result<()> {
        self.handlebars
            .register_template_string(name, template)
            .map_err(|e| PatsimError::template(e.to_string()))?;
        Ok(())
    }

    /// Replace the prompt used for one pipeline step
    pub fn override_prompt(&mut self, kind: PromptKind, template: &str) -> Result<()> {
        self.register_template(template_name(kind), template)
    }

    /// Render the prompt for a pipeline step
    pub fn render_prompt(
        &self,
        kind: PromptKind,
        data: &HashMap<String, serde_json::Value>,
    ) -> Result<String> {
        self.handlebars
            .render(template_name(kind), data)
            .map_err(|e| PatsimError::template(e.to_string()))
    }
}

/// Placeholder values shared by all three prompts
pub fn persona_prompt_data(
    persona: &PatientPersona,
    mood: &str,
    context: &ConversationContext,
) -> HashMap<String, serde_json::Value> {
    let mut data = HashMap::new();
    data.insert(
        "PERSONA".to_string(),
        serde_json::Value::String(persona.to_string().trim_end().to_string()),
    );
    data.insert("MOOD".to_string(), serde_json::Value::String(mood.to_string()));
    data.insert(
        "CONTEXT".to_string(),
        serde_json::Value::String(context.to_string().trim_end().to_string()),
    );
    data
}

fn template_name(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::MoodValidation => "mood_validation",
        PromptKind::ReplyGeneration => "reply_generation",
        PromptKind::ReplyEvaluation => "reply_evaluation",
    }
}

/// Persona-mood realism check
pub const MOOD_VALIDATION_TEMPLATE: &str = r#"
# Task
Evaluate the realism and consistency of a persona-mood combination in a therapy context.

# Patient Persona
{{PERSONA}}

# Mood
{{MOOD}}

# Session Context
{{CONTEXT}}

# Evaluation Guidelines
1. Consistency: the mood should align with the patient's background and mental health history.
2. Contextual appropriateness: the mood should fit the current session and topic.
3. Complexity: real patients often have layered emotional states; avoid overly simple pairings.
4. Temporal factors: account for recent events or therapy progress that could shape the mood.
5. Personality influence: consider how the personality traits affect how the mood is expressed.

# Scoring
- Score from 0.0 to 1.0, where 1.0 is perfectly realistic and consistent.
- Scores below 0.5 indicate significant inconsistencies or unrealistic combinations.
- Scores above 0.7 indicate acceptable realism.

Respond in XML format:
<realism_score>A number between 0.0 and 1.0</realism_score>
<explanation>A brief explanation highlighting strengths or concerns</explanation>
<suggestions>Minor adjustments that would improve realism, or "none"</suggestions>
"#;

/// Patient reply generation
pub const REPLY_GENERATION_TEMPLATE: &str = r#"
# Task
Generate a realistic, contextually appropriate patient reply in a therapy session.

# Patient Persona
{{PERSONA}}

# Current Mood
{{MOOD}}

# Session Context
{{CONTEXT}}

# Therapist
{{THERAPIST_STATEMENT}}

# Generation Guidelines
1. Stay consistent with the persona, the mood and previous statements.
2. Reflect therapeutic progress implied by the session number.
3. Show the level of resistance or openness the personality and mood call for.
4. Match the patient's background and typical speech patterns.
5. Include non-verbal cues such as tone, pauses or gestures in parentheses.
6. Respond directly to the therapist's statement.
7. Where it fits, show internal conflict or mixed feelings about the issue or the therapy.

# Format
- Start the reply with "Patient:" followed by the verbal response.
- Keep it to 1-3 sentences unless the context clearly calls for more.

Respond in XML format:
<patient_reply>Patient: ...</patient_reply>
"#;

/// Patient reply realism scoring
pub const REPLY_EVALUATION_TEMPLATE: &str = r#"
# Task
Evaluate the realism and appropriateness of a generated patient reply in a therapy context.

# Patient Persona
{{PERSONA}}

# Current Mood
{{MOOD}}

# Session Context
{{CONTEXT}}

# Therapist
{{THERAPIST_STATEMENT}}

# Patient Reply
{{PATIENT_REPLY}}

# Evaluation Criteria
1. Consistency with persona, mood and session context.
2. Relevance as a response to the therapist's statement.
3. Emotional congruence between tone and the patient's mood and situation.
4. Authenticity: natural rather than scripted.
5. Therapeutic engagement appropriate for this patient and session.
6. Language consistent with the patient's background and emotional state.
7. Depth appropriate to the context and the patient's characteristics.

# Scoring
- Score from 0.0 to 1.0, where 1.0 is a perfectly realistic and appropriate reply.
- Scores below 0.5 indicate significant issues.
- Scores above 0.7 indicate acceptable realism.

Respond in XML format:
<realism_score>A number between 0.0 and 1.0</realism_score>
<explanation>A brief explanation highlighting strengths and areas for improvement</explanation>
<suggestions>Specific improvements if the score is low, or "none"</suggestions>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> HashMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn test_persona_prompt_data() {
        let persona = PatientPersona::new("kim", "Kim", "New parent").with_age(30);
        let context = ConversationContext::new("s1", 2, "CBT", "Sleep");
        let data = persona_prompt_data(&persona, "tired", &context);

        let engine = TemplateEngine::new().unwrap();
        let prompt = engine.render_prompt(PromptKind::MoodValidation, &data).unwrap();
        assert!(prompt.contains("Name: Kim\nAge: 30\nBackground: New parent"));
        assert!(prompt.contains("Session Number: 2"));
        assert!(prompt.contains("# Mood\ntired"));
    }

    #[test]
    fn test_render_does_not_escape() {
        let engine = TemplateEngine::new().unwrap();
        let result = engine
            .render("{{LINE}}", &data(&[("LINE", "I'm \"fine\" & <ok>")]))
            .unwrap();
        assert_eq!(result, "I'm \"fine\" & <ok>");
    }

    #[test]
    fn test_strict_mode_rejects_missing_placeholder() {
        let engine = TemplateEngine::new().unwrap();
        let result = engine.render_prompt(
            PromptKind::MoodValidation,
            &data(&[("PERSONA", "Name: Alex"), ("MOOD", "calm")]),
        );
        assert!(matches!(result, Err(PatsimError::Template(_))));
    }

    #[test]
    fn test_generation_prompt_contents() {
        let engine = TemplateEngine::new().unwrap();
        let prompt = engine
            .render_prompt(
                PromptKind::ReplyGeneration,
                &data(&[
                    ("PERSONA", "Name: Alex"),
                    ("MOOD", "skeptical and guarded"),
                    ("CONTEXT", "Session Number: 2"),
                    ("THERAPIST_STATEMENT", "How has your week been?"),
                ]),
            )
            .unwrap();
        assert!(prompt.contains("skeptical and guarded"));
        assert!(prompt.contains("How has your week been?"));
        assert!(prompt.contains("<patient_reply>"));
    }

    #[test]
    fn test_override_prompt() {
        let mut engine = TemplateEngine::new().unwrap();
        engine
            .override_prompt(
                PromptKind::ReplyEvaluation,
                "Rate: {{PATIENT_REPLY}} <realism_score></realism_score>",
            )
            .unwrap();
        let prompt = engine
            .render_prompt(
                PromptKind::ReplyEvaluation,
                &data(&[("PATIENT_REPLY", "Patient: Okay.")]),
            )
            .unwrap();
        assert_eq!(prompt, "Rate: Patient: Okay. <realism_score></realism_score>");
    }

    #[test]
    fn test_templates_request_tagged_scores() {
        for template in [MOOD_VALIDATION_TEMPLATE, REPLY_EVALUATION_TEMPLATE] {
            assert!(template.contains("<realism_score>"));
            assert!(template.contains("<explanation>"));
            assert!(template.contains("<suggestions>"));
        }
    }
}
