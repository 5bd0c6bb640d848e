//! Fixed input lists the batch runner selects from
//!
//! A [`Catalog`] is built once, validated, and then only read. The
//! built-in data covers ten personas, thirty moods, fifteen session
//! contexts and twenty therapist statements; custom catalogs can be loaded
//! from JSON with the same shape.

use crate::types::{ConversationContext, PatientPersona};
use crate::{PatsimError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Immutable persona, mood, context and therapist statement lists
///
/// Deserialization validates like [`Catalog::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCatalog")]
pub struct Catalog {
    personas: Vec<PatientPersona>,
    moods: Vec<String>,
    contexts: Vec<ConversationContext>,
    therapist_statements: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCatalog {
    personas: Vec<PatientPersona>,
    moods: Vec<String>,
    contexts: Vec<ConversationContext>,
    therapist_statements: Vec<String>,
}

impl TryFrom<RawCatalog> for Catalog {
    type Error = PatsimError;

    fn try_from(raw: RawCatalog) -> Result<Self> {
        Catalog::new(
            raw.personas,
            raw.moods,
            raw.contexts,
            raw.therapist_statements,
        )
    }
}

impl Catalog {
    /// Build a catalog, rejecting empty lists, blank entries and duplicate ids
    pub fn new(
        personas: Vec<PatientPersona>,
        moods: Vec<String>,
        contexts: Vec<ConversationContext>,
        therapist_statements: Vec<String>,
    ) -> Result<Self> {
        let catalog = Self {
            personas,
            moods,
            contexts,
            therapist_statements,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PatsimError::config(format!(
                "Failed to read catalog file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Parse a catalog from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// Personas
    pub fn personas(&self) -> &[PatientPersona] {
        &self.personas
    }

    /// Mood labels
    pub fn moods(&self) -> &[String] {
        &self.moods
    }

    /// Session contexts
    pub fn contexts(&self) -> &[ConversationContext] {
        &self.contexts
    }

    /// Therapist statements
    pub fn therapist_statements(&self) -> &[String] {
        &self.therapist_statements
    }

    /// Look up a persona by id
    pub fn persona(&self, id: &str) -> Option<&PatientPersona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Look up a context by id
    pub fn context(&self, id: &str) -> Option<&ConversationContext> {
        self.contexts.iter().find(|c| c.id == id)
    }

    fn validate(&self) -> Result<()> {
        if self.personas.is_empty() {
            return Err(PatsimError::validation("catalog has no personas"));
        }
        if self.moods.is_empty() {
            return Err(PatsimError::validation("catalog has no moods"));
        }
        if self.contexts.is_empty() {
            return Err(PatsimError::validation("catalog has no contexts"));
        }
        if self.therapist_statements.is_empty() {
            return Err(PatsimError::validation(
                "catalog has no therapist statements",
            ));
        }

        let mut seen = HashSet::new();
        for persona in &self.personas {
            if persona.id.trim().is_empty() {
                return Err(PatsimError::missing_field(
                    "id",
                    format!("persona '{}'", persona.name),
                    "Give every persona a unique, non-empty id",
                ));
            }
            if persona.name.trim().is_empty() || persona.background.trim().is_empty() {
                return Err(PatsimError::validation(format!(
                    "persona '{}' needs a name and a background",
                    persona.id
                )));
            }
            if !seen.insert(persona.id.as_str()) {
                return Err(PatsimError::validation(format!(
                    "duplicate persona id '{}'",
                    persona.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for context in &self.contexts {
            if context.id.trim().is_empty() {
                return Err(PatsimError::missing_field(
                    "id",
                    format!("context '{}'", context.current_topic),
                    "Give every context a unique, non-empty id",
                ));
            }
            if context.session_number == 0 {
                return Err(PatsimError::validation(format!(
                    "context '{}' has session number 0; sessions start at 1",
                    context.id
                )));
            }
            if !seen.insert(context.id.as_str()) {
                return Err(PatsimError::validation(format!(
                    "duplicate context id '{}'",
                    context.id
                )));
            }
        }

        if self.moods.iter().any(|m| m.trim().is_empty()) {
            return Err(PatsimError::validation("catalog contains a blank mood"));
        }
        if self.therapist_statements.iter().any(|s| s.trim().is_empty()) {
            return Err(PatsimError::validation(
                "catalog contains a blank therapist statement",
            ));
        }

        Ok(())
    }

    /// Built-in catalog
    pub fn builtin() -> Self {
        Self {
            personas: builtin_personas(),
            moods: BUILTIN_MOODS.iter().map(|m| m.to_string()).collect(),
            contexts: builtin_contexts(),
            therapist_statements: BUILTIN_THERAPIST_STATEMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_personas() -> Vec<PatientPersona> {
    vec![
        PatientPersona::new(
            "alex",
            "Alex",
            "Recently divorced, struggling with work-life balance",
        )
        .with_age(28)
        .with_occupation("Software Developer")
        .with_traits(["introverted", "analytical", "perfectionist"])
        .with_history("History of mild depression, first time in therapy"),
        PatientPersona::new("sarah", "Sarah", "Single parent of two, dealing with burnout")
            .with_age(35)
            .with_occupation("Elementary School Teacher")
            .with_traits(["empathetic", "organized", "anxious"])
            .with_history("Diagnosed with generalized anxiety disorder, in therapy for 6 months"),
        PatientPersona::new(
            "michael",
            "Michael",
            "Workaholic, recently passed over for promotion",
        )
        .with_age(42)
        .with_occupation("Marketing Executive")
        .with_traits(["ambitious", "competitive", "impatient"])
        .with_history("No prior therapy, experiencing symptoms of burnout and insomnia"),
        PatientPersona::new(
            "emily",
            "Emily",
            "First-generation college student, struggling with academic pressure",
        )
        .with_age(19)
        .with_occupation("College Student")
        .with_traits(["creative", "sensitive", "self-critical"])
        .with_history("History of social anxiety, started therapy 3 months ago"),
        PatientPersona::new(
            "robert",
            "Robert",
            "Recovering alcoholic, trying to rebuild relationships with family",
        )
        .with_age(55)
        .with_occupation("Construction Worker")
        .with_traits(["stoic", "hardworking", "guarded"])
        .with_history("Completed rehab 1 year ago, in therapy for anger management"),
        PatientPersona::new(
            "lisa",
            "Lisa",
            "Working in high-stress hospital environment, dealing with compassion fatigue",
        )
        .with_age(31)
        .with_occupation("Nurse")
        .with_traits(["compassionate", "dedicated", "perfectionist"])
        .with_history("Experiencing symptoms of PTSD, first time in therapy"),
        PatientPersona::new(
            "david",
            "David",
            "Recently filed for bankruptcy, marriage under strain",
        )
        .with_age(48)
        .with_occupation("Small Business Owner")
        .with_traits(["risk-taker", "optimistic", "stubborn"])
        .with_history("History of mild depression, returning to therapy after 5 years"),
        PatientPersona::new(
            "sophia",
            "Sophia",
            "Moved to big city to pursue dreams, feeling lonely and overwhelmed",
        )
        .with_age(23)
        .with_occupation("Aspiring Actor")
        .with_traits(["extroverted", "ambitious", "sensitive"])
        .with_history("No prior therapy, experiencing symptoms of depression and anxiety"),
        PatientPersona::new(
            "james",
            "James",
            "Struggling to find purpose post-retirement, wife diagnosed with cancer",
        )
        .with_age(62)
        .with_occupation("Recently Retired Engineer")
        .with_traits(["logical", "reserved", "routine-oriented"])
        .with_history("No prior therapy, experiencing grief and adjustment issues"),
        PatientPersona::new(
            "maria",
            "Maria",
            "First-generation immigrant, balancing cultural expectations with personal goals",
        )
        .with_age(37)
        .with_occupation("Freelance Graphic Designer")
        .with_traits(["creative", "adaptable", "people-pleaser"])
        .with_history("In therapy for 2 years, working on self-esteem and assertiveness"),
    ]
}

const BUILTIN_MOODS: &[&str] = &[
    "anxious and slightly defensive",
    "depressed and withdrawn",
    "optimistic but cautious",
    "frustrated and impatient",
    "calm and reflective",
    "angry and confrontational",
    "sad but hopeful",
    "overwhelmed and scattered",
    "content yet uncertain",
    "fearful and avoidant",
    "excited and talkative",
    "guilty and remorseful",
    "numb and disconnected",
    "irritable and restless",
    "grateful but worried",
    "confused and seeking clarity",
    "determined and focused",
    "vulnerable and open",
    "skeptical and guarded",
    "energetic but nervous",
    "resigned and apathetic",
    "curious and engaged",
    "ashamed and self-critical",
    "relieved but exhausted",
    "motivated yet apprehensive",
    "pessimistic and cynical",
    "confident and assertive",
    "lonely and seeking connection",
    "nostalgic and melancholic",
    "amused and light-hearted",
];

fn builtin_contexts() -> Vec<ConversationContext> {
    [
        (3, "Cognitive Behavioral Therapy", "Work-related stress",
         "I feel overwhelmed by my project deadlines."),
        (1, "Psychodynamic Therapy", "Childhood experiences",
         "I've always felt like I wasn't good enough for my parents."),
        (7, "Mindfulness-Based Stress Reduction", "Anxiety management",
         "I tried the breathing exercise, but my mind kept wandering."),
        (5, "Solution-Focused Brief Therapy", "Relationship issues",
         "Things have been better with my partner since we started communicating more."),
        (2, "Acceptance and Commitment Therapy", "Values and goals",
         "I'm not sure what I really want in life anymore."),
        (10, "Cognitive Behavioral Therapy", "Depression management",
         "I've been able to challenge some of my negative thoughts, but it's still hard."),
        (4, "Dialectical Behavior Therapy", "Emotional regulation",
         "I lashed out at my coworker again, but I felt guilty immediately after."),
        (8, "Interpersonal Therapy", "Social support",
         "I've been trying to reach out to friends more, but it feels awkward."),
        (6, "Existential Therapy", "Life meaning and purpose",
         "Sometimes I wonder if anything I do really matters."),
        (12, "Narrative Therapy", "Reframing life story",
         "I'm starting to see how I've been telling myself a negative story about my capabilities."),
        (3, "Gestalt Therapy", "Present-moment awareness",
         "I noticed I was clenching my fists when talking about my boss."),
        (9, "Art Therapy", "Self-expression",
         "The painting I made last session really helped me understand my feelings better."),
        (2, "Family Systems Therapy", "Family dynamics",
         "I realized I've been playing the peacekeeper role in my family for years."),
        (5, "Positive Psychology", "Strengths and resilience",
         "I've been trying to focus on what I'm good at instead of my weaknesses."),
        (7, "Trauma-Focused Cognitive Behavioral Therapy", "Coping with traumatic memories",
         "The nightmares are less frequent now, but they're still intense when they happen."),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (session, approach, topic, previous))| {
        ConversationContext::new(format!("ctx-{:02}", i + 1), session, approach, topic)
            .with_previous_statement(previous)
    })
    .collect()
}

const BUILTIN_THERAPIST_STATEMENTS: &[&str] = &[
    "Thank you for sharing that. Can you tell me more about how this experience has been affecting you?",
    "It sounds like you've been going through a lot. How have you been coping with these feelings?",
    "I'm curious about your perspective on this. What do you think might be underlying these experiences?",
    "Let's explore that further. How do you think this relates to what we've discussed in previous sessions?",
    "It's important to acknowledge those feelings. Have you noticed any patterns in when they tend to arise?",
    "You've shown a lot of resilience in dealing with this. What strategies have you found most helpful so far?",
    "I wonder if we could take a moment to reflect on how this situation aligns with your personal values and goals.",
    "That must be challenging to deal with. How would you like things to be different?",
    "It's interesting that you mention that. How do you think this connects to other areas of your life?",
    "I appreciate your openness. Can you walk me through what a typical day looks like for you when dealing with this?",
    "Let's take a step back for a moment. How do you think someone you admire might handle a similar situation?",
    "It sounds like this has been weighing on you. What would it look like to show yourself some compassion in this situation?",
    "I'm hearing a lot of important points. Which aspect of this do you think is most crucial for us to focus on right now?",
    "You've made some important observations. How do you think understanding this might help you move forward?",
    "It's clear you've given this a lot of thought. What do you think might be a small, manageable step you could take to address this?",
    "I'm noticing some themes in what you're sharing. How do these experiences compare to similar situations you've faced in the past?",
    "That sounds really challenging. If you could change one thing about this situation, what would it be?",
    "You've mentioned several different aspects of this issue. Which one feels most pressing or important to you right now?",
    "I can see how much this matters to you. What do you think success or progress would look like in this situation?",
    "It's important that we explore this further. How do you think these experiences have shaped your view of yourself or the world?",
];
