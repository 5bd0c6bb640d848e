//! Patient persona and session context records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Static background profile of a simulated patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPersona {
    /// Stable identifier written to output rows
    pub id: String,

    /// Display name
    pub name: String,

    /// Age in years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,

    /// Occupation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,

    /// Life situation driving the therapy
    pub background: String,

    /// Personality traits
    #[serde(default)]
    pub personality_traits: Vec<String>,

    /// Prior diagnoses and therapy history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mental_health_history: Option<String>,
}

impl PatientPersona {
    /// Create a persona with the required fields; optional ones start empty
    pub fn new(id: impl Into<String>, name: impl Into<String>, background: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            age: None,
            occupation: None,
            background: background.into(),
            personality_traits: Vec::new(),
            mental_health_history: None,
        }
    }

    /// Set age
    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    /// Set occupation
    pub fn with_occupation(mut self, occupation: impl Into<String>) -> Self {
        self.occupation = Some(occupation.into());
        self
    }

    /// Set personality traits
    pub fn with_traits<I, S>(mut self, traits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.personality_traits = traits.into_iter().map(Into::into).collect();
        self
    }

    /// Set mental health history
    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        self.mental_health_history = Some(history.into());
        self
    }
}

/// Labelled block used inside prompts
impl fmt::Display for PatientPersona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        if let Some(age) = self.age {
            writeln!(f, "Age: {}", age)?;
        }
        if let Some(occupation) = &self.occupation {
            writeln!(f, "Occupation: {}", occupation)?;
        }
        writeln!(f, "Background: {}", self.background)?;
        if !self.personality_traits.is_empty() {
            writeln!(
                f,
                "Personality Traits: {}",
                self.personality_traits.join(", ")
            )?;
        }
        if let Some(history) = &self.mental_health_history {
            writeln!(f, "Mental Health History: {}", history)?;
        }
        Ok(())
    }
}

/// Session-level metadata describing the simulated therapy scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    /// Stable identifier written to output rows
    pub id: String,

    /// 1-based session number
    pub session_number: u32,

    /// Therapy approach in use
    pub therapy_approach: String,

    /// Topic of the current session
    pub current_topic: String,

    /// Last thing the patient said before the therapist's statement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_patient_statement: Option<String>,
}

impl ConversationContext {
    /// Create a context without a previous patient statement
    pub fn new(
        id: impl Into<String>,
        session_number: u32,
        therapy_approach: impl Into<String>,
        current_topic: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            session_number,
            therapy_approach: therapy_approach.into(),
            current_topic: current_topic.into(),
            previous_patient_statement: None,
        }
    }

    /// Set the previous patient statement
    pub fn with_previous_statement(mut self, statement: impl Into<String>) -> Self {
        self.previous_patient_statement = Some(statement.into());
        self
    }
}

impl fmt::Display for ConversationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session Number: {}", self.session_number)?;
        writeln!(f, "Therapy Approach: {}", self.therapy_approach)?;
        writeln!(f, "Current Topic: {}", self.current_topic)?;
        if let Some(statement) = &self.previous_patient_statement {
            writeln!(f, "Previous Patient Statement: {}", statement)?;
        }
        Ok(())
    }
}
