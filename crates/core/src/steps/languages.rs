//! Languages step.

use serde::{Deserialize, Serialize};

use super::{sorted, FieldError, StepValidator, ValidationContext};
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    Basic,
    Conversational,
    Fluent,
    Native,
}

impl Proficiency {
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "basic" => Ok(Self::Basic),
            "conversational" => Ok(Self::Conversational),
            "fluent" => Ok(Self::Fluent),
            "native" => Ok(Self::Native),
            _ => Err(CoreError::Validation(format!(
                "Invalid proficiency '{s}'. Must be one of: basic, conversational, fluent, native"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Conversational => "conversational",
            Self::Fluent => "fluent",
            Self::Native => "native",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageEntry {
    #[serde(default)]
    pub language_name: String,
    /// `None` until the worker picks a level.
    #[serde(default)]
    pub proficiency: Option<Proficiency>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguagesData {
    #[serde(default)]
    pub languages: Vec<LanguageEntry>,
}

impl StepValidator for LanguagesData {
    fn validate(&self, _ctx: &ValidationContext) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.languages.is_empty() {
            errors.push(FieldError::new("languages", "Add at least one language"));
        }
        for (i, lang) in self.languages.iter().enumerate() {
            if lang.language_name.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("languages[{i}].language_name"),
                    "Language is required",
                ));
            }
            if lang.proficiency.is_none() {
                errors.push(FieldError::new(
                    format!("languages[{i}].proficiency"),
                    "Select a proficiency level",
                ));
            }
        }
        sorted(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::fixtures::ctx;

    #[test]
    fn needs_at_least_one_language() {
        assert!(!LanguagesData::default().is_valid(&ctx()));
    }

    #[test]
    fn named_language_with_level_is_valid() {
        let data = LanguagesData {
            languages: vec![LanguageEntry {
                language_name: "Hindi".into(),
                proficiency: Some(Proficiency::Native),
            }],
        };
        assert!(data.is_valid(&ctx()));
    }

    #[test]
    fn missing_level_is_invalid() {
        let data = LanguagesData {
            languages: vec![LanguageEntry {
                language_name: "Arabic".into(),
                proficiency: None,
            }],
        };
        assert_eq!(data.validate(&ctx())[0].field, "languages[0].proficiency");
    }

    #[test]
    fn unknown_level_fails_to_deserialize() {
        let result: Result<LanguageEntry, _> = serde_json::from_value(serde_json::json!({
            "language_name": "English",
            "proficiency": "expert"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn proficiency_roundtrip() {
        for p in [
            Proficiency::Basic,
            Proficiency::Conversational,
            Proficiency::Fluent,
            Proficiency::Native,
        ] {
            assert_eq!(Proficiency::from_str_db(p.as_str()).unwrap(), p);
        }
    }
}
