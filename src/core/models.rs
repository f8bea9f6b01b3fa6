//! Core data models for translation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of a ModernMT translate request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateBody {
    /// Remote source language code
    pub source: String,
    /// Remote target language code
    pub target: String,
    /// Text to translate
    pub q: String,
}

impl TranslateBody {
    /// Create a request body
    pub fn new(text: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            q: text.into(),
        }
    }
}

/// How a translatable leaf was written in the item data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldShape {
    /// A bare string value
    Plain,
    /// An object carrying its text under `#text`
    Annotated,
}

/// A translatable leaf extracted from job item data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatableField {
    /// Path of the leaf, used to write the translation back
    pub key: String,
    /// Source text
    pub text: String,
    /// Shape the translation is written back in
    pub shape: FieldShape,
}

impl TranslatableField {
    /// Create a plain-string field
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            shape: FieldShape::Plain,
        }
    }
}

/// Outcome of translating one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum FieldOutcome {
    /// Provider returned a translation (possibly empty)
    Translated(String),
    /// Provider answered but the body held no usable translation
    Malformed(String),
    /// Provider could not be reached or refused the request
    Failed(String),
}

impl FieldOutcome {
    /// Text to write back; empty unless translated
    pub fn text(&self) -> &str {
        match self {
            FieldOutcome::Translated(text) => text,
            FieldOutcome::Malformed(_) | FieldOutcome::Failed(_) => "",
        }
    }

    /// Whether the provider returned a translation
    pub fn is_translated(&self) -> bool {
        matches!(self, FieldOutcome::Translated(_))
    }
}

/// Translation result for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// Key of the source field
    pub key: String,
    /// What happened
    pub outcome: FieldOutcome,
}

impl TranslationResult {
    /// Translated text, empty on failure
    pub fn translated_text(&self) -> &str {
        self.outcome.text()
    }
}

/// Result of the pre-flight availability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Credential accepted by the provider
    Available,
    /// No credential selected
    NotConfigured,
    /// Credential missing, rejected, or provider unreachable
    Unavailable {
        /// Human-readable cause
        reason: String,
    },
}

impl Availability {
    /// Whether the translator can be used
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    /// Reason the translator cannot be used
    pub fn reason(&self) -> Option<&str> {
        match self {
            Availability::Available => None,
            Availability::NotConfigured => Some("not configured"),
            Availability::Unavailable { reason } => Some(reason),
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available => write!(f, "ModernMT service is available."),
            Availability::NotConfigured => write!(f, "ModernMT service is not configured."),
            Availability::Unavailable { reason } => {
                write!(f, "ModernMT service is not available: {}", reason)
            }
        }
    }
}
