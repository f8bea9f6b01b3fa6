//! ModernMT Connector - machine translation for content translation jobs
//!
//! This library validates ModernMT API keys, translates the translatable
//! fields of translation job items one request per field, and writes the
//! results back in the items' original nested shape.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod core;
pub mod processors;

// Re-export key types for convenience
pub use crate::core::{
    client::ModernMtTranslator,
    config::ProviderConfig,
    credentials::{CredentialResolver, EnvKeyRepository, InMemoryKeyRepository, KeyRepository},
    errors::ConnectorError,
    http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport},
    models::{Availability, FieldOutcome, TranslatableField, TranslationResult},
};

pub use crate::processors::{
    data::{DataShaper, NestedDataShaper},
    job::{InMemoryJob, JobProcessor, JobReport, MessageSeverity, TranslationJob},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
