//! Translation job processing: flatten items, translate fields, write back

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::client::ModernMtTranslator;
use crate::core::models::{FieldOutcome, TranslatableField, TranslationResult};
use crate::processors::data::{self, DataShaper, FlatData, NestedDataShaper};

/// Message recorded when a job has been handed to ModernMT
pub const SUBMITTED_MESSAGE: &str = "The translation job has been submitted to ModernMT.";

/// Severity of a job message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSeverity {
    /// Informational
    Status,
    /// Something degraded but the job went on
    Warning,
    /// The job failed
    Error,
}

impl fmt::Display for MessageSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageSeverity::Status => write!(f, "status"),
            MessageSeverity::Warning => write!(f, "warning"),
            MessageSeverity::Error => write!(f, "error"),
        }
    }
}

/// Host-side view of a translation job
///
/// Items are addressed by position so the processor can mark the job while
/// it walks the items.
pub trait TranslationJob: Send {
    /// Provider language code of the source language
    fn remote_source_language(&self) -> String;

    /// Provider language code of the target language
    fn remote_target_language(&self) -> String;

    /// Number of items in the job
    fn item_count(&self) -> usize;

    /// Nested source data of an item
    fn item_data(&self, index: usize) -> Option<&Value>;

    /// Attach translated nested data to an item
    fn add_translated_data(&mut self, index: usize, data: Value);

    /// Whether the job has been rejected
    fn is_rejected(&self) -> bool;

    /// Mark the job as submitted
    fn submitted(&mut self, message: &str);

    /// Mark the job as rejected
    fn rejected(&mut self, message: &str, severity: MessageSeverity);
}

/// Counters from one `request_translation` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    /// Items processed
    pub items: usize,
    /// Translatable fields found
    pub fields: usize,
    /// Fields the provider translated
    pub translated: usize,
    /// Fields whose response held no translation
    pub malformed: usize,
    /// Fields whose request failed
    pub failed: usize,
}

/// Drives a translator over every translatable field of a job
#[derive(Clone)]
pub struct JobProcessor {
    translator: ModernMtTranslator,
    shaper: Arc<dyn DataShaper>,
}

impl fmt::Debug for JobProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobProcessor")
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}

impl JobProcessor {
    /// Create a processor with the default data shaper
    pub fn new(translator: ModernMtTranslator) -> Self {
        Self::with_shaper(translator, Arc::new(NestedDataShaper::new()))
    }

    /// Create a processor with a custom data shaper
    pub fn with_shaper(translator: ModernMtTranslator, shaper: Arc<dyn DataShaper>) -> Self {
        Self { translator, shaper }
    }

    /// Translator used for the fields
    pub fn translator(&self) -> &ModernMtTranslator {
        &self.translator
    }

    /// Translate every item of a job and report the job-level outcome
    ///
    /// A failed field rejects the job but the remaining fields and items are
    /// still translated. Every translatable key is written back, failed ones
    /// as empty strings. The job is marked submitted only if it ends up not
    /// rejected.
    pub async fn request_translation<J>(&self, job: &mut J) -> JobReport
    where
        J: TranslationJob + ?Sized,
    {
        let source = job.remote_source_language();
        let target = job.remote_target_language();
        let mut report = JobReport::default();

        info!(
            "Requesting translation of {} item(s) {} -> {}",
            job.item_count(),
            source,
            target
        );

        for index in 0..job.item_count() {
            let fields = match job.item_data(index) {
                Some(data) => self.shaper.filter_translatable(data),
                None => continue,
            };
            debug!("Item {}: {} translatable field(s)", index, fields.len());

            let mut results = self.translate_fields(&fields, &source, &target).await;
            let mut translated = FlatData::new();

            for field in &fields {
                let outcome = results
                    .remove(&field.key)
                    .map(|result| result.outcome)
                    .unwrap_or_else(|| FieldOutcome::Failed("no result for field".to_string()));

                match &outcome {
                    FieldOutcome::Translated(_) => report.translated += 1,
                    FieldOutcome::Malformed(_) => report.malformed += 1,
                    FieldOutcome::Failed(reason) => {
                        report.failed += 1;
                        job.rejected(
                            &format!("ModernMT translation failed: {}", reason),
                            MessageSeverity::Error,
                        );
                    }
                }

                translated.insert(field.key.clone(), data::translated_value(field, outcome.text()));
            }

            report.items += 1;
            report.fields += fields.len();
            job.add_translated_data(index, self.shaper.unflatten(&translated));
        }

        if !job.is_rejected() {
            job.submitted(SUBMITTED_MESSAGE);
        }

        info!(
            "Job processed: {} translated, {} malformed, {} failed",
            report.translated, report.malformed, report.failed
        );

        report
    }

    /// Translate fields with at most `max_concurrent` requests in flight
    async fn translate_fields(
        &self,
        fields: &[TranslatableField],
        source: &str,
        target: &str,
    ) -> BTreeMap<String, TranslationResult> {
        let max_concurrent = self.translator.config().max_concurrent.max(1);

        stream::iter(fields)
            .map(|field| self.translator.translate_field(field, source, target))
            .buffer_unordered(max_concurrent)
            .map(|result| (result.key.clone(), result))
            .collect::<BTreeMap<_, _>>()
            .await
    }
}

/// Lifecycle state of an [`InMemoryJob`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Not yet sent to the provider
    #[default]
    Unprocessed,
    /// Sent to the provider
    Submitted,
    /// Rejected by the translator
    Rejected,
}

/// A message in a job's log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    /// Message text
    pub message: String,
    /// Severity
    pub severity: MessageSeverity,
    /// When the message was recorded
    pub created: DateTime<Utc>,
}

/// One content item of an [`InMemoryJob`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryJobItem {
    /// Item id
    #[serde(default)]
    pub id: u64,
    /// Nested source data
    #[serde(default)]
    pub data: Value,
    /// Nested translated data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_data: Option<Value>,
}

impl InMemoryJobItem {
    /// Create an item from nested data
    pub fn new(id: u64, data: Value) -> Self {
        Self {
            id,
            data,
            translated_data: None,
        }
    }
}

/// Self-contained job, loadable from JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryJob {
    /// Job id
    #[serde(default)]
    pub id: u64,
    /// Local source language code
    pub source_language: String,
    /// Local target language code
    pub target_language: String,
    /// Local to provider language code mapping
    #[serde(default)]
    pub remote_languages: BTreeMap<String, String>,
    /// Lifecycle state
    #[serde(default)]
    pub state: JobState,
    /// Items to translate
    #[serde(default)]
    pub items: Vec<InMemoryJobItem>,
    /// Message log
    #[serde(default)]
    pub messages: Vec<JobMessage>,
}

impl InMemoryJob {
    /// Create an empty job
    pub fn new(source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            source_language: source_language.into(),
            target_language: target_language.into(),
            ..Default::default()
        }
    }

    /// Add an item with the next id
    pub fn with_item(mut self, data: Value) -> Self {
        let id = self.items.len() as u64 + 1;
        self.items.push(InMemoryJobItem::new(id, data));
        self
    }

    /// Map a local language code to the provider's code
    pub fn with_remote_language(
        mut self,
        local: impl Into<String>,
        remote: impl Into<String>,
    ) -> Self {
        self.remote_languages.insert(local.into(), remote.into());
        self
    }

    fn remote_language(&self, local: &str) -> String {
        self.remote_languages
            .get(local)
            .cloned()
            .unwrap_or_else(|| local.to_string())
    }

    fn add_message(&mut self, message: &str, severity: MessageSeverity) {
        self.messages.push(JobMessage {
            message: message.to_string(),
            severity,
            created: Utc::now(),
        });
    }
}

impl TranslationJob for InMemoryJob {
    fn remote_source_language(&self) -> String {
        self.remote_language(&self.source_language)
    }

    fn remote_target_language(&self) -> String {
        self.remote_language(&self.target_language)
    }

    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn item_data(&self, index: usize) -> Option<&Value> {
        self.items.get(index).map(|item| &item.data)
    }

    fn add_translated_data(&mut self, index: usize, data: Value) {
        let Some(item) = self.items.get_mut(index) else {
            warn!("No job item at index {}", index);
            return;
        };

        match item.translated_data.as_mut() {
            Some(existing) => data::merge_data(existing, data),
            None => item.translated_data = Some(data),
        }
    }

    fn is_rejected(&self) -> bool {
        self.state == JobState::Rejected
    }

    fn submitted(&mut self, message: &str) {
        if self.is_rejected() {
            warn!("Job {} is rejected; not marking it submitted", self.id);
            return;
        }
        self.state = JobState::Submitted;
        self.add_message(message, MessageSeverity::Status);
    }

    fn rejected(&mut self, message: &str, severity: MessageSeverity) {
        self.state = JobState::Rejected;
        self.add_message(message, severity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProviderConfig;
    use crate::core::credentials::InMemoryKeyRepository;
    use crate::core::http::testing::FakeTransport;
    use crate::core::http::HttpResponse;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    fn ok(translation: &str) -> HttpResponse {
        HttpResponse::new(200, json!({"data": {"translation": translation}}).to_string())
    }

    fn processor(transport: Arc<FakeTransport>, max_concurrent: usize) -> JobProcessor {
        let config = ProviderConfig {
            max_concurrent,
            ..ProviderConfig::with_api_key_id("modernmt")
        };
        let keys = InMemoryKeyRepository::new().with_key("modernmt", "s3cr3t");
        JobProcessor::new(ModernMtTranslator::new(config, transport, Arc::new(keys)).unwrap())
    }

    #[tokio::test]
    async fn test_single_field_job() {
        let transport = Arc::new(FakeTransport::new().reply(ok("Bonjour le monde")));
        let mut job = InMemoryJob::new("en", "fr").with_item(json!({"title": "Hello world"}));

        let report = processor(transport, 1).request_translation(&mut job).await;

        assert_eq!(job.state, JobState::Submitted);
        assert_eq!(job.messages.len(), 1);
        assert_eq!(job.messages[0].message, SUBMITTED_MESSAGE);
        assert_json_eq!(
            job.items[0].translated_data.clone().unwrap(),
            json!({"title": "Bonjour le monde"})
        );
        assert_eq!(report.translated, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_empty_job_is_submitted_without_requests() {
        let transport = Arc::new(FakeTransport::new());
        let mut job = InMemoryJob::new("en", "fr");

        let report = processor(transport.clone(), 1).request_translation(&mut job).await;

        assert_eq!(job.state, JobState::Submitted);
        assert_eq!(transport.request_count(), 0);
        assert_eq!(report, JobReport::default());
    }

    #[tokio::test]
    async fn test_failed_field_rejects_but_continues() {
        let transport = Arc::new(
            FakeTransport::new()
                .reply(ok("Bonjour"))
                .fail("connection reset")
                .reply(ok("Salut")),
        );
        let mut job = InMemoryJob::new("en", "fr")
            .with_item(json!({"a": "Hello", "b": "World"}))
            .with_item(json!({"c": {"#text": "Hi", "#translate": true}}));

        let report = processor(transport.clone(), 1).request_translation(&mut job).await;

        assert_eq!(transport.request_count(), 3);
        assert_eq!(job.state, JobState::Rejected);
        assert_eq!(job.messages.len(), 1);
        assert_eq!(job.messages[0].severity, MessageSeverity::Error);
        assert!(job.messages[0]
            .message
            .starts_with("ModernMT translation failed: Network error: connection reset"));

        assert_json_eq!(
            job.items[0].translated_data.clone().unwrap(),
            json!({"a": "Bonjour", "b": ""})
        );
        assert_json_eq!(
            job.items[1].translated_data.clone().unwrap(),
            json!({"c": {"#text": "Salut"}})
        );
        assert_eq!(
            report,
            JobReport {
                items: 2,
                fields: 3,
                translated: 2,
                malformed: 0,
                failed: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_response_does_not_reject() {
        let transport = Arc::new(FakeTransport::new().reply(HttpResponse::new(200, "{}")));
        let mut job = InMemoryJob::new("en", "de").with_item(json!({"title": "Hello"}));

        let report = processor(transport, 1).request_translation(&mut job).await;

        assert_eq!(job.state, JobState::Submitted);
        assert_eq!(report.malformed, 1);
        assert_json_eq!(job.items[0].translated_data.clone().unwrap(), json!({"title": ""}));
    }

    #[tokio::test]
    async fn test_remote_language_mapping() {
        let transport = Arc::new(FakeTransport::new().reply(ok("Hallo")));
        let mut job = InMemoryJob::new("en", "pt-br")
            .with_remote_language("pt-br", "pt-BR")
            .with_item(json!({"title": "Hello"}));

        processor(transport.clone(), 1).request_translation(&mut job).await;

        let body: Value =
            serde_json::from_str(transport.last_request().unwrap().body.as_deref().unwrap()).unwrap();
        assert_eq!(body["source"], "en");
        assert_eq!(body["target"], "pt-BR");
    }

    #[tokio::test]
    async fn test_concurrent_fields_keep_their_keys() {
        let transport = Arc::new(FakeTransport::always(ok("same")));
        let data: serde_json::Map<String, Value> = (0..12)
            .map(|i| (format!("field_{:02}", i), Value::String(format!("text {}", i))))
            .collect();
        let mut job = InMemoryJob::new("en", "fr").with_item(Value::Object(data));

        let report = processor(transport.clone(), 4).request_translation(&mut job).await;

        assert_eq!(transport.request_count(), 12);
        assert_eq!(report.translated, 12);
        let translated = job.items[0].translated_data.clone().unwrap();
        for i in 0..12 {
            assert_eq!(translated[format!("field_{:02}", i)], "same");
        }
    }

    #[tokio::test]
    async fn test_non_translatable_fields_are_skipped() {
        let transport = Arc::new(FakeTransport::new().reply(ok("Titre")));
        let mut job = InMemoryJob::new("en", "fr").with_item(json!({
            "title": {"#text": "Title"},
            "format": {"#text": "basic_html", "#translate": false},
            "weight": 1
        }));

        processor(transport.clone(), 1).request_translation(&mut job).await;

        assert_eq!(transport.request_count(), 1);
        assert_json_eq!(
            job.items[0].translated_data.clone().unwrap(),
            json!({"title": {"#text": "Titre"}})
        );
    }

    #[test]
    fn test_rejected_job_stays_rejected() {
        let mut job = InMemoryJob::new("en", "fr");
        job.rejected("ModernMT translation failed: boom", MessageSeverity::Error);
        job.submitted(SUBMITTED_MESSAGE);

        assert!(job.is_rejected());
        assert_eq!(job.messages.len(), 1);
    }

    #[test]
    fn test_job_state_values() {
        for (state, name) in [
            (JobState::Unprocessed, "unprocessed"),
            (JobState::Submitted, "submitted"),
            (JobState::Rejected, "rejected"),
        ] {
            assert_eq!(serde_json::to_value(state).unwrap(), json!(name));
        }
        assert!(serde_json::from_value::<JobState>(json!("translated")).is_err());
    }

    #[test]
    fn test_job_from_json() {
        let job: InMemoryJob = serde_json::from_value(json!({
            "source_language": "en",
            "target_language": "it",
            "items": [{"data": {"title": "Hello"}}]
        }))
        .unwrap();

        assert_eq!(job.state, JobState::Unprocessed);
        assert_eq!(job.item_count(), 1);
        assert_eq!(job.remote_target_language(), "it");
        assert_eq!(job.item_data(0), Some(&json!({"title": "Hello"})));
        assert_eq!(job.item_data(1), None);
    }
}
