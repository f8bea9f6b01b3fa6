//! ModernMT client: key validation, translate requests and response decoding

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::config::ProviderConfig;
use crate::core::credentials::{CredentialResolver, KeyRepository, SecretValue};
use crate::core::errors::{ConnectorError, Result};
use crate::core::http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::core::models::{
    Availability, FieldOutcome, TranslatableField, TranslateBody, TranslationResult,
};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "MMT-ApiKey";
/// Header naming the calling platform
pub const PLATFORM_HEADER: &str = "MMT-Platform";
/// Header carrying the platform version
pub const PLATFORM_VERSION_HEADER: &str = "MMT-PlatformVersion";
/// Platform identifier sent with the key validation request
pub const PLATFORM: &str = "simple-cat-tool";
/// Platform version sent with the key validation request
pub const PLATFORM_VERSION: &str = "1.2.8";

/// ModernMT translator bound to one provider configuration
#[derive(Clone)]
pub struct ModernMtTranslator {
    transport: Arc<dyn HttpTransport>,
    credentials: CredentialResolver,
    config: Arc<ProviderConfig>,
}

impl std::fmt::Debug for ModernMtTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModernMtTranslator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ModernMtTranslator {
    /// Create a translator over an explicit transport and key store
    pub fn new(
        config: ProviderConfig,
        transport: Arc<dyn HttpTransport>,
        keys: Arc<dyn KeyRepository>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            transport,
            credentials: CredentialResolver::new(keys),
            config: Arc::new(config),
        })
    }

    /// Create a translator talking to ModernMT over reqwest
    pub fn from_config(config: ProviderConfig, keys: Arc<dyn KeyRepository>) -> Result<Self> {
        let transport = ReqwestTransport::new(config.timeout_ms)?;
        Self::new(config, Arc::new(transport), keys)
    }

    /// Provider configuration in use
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Check that the configured key is accepted by ModernMT
    ///
    /// Always calls the provider; errors are folded into the result.
    pub async fn check_available(&self) -> Availability {
        if !self.config.is_configured() {
            return Availability::NotConfigured;
        }

        match self.validate_api_key(&self.config.api_key_id).await {
            Ok(()) => {
                info!("ModernMT API key {} validated", self.config.api_key_id);
                Availability::Available
            }
            Err(e) => {
                warn!("ModernMT availability check failed: {}", e);
                Availability::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn validate_api_key(&self, api_key_id: &str) -> Result<()> {
        let api_key = self.credentials.resolve(api_key_id)?;

        let request = HttpRequest::get(&self.config.validate_url)
            .header(API_KEY_HEADER, api_key.expose())
            .header(PLATFORM_HEADER, PLATFORM)
            .header(PLATFORM_VERSION_HEADER, PLATFORM_VERSION);

        let response = self.transport.send(request).await?;

        if response.status != 200 {
            let message = if response.body.trim().is_empty() {
                format!("unexpected response from ModernMT API (status {})", response.status)
            } else {
                provider_error_message(&response.body)
            };

            return Err(ConnectorError::ApiError {
                status: response.status,
                message: format!("ModernMT API validation failed: {}", message),
            });
        }

        Ok(())
    }

    /// Translate text, reporting every failure as an error
    ///
    /// Transport and status failures are `ApiError`/`NetworkError`; a body
    /// without `data.translation` is `MalformedResponse`. No retries.
    pub async fn try_translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let api_key = self.credentials.resolve(&self.config.api_key_id)?;
        let response = self.send_translate(text, source, target, &api_key).await?;

        if !response.is_success() {
            return Err(ConnectorError::ApiError {
                status: response.status,
                message: provider_error_message(&response.body),
            });
        }

        decode_translation(&response.body)
    }

    /// Translate text on a best-effort basis
    ///
    /// Any failure is logged and yields an empty string.
    pub async fn translate(&self, text: &str, source: &str, target: &str) -> String {
        match self.try_translate(text, source, target).await {
            Ok(translation) => translation,
            Err(e) => {
                error!("Translation failed: {}", e);
                String::new()
            }
        }
    }

    /// Translate one field into a tagged result
    pub async fn translate_field(
        &self,
        field: &TranslatableField,
        source: &str,
        target: &str,
    ) -> TranslationResult {
        if field.text.is_empty() {
            return TranslationResult {
                key: field.key.clone(),
                outcome: FieldOutcome::Translated(String::new()),
            };
        }

        let outcome = match self.try_translate(&field.text, source, target).await {
            Ok(translation) => FieldOutcome::Translated(translation),
            Err(e @ ConnectorError::MalformedResponse { .. }) => {
                warn!("Field {}: {}", field.key, e);
                FieldOutcome::Malformed(e.to_string())
            }
            Err(e) => {
                error!("Field {}: translation failed: {}", field.key, e);
                FieldOutcome::Failed(e.to_string())
            }
        };

        TranslationResult {
            key: field.key.clone(),
            outcome,
        }
    }

    async fn send_translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
        api_key: &SecretValue,
    ) -> Result<HttpResponse> {
        let body = serde_json::to_string(&TranslateBody::new(text, source, target))?;

        debug!(
            "Translating {} chars {} -> {}",
            text.chars().count(),
            source,
            target
        );

        let request = HttpRequest::post(&self.config.translate_url)
            .header(API_KEY_HEADER, api_key.expose())
            .header("Content-Type", "application/json")
            .header("X-HTTP-Method-Override", "GET")
            .body(body);

        self.transport.send(request).await
    }
}

/// Extract the translation from a ModernMT response body
pub fn decode_translation(body: &str) -> Result<String> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ConnectorError::MalformedResponse {
            message: e.to_string(),
        })?;

    json["data"]["translation"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConnectorError::MalformedResponse {
            message: "No translation in response".to_string(),
        })
}

/// Error text from a ModernMT error body, falling back to the raw body
fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
