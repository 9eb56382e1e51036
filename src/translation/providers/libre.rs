//! LibreTranslate 后端

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::TranslationProvider;
use crate::translation::error::{TranslationError, TranslationResult};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a [String],
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslatedItem {
    #[serde(rename = "translatedText", default)]
    translated_text: Option<String>,
}

/// 服务端既可能返回数组，也可能返回单个对象
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranslateResponse {
    Many(Vec<TranslatedItem>),
    Batch {
        #[serde(rename = "translatedText")]
        translated_text: Vec<String>,
    },
    One(TranslatedItem),
}

/// LibreTranslate 后端
#[derive(Debug, Clone)]
pub struct LibreTranslateProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    source_lang: String,
}

impl LibreTranslateProvider {
    pub fn new(endpoint: &str, api_key: Option<String>) -> TranslationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            source_lang: "auto".to_string(),
        })
    }

    pub fn with_source_lang(mut self, source_lang: &str) -> Self {
        if !source_lang.trim().is_empty() {
            self.source_lang = source_lang.trim().to_string();
        }
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn into_translations(response: TranslateResponse, expected: usize) -> Vec<String> {
    match response {
        TranslateResponse::Many(items) => items
            .into_iter()
            .map(|item| item.translated_text.unwrap_or_default())
            .collect(),
        TranslateResponse::Batch { translated_text } => translated_text,
        TranslateResponse::One(item) if expected == 1 => {
            vec![item.translated_text.unwrap_or_default()]
        }
        TranslateResponse::One(_) => vec![String::new(); expected],
    }
}

#[async_trait(?Send)]
impl TranslationProvider for LibreTranslateProvider {
    fn name(&self) -> &str {
        "libre"
    }

    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = TranslateRequest {
            q: texts,
            source: &self.source_lang,
            target: target_lang,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/translate", self.endpoint))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => TranslationError::InvalidCredential(format!(
                    "{} - LibreTranslate rejected the API key",
                    status.as_u16()
                )),
                429 => TranslationError::RateLimitExceeded,
                code => TranslationError::ApiError {
                    status: code,
                    message: status.canonical_reason().unwrap_or("").to_string(),
                },
            });
        }

        let body: TranslateResponse = response.json().await?;
        Ok(into_translations(body, texts.len()))
    }
}
