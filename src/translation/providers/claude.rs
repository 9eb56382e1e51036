//! Claude (Anthropic Messages API) 后端
//!
//! 一个批次合并为一条编号列表提示，响应按行拆分后去掉编号。
//! 模型偶尔会合并或拆分行，条数不符时按以下规则修补：
//! 只有一行时把整段结果复制到每一项；否则用最后一行补齐并截断到期望条数。

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::TranslationProvider;
use crate::translation::error::{TranslationError, TranslationResult};

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Claude 后端
#[derive(Debug, Clone)]
pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl ClaudeProvider {
    pub fn new(api_key: Option<String>) -> TranslationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        if !model.trim().is_empty() {
            self.model = model.trim().to_string();
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.endpoint)
    }
}

/// 语言代码 → 提示里使用的语言名称
pub fn language_name(code: &str) -> &str {
    match code {
        "ja" => "Japanese",
        "en" => "English",
        "zh" => "Chinese",
        "ko" => "Korean",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "it" => "Italian",
        other => other,
    }
}

/// 构造编号列表提示
pub fn build_prompt(texts: &[String], target_lang: &str) -> String {
    let numbered = texts
        .iter()
        .enumerate()
        .map(|(index, text)| format!("{}. {}", index + 1, text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Translate the following texts into {}. Return the result as a numbered list and keep the original numbering.\n\n{}\n\nReturn only the translations, without explanations or any additional text.",
        language_name(target_lang),
        numbered
    )
}

static NUMBER_PREFIX: OnceLock<Option<Regex>> = OnceLock::new();

fn strip_number_prefix(line: &str) -> String {
    let regex = NUMBER_PREFIX
        .get_or_init(|| Regex::new(r"^\d+[.)]\s*").ok())
        .as_ref();
    match regex {
        Some(regex) => regex.replace(line, "").trim().to_string(),
        None => line.trim().to_string(),
    }
}

/// 解析编号列表响应，并把条数修补为 `expected`
pub fn parse_numbered_response(text: &str, expected: usize) -> Vec<String> {
    let mut translations: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(strip_number_prefix)
        .collect();

    if translations.len() == expected {
        return translations;
    }

    tracing::warn!(
        "翻译结果条数不一致: 期望 {}, 实际 {}",
        expected,
        translations.len()
    );

    if translations.len() == 1 {
        return vec![text.trim().to_string(); expected];
    }

    let filler = translations.last().cloned().unwrap_or_default();
    while translations.len() < expected {
        translations.push(filler.clone());
    }
    translations.truncate(expected);
    translations
}

#[async_trait(?Send)]
impl TranslationProvider for ClaudeProvider {
    fn name(&self) -> &str {
        "claude"
    }

    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            TranslationError::MissingCredential("Claude API key is not configured".to_string())
        })?;

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "发送 Claude 请求: 模型 {}, {} 条文本, 目标语言 {}",
            self.model,
            texts.len(),
            target_lang
        );

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: build_prompt(texts, target_lang),
            }],
        };

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("").to_string();
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error)
                .and_then(|error| error.message)
                .unwrap_or(reason);
            return Err(match status.as_u16() {
                401 => TranslationError::InvalidCredential(format!("401 - {}", message)),
                429 => TranslationError::RateLimitExceeded,
                code => TranslationError::ApiError {
                    status: code,
                    message,
                },
            });
        }

        let body: MessagesResponse = response.json().await?;
        let text = body
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(TranslationError::MalformedResponse(
                "translation result is empty".to_string(),
            ));
        }

        let translations = parse_numbered_response(&text, texts.len());
        tracing::debug!("Claude 返回 {} 条译文", translations.len());
        Ok(translations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_numbers_every_text() {
        let prompt = build_prompt(&["Hello".to_string(), "World".to_string()], "ja");
        assert!(prompt.contains("into Japanese"));
        assert!(prompt.contains("1. Hello\n2. World"));
        assert!(build_prompt(&["x".to_string()], "sv").contains("into sv"));
    }

    #[test]
    fn test_parse_strips_numbering() {
        let parsed = parse_numbered_response("1. こんにちは\n2) 世界\n\n3.さようなら", 3);
        assert_eq!(parsed, vec!["こんにちは", "世界", "さようなら"]);
    }

    #[test]
    fn test_parse_single_line_is_replicated() {
        let parsed = parse_numbered_response("全部まとめて", 3);
        assert_eq!(parsed, vec!["全部まとめて"; 3]);
    }

    #[test]
    fn test_parse_pads_and_truncates() {
        assert_eq!(
            parse_numbered_response("1. a\n2. b", 4),
            vec!["a", "b", "b", "b"]
        );
        assert_eq!(parse_numbered_response("1. a\n2. b\n3. c", 2), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_missing_key_is_reported_before_any_request() {
        let provider = ClaudeProvider::new(Some("  ".to_string())).unwrap();
        let error = provider
            .translate(&["Hello".to_string()], "ja")
            .await
            .unwrap_err();
        assert!(matches!(error, TranslationError::MissingCredential(_)));
        assert_eq!(
            error.category(),
            crate::translation::error::ErrorCategory::MissingCredential
        );
    }
}
