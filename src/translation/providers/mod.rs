//! 翻译后端
//!
//! 引擎只依赖 [`TranslationProvider`]：输入 N 条文本，输出 N 条译文。
//! 返回条数不一致由引擎处理（丢弃该批次），后端自身的错误以
//! [`TranslationError`](crate::translation::error::TranslationError) 返回。

pub mod claude;
pub mod libre;
pub mod stub;

use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::translation::config::manager::ProviderSettings;
use crate::translation::error::TranslationResult;

pub use claude::ClaudeProvider;
pub use libre::LibreTranslateProvider;
pub use stub::StubProvider;

/// 批量翻译能力
#[async_trait(?Send)]
pub trait TranslationProvider {
    /// 后端名称，用于日志
    fn name(&self) -> &str;

    /// 按顺序翻译一批文本
    async fn translate(&self, texts: &[String], target_lang: &str)
        -> TranslationResult<Vec<String>>;
}

/// 后端种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Stub,
    Claude,
    Libre,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Stub => "stub",
            ProviderKind::Claude => "claude",
            ProviderKind::Libre => "libre",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stub" | "dummy" => Ok(ProviderKind::Stub),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "libre" | "libretranslate" => Ok(ProviderKind::Libre),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 按配置创建后端
///
/// 凭据缺失不会在这里报错，而是在第一次翻译调用时返回
/// `MissingCredential`，与用户在页面上看到的提示保持一致。
pub fn create_provider(
    settings: &ProviderSettings,
    credential: Option<String>,
) -> TranslationResult<Rc<dyn TranslationProvider>> {
    let provider: Rc<dyn TranslationProvider> = match settings.kind {
        ProviderKind::Stub => Rc::new(StubProvider::new()),
        ProviderKind::Claude => {
            let mut provider = ClaudeProvider::new(credential)?;
            if let Some(model) = &settings.model {
                provider = provider.with_model(model);
            }
            if let Some(endpoint) = &settings.endpoint {
                provider = provider.with_endpoint(endpoint);
            }
            Rc::new(provider)
        }
        ProviderKind::Libre => {
            let endpoint = settings
                .endpoint
                .as_deref()
                .unwrap_or(libre::DEFAULT_ENDPOINT);
            Rc::new(
                LibreTranslateProvider::new(endpoint, credential)?
                    .with_source_lang(&settings.source_lang),
            )
        }
    };
    tracing::info!("使用翻译后端: {}", provider.name());
    Ok(provider)
}
