//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型、面向用户的错误分类以及错误处理助手

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 未配置凭据
    #[error("API key is not configured: {0}")]
    MissingCredential(String),

    /// 凭据无效（401）
    #[error("API key is invalid: {0}")]
    InvalidCredential(String),

    /// 速率限制（429）
    #[error("rate limit exceeded (429)")]
    RateLimitExceeded,

    /// 网络错误
    #[error("network error: {0}")]
    NetworkError(String),

    /// 后端返回非成功状态
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// 后端返回的结果无法解析
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// 配置错误
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// 设置存储错误
    #[error("settings error: {0}")]
    SettingsError(String),

    /// 输入验证错误
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// 没有选中文本
    #[error("no text is selected")]
    NothingSelected,

    /// 选中文本过短
    #[error("selected text is too short (minimum {min} characters)")]
    SelectionTooShort { min: usize },

    /// 序列化错误
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("internal error: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::NetworkError(_) => true,
            TranslationError::ApiError { status, .. } => *status >= 500,
            TranslationError::MalformedResponse(_) => true,
            TranslationError::RateLimitExceeded => false, // 需要等待
            TranslationError::MissingCredential(_) => false,
            TranslationError::InvalidCredential(_) => false,
            TranslationError::ConfigError(_) => false,
            TranslationError::SettingsError(_) => false,
            TranslationError::InvalidInput(_) => false,
            TranslationError::NothingSelected => false,
            TranslationError::SelectionTooShort { .. } => false,
            TranslationError::SerializationError(_) => false,
            TranslationError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::MissingCredential(_) => ErrorSeverity::Critical,
            TranslationError::InvalidCredential(_) => ErrorSeverity::Critical,
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::RateLimitExceeded => ErrorSeverity::Warning,
            TranslationError::NetworkError(_) => ErrorSeverity::Warning,
            TranslationError::ApiError { .. } => ErrorSeverity::Error,
            TranslationError::MalformedResponse(_) => ErrorSeverity::Error,
            TranslationError::SettingsError(_) => ErrorSeverity::Error,
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
            TranslationError::NothingSelected => ErrorSeverity::Info,
            TranslationError::SelectionTooShort { .. } => ErrorSeverity::Info,
            TranslationError::SerializationError(_) => ErrorSeverity::Error,
            TranslationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 面向用户的错误类别
    ///
    /// 类型本身能确定类别时直接返回，否则按错误文本归类
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::MissingCredential(_) => ErrorCategory::MissingCredential,
            TranslationError::InvalidCredential(_) => ErrorCategory::InvalidCredential,
            TranslationError::RateLimitExceeded => ErrorCategory::RateLimit,
            other => classify_message(&other.to_string()),
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let append = |msg: &mut String| {
            *msg = format!("{} (context: {})", msg, context);
        };

        match &mut self {
            TranslationError::MissingCredential(msg)
            | TranslationError::InvalidCredential(msg)
            | TranslationError::NetworkError(msg)
            | TranslationError::MalformedResponse(msg)
            | TranslationError::ConfigError(msg)
            | TranslationError::SettingsError(msg)
            | TranslationError::InvalidInput(msg)
            | TranslationError::SerializationError(msg)
            | TranslationError::InternalError(msg) => append(msg),
            TranslationError::ApiError { message, .. } => append(message),
            TranslationError::RateLimitExceeded
            | TranslationError::NothingSelected
            | TranslationError::SelectionTooShort { .. } => {}
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 面向用户的错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    MissingCredential,
    InvalidCredential,
    RateLimit,
    Generic,
}

impl ErrorCategory {
    /// 提示条上的简短标题
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::MissingCredential => "API key is not configured",
            ErrorCategory::InvalidCredential => "API key is invalid",
            ErrorCategory::RateLimit => "API rate limit reached",
            ErrorCategory::Generic => "An error occurred during translation",
        }
    }

    /// 提示条上的详细说明，`Generic` 直接显示原始错误文本
    pub fn details(&self, raw_message: &str) -> String {
        match self {
            ErrorCategory::MissingCredential => {
                "Set an API key in the extension settings".to_string()
            }
            ErrorCategory::InvalidCredential => {
                "Check the API key in the extension settings".to_string()
            }
            ErrorCategory::RateLimit => "Wait a moment and try again".to_string(),
            ErrorCategory::Generic => raw_message.to_string(),
        }
    }
}

/// 按错误文本的子串归类
pub fn classify_message(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    if lower.contains("api key is not configured")
        || lower.contains("missing api key")
        || lower.contains("apiキーが設定されていません")
    {
        ErrorCategory::MissingCredential
    } else if lower.contains("401") || lower.contains("unauthorized") || lower.contains("authentication") || lower.contains("認証") {
        ErrorCategory::InvalidCredential
    } else if lower.contains("429") || lower.contains("rate limit") || lower.contains("レート制限") {
        ErrorCategory::RateLimit
    } else {
        ErrorCategory::Generic
    }
}

/// 标准错误转换
impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::InternalError(format!("IO error: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON error: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ConfigError(format!("TOML parse error: {}", error))
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return TranslationError::MalformedResponse(error.to_string());
        }
        match error.status() {
            Some(status) if status.as_u16() == 401 => {
                TranslationError::InvalidCredential(error.to_string())
            }
            Some(status) if status.as_u16() == 429 => TranslationError::RateLimitExceeded,
            Some(status) => TranslationError::ApiError {
                status: status.as_u16(),
                message: error.to_string(),
            },
            None => TranslationError::NetworkError(error.to_string()),
        }
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 记录并返回错误
    pub fn log_error<T>(error: TranslationError) -> TranslationResult<T> {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }

        Err(error)
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ConfigError(msg.to_string())
    }

    /// 创建输入验证错误
    pub fn validation_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::InvalidInput(msg.to_string())
    }

    /// 创建内部错误
    pub fn internal_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::InternalError(msg.to_string())
    }
}
