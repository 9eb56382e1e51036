//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，所有变量都以 `TRANSLATOR_` 为前缀

use std::env;
use std::fmt;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }

    /// 变量是否显式设置
    fn is_set() -> bool {
        env::var(Self::NAME).is_ok()
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "TRANSLATOR_LOG_LEVEL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 翻译引擎相关环境变量
pub mod translation {
    use super::*;

    /// 默认目标语言
    pub struct TargetLang;
    impl EnvVar<String> for TargetLang {
        const NAME: &'static str = "TRANSLATOR_TARGET_LANG";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("ja".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Default target language (e.g. ja, en, zh-CN)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_language_tag(value, Self::NAME)
        }
    }

    /// 每批最多文本数
    pub struct MaxBatchSize;
    impl EnvVar<usize> for MaxBatchSize {
        const NAME: &'static str = "TRANSLATOR_MAX_BATCH_SIZE";
        const DEFAULT: Option<usize> = Some(10);
        const DESCRIPTION: &'static str = "Maximum number of texts per translation call (1-500)";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 500)
        }
    }

    /// 动态内容监听
    pub struct WatchEnabled;
    impl EnvVar<bool> for WatchEnabled {
        const NAME: &'static str = "TRANSLATOR_WATCH_ENABLED";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Translate content added after the first page pass";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 最短文本长度
    pub struct MinTextLength;
    impl EnvVar<usize> for MinTextLength {
        const NAME: &'static str = "TRANSLATOR_MIN_TEXT_LENGTH";
        const DEFAULT: Option<usize> = Some(1);
        const DESCRIPTION: &'static str = "Minimum trimmed text length for a translatable unit";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 10_000)
        }
    }

    /// 可翻译属性
    pub struct AttributeNames;
    impl EnvVar<Vec<String>> for AttributeNames {
        const NAME: &'static str = "TRANSLATOR_ATTRIBUTES";
        const DEFAULT: Option<Vec<String>> = None;

        fn get() -> EnvResult<Vec<String>> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok(vec![
                    "alt".to_string(),
                    "title".to_string(),
                    "aria-label".to_string(),
                ]),
            }
        }
        const DESCRIPTION: &'static str = "Translatable attribute names (comma-separated)";

        fn parse(value: &str) -> EnvResult<Vec<String>> {
            Ok(value
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect())
        }
    }

    /// 悬停显示原文
    pub struct ShowOriginal;
    impl EnvVar<bool> for ShowOriginal {
        const NAME: &'static str = "TRANSLATOR_SHOW_ORIGINAL";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Show the original text when hovering translated content";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }
}

/// 翻译后端相关环境变量
pub mod provider {
    use super::*;

    /// API 密钥
    pub struct ApiKey;
    impl EnvVar<String> for ApiKey {
        const NAME: &'static str = "TRANSLATOR_API_KEY";
        const DEFAULT: Option<String> = None; // 无默认值，必须设置
        const DESCRIPTION: &'static str = "Credential for the translation backend";

        fn parse(value: &str) -> EnvResult<String> {
            let key = value.trim();
            if key.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API key must not be empty".to_string(),
                });
            }
            Ok(key.to_string())
        }
    }

    /// 模型名称
    pub struct Model;
    impl EnvVar<String> for Model {
        const NAME: &'static str = "TRANSLATOR_MODEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Model name used by the LLM backend";

        fn parse(value: &str) -> EnvResult<String> {
            let model = value.trim();
            if model.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Model name must not be empty".to_string(),
                });
            }
            Ok(model.to_string())
        }
    }

    /// API 地址
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "TRANSLATOR_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Override the backend endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "URL must start with http:// or https://".to_string(),
                });
            }
            Ok(url.trim_end_matches('/').to_string())
        }
    }
}

/// 辅助函数
fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

fn parse_language_tag(value: &str, var_name: &str) -> EnvResult<String> {
    let tag = value.trim();
    let valid = !tag.is_empty()
        && tag.len() <= 16
        && tag.split('-').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric())
        });
    if !valid {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Invalid language tag '{}'", value),
        });
    }
    Ok(tag.to_string())
}

/// 环境变量配置汇总
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub log_level: String,

    pub target_lang: String,
    pub max_batch_size: usize,
    pub watch_enabled: bool,
    pub min_text_length: usize,
    pub attribute_names: Vec<String>,
    pub show_original: bool,

    pub api_key: Option<String>,
    pub model: Option<String>,
    pub api_url: Option<String>,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> EnvResult<Self> {
        Ok(Self {
            log_level: core::LogLevel::get()?,

            target_lang: translation::TargetLang::get()?,
            max_batch_size: translation::MaxBatchSize::get()?,
            watch_enabled: translation::WatchEnabled::get()?,
            min_text_length: translation::MinTextLength::get()?,
            attribute_names: translation::AttributeNames::get()?,
            show_original: translation::ShowOriginal::get()?,

            api_key: provider::ApiKey::get().ok(),
            model: provider::Model::get().ok(),
            api_url: provider::ApiUrl::get().ok(),
        })
    }

    /// 打印配置摘要（隐藏敏感信息）
    pub fn print_summary(&self) {
        println!("Environment Configuration Summary:");
        println!("  Log Level: {}", self.log_level);
        println!("  Target Language: {}", self.target_lang);
        println!("  Max Batch Size: {}", self.max_batch_size);
        println!(
            "  Watch: {}",
            if self.watch_enabled { "enabled" } else { "disabled" }
        );
        println!("  Attributes: {}", self.attribute_names.join(", "));
        if self.api_key.is_some() {
            println!("  API Key: [configured]");
        }
    }
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");

    docs.push_str("## Core Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {}\n",
        core::LogLevel::NAME,
        core::LogLevel::DESCRIPTION
    ));

    docs.push_str("\n## Translation Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {}\n",
        translation::TargetLang::NAME,
        translation::TargetLang::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        translation::MaxBatchSize::NAME,
        translation::MaxBatchSize::DESCRIPTION,
        translation::MaxBatchSize::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        translation::WatchEnabled::NAME,
        translation::WatchEnabled::DESCRIPTION,
        translation::WatchEnabled::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        translation::MinTextLength::NAME,
        translation::MinTextLength::DESCRIPTION,
        translation::MinTextLength::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {}\n",
        translation::AttributeNames::NAME,
        translation::AttributeNames::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        translation::ShowOriginal::NAME,
        translation::ShowOriginal::DESCRIPTION,
        translation::ShowOriginal::DEFAULT
    ));

    docs.push_str("\n## Provider Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {}\n",
        provider::ApiKey::NAME,
        provider::ApiKey::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {}\n",
        provider::Model::NAME,
        provider::Model::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {}\n",
        provider::ApiUrl::NAME,
        provider::ApiUrl::DESCRIPTION
    ));

    docs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_parsing() {
        assert!(translation::WatchEnabled::parse("true").unwrap());
        assert!(translation::WatchEnabled::parse("1").unwrap());
        assert!(translation::WatchEnabled::parse("YES").unwrap());
        assert!(!translation::WatchEnabled::parse("off").unwrap());
        assert!(!translation::ShowOriginal::parse("disabled").unwrap());

        assert!(translation::WatchEnabled::parse("maybe").is_err());
    }

    #[test]
    fn test_numeric_validation() {
        assert_eq!(translation::MaxBatchSize::parse("2").unwrap(), 2);
        assert!(translation::MaxBatchSize::parse("0").is_err());
        assert!(translation::MaxBatchSize::parse("501").is_err());
        assert!(translation::MinTextLength::parse("abc").is_err());
    }

    #[test]
    fn test_language_tag_validation() {
        assert_eq!(translation::TargetLang::parse(" zh-CN ").unwrap(), "zh-CN");
        assert!(translation::TargetLang::parse("ja").is_ok());
        assert!(translation::TargetLang::parse("").is_err());
        assert!(translation::TargetLang::parse("en_US").is_err());
    }

    #[test]
    fn test_attribute_list_parsing() {
        let names = translation::AttributeNames::parse("alt, Title,,placeholder").unwrap();
        assert_eq!(names, vec!["alt", "title", "placeholder"]);
    }

    #[test]
    fn test_url_validation() {
        assert_eq!(
            provider::ApiUrl::parse("http://localhost:5000/").unwrap(),
            "http://localhost:5000"
        );
        assert!(provider::ApiUrl::parse("ftp://example.com").is_err());
    }

    #[test]
    fn test_env_docs_mention_every_variable() {
        let docs = generate_env_docs();
        for name in [
            translation::MaxBatchSize::NAME,
            translation::WatchEnabled::NAME,
            translation::MinTextLength::NAME,
            translation::AttributeNames::NAME,
            provider::ApiKey::NAME,
        ] {
            assert!(docs.contains(name), "missing {}", name);
        }
    }
}
