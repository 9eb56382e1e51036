//! 配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::providers::{ProviderKind, TranslationProvider};

/// 翻译后端配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    /// 模型名称，未设置时使用后端默认值
    pub model: Option<String>,
    /// 覆盖后端地址
    pub endpoint: Option<String>,
    /// 源语言（LibreTranslate 使用）
    pub source_lang: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Claude,
            model: None,
            endpoint: None,
            source_lang: "auto".to_string(),
        }
    }
}

/// 可序列化的引擎配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslatorSettings {
    /// 每次调用最多提交的文本数
    pub max_batch_size: usize,
    /// 首次翻译后是否继续跟踪动态内容
    pub watch_enabled: bool,
    /// 可翻译单元的最短长度（去除首尾空白后）
    pub min_text_length: usize,
    /// 可翻译属性
    pub attribute_names: Vec<String>,
    /// 命令未指定语言时使用的目标语言
    pub default_target_lang: String,
    pub provider: ProviderSettings,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            max_batch_size: constants::DEFAULT_MAX_BATCH_SIZE,
            watch_enabled: true,
            min_text_length: constants::DEFAULT_MIN_TEXT_LENGTH,
            attribute_names: constants::TRANSLATABLE_ATTRS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            provider: ProviderSettings::default(),
        }
    }
}

impl TranslatorSettings {
    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.max_batch_size == 0 {
            return Err(TranslationError::ConfigError(
                "max_batch_size must be greater than 0".to_string(),
            ));
        }

        if self.min_text_length == 0 {
            return Err(TranslationError::ConfigError(
                "min_text_length must be greater than 0".to_string(),
            ));
        }

        if self.default_target_lang.trim().is_empty() {
            return Err(TranslationError::ConfigError(
                "default_target_lang must not be empty".to_string(),
            ));
        }

        if let Some(name) = self
            .attribute_names
            .iter()
            .find(|name| name.trim().is_empty() || name.contains(char::is_whitespace))
        {
            return Err(TranslationError::ConfigError(format!(
                "invalid attribute name '{}'",
                name
            )));
        }

        Ok(())
    }

    /// 应用环境变量覆盖（只覆盖显式设置的变量）
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{provider, translation, EnvVar};

        macro_rules! override_from_env {
            ($var:ty, $field:expr) => {
                if <$var>::is_set() {
                    match <$var>::get() {
                        Ok(value) => $field = value,
                        Err(e) => tracing::warn!("忽略无效的环境变量: {}", e),
                    }
                }
            };
        }

        override_from_env!(translation::MaxBatchSize, self.max_batch_size);
        override_from_env!(translation::WatchEnabled, self.watch_enabled);
        override_from_env!(translation::MinTextLength, self.min_text_length);
        override_from_env!(translation::AttributeNames, self.attribute_names);
        override_from_env!(translation::TargetLang, self.default_target_lang);

        if provider::Model::is_set() {
            match provider::Model::get() {
                Ok(model) => self.provider.model = Some(model),
                Err(e) => tracing::warn!("忽略无效的环境变量: {}", e),
            }
        }

        if provider::ApiUrl::is_set() {
            match provider::ApiUrl::get() {
                Ok(url) => {
                    tracing::info!("环境变量覆盖 API URL: {}", url);
                    self.provider.endpoint = Some(url);
                }
                Err(e) => tracing::warn!("忽略无效的环境变量: {}", e),
            }
        }
    }
}

/// 引擎运行时配置：翻译后端 + 可序列化的设置
///
/// 会话创建时设定，之后只能通过显式重载修改
#[derive(Clone)]
pub struct TranslatorConfig {
    pub provider: Rc<dyn TranslationProvider>,
    pub settings: TranslatorSettings,
}

impl TranslatorConfig {
    pub fn new(provider: Rc<dyn TranslationProvider>, settings: TranslatorSettings) -> Self {
        Self { provider, settings }
    }

    /// 使用默认设置
    pub fn with_provider(provider: Rc<dyn TranslationProvider>) -> Self {
        Self::new(provider, TranslatorSettings::default())
    }

    pub fn max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.settings.max_batch_size = max_batch_size;
        self
    }

    pub fn watch_enabled(mut self, watch_enabled: bool) -> Self {
        self.settings.watch_enabled = watch_enabled;
        self
    }

    pub fn min_text_length(mut self, min_text_length: usize) -> Self {
        self.settings.min_text_length = min_text_length;
        self
    }

    pub fn attribute_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.attribute_names = names.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for TranslatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorConfig")
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .finish()
    }
}

/// 配置管理器
pub struct ConfigManager {
    settings: TranslatorSettings,
    source: Option<String>,
}

impl ConfigManager {
    /// 创建新的配置管理器：.env → 配置文件 → 环境变量 → 验证
    pub fn new() -> TranslationResult<Self> {
        Self::load_dotenv();

        let (mut settings, source) = match Self::find_config_file() {
            Some(path) => {
                tracing::info!("加载配置文件: {}", path);
                (Self::load_from_file(&path)?, Some(path))
            }
            None => {
                tracing::info!("未找到配置文件，使用默认配置");
                (TranslatorSettings::default(), None)
            }
        };

        settings.apply_env_overrides();
        settings.validate()?;

        Ok(Self { settings, source })
    }

    /// 从指定文件创建（仍然应用环境变量覆盖）
    pub fn from_file<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        let path = path.as_ref().to_string_lossy().to_string();
        let mut settings = Self::load_from_file(&path)?;
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(Self {
            settings,
            source: Some(path),
        })
    }

    /// 获取配置
    pub fn get_settings(&self) -> &TranslatorSettings {
        &self.settings
    }

    pub fn into_settings(self) -> TranslatorSettings {
        self.settings
    }

    /// 配置来源文件
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn find_config_file() -> Option<String> {
        constants::CONFIG_PATHS
            .iter()
            .map(|path| shellexpand::tilde(path).to_string())
            .find(|path| Path::new(path).exists())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &str) -> TranslationResult<TranslatorSettings> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> TranslationResult<()> {
        let config = TranslatorSettings::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = TranslatorSettings::default();
        assert_eq!(settings.max_batch_size, 10);
        assert!(settings.watch_enabled);
        assert_eq!(settings.min_text_length, 1);
        assert_eq!(settings.attribute_names, vec!["alt", "title", "aria-label"]);
        assert_eq!(settings.default_target_lang, "ja");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let settings = TranslatorSettings {
            max_batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(TranslationError::ConfigError(_))
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: TranslatorSettings = toml::from_str(
            r#"
max_batch_size = 2
attribute_names = ["alt"]

[provider]
kind = "stub"
"#,
        )
        .unwrap();
        assert_eq!(settings.max_batch_size, 2);
        assert_eq!(settings.attribute_names, vec!["alt"]);
        assert!(settings.watch_enabled);
        assert_eq!(settings.provider.kind, ProviderKind::Stub);
        assert_eq!(settings.provider.source_lang, "auto");
    }

    #[test]
    fn test_generate_and_reload_example_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translator.toml");
        ConfigManager::generate_example_config(&path).unwrap();

        let manager = ConfigManager::from_file(&path).unwrap();
        assert_eq!(manager.get_settings().max_batch_size, 10);
        assert!(manager.source().unwrap().ends_with("translator.toml"));
    }

    #[test]
    fn test_json_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translator.json");
        std::fs::write(&path, r#"{"min_text_length": 3, "watch_enabled": false}"#).unwrap();

        let settings = ConfigManager::from_file(&path).unwrap().into_settings();
        assert_eq!(settings.min_text_length, 3);
        assert!(!settings.watch_enabled);
    }
}
