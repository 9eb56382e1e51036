//! 用户设置存储
//!
//! 对应扩展里的设置页：凭据、模型名称和"悬停显示原文"开关。
//! 引擎本身只读取 `show_original`，凭据和模型由翻译后端消费。

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::translation::error::{TranslationError, TranslationResult};

fn default_show_original() -> bool {
    true
}

/// 用户设置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default = "default_show_original")]
    pub show_original: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credential: None,
            model_name: None,
            show_original: true,
        }
    }
}

/// 异步设置存储
#[async_trait(?Send)]
pub trait SettingsStore {
    async fn load(&self) -> TranslationResult<Settings>;
    async fn save(&self, settings: &Settings) -> TranslationResult<()>;
}

/// 内存中的设置存储
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RefCell<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RefCell::new(settings),
        }
    }

    /// 同步修改，方便测试模拟设置页的写入
    pub fn set_show_original(&self, show_original: bool) {
        self.settings.borrow_mut().show_original = show_original;
    }
}

#[async_trait(?Send)]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> TranslationResult<Settings> {
        Ok(self.settings.borrow().clone())
    }

    async fn save(&self, settings: &Settings) -> TranslationResult<()> {
        *self.settings.borrow_mut() = settings.clone();
        Ok(())
    }
}

/// JSON 文件设置存储
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// 使用默认位置（支持 `~` 展开）
    pub fn default_location() -> Self {
        let expanded = shellexpand::tilde(super::constants::SETTINGS_PATH);
        Self::new(expanded.as_ref())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait(?Send)]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> TranslationResult<Settings> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                TranslationError::SettingsError(format!(
                    "failed to parse {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("设置文件不存在，使用默认设置: {}", self.path.display());
                Ok(Settings::default())
            }
            Err(e) => Err(TranslationError::SettingsError(format!(
                "failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, settings: &Settings) -> TranslationResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    TranslationError::SettingsError(format!(
                        "failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let content = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&self.path, content).await.map_err(|e| {
            TranslationError::SettingsError(format!(
                "failed to write {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}
