//! 翻译模块
//!
//! 在页面内就地翻译文本，保留原文并在悬停时显示，跟踪动态内容，随时可以完整还原：
//! - **core**: 会话、批量翻译引擎和变更监视器
//! - **pipeline**: 目标收集、过滤和分批
//! - **storage**: 节点标识、翻译状态和逆向定位
//! - **presenter**: 原文浮层和进度/错误提示
//! - **providers**: 翻译后端
//! - **config**: 引擎配置和用户设置
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use inline_translator::parsers::Document;
//! use inline_translator::translation::{providers::StubProvider, TranslatorConfig, TranslatorSession};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let document = Document::parse("<p>Hello world.</p>")?;
//! let config = TranslatorConfig::with_provider(Rc::new(StubProvider::new()));
//! let session = TranslatorSession::new(document, config);
//!
//! let report = session.translate_page("ja").await?;
//! println!("{}", report.summary());
//!
//! session.restore_original();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod presenter;
pub mod providers;
pub mod storage;

pub use config::{
    constants, ConfigManager, FileSettingsStore, MemorySettingsStore, ProviderSettings, Settings,
    SettingsStore, TranslatorConfig, TranslatorSettings,
};
pub use core::{
    BatchTranslationEngine, Command, CommandResponse, MutationWatcher, TranslatorSession,
};
pub use error::{ErrorCategory, ErrorSeverity, TranslationError, TranslationResult};
pub use pipeline::{BatchReport, Target, TargetCollector, TargetKey, TargetKind, TextFilter};
pub use presenter::{ListenerLease, OverlayPresenter, PointerEvent, ProgressIndicator};
pub use providers::{create_provider, ProviderKind, TranslationProvider};
pub use storage::{NodeIdentity, NodeLocator, TranslationStateEntry, TranslationStateStore};

/// 检查配置文件是否存在
pub fn config_file_exists() -> bool {
    config::config_file_exists()
}

/// 在指定路径生成示例配置文件
pub fn generate_example_config<P: AsRef<std::path::Path>>(path: P) -> TranslationResult<()> {
    ConfigManager::generate_example_config(&path)?;
    tracing::info!("已生成示例配置文件: {}", path.as_ref().display());
    Ok(())
}
