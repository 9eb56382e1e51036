//! # Inline Translator
//!
//! 在页面内就地翻译 HTML 文本的引擎：调用大模型后端翻译正文和可翻译属性，
//! 保留每个单元的原文并在悬停时显示，跟踪动态内容，并且可以随时完整还原。
//!
//! ## 模块组织
//!
//! - `parsers` - HTML 文档模型（DOM 工具、变更记录、样式、选区、几何）
//! - `translation` - 翻译会话、引擎、收集管道、状态存储、浮层与后端
//! - `env` - 环境变量

pub mod env;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use parsers::Document;
pub use translation::{
    Command, CommandResponse, TranslationError, TranslationResult, TranslatorConfig,
    TranslatorSession, TranslatorSettings,
};
