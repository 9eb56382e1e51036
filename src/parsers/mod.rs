//! # 解析器模块
//!
//! 目前只包含 HTML：解析、DOM 操作、样式推导、选区和几何。
//!
//! # 模块组织
//!
//! - `html` - HTML 文档解析、可观察文档、计算样式

pub mod html;

// Re-export commonly used items for convenience
pub use html::{html_to_dom, Document, MutationRecord, SelectionRange};
