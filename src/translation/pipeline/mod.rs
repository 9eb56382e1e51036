//! 翻译管道模块
//!
//! 提供目标模型、可见性过滤、目标收集和批次切分

pub mod batch;
pub mod collector;
pub mod filters;
pub mod target;

// 重新导出主要类型
pub use batch::{partition, Batch, BatchReport};
pub use collector::{CollectionStats, TargetCollector};
pub use filters::{has_translatable_content, TextFilter};
pub use target::{ParsedKey, Target, TargetKey, TargetKind};
