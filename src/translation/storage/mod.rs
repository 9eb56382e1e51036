//! 存储模块
//!
//! 提供节点标识、翻译状态存储和按键逆向定位。

pub mod identity;
pub mod locator;
pub mod state;

pub use identity::NodeIdentity;
pub use locator::NodeLocator;
pub use state::{Segment, TranslationStateEntry, TranslationStateStore};
