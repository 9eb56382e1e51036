//! 翻译核心模块
//!
//! - **会话层** (`session.rs`): 对外的命令接口，协调收集、翻译、还原和设置重载
//! - **引擎层** (`engine.rs`): 分批调用翻译后端并写回 DOM
//! - **监视器** (`watcher.rs`): 跟踪动态新增的内容
//!
//! ```text
//! TranslatorSession (session.rs)
//!     ├── TargetCollector (pipeline/collector.rs)
//!     ├── TranslationStateStore (storage/state.rs)
//!     ├── NodeLocator (storage/locator.rs)
//!     ├── MutationWatcher (watcher.rs)
//!     ├── OverlayPresenter (presenter/overlay.rs)
//!     └── BatchTranslationEngine (engine.rs)
//!             └── TranslationProvider (providers/)
//! ```

pub mod engine;
pub mod session;
pub mod watcher;

pub use engine::BatchTranslationEngine;
pub use session::{Command, CommandResponse, TranslatorSession};
pub use watcher::MutationWatcher;
