//! 页面呈现层
//!
//! 原文浮层、进度/错误提示条、注入的样式，以及它们共用的监听器租约和延时任务队列。

pub mod indicator;
pub mod lease;
pub mod overlay;
pub mod styles;
pub mod timers;

pub use indicator::ProgressIndicator;
pub use lease::ListenerLease;
pub use overlay::{place_overlay, OverlayPosition, OverlayPresenter, Placement, PointerEvent};
pub use timers::{TimerId, TimerQueue, TimerTask};
