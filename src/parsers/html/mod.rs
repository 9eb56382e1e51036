//! HTML 文档模块
//!
//! 翻译引擎依赖的页面平台能力，拆分为几个子模块：
//!
//! - `dom`: 基础 DOM 操作和遍历
//! - `document`: 可观察的文档（统一修改接口、变更记录队列、序列化）
//! - `style`: 从内联样式推导计算样式
//! - `selection`: 选区
//! - `layout`: 元素几何

pub mod document;
pub mod dom;
pub mod layout;
pub mod selection;
pub mod style;

// 重新导出常用类型
pub use document::{same_node, Document, MutationRecord, ObserveOptions};
pub use dom::{
    find_nodes, get_child_node_by_name, get_node_attr, get_node_name, get_parent_node, html_to_dom,
    set_node_attr,
};
pub use layout::{LayoutProbe, NoLayout, Rect, StaticLayout};
pub use selection::{BoundaryPoint, SelectionRange};
pub use style::{computed_style, has_layout_box, ComputedStyle};
