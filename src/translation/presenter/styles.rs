//! 注入页面的样式
//!
//! 提示条和浮层各一个 `<style>`，按 id 去重，只注入一次。

use crate::parsers::html::document::Document;
use crate::parsers::html::dom::{append_child, create_element, create_text};
use crate::translation::config::constants;

pub const LOADING_CSS: &str = r#"
.translator-loading-indicator { position: fixed; top: 20px; right: 20px; z-index: 2147483647; display: flex; align-items: center; gap: 10px; max-width: 400px; padding: 12px 20px; border-radius: 8px; background: #4a90e2; color: white; font: 500 14px system-ui, sans-serif; box-shadow: 0 4px 12px rgba(0, 0, 0, 0.2); }
.translator-loading-indicator.error { background: #ff4444; flex-wrap: wrap; }
.translator-error-message { margin-top: 8px; font-size: 12px; opacity: 0.9; line-height: 1.4; }
.translator-loading-spinner { width: 16px; height: 16px; border: 2px solid rgba(255, 255, 255, 0.3); border-top-color: white; border-radius: 50%; animation: translator-spin 0.8s linear infinite; }
@keyframes translator-spin { to { transform: rotate(360deg); } }
[data-translating="true"] { position: relative; opacity: 0.6; }
"#;

pub const TOOLTIP_CSS: &str = r#"
.translator-original-display { position: absolute; left: 0; right: 0; z-index: 2147483647; padding: 12px 14px; border: 1px solid #e0e0e0; border-radius: 8px; background: #ffffff; color: #333; font: 14px/1.6 system-ui, sans-serif; white-space: normal; overflow-wrap: break-word; box-shadow: 0 4px 12px rgba(0, 0, 0, 0.15); max-height: min(400px, calc(100vh - 80px)); overflow-y: auto; }
.translator-original-display.position-top { bottom: 100%; margin-bottom: 4px; }
.translator-original-display.position-bottom { top: 100%; margin-top: 4px; }
.translator-original-display.pinned { background: #fff5f5; border-color: #ffcccc; }
.translator-original-header { display: flex; align-items: center; gap: 8px; margin-bottom: 6px; font-size: 12px; font-weight: bold; color: #4a90e2; }
.translator-original-display.pinned .translator-original-header { color: #ff6b6b; }
.translator-pin-icon { display: inline-flex; width: 16px; height: 16px; cursor: pointer; flex-shrink: 0; }
.translator-pin-icon svg { width: 100%; height: 100%; fill: #666; }
.translator-original-display.pinned .translator-pin-icon svg { fill: #ff6b6b; }
[data-translated="true"] { position: relative; }
"#;

/// 注入一个带 id 的样式表；已存在时什么都不做
pub fn inject(document: &Document, id: &str, css: &str) -> bool {
    if document.get_element_by_id(id).is_some() {
        return false;
    }
    let style = create_element("style", &[("id", id)]);
    append_child(&style, &create_text(css));
    let parent = document.head().unwrap_or_else(|| document.body_or_root());
    document.append_child(&parent, &style);
    true
}

pub fn inject_loading_styles(document: &Document) -> bool {
    inject(document, constants::LOADING_STYLES_ID, LOADING_CSS)
}

pub fn inject_tooltip_styles(document: &Document) -> bool {
    inject(document, constants::TOOLTIP_STYLES_ID, TOOLTIP_CSS)
}
