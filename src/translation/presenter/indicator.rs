//! 进度与错误提示条
//!
//! 固定在页面右上角的 `#translator-loading-indicator`。
//! 进度状态由引擎在批次之间刷新；错误状态 3 秒后自动消失，
//! 在此之前 `hide` 不会移除它。

use std::cell::Cell;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use super::styles;
use super::timers::{TimerId, TimerQueue, TimerTask};
use crate::parsers::html::document::{same_node, Document};
use crate::parsers::html::dom::{append_child, create_element, create_text, has_class, text_content};
use crate::translation::config::constants;

/// 提示条
#[derive(Debug)]
pub struct ProgressIndicator {
    document: Rc<Document>,
    timers: Rc<TimerQueue>,
    dismiss_timer: Cell<Option<TimerId>>,
}

impl ProgressIndicator {
    pub fn new(document: Rc<Document>, timers: Rc<TimerQueue>) -> Self {
        Self {
            document,
            timers,
            dismiss_timer: Cell::new(None),
        }
    }

    /// 当前挂在页面上的提示条
    pub fn element(&self) -> Option<Handle> {
        self.document.get_element_by_id(constants::INDICATOR_ID)
    }

    pub fn is_visible(&self) -> bool {
        self.element().is_some()
    }

    pub fn is_error_shown(&self) -> bool {
        self.element()
            .map(|element| has_class(&element, constants::CLASS_ERROR))
            .unwrap_or(false)
    }

    /// 提示条上的全部文本
    pub fn text(&self) -> Option<String> {
        self.element().map(|element| text_content(&element))
    }

    fn ensure_element(&self, class: &str) -> Handle {
        styles::inject_loading_styles(&self.document);
        match self.element() {
            Some(element) => {
                self.document.set_attribute(&element, "class", class);
                element
            }
            None => {
                let element =
                    create_element("div", &[("id", constants::INDICATOR_ID), ("class", class)]);
                self.document
                    .append_child(&self.document.body_or_root(), &element);
                element
            }
        }
    }

    fn cancel_dismiss(&self) {
        if let Some(id) = self.dismiss_timer.take() {
            self.timers.cancel(id);
        }
    }

    /// 进度：`total > 1` 时显示 `(current/total)`
    pub fn show_progress(&self, total: usize, current: usize) {
        self.cancel_dismiss();
        let element = self.ensure_element(constants::CLASS_INDICATOR);

        let spinner = create_element("div", &[("class", constants::CLASS_SPINNER)]);
        let label = create_element("span", &[]);
        let message = if total > 1 {
            format!("Translating... ({}/{})", current, total)
        } else {
            "Translating...".to_string()
        };
        append_child(&label, &create_text(&message));

        self.document.replace_children(&element, &[spinner, label]);
    }

    /// 错误：图标 + 标题 + 可选的详细说明，稍后自动消失
    pub fn show_error(&self, message: &str, details: Option<&str>) {
        self.cancel_dismiss();
        let class = format!("{} {}", constants::CLASS_INDICATOR, constants::CLASS_ERROR);
        let element = self.ensure_element(&class);

        let icon = create_element("span", &[("style", "font-size: 18px")]);
        append_child(&icon, &create_text("⚠️"));
        let label = create_element("span", &[]);
        append_child(&label, &create_text(message));

        let mut children = vec![icon, label];
        if let Some(details) = details.filter(|details| !details.is_empty()) {
            let detail = create_element("div", &[("class", constants::CLASS_ERROR_MESSAGE)]);
            append_child(&detail, &create_text(details));
            children.push(detail);
        }
        self.document.replace_children(&element, &children);

        tracing::warn!("提示: {} ({})", message, details.unwrap_or(""));
        let id = self.timers.schedule(
            constants::ERROR_DISMISS_DELAY,
            TimerTask::DismissIndicator { indicator: element },
        );
        self.dismiss_timer.set(Some(id));
    }

    /// 隐藏进度；错误状态保留到自动消失
    pub fn hide(&self) {
        if let Some(element) = self.element() {
            if has_class(&element, constants::CLASS_ERROR) {
                return;
            }
            self.document.remove(&element);
        }
    }

    /// 定时器到期时调用
    pub fn dismiss(&self, indicator: &Handle) {
        if let Some(element) = self.element() {
            if same_node(&element, indicator) {
                self.document.remove(&element);
            }
        }
        self.dismiss_timer.set(None);
    }
}
