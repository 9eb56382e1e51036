//! 文本过滤器模块
//!
//! 可见性判断和内容判断，决定一个文本节点能否成为翻译目标

use std::sync::OnceLock;

use markup5ever_rcdom::Handle;
use regex::Regex;

use crate::parsers::html::dom::{self, get_node_attr, get_node_name, get_text, is_text};
use crate::parsers::html::style::{computed_style, has_layout_box};
use crate::translation::config::constants;

/// 至少包含一个非空白、非标点字符
static CONTENT_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn content_regex() -> Option<&'static Regex> {
    CONTENT_REGEX
        .get_or_init(|| match Regex::new(r"[^\s\u{3000}.,;:!?、。]") {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::error!("内容正则编译失败: {}", e);
                None
            }
        })
        .as_ref()
}

/// 文本是否有可翻译内容（不只是空白和标点）
pub fn has_translatable_content(text: &str) -> bool {
    match content_regex() {
        Some(regex) => regex.is_match(text.trim()),
        None => text
            .trim()
            .chars()
            .any(|c| !c.is_whitespace() && !".,;:!?、。".contains(c)),
    }
}

/// 节点是否位于浮层或提示条内部（含自身）
pub fn is_translator_markup(node: &Handle) -> bool {
    dom::closest(node, |element| {
        dom::has_class(element, constants::CLASS_ORIGINAL_DISPLAY)
            || get_node_attr(element, "id").as_deref() == Some(constants::INDICATOR_ID)
    })
    .is_some()
}

/// 自身或祖先带 `aria-hidden="true"`
pub fn is_aria_hidden(node: &Handle) -> bool {
    dom::closest(node, |element| {
        get_node_attr(element, "aria-hidden").as_deref() == Some("true")
    })
    .is_some()
}

/// 文本过滤器
#[derive(Debug, Clone, Copy)]
pub struct TextFilter {
    min_text_length: usize,
}

impl Default for TextFilter {
    fn default() -> Self {
        Self::new(constants::DEFAULT_MIN_TEXT_LENGTH)
    }
}

impl TextFilter {
    pub fn new(min_text_length: usize) -> Self {
        Self { min_text_length }
    }

    pub fn min_text_length(&self) -> usize {
        self.min_text_length
    }

    /// 去掉首尾空白后的长度是否达标
    pub fn is_long_enough(&self, text: &str) -> bool {
        let trimmed = text.trim();
        !trimmed.is_empty() && trimmed.chars().count() >= self.min_text_length
    }

    /// 可见文本节点判断
    ///
    /// 依次检查：节点类型、长度、父元素、计算样式、`aria-hidden`、
    /// 布局盒（`position:fixed` 除外）、非正文标签、翻译器自身的标记。
    pub fn is_visible_text_node(&self, node: &Handle) -> bool {
        if !is_text(node) {
            return false;
        }
        let Some(text) = get_text(node) else {
            return false;
        };
        if !self.is_long_enough(&text) {
            return false;
        }

        let Some(parent) = dom::get_parent_element(node) else {
            return false;
        };

        let style = computed_style(&parent);
        if style.is_display_none() || style.is_visibility_hidden() || style.is_transparent() {
            return false;
        }

        if is_aria_hidden(&parent) {
            return false;
        }

        if !has_layout_box(&parent) && !style.is_fixed() {
            return false;
        }

        if let Some(tag) = get_node_name(&parent) {
            if constants::NON_CONTENT_TAGS.contains(&tag) {
                return false;
            }
        }

        !is_translator_markup(&parent)
    }

    /// 可见并且有内容
    pub fn accepts_text_node(&self, node: &Handle) -> bool {
        self.is_visible_text_node(node)
            && get_text(node)
                .map(|text| has_translatable_content(&text))
                .unwrap_or(false)
    }

    /// 属性值是否值得翻译
    pub fn accepts_attribute_value(&self, value: &str) -> bool {
        self.is_long_enough(value)
    }
}
