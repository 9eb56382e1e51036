//! 计算样式
//!
//! 没有布局引擎，这里只根据以下信息推导元素的计算样式：
//!
//! - 用户代理默认值（`head`、`script` 等默认不显示）
//! - `hidden` 属性
//! - 内联 `style` 属性（使用 cssparser 分词）
//! - `visibility` 的继承
//!
//! 样式读不出来时按"未隐藏"处理，保证文本仍然能被发现。

use cssparser::{Parser, ParserInput, Token};
use markup5ever_rcdom::Handle;

use super::dom::{ancestors, get_node_attr, get_node_name, has_node_attr, is_element};

/// 默认不渲染的元素
const UA_HIDDEN_TAGS: &[&str] = &[
    "head", "script", "style", "template", "noscript", "meta", "link", "title", "base",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    #[default]
    Normal,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    Collapse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

/// 元素的计算样式（仅限引擎关心的属性）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComputedStyle {
    pub display: Display,
    pub visibility: Visibility,
    pub opacity: Option<f32>,
    pub position: Position,
}

impl ComputedStyle {
    pub fn is_display_none(&self) -> bool {
        self.display == Display::None
    }

    pub fn is_visibility_hidden(&self) -> bool {
        matches!(self.visibility, Visibility::Hidden | Visibility::Collapse)
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity == Some(0.0)
    }

    pub fn is_fixed(&self) -> bool {
        self.position == Position::Fixed
    }
}

/// 解析内联样式声明，返回 `(属性名, 值)` 列表
///
/// 无法识别的片段会被跳过，`!important` 被忽略。
pub fn parse_inline_style(css: &str) -> Vec<(String, String)> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);

    let mut declarations = Vec::new();
    let mut name: Option<String> = None;
    let mut value_parts: Vec<String> = Vec::new();
    let mut in_value = false;
    let mut important = false;

    while let Ok(token) = parser.next() {
        match token {
            Token::Semicolon => {
                if let Some(name) = name.take() {
                    if in_value && !value_parts.is_empty() {
                        declarations.push((name, value_parts.join(" ")));
                    }
                }
                value_parts.clear();
                in_value = false;
                important = false;
            }
            Token::Ident(ident) if !in_value && name.is_none() => {
                name = Some(ident.to_ascii_lowercase());
            }
            Token::Colon if !in_value && name.is_some() => {
                in_value = true;
            }
            Token::Delim('!') if in_value => {
                important = true;
            }
            Token::Ident(ident) if in_value => {
                if important && ident.eq_ignore_ascii_case("important") {
                    important = false;
                } else {
                    value_parts.push(ident.to_ascii_lowercase());
                }
            }
            Token::Number { value, .. } if in_value => {
                value_parts.push(value.to_string());
            }
            Token::Percentage { unit_value, .. } if in_value => {
                value_parts.push(format!("{}%", unit_value * 100.0));
            }
            Token::Dimension { value, unit, .. } if in_value => {
                value_parts.push(format!("{}{}", value, &**unit));
            }
            Token::QuotedString(text) if in_value => {
                value_parts.push((**text).to_string());
            }
            _ => {
                // 残缺的声明整体丢弃，等下一个分号
                if !in_value {
                    name = None;
                }
            }
        }
    }

    if let Some(name) = name {
        if in_value && !value_parts.is_empty() {
            declarations.push((name, value_parts.join(" ")));
        }
    }

    declarations
}

fn parse_display(value: &str) -> Option<Display> {
    match value {
        "none" => Some(Display::None),
        "" => None,
        _ => Some(Display::Normal),
    }
}

fn parse_visibility(value: &str) -> Option<Visibility> {
    match value {
        "visible" => Some(Visibility::Visible),
        "hidden" => Some(Visibility::Hidden),
        "collapse" => Some(Visibility::Collapse),
        _ => None,
    }
}

fn parse_position(value: &str) -> Option<Position> {
    match value {
        "static" => Some(Position::Static),
        "relative" => Some(Position::Relative),
        "absolute" => Some(Position::Absolute),
        "fixed" => Some(Position::Fixed),
        "sticky" => Some(Position::Sticky),
        _ => None,
    }
}

fn parse_opacity(value: &str) -> Option<f32> {
    let value = value.trim();
    match value.strip_suffix('%') {
        Some(percent) => percent.parse::<f32>().ok().map(|p| p / 100.0),
        None => value.parse::<f32>().ok(),
    }
}

/// 元素自身声明的样式（不含继承）
fn declared_style(element: &Handle) -> (ComputedStyle, Option<Visibility>) {
    let mut style = ComputedStyle::default();
    let mut declared_visibility = None;

    if let Some(tag) = get_node_name(element) {
        if UA_HIDDEN_TAGS.contains(&tag) {
            style.display = Display::None;
        }
    }
    if has_node_attr(element, "hidden") {
        style.display = Display::None;
    }

    if let Some(inline) = get_node_attr(element, "style") {
        for (name, value) in parse_inline_style(&inline) {
            match name.as_str() {
                "display" => {
                    if let Some(display) = parse_display(&value) {
                        style.display = display;
                    }
                }
                "visibility" => {
                    if let Some(visibility) = parse_visibility(&value) {
                        declared_visibility = Some(visibility);
                    }
                }
                "opacity" => {
                    if let Some(opacity) = parse_opacity(&value) {
                        style.opacity = Some(opacity);
                    }
                }
                "position" => {
                    if let Some(position) = parse_position(&value) {
                        style.position = position;
                    }
                }
                _ => {}
            }
        }
    }

    (style, declared_visibility)
}

/// 计算元素样式；非元素节点返回默认值
pub fn computed_style(element: &Handle) -> ComputedStyle {
    if !is_element(element) {
        return ComputedStyle::default();
    }

    let (mut style, declared_visibility) = declared_style(element);

    style.visibility = match declared_visibility {
        Some(visibility) => visibility,
        None => ancestors(element)
            .iter()
            .filter(|ancestor| is_element(ancestor))
            .find_map(|ancestor| declared_style(ancestor).1)
            .unwrap_or_default(),
    };

    style
}

/// 元素是否有布局盒：自身及所有祖先都不是 `display:none`
pub fn has_layout_box(element: &Handle) -> bool {
    if !is_element(element) || computed_style(element).is_display_none() {
        return false;
    }
    ancestors(element)
        .iter()
        .filter(|ancestor| is_element(ancestor))
        .all(|ancestor| !declared_style(ancestor).0.is_display_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{create_element, find_nodes, first_child, html_to_dom};
    use markup5ever_rcdom::RcDom;

    /// 返回 body 的第一个子元素，连同持有整棵树的 `RcDom`
    fn body_child(html: &str) -> (RcDom, Handle) {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let body = find_nodes(&dom.document, &["html", "body"])
            .into_iter()
            .next()
            .unwrap();
        let child = first_child(&body).unwrap();
        (dom, child)
    }

    #[test]
    fn test_parse_inline_style_declarations() {
        let declarations = parse_inline_style("display: none; opacity:0 ; color: red !important");
        assert_eq!(
            declarations,
            vec![
                ("display".to_string(), "none".to_string()),
                ("opacity".to_string(), "0".to_string()),
                ("color".to_string(), "red".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_style_fails_open() {
        let element = create_element("p", &[("style", "display: ; :none;;; opacity")]);
        let style = computed_style(&element);
        assert!(!style.is_display_none());
        assert!(!style.is_transparent());
    }

    #[test]
    fn test_visibility_is_inherited() {
        let (_dom, outer) = body_child("<div style=\"visibility:hidden\"><span>x</span></div>");
        let span = first_child(&outer).unwrap();
        assert!(computed_style(&span).is_visibility_hidden());
    }

    #[test]
    fn test_layout_box_requires_rendered_ancestors() {
        let (_dom, outer) = body_child("<div style=\"display:none\"><span>x</span></div>");
        let span = first_child(&outer).unwrap();
        assert!(!computed_style(&span).is_display_none());
        assert!(!has_layout_box(&span));
    }

    #[test]
    fn test_hidden_attribute_and_position() {
        let element = create_element("div", &[("hidden", ""), ("style", "position: fixed")]);
        let style = computed_style(&element);
        assert!(style.is_display_none());
        assert!(style.is_fixed());
    }
}
