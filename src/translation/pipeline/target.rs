//! 翻译目标
//!
//! 一个目标是一段可翻译的文本单元：同一块级祖先下的一组文本节点，
//! 或者某个元素上的一个属性。目标不持久化，每次收集时重新计算；
//! 跨收集轮次的身份由 [`TargetKey`] 表示。

use std::fmt;

use markup5ever_rcdom::Handle;

use crate::parsers::html::document::Document;
use crate::parsers::html::dom::{self, get_node_attr, get_node_name, get_text};
use crate::translation::config::constants;
use crate::translation::storage::identity::NodeIdentity;

/// 目标种类
#[derive(Debug, Clone)]
pub enum TargetKind {
    /// 一个或多个文本节点（文档顺序）
    Text { nodes: Vec<Handle> },
    /// 元素上的一个属性
    Attribute { element: Handle, name: String },
}

/// 可翻译单元
#[derive(Debug, Clone)]
pub struct Target {
    pub kind: TargetKind,
    /// 承载标记和浮层的元素
    pub host: Handle,
}

impl Target {
    /// 文本目标，宿主为首个节点的块级祖先
    pub fn text(nodes: Vec<Handle>) -> Option<Self> {
        let host = block_host(nodes.first()?)?;
        Some(Self {
            kind: TargetKind::Text { nodes },
            host,
        })
    }

    /// 指定宿主的文本目标；没有成员时返回 `None`
    pub fn text_with_host(nodes: Vec<Handle>, host: Handle) -> Option<Self> {
        if nodes.is_empty() {
            return None;
        }
        Some(Self {
            kind: TargetKind::Text { nodes },
            host,
        })
    }

    /// 属性目标，宿主即元素本身
    pub fn attribute(element: Handle, name: &str) -> Self {
        Self {
            kind: TargetKind::Attribute {
                element: element.clone(),
                name: name.to_string(),
            },
            host: element,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, TargetKind::Text { .. })
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self.kind, TargetKind::Attribute { .. })
    }

    pub fn attribute_name(&self) -> Option<&str> {
        match &self.kind {
            TargetKind::Attribute { name, .. } => Some(name),
            TargetKind::Text { .. } => None,
        }
    }

    /// 用于生成键的节点：首个文本节点（没有成员时为宿主）或属性所在元素
    pub fn anchor(&self) -> &Handle {
        match &self.kind {
            TargetKind::Text { nodes } => nodes.first().unwrap_or(&self.host),
            TargetKind::Attribute { element, .. } => element,
        }
    }

    /// 文本节点成员（属性目标为空）
    pub fn text_nodes(&self) -> &[Handle] {
        match &self.kind {
            TargetKind::Text { nodes } => nodes,
            TargetKind::Attribute { .. } => &[],
        }
    }

    /// 当前可见文本；分组目标按文档顺序拼接成员文本
    pub fn get(&self) -> String {
        match &self.kind {
            TargetKind::Text { nodes } => nodes.iter().filter_map(get_text).collect(),
            TargetKind::Attribute { element, name } => {
                get_node_attr(element, name).unwrap_or_default()
            }
        }
    }

    /// 写回文本
    ///
    /// 分组目标：完整译文写入第一个成员，其余成员清空。
    /// 这样保留了 DOM 结构，但译文中不再有原来的行内格式边界。
    pub fn set(&self, document: &Document, value: &str) {
        match &self.kind {
            TargetKind::Text { nodes } => {
                for (index, node) in nodes.iter().enumerate() {
                    document.set_text(node, if index == 0 { value } else { "" });
                }
            }
            TargetKind::Attribute { element, name } => {
                document.set_attribute(element, name, value);
            }
        }
    }

    /// 计算键（必要时为锚点分配标识）
    pub fn key(&self, identity: &NodeIdentity) -> TargetKey {
        let node_id = identity.identify(self.anchor());
        match &self.kind {
            TargetKind::Text { .. } => TargetKey::text(&node_id),
            TargetKind::Attribute { name, .. } => TargetKey::attribute(name, &node_id),
        }
    }

    /// 目标是否与节点相交：任一成员（或属性所在元素）位于 `node` 子树内
    pub fn is_within(&self, node: &Handle) -> bool {
        match &self.kind {
            TargetKind::Text { nodes } => nodes.iter().any(|member| dom::contains(node, member)),
            TargetKind::Attribute { element, .. } => dom::contains(node, element),
        }
    }
}

/// 最近的块级祖先；没有时退回到直接父元素
pub fn block_host(node: &Handle) -> Option<Handle> {
    dom::ancestors(node)
        .into_iter()
        .find(|ancestor| is_block_level(ancestor))
        .or_else(|| dom::get_parent_element(node))
}

pub fn is_block_level(node: &Handle) -> bool {
    get_node_name(node)
        .map(|tag| constants::BLOCK_LEVEL_TAGS.contains(&tag))
        .unwrap_or(false)
}

/// 目标键：`text:<nodeId>` 或 `attr:<attrName>:<nodeId>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey(String);

/// 解析后的目标键
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedKey {
    Text { node_id: String },
    Attribute { name: String, node_id: String },
}

impl TargetKey {
    pub fn text(node_id: &str) -> Self {
        Self(format!("text:{}", node_id))
    }

    pub fn attribute(name: &str, node_id: &str) -> Self {
        Self(format!("attr:{}:{}", name, node_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 拆分键；节点标识本身可以包含 `:`
    pub fn parse(&self) -> Option<ParsedKey> {
        let (kind, rest) = self.0.split_once(':')?;
        match kind {
            "text" if !rest.is_empty() => Some(ParsedKey::Text {
                node_id: rest.to_string(),
            }),
            "attr" => {
                let (name, node_id) = rest.split_once(':')?;
                if name.is_empty() || node_id.is_empty() {
                    return None;
                }
                Some(ParsedKey::Attribute {
                    name: name.to_string(),
                    node_id: node_id.to_string(),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::first_child;

    #[test]
    fn test_key_parse() {
        assert_eq!(
            TargetKey::text("nabc123").parse(),
            Some(ParsedKey::Text {
                node_id: "nabc123".to_string()
            })
        );
        assert_eq!(
            TargetKey::attribute("aria-label", "n:1").parse(),
            Some(ParsedKey::Attribute {
                name: "aria-label".to_string(),
                node_id: "n:1".to_string()
            })
        );
        assert_eq!(TargetKey::from("bogus").parse(), None);
        assert_eq!(TargetKey::from("attr:alt").parse(), None);
        assert_eq!(TargetKey::from("other:x").parse(), None);
    }

    #[test]
    fn test_grouped_get_and_blanking_set() {
        let document = Document::parse("<p>Hello <b>bold</b> world</p>").unwrap();
        let p = first_child(&document.body().unwrap()).unwrap();
        let hello = first_child(&p).unwrap();
        let bold = first_child(&p.children.borrow()[1]).unwrap();
        let world = p.children.borrow()[2].clone();

        let target = Target::text(vec![hello.clone(), bold.clone(), world.clone()]).unwrap();
        assert!(std::rc::Rc::ptr_eq(&target.host, &p));
        assert_eq!(target.get(), "Hello bold world");

        target.set(&document, "Hallo fett Welt");
        assert_eq!(get_text(&hello).unwrap(), "Hallo fett Welt");
        assert_eq!(get_text(&bold).unwrap(), "");
        assert_eq!(get_text(&world).unwrap(), "");
    }

    #[test]
    fn test_attribute_target_get_set() {
        let document = Document::parse("<img alt=\"A photo\">").unwrap();
        let img = first_child(&document.body().unwrap()).unwrap();
        let target = Target::attribute(img.clone(), "alt");
        assert_eq!(target.get(), "A photo");
        target.set(&document, "Ein Foto");
        assert_eq!(get_node_attr(&img, "alt").as_deref(), Some("Ein Foto"));
        assert_eq!(target.attribute_name(), Some("alt"));
    }

    #[test]
    fn test_text_target_needs_members() {
        let document = Document::parse("<p>Hi</p>").unwrap();
        let p = first_child(&document.body().unwrap()).unwrap();
        assert!(Target::text(Vec::new()).is_none());
        assert!(Target::text_with_host(Vec::new(), p.clone()).is_none());

        let text = first_child(&p).unwrap();
        let target = Target::text_with_host(vec![text.clone()], p).unwrap();
        assert!(std::rc::Rc::ptr_eq(target.anchor(), &text));

        // 直接构造的空目标退回到宿主
        let empty = Target {
            kind: TargetKind::Text { nodes: Vec::new() },
            host: target.host.clone(),
        };
        assert!(std::rc::Rc::ptr_eq(empty.anchor(), &target.host));
    }

    #[test]
    fn test_key_is_stable() {
        let identity = NodeIdentity::new();
        let document = Document::parse("<p>Hi</p>").unwrap();
        let p = first_child(&document.body().unwrap()).unwrap();
        let text = first_child(&p).unwrap();
        let a = Target::text(vec![text.clone()]).unwrap().key(&identity);
        let b = Target::text(vec![text]).unwrap().key(&identity);
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("text:n"));
    }
}
