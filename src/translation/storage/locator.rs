//! 节点逆向定位
//!
//! 把存储里的键还原为仍挂在文档上的目标，供还原和设置切换后重新挂载浮层使用。

use std::rc::Rc;

use markup5ever_rcdom::Handle;

use super::identity::NodeIdentity;
use super::state::TranslationStateEntry;
use crate::parsers::html::document::Document;
use crate::parsers::html::dom::{is_element, is_text};
use crate::translation::pipeline::target::{ParsedKey, Target, TargetKey};

pub struct NodeLocator {
    identity: Rc<NodeIdentity>,
}

impl NodeLocator {
    pub fn new(identity: Rc<NodeIdentity>) -> Self {
        Self { identity }
    }

    /// 按键定位目标；节点已释放、已脱离文档或类型不符时返回 `None`
    ///
    /// 文本目标会按条目里记录的成员恢复整组节点，已经不在文档里的成员被跳过。
    pub fn locate(
        &self,
        document: &Document,
        key: &TargetKey,
        entry: Option<&TranslationStateEntry>,
    ) -> Option<Target> {
        match key.parse()? {
            ParsedKey::Text { node_id } => {
                let first = self.live_node(document, &node_id)?;
                if !is_text(&first) {
                    return None;
                }
                let mut nodes = vec![first];
                if let Some(entry) = entry {
                    nodes.extend(
                        entry
                            .segments
                            .iter()
                            .skip(1)
                            .filter_map(|segment| self.live_node(document, &segment.node_id))
                            .filter(is_text),
                    );
                }
                Target::text(nodes)
            }
            ParsedKey::Attribute { name, node_id } => {
                let element = self.live_node(document, &node_id)?;
                if !is_element(&element) {
                    return None;
                }
                Some(Target::attribute(element, &name))
            }
        }
    }

    fn live_node(&self, document: &Document, node_id: &str) -> Option<Handle> {
        self.identity
            .resolve(node_id)
            .filter(|node| document.is_connected(node))
    }
}
