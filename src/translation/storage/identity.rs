//! 节点标识
//!
//! 为 DOM 节点分配稳定的随机标识。关联表以节点地址为键、持有 `Weak`，
//! 不会延长节点寿命；节点释放后条目在下一次清理时移除。
//! `Weak` 存在期间分配不会被回收，所以地址不会被新节点复用。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node};

struct IdentityRecord {
    node: Weak<Node>,
    id: String,
}

/// 节点 → 标识的弱关联表
#[derive(Default)]
pub struct NodeIdentity {
    by_node: RefCell<HashMap<usize, IdentityRecord>>,
    by_id: RefCell<HashMap<String, usize>>,
}

impl std::fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeIdentity")
            .field("entries", &self.by_node.borrow().len())
            .finish()
    }
}

fn node_key(node: &Handle) -> usize {
    Rc::as_ptr(node) as usize
}

/// 生成 `n` + 随机 base36 片段 + 毫秒时间戳
fn generate_id() -> String {
    let random = uuid::Uuid::new_v4().as_u128() as u64;
    format!(
        "n{}{}",
        to_base36(random),
        chrono::Utc::now().timestamp_millis()
    )
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).to_string()
}

impl NodeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查找或创建节点标识
    pub fn identify(&self, node: &Handle) -> String {
        if let Some(id) = self.peek(node) {
            return id;
        }

        let mut id = generate_id();
        while self.by_id.borrow().contains_key(&id) {
            id = generate_id();
        }

        let key = node_key(node);
        self.by_node.borrow_mut().insert(
            key,
            IdentityRecord {
                node: Rc::downgrade(node),
                id: id.clone(),
            },
        );
        self.by_id.borrow_mut().insert(id.clone(), key);
        id
    }

    /// 只查找，不创建
    pub fn peek(&self, node: &Handle) -> Option<String> {
        self.by_node
            .borrow()
            .get(&node_key(node))
            .filter(|record| record.node.strong_count() > 0)
            .map(|record| record.id.clone())
    }

    /// 反查仍然存活的节点
    pub fn resolve(&self, id: &str) -> Option<Handle> {
        let key = *self.by_id.borrow().get(id)?;
        self.by_node
            .borrow()
            .get(&key)
            .and_then(|record| record.node.upgrade())
    }

    /// 移除已释放节点的条目，返回移除数量
    pub fn purge(&self) -> usize {
        let dead: Vec<(usize, String)> = self
            .by_node
            .borrow()
            .iter()
            .filter(|(_, record)| record.node.strong_count() == 0)
            .map(|(key, record)| (*key, record.id.clone()))
            .collect();

        let mut by_node = self.by_node.borrow_mut();
        let mut by_id = self.by_id.borrow_mut();
        for (key, id) in &dead {
            by_node.remove(key);
            by_id.remove(id);
        }
        if !dead.is_empty() {
            tracing::debug!("清理 {} 个已释放节点的标识", dead.len());
        }
        dead.len()
    }

    pub fn len(&self) -> usize {
        self.by_node.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::create_text;

    #[test]
    fn test_identify_is_idempotent() {
        let identity = NodeIdentity::new();
        let node = create_text("Hello");
        let first = identity.identify(&node);
        assert_eq!(identity.identify(&node), first);
        assert!(first.starts_with('n'));
        assert_eq!(identity.peek(&node), Some(first));
    }

    #[test]
    fn test_distinct_nodes_get_distinct_ids() {
        let identity = NodeIdentity::new();
        let a = create_text("a");
        let b = create_text("a");
        assert_ne!(identity.identify(&a), identity.identify(&b));
    }

    #[test]
    fn test_association_does_not_keep_node_alive() {
        let identity = NodeIdentity::new();
        let node = create_text("gone");
        let id = identity.identify(&node);
        assert!(identity.resolve(&id).is_some());

        drop(node);
        assert!(identity.resolve(&id).is_none());
        assert_eq!(identity.purge(), 1);
        assert!(identity.is_empty());
    }

    #[test]
    fn test_peek_does_not_create() {
        let identity = NodeIdentity::new();
        let node = create_text("x");
        assert!(identity.peek(&node).is_none());
        assert!(identity.is_empty());
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
