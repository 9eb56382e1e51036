//! 选区
//!
//! 对应浏览器里的 `Range`：由两个边界点组成，边界点是 `(容器, 偏移)`。
//! 容器为文本节点时偏移按字符计，容器为元素时偏移是子节点下标。

use std::cmp::Ordering;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use super::dom::{ancestors, contains, descendants, get_text, is_text};

/// 边界点
#[derive(Debug, Clone)]
pub struct BoundaryPoint {
    pub container: Handle,
    pub offset: usize,
}

/// 选区范围
#[derive(Debug, Clone)]
pub struct SelectionRange {
    pub start: BoundaryPoint,
    pub end: BoundaryPoint,
}

/// 边界点在先序遍历中的位置：`(节点下标, 阶段, 偏移)`
///
/// 阶段 0 表示节点之前，1 表示文本内部，2 表示节点及其后代之后。
type Position = (usize, u8, usize);

struct TreeOrder {
    nodes: Vec<Handle>,
}

impl TreeOrder {
    fn new(root: &Handle) -> Self {
        let mut nodes = vec![root.clone()];
        nodes.extend(descendants(root));
        Self { nodes }
    }

    fn index_of(&self, node: &Handle) -> Option<usize> {
        self.nodes
            .iter()
            .position(|candidate| Rc::ptr_eq(candidate, node))
    }

    /// 子树最后一个后代的下标（没有后代时为自身）
    fn last_index_in(&self, node: &Handle) -> Option<usize> {
        let start = self.index_of(node)?;
        let subtree = descendants(node).len();
        Some(start + subtree)
    }

    fn before(&self, node: &Handle) -> Option<Position> {
        Some((self.index_of(node)?, 0, 0))
    }

    fn after(&self, node: &Handle) -> Option<Position> {
        Some((self.last_index_in(node)?, 2, 0))
    }

    fn boundary(&self, point: &BoundaryPoint) -> Option<Position> {
        if is_text(&point.container) {
            return Some((self.index_of(&point.container)?, 1, point.offset));
        }
        let child = point.container.children.borrow().get(point.offset).cloned();
        match child {
            Some(child) => self.before(&child),
            None => self.after(&point.container),
        }
    }
}

fn tree_root(node: &Handle) -> Handle {
    ancestors(node).pop().unwrap_or_else(|| node.clone())
}

impl SelectionRange {
    pub fn new(start: Handle, start_offset: usize, end: Handle, end_offset: usize) -> Self {
        Self {
            start: BoundaryPoint {
                container: start,
                offset: start_offset,
            },
            end: BoundaryPoint {
                container: end,
                offset: end_offset,
            },
        }
    }

    /// 选中节点的全部内容
    pub fn select_node_contents(node: &Handle) -> Self {
        let length = match get_text(node) {
            Some(text) => text.chars().count(),
            None => node.children.borrow().len(),
        };
        Self::new(node.clone(), 0, node.clone(), length)
    }

    pub fn is_collapsed(&self) -> bool {
        Rc::ptr_eq(&self.start.container, &self.end.container)
            && self.start.offset == self.end.offset
    }

    /// 同时包含两个边界容器的最近节点（含自身）
    pub fn common_ancestor(&self) -> Handle {
        let start = &self.start.container;
        std::iter::once(start.clone())
            .chain(ancestors(start))
            .find(|candidate| contains(candidate, &self.end.container))
            .unwrap_or_else(|| tree_root(start))
    }

    fn positions(&self, order: &TreeOrder) -> Option<(Position, Position)> {
        let start = order.boundary(&self.start)?;
        let end = order.boundary(&self.end)?;
        match start.cmp(&end) {
            Ordering::Greater => Some((end, start)),
            _ => Some((start, end)),
        }
    }

    /// 节点是否与选区相交（与 `Range.intersectsNode` 一致）
    pub fn intersects_node(&self, node: &Handle) -> bool {
        let order = TreeOrder::new(&tree_root(&self.start.container));
        let Some((start, end)) = self.positions(&order) else {
            return false;
        };
        match (order.before(node), order.after(node)) {
            (Some(node_start), Some(node_end)) => node_start < end && node_end > start,
            _ => false,
        }
    }

    /// 选中的文本
    pub fn text(&self) -> String {
        let root = self.common_ancestor();
        let order = TreeOrder::new(&tree_root(&root));
        let Some((start, end)) = self.positions(&order) else {
            return String::new();
        };

        let mut nodes = vec![root.clone()];
        nodes.extend(descendants(&root));

        let mut out = String::new();
        for node in nodes.iter().filter(|node| is_text(node)) {
            let Some(index) = order.index_of(node) else {
                continue;
            };
            let text = get_text(node).unwrap_or_default();
            let length = text.chars().count();
            let content_start = (index, 1, 0);
            let content_end = (index, 1, length);
            if end <= content_start || start >= content_end {
                continue;
            }
            let from = if start > content_start { start.2 } else { 0 };
            let to = if end < content_end { end.2 } else { length };
            out.extend(text.chars().skip(from).take(to.saturating_sub(from)));
        }
        out
    }
}

impl std::fmt::Display for SelectionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}
