//! 目标收集器模块
//!
//! 遍历 DOM 子树，产出文本目标（按块级祖先分组）和属性目标。
//! 收集是只读的：不修改文档，也不分配节点标识。

use std::rc::Rc;

use indexmap::IndexMap;
use markup5ever_rcdom::Handle;

use super::filters::{is_translator_markup, TextFilter};
use super::target::{block_host, Target};
use crate::parsers::html::dom::{self, get_node_attr, is_element, is_text};
use crate::parsers::html::selection::SelectionRange;
use crate::translation::config::TranslatorSettings;

/// 收集统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub text_nodes_visited: usize,
    pub text_nodes_accepted: usize,
    pub text_groups: usize,
    pub attribute_targets: usize,
}

/// 翻译目标收集器
#[derive(Debug, Clone)]
pub struct TargetCollector {
    filter: TextFilter,
    attribute_names: Vec<String>,
}

impl TargetCollector {
    pub fn new(filter: TextFilter, attribute_names: Vec<String>) -> Self {
        Self {
            filter,
            attribute_names,
        }
    }

    pub fn from_settings(settings: &TranslatorSettings) -> Self {
        Self::new(
            TextFilter::new(settings.min_text_length),
            settings.attribute_names.clone(),
        )
    }

    pub fn filter(&self) -> &TextFilter {
        &self.filter
    }

    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    /// 收集 `root` 子树（含自身）中的全部目标
    ///
    /// 文本目标在前，按组内第一个成员的文档顺序排列；
    /// 属性目标在后，按元素文档顺序、再按配置的属性顺序排列。
    pub fn collect(&self, root: &Handle) -> Vec<Target> {
        let (targets, stats) = self.collect_with_stats(root);
        tracing::debug!(
            "收集完成: 访问 {} 个文本节点, 接受 {} 个, 分为 {} 组, 属性目标 {} 个",
            stats.text_nodes_visited,
            stats.text_nodes_accepted,
            stats.text_groups,
            stats.attribute_targets
        );
        targets
    }

    pub fn collect_with_stats(&self, root: &Handle) -> (Vec<Target>, CollectionStats) {
        let mut stats = CollectionStats::default();
        let mut nodes = vec![root.clone()];
        nodes.extend(dom::descendants(root));

        // 块级宿主地址 → (宿主, 成员)
        let mut groups: IndexMap<usize, (Handle, Vec<Handle>)> = IndexMap::new();
        for node in nodes.iter().filter(|node| is_text(node)) {
            stats.text_nodes_visited += 1;
            if !self.filter.accepts_text_node(node) {
                continue;
            }
            let Some(host) = block_host(node) else {
                continue;
            };
            stats.text_nodes_accepted += 1;
            groups
                .entry(Rc::as_ptr(&host) as usize)
                .or_insert_with(|| (host.clone(), Vec::new()))
                .1
                .push(node.clone());
        }
        stats.text_groups = groups.len();

        let mut targets: Vec<Target> = groups
            .into_values()
            .filter_map(|(host, members)| Target::text_with_host(members, host))
            .collect();

        for element in nodes.iter().filter(|node| is_element(node)) {
            let attribute_targets = self.attribute_targets(element);
            stats.attribute_targets += attribute_targets.len();
            targets.extend(attribute_targets);
        }

        (targets, stats)
    }

    /// 元素上所有符合条件的属性目标（按配置顺序）
    pub fn attribute_targets(&self, element: &Handle) -> Vec<Target> {
        if !is_element(element) || is_translator_markup(element) {
            return Vec::new();
        }
        self.attribute_names
            .iter()
            .filter_map(|name| self.attribute_target(element, name))
            .collect()
    }

    /// 单个属性目标；值过短或元素属于翻译器标记时返回 `None`
    pub fn attribute_target(&self, element: &Handle, name: &str) -> Option<Target> {
        if is_translator_markup(element) {
            return None;
        }
        let value = get_node_attr(element, name)?;
        if !self.filter.accepts_attribute_value(&value) {
            return None;
        }
        Some(Target::attribute(element.clone(), name))
    }

    /// 单个文本节点作为独立目标
    pub fn text_target(&self, node: &Handle) -> Option<Target> {
        if !self.filter.accepts_text_node(node) {
            return None;
        }
        Target::text(vec![node.clone()])
    }

    /// 在选区的公共祖先内收集，只保留与选区相交的目标
    pub fn collect_in_selection(&self, range: &SelectionRange, fallback_root: &Handle) -> Vec<Target> {
        let container = range.common_ancestor();
        let root = if is_element(&container) {
            container
        } else {
            dom::get_parent_element(&container).unwrap_or_else(|| fallback_root.clone())
        };

        self.collect(&root)
            .into_iter()
            .filter(|target| match target.text_nodes() {
                [] => range.intersects_node(target.anchor()),
                members => members.iter().any(|member| range.intersects_node(member)),
            })
            .collect()
    }
}
