//! 动态内容监视
//!
//! 武装后文档开始记录 body 子树的变更；会话在检查点取走记录，
//! 这里把记录换算成新的翻译目标。翻译进行中不武装，避免引擎自己的写入触发翻译。

use std::cell::Cell;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::parsers::html::document::{Document, MutationRecord, ObserveOptions};
use crate::parsers::html::dom::{is_element, is_text};
use crate::translation::pipeline::collector::TargetCollector;
use crate::translation::pipeline::filters::is_translator_markup;
use crate::translation::pipeline::target::Target;

/// 变更监视器
#[derive(Debug)]
pub struct MutationWatcher {
    document: Rc<Document>,
    attribute_names: Vec<String>,
    armed: Cell<bool>,
}

impl MutationWatcher {
    pub fn new(document: Rc<Document>, attribute_names: Vec<String>) -> Self {
        Self {
            document,
            attribute_names,
            armed: Cell::new(false),
        }
    }

    /// 开始监视；已武装时什么都不做
    pub fn arm(&self) {
        if self.armed.get() {
            return;
        }
        self.document.observe(ObserveOptions {
            attribute_filter: self.attribute_names.clone(),
        });
        self.armed.set(true);
        tracing::debug!("开始监视动态内容");
    }

    /// 停止监视并丢弃未投递的记录
    pub fn disarm(&self) {
        if !self.armed.get() {
            return;
        }
        self.document.disconnect();
        self.armed.set(false);
        tracing::debug!("停止监视动态内容");
    }

    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }

    /// 把一批变更记录换算为候选目标（尚未经过存储去重）
    ///
    /// - 新增元素：重新收集其子树，跳过翻译器自己的标记
    /// - 新增文本节点：通过可见性和内容检查后作为单独目标
    /// - 受监视的属性变更：值足够长时作为单独的属性目标
    pub fn targets_from_records(
        &self,
        records: &[MutationRecord],
        collector: &TargetCollector,
    ) -> Vec<Target> {
        let mut targets = Vec::new();
        for record in records {
            match record {
                MutationRecord::ChildList { added, .. } => {
                    for node in added {
                        targets.extend(self.targets_from_added(node, collector));
                    }
                }
                MutationRecord::Attributes {
                    target,
                    attribute_name,
                    ..
                } => {
                    if !self.attribute_names.iter().any(|name| name == attribute_name) {
                        continue;
                    }
                    if !self.document.is_connected(target) {
                        continue;
                    }
                    if let Some(attribute) = collector.attribute_target(target, attribute_name) {
                        targets.push(attribute);
                    }
                }
            }
        }
        targets
    }

    fn targets_from_added(&self, node: &Handle, collector: &TargetCollector) -> Vec<Target> {
        if !self.document.is_connected(node) {
            return Vec::new();
        }
        if is_element(node) {
            if is_translator_markup(node) {
                return Vec::new();
            }
            collector.collect(node)
        } else if is_text(node) {
            collector.text_target(node).into_iter().collect()
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{append_child, create_element, create_text};
    use crate::translation::config::TranslatorSettings;

    fn setup(html: &str) -> (Rc<Document>, MutationWatcher, TargetCollector) {
        let document = Rc::new(Document::parse(html).unwrap());
        let settings = TranslatorSettings::default();
        let watcher = MutationWatcher::new(document.clone(), settings.attribute_names.clone());
        (document, watcher, TargetCollector::from_settings(&settings))
    }

    #[test]
    fn test_arm_is_idempotent_and_controls_recording() {
        let (document, watcher, _collector) = setup("<p>Hello</p>");
        let body = document.body().unwrap();

        document.append_child(&body, &create_element("p", &[]));
        assert_eq!(document.pending_records(), 0);

        watcher.arm();
        watcher.arm();
        assert!(watcher.is_armed());
        document.append_child(&body, &create_element("p", &[]));
        assert_eq!(document.pending_records(), 1);

        watcher.disarm();
        assert!(!watcher.is_armed());
        assert_eq!(document.pending_records(), 0);
    }

    #[test]
    fn test_added_subtree_and_attribute_become_targets() {
        let (document, watcher, collector) = setup("<p>Hello</p><img id=\"pic\" alt=\"old\">");
        let body = document.body().unwrap();
        watcher.arm();

        let paragraph = create_element("p", &[]);
        append_child(&paragraph, &create_text("New paragraph"));
        document.append_child(&body, &paragraph);

        let img = document.get_element_by_id("pic").unwrap();
        document.set_attribute(&img, "alt", "A new caption");
        document.set_attribute(&img, "src", "x.png");

        let records = document.take_records();
        let targets = watcher.targets_from_records(&records, &collector);
        let texts: Vec<String> = targets.iter().map(Target::get).collect();
        assert_eq!(texts, vec!["New paragraph", "A new caption"]);
    }

    #[test]
    fn test_overlay_markup_is_ignored() {
        let (document, watcher, collector) = setup("<p>Hello</p>");
        let body = document.body().unwrap();
        watcher.arm();

        let overlay = create_element("div", &[("class", "translator-original-display")]);
        append_child(&overlay, &create_text("Original text"));
        document.append_child(&body, &overlay);

        let records = document.take_records();
        assert_eq!(records.len(), 1);
        assert!(watcher.targets_from_records(&records, &collector).is_empty());
    }
}
