//! 可观察的页面文档
//!
//! 在 `RcDom` 之上包了一层，提供浏览器页面里翻译引擎依赖的那部分平台能力：
//!
//! - 通过统一的修改接口改写 DOM
//! - 类 `MutationObserver` 的变更记录队列（子节点增删、属性变更）
//! - 连接状态判断与序列化
//!
//! 变更记录只在 `observe` 之后产生，并且只针对 `body` 子树。记录会合并累积，
//! 直到调用方通过 `take_records` 一次性取走，这相当于浏览器在微任务检查点
//! 批量投递回调。

use std::cell::RefCell;
use std::rc::Rc;

use html5ever::serialize::{serialize, SerializeOpts};
use markup5ever_rcdom::{Handle, RcDom, SerializableHandle};

use super::dom::{
    self, find_nodes, get_child_node_by_name, get_node_attr, html_to_dom, set_node_attr,
};

/// 单条 DOM 变更记录
#[derive(Debug, Clone)]
pub enum MutationRecord {
    /// 子节点增删
    ChildList {
        target: Handle,
        added: Vec<Handle>,
        removed: Vec<Handle>,
    },
    /// 属性变更
    Attributes {
        target: Handle,
        attribute_name: String,
        old_value: Option<String>,
    },
}

impl MutationRecord {
    pub fn target(&self) -> &Handle {
        match self {
            MutationRecord::ChildList { target, .. } => target,
            MutationRecord::Attributes { target, .. } => target,
        }
    }
}

/// 观察选项，对应 `childList + subtree + attributes + attributeFilter`
#[derive(Debug, Clone, Default)]
pub struct ObserveOptions {
    pub attribute_filter: Vec<String>,
}

/// 页面文档
pub struct Document {
    dom: RcDom,
    observer: RefCell<Option<ObserveOptions>>,
    records: RefCell<Vec<MutationRecord>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("observing", &self.is_observing())
            .field("pending_records", &self.records.borrow().len())
            .finish()
    }
}

impl Document {
    pub fn from_dom(dom: RcDom) -> Self {
        Self {
            dom,
            observer: RefCell::new(None),
            records: RefCell::new(Vec::new()),
        }
    }

    /// 解析 UTF-8 HTML 字符串
    pub fn parse(html: &str) -> std::io::Result<Self> {
        Self::parse_bytes(html.as_bytes(), "utf-8")
    }

    /// 按指定字符集解析 HTML 字节
    pub fn parse_bytes(data: &[u8], encoding: &str) -> std::io::Result<Self> {
        Ok(Self::from_dom(html_to_dom(data, encoding)?))
    }

    /// 文档根节点
    pub fn root(&self) -> &Handle {
        &self.dom.document
    }

    pub fn html(&self) -> Option<Handle> {
        get_child_node_by_name(self.root(), "html")
    }

    pub fn head(&self) -> Option<Handle> {
        self.html()
            .and_then(|html| get_child_node_by_name(&html, "head"))
    }

    pub fn body(&self) -> Option<Handle> {
        self.html()
            .and_then(|html| get_child_node_by_name(&html, "body"))
    }

    /// body 不存在时退回到文档根
    pub fn body_or_root(&self) -> Handle {
        self.body().unwrap_or_else(|| self.root().clone())
    }

    /// 节点是否仍挂在文档上
    pub fn is_connected(&self, node: &Handle) -> bool {
        dom::contains(self.root(), node)
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Handle> {
        dom::descendants(self.root())
            .into_iter()
            .find(|node| get_node_attr(node, "id").as_deref() == Some(id))
    }

    /// 查找带某个 class 的所有元素
    pub fn elements_with_class(&self, root: &Handle, class_name: &str) -> Vec<Handle> {
        dom::descendants(root)
            .into_iter()
            .filter(|node| dom::has_class(node, class_name))
            .collect()
    }

    /// 查找带某个属性的所有元素
    pub fn elements_with_attr(&self, root: &Handle, attr_name: &str) -> Vec<Handle> {
        dom::descendants(root)
            .into_iter()
            .filter(|node| dom::has_node_attr(node, attr_name))
            .collect()
    }

    pub fn find_nodes(&self, path: &[&str]) -> Vec<Handle> {
        find_nodes(self.root(), path)
    }

    /// 页面声明的字符集：`<meta charset>` 或 `http-equiv="content-type"` 中的 `charset=`
    pub fn charset(&self) -> Option<String> {
        for meta in self.find_nodes(&["html", "head", "meta"]) {
            if let Some(charset) = get_node_attr(&meta, "charset") {
                return Some(charset.trim().to_string());
            }

            let is_content_type = get_node_attr(&meta, "http-equiv")
                .map(|value| value.eq_ignore_ascii_case("content-type"))
                .unwrap_or(false);
            if !is_content_type {
                continue;
            }
            if let Some(content) = get_node_attr(&meta, "content") {
                let charset = content.split(';').skip(1).find_map(|param| {
                    let (name, value) = param.trim().split_once('=')?;
                    name.trim()
                        .eq_ignore_ascii_case("charset")
                        .then(|| value.trim().trim_matches('"').to_string())
                });
                if charset.is_some() {
                    return charset;
                }
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // 观察
    // ------------------------------------------------------------------

    /// 开始观察 body 子树；重复调用只更新选项
    pub fn observe(&self, options: ObserveOptions) {
        *self.observer.borrow_mut() = Some(options);
    }

    /// 停止观察并丢弃尚未投递的记录
    pub fn disconnect(&self) {
        self.observer.borrow_mut().take();
        self.records.borrow_mut().clear();
    }

    pub fn is_observing(&self) -> bool {
        self.observer.borrow().is_some()
    }

    /// 取走累积的变更记录
    pub fn take_records(&self) -> Vec<MutationRecord> {
        std::mem::take(&mut *self.records.borrow_mut())
    }

    pub fn pending_records(&self) -> usize {
        self.records.borrow().len()
    }

    fn in_observed_subtree(&self, node: &Handle) -> bool {
        match self.body() {
            Some(body) => dom::contains(&body, node),
            None => self.is_connected(node),
        }
    }

    fn record_child_list(&self, target: &Handle, added: Vec<Handle>, removed: Vec<Handle>) {
        if !self.is_observing() || !self.in_observed_subtree(target) {
            return;
        }
        self.records.borrow_mut().push(MutationRecord::ChildList {
            target: target.clone(),
            added,
            removed,
        });
    }

    fn record_attribute(&self, target: &Handle, attribute_name: &str, old_value: Option<String>) {
        let watched = match self.observer.borrow().as_ref() {
            Some(options) => options
                .attribute_filter
                .iter()
                .any(|name| name == attribute_name),
            None => false,
        };
        if !watched || !self.in_observed_subtree(target) {
            return;
        }
        self.records.borrow_mut().push(MutationRecord::Attributes {
            target: target.clone(),
            attribute_name: attribute_name.to_string(),
            old_value,
        });
    }

    // ------------------------------------------------------------------
    // 修改接口
    // ------------------------------------------------------------------

    pub fn append_child(&self, parent: &Handle, child: &Handle) {
        let previous_parent = dom::get_parent_node(child);
        dom::append_child(parent, child);
        if let Some(previous_parent) = previous_parent {
            self.record_child_list(&previous_parent, Vec::new(), vec![child.clone()]);
        }
        self.record_child_list(parent, vec![child.clone()], Vec::new());
    }

    pub fn insert_before(&self, parent: &Handle, child: &Handle, reference: Option<&Handle>) {
        let previous_parent = dom::get_parent_node(child);
        dom::insert_before(parent, child, reference);
        if let Some(previous_parent) = previous_parent {
            self.record_child_list(&previous_parent, Vec::new(), vec![child.clone()]);
        }
        self.record_child_list(parent, vec![child.clone()], Vec::new());
    }

    /// 插入为第一个子节点
    pub fn prepend_child(&self, parent: &Handle, child: &Handle) {
        let first = dom::first_child(parent);
        self.insert_before(parent, child, first.as_ref());
    }

    pub fn remove(&self, node: &Handle) {
        if let Some(parent) = dom::get_parent_node(node) {
            // 先记录再摘除，摘除后节点已不在观察子树内
            self.record_child_list(&parent, Vec::new(), vec![node.clone()]);
            dom::detach_node(node);
        }
    }

    /// 替换元素的全部子节点
    pub fn replace_children(&self, parent: &Handle, children: &[Handle]) {
        let removed: Vec<Handle> = parent.children.borrow().clone();
        dom::clear_children(parent);
        for child in children {
            dom::append_child(parent, child);
        }
        self.record_child_list(parent, children.to_vec(), removed);
    }

    pub fn set_attribute(&self, element: &Handle, name: &str, value: &str) {
        let old_value = get_node_attr(element, name);
        set_node_attr(element, name, Some(value.to_string()));
        self.record_attribute(element, name, old_value);
    }

    pub fn remove_attribute(&self, element: &Handle, name: &str) {
        let old_value = get_node_attr(element, name);
        if old_value.is_none() {
            return;
        }
        set_node_attr(element, name, None);
        self.record_attribute(element, name, old_value);
    }

    /// 改写文本节点；不观察 characterData，因此不产生记录
    pub fn set_text(&self, node: &Handle, value: &str) {
        dom::set_text(node, value);
    }

    // ------------------------------------------------------------------
    // 序列化
    // ------------------------------------------------------------------

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf: Vec<u8> = Vec::new();
        let serializable: SerializableHandle = self.dom.document.clone().into();
        if let Err(error) = serialize(&mut buf, &serializable, SerializeOpts::default()) {
            tracing::error!("序列化文档失败: {}", error);
        }
        buf
    }

    pub fn to_html(&self) -> String {
        String::from_utf8_lossy(&self.serialize()).to_string()
    }

    /// 按字符集编码输出
    pub fn serialize_with_encoding(&self, document_encoding: &str) -> Vec<u8> {
        let buf = self.serialize();
        if document_encoding.is_empty() {
            return buf;
        }
        match encoding_rs::Encoding::for_label(document_encoding.as_bytes()) {
            Some(encoding) => {
                let s: &str = &String::from_utf8_lossy(&buf);
                let (data, _, _) = encoding.encode(s);
                data.to_vec()
            }
            None => buf,
        }
    }
}

/// 判断两个句柄是否指向同一节点
pub fn same_node(a: &Handle, b: &Handle) -> bool {
    Rc::ptr_eq(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{create_element, create_text, first_child};

    #[test]
    fn test_no_records_without_observer() {
        let document = Document::parse("<body><p>Hi</p></body>").unwrap();
        let body = document.body().unwrap();
        document.append_child(&body, &create_element("p", &[]));
        assert_eq!(document.pending_records(), 0);
    }

    #[test]
    fn test_child_list_records_are_coalesced_until_taken() {
        let document = Document::parse("<body><p>Hi</p></body>").unwrap();
        let body = document.body().unwrap();
        document.observe(ObserveOptions::default());

        let p = create_element("p", &[]);
        document.append_child(&p, &create_text("detached"));
        document.append_child(&body, &p);
        document.append_child(&body, &create_text("bare"));

        let records = document.take_records();
        // 未挂载时对 p 的修改不在观察范围内
        assert_eq!(records.len(), 2);
        assert_eq!(document.pending_records(), 0);
    }

    #[test]
    fn test_attribute_records_respect_filter() {
        let document = Document::parse("<body><img alt=\"x\"></body>").unwrap();
        let img = first_child(&document.body().unwrap()).unwrap();
        document.observe(ObserveOptions {
            attribute_filter: vec!["alt".to_string()],
        });

        document.set_attribute(&img, "alt", "y");
        document.set_attribute(&img, "data-translated", "true");

        let records = document.take_records();
        assert_eq!(records.len(), 1);
        match &records[0] {
            MutationRecord::Attributes {
                attribute_name,
                old_value,
                ..
            } => {
                assert_eq!(attribute_name, "alt");
                assert_eq!(old_value.as_deref(), Some("x"));
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_disconnect_drops_pending_records() {
        let document = Document::parse("<body></body>").unwrap();
        let body = document.body().unwrap();
        document.observe(ObserveOptions::default());
        document.append_child(&body, &create_element("div", &[]));
        document.disconnect();
        assert!(document.take_records().is_empty());
    }

    #[test]
    fn test_remove_detaches_node() {
        let document = Document::parse("<body><p id=\"x\">Hi</p></body>").unwrap();
        let p = document.get_element_by_id("x").unwrap();
        document.remove(&p);
        assert!(!document.is_connected(&p));
        assert!(!document.to_html().contains("Hi"));
    }

    #[test]
    fn test_charset_from_meta() {
        let document =
            Document::parse("<head><meta charset=\"windows-1252\"></head><p>x</p>").unwrap();
        assert_eq!(document.charset().as_deref(), Some("windows-1252"));

        let document = Document::parse(
            "<head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=shift_jis\"></head>",
        )
        .unwrap();
        assert_eq!(document.charset().as_deref(), Some("shift_jis"));

        assert_eq!(Document::parse("<p>x</p>").unwrap().charset(), None);
    }
}
