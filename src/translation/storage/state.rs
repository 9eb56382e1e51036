//! 翻译状态存储
//!
//! 目标键 → `{original, current}` 的映射，是"哪些内容已经翻译"的唯一依据。
//! 条目一旦建立，`original` 不再改变；`current == original` 表示尚未翻译。

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexMap;

use super::identity::NodeIdentity;
use crate::parsers::html::dom::get_text;
use crate::translation::pipeline::target::{Target, TargetKey};

/// 分组文本目标中单个成员的原文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub node_id: String,
    pub text: String,
}

/// 单个目标的翻译状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationStateEntry {
    pub original: String,
    pub current: String,
    /// 文本目标各成员的原文，用于逐个还原
    pub segments: Vec<Segment>,
}

impl TranslationStateEntry {
    pub fn is_translated(&self) -> bool {
        self.current != self.original
    }
}

/// 翻译状态存储（按插入顺序）
pub struct TranslationStateStore {
    identity: Rc<NodeIdentity>,
    entries: RefCell<IndexMap<TargetKey, TranslationStateEntry>>,
}

impl std::fmt::Debug for TranslationStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationStateStore")
            .field("entries", &self.entries.borrow().len())
            .finish()
    }
}

impl TranslationStateStore {
    pub fn new(identity: Rc<NodeIdentity>) -> Self {
        Self {
            identity,
            entries: RefCell::new(IndexMap::new()),
        }
    }

    pub fn identity(&self) -> &Rc<NodeIdentity> {
        &self.identity
    }

    pub fn key_of(&self, target: &Target) -> TargetKey {
        target.key(&self.identity)
    }

    /// 只保留尚未记录的目标；同一批里重复的键只保留第一个
    pub fn filter_new(&self, targets: Vec<Target>) -> Vec<Target> {
        let entries = self.entries.borrow();
        let mut seen = HashSet::new();
        targets
            .into_iter()
            .filter(|target| {
                let key = target.key(&self.identity);
                !entries.contains_key(&key) && seen.insert(key)
            })
            .collect()
    }

    /// 记录原文；已存在的键保持不变
    pub fn save_originals(&self, targets: &[Target]) {
        let mut entries = self.entries.borrow_mut();
        for target in targets {
            let key = target.key(&self.identity);
            if entries.contains_key(&key) {
                continue;
            }
            let original = target.get();
            let segments = target
                .text_nodes()
                .iter()
                .map(|node| Segment {
                    node_id: self.identity.identify(node),
                    text: get_text(node).unwrap_or_default(),
                })
                .collect();
            entries.insert(
                key,
                TranslationStateEntry {
                    current: original.clone(),
                    original,
                    segments,
                },
            );
        }
    }

    pub fn is_translated(&self, key: &TargetKey) -> bool {
        self.entries
            .borrow()
            .get(key)
            .map(TranslationStateEntry::is_translated)
            .unwrap_or(false)
    }

    pub fn contains(&self, key: &TargetKey) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn get(&self, key: &TargetKey) -> Option<TranslationStateEntry> {
        self.entries.borrow().get(key).cloned()
    }

    /// 推进 `current`；键不存在时返回 `false`
    pub fn set_current(&self, key: &TargetKey, value: &str) -> bool {
        match self.entries.borrow_mut().get_mut(key) {
            Some(entry) => {
                entry.current = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn reset_current_to_original(&self, key: &TargetKey) {
        if let Some(entry) = self.entries.borrow_mut().get_mut(key) {
            entry.current = entry.original.clone();
        }
    }

    /// 快照（插入顺序）
    pub fn entries(&self) -> Vec<(TargetKey, TranslationStateEntry)> {
        self.entries
            .borrow()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// 已翻译条目的原文，按插入顺序
    pub fn translated_originals<F>(&self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&TargetKey) -> bool,
    {
        self.entries
            .borrow()
            .iter()
            .filter(|(key, entry)| entry.is_translated() && predicate(*key))
            .map(|(_, entry)| entry.original.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
