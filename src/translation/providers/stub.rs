//! 占位后端
//!
//! 不访问网络，返回 `"[lang] " + 原文`，用于开发和测试。

use std::cell::RefCell;

use async_trait::async_trait;

use super::TranslationProvider;
use crate::translation::error::TranslationResult;

/// 确定性的占位后端，记录每次调用
#[derive(Debug, Default)]
pub struct StubProvider {
    calls: RefCell<Vec<Vec<String>>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收到的调用（每项是一个批次的输入）
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

#[async_trait(?Send)]
impl TranslationProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        self.calls.borrow_mut().push(texts.to_vec());
        Ok(texts
            .iter()
            .map(|text| format!("[{}] {}", target_lang, text))
            .collect())
    }
}
