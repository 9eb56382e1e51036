//! 批量翻译引擎
//!
//! 把目标切成不超过 `max_batch_size` 的批次，按顺序调用翻译后端，
//! 写回译文、推进存储中的 `current` 并挂载原文浮层。
//!
//! ## 状态
//!
//! 引擎只有 `Idle` 和 `Running` 两个状态。运行期间再次调用会直接返回
//! 被跳过的报告，不会触发任何后端调用。运行期间监视器被解除，
//! 结束时（无论正常返回还是 future 被丢弃）由守卫对象统一收尾：
//!
//! 1. 移除 `data-translating` 标记
//! 2. 隐藏进度提示（错误提示保留）
//! 3. 清除运行标志
//! 4. 运行前已武装且配置允许时重新武装监视器
//!
//! ## 错误
//!
//! 单个批次失败只记录日志并跳过，不影响后续批次；
//! 同一次调用里只有第一个失败的批次会弹出用户可见的错误提示。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::parsers::html::document::{same_node, Document};
use crate::parsers::html::dom::{self, has_node_attr};
use crate::translation::config::{constants, TranslatorConfig};
use crate::translation::core::watcher::MutationWatcher;
use crate::translation::pipeline::batch::{has_translatable_text, partition, Batch, BatchReport};
use crate::translation::pipeline::filters::TextFilter;
use crate::translation::pipeline::target::Target;
use crate::translation::presenter::{OverlayPresenter, ProgressIndicator};
use crate::translation::storage::TranslationStateStore;

/// 批量翻译引擎
pub struct BatchTranslationEngine {
    document: Rc<Document>,
    config: TranslatorConfig,
    filter: TextFilter,
    store: Rc<TranslationStateStore>,
    presenter: Rc<OverlayPresenter>,
    indicator: Rc<ProgressIndicator>,
    watcher: Rc<MutationWatcher>,
    running: Cell<bool>,
}

impl std::fmt::Debug for BatchTranslationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchTranslationEngine")
            .field("config", &self.config)
            .field("running", &self.running.get())
            .finish()
    }
}

/// 运行期间的收尾守卫
struct RunGuard<'a> {
    engine: &'a BatchTranslationEngine,
    rearm_watcher: bool,
    marked: RefCell<Vec<Handle>>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let engine = self.engine;
        for host in self.marked.borrow_mut().drain(..) {
            engine
                .document
                .remove_attribute(&host, constants::ATTR_TRANSLATING);
        }
        engine.indicator.hide();
        engine.running.set(false);
        if self.rearm_watcher {
            engine.watcher.arm();
        }
    }
}

impl BatchTranslationEngine {
    pub fn new(
        document: Rc<Document>,
        config: TranslatorConfig,
        store: Rc<TranslationStateStore>,
        presenter: Rc<OverlayPresenter>,
        indicator: Rc<ProgressIndicator>,
        watcher: Rc<MutationWatcher>,
    ) -> Self {
        let filter = TextFilter::new(config.settings.min_text_length);
        Self {
            document,
            config,
            filter,
            store,
            presenter,
            indicator,
            watcher,
            running: Cell::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// 分批翻译
    ///
    /// 调用方应已为目标保存原文；这里再保存一次，已有条目保持不变。
    pub async fn translate_in_batches(&self, targets: Vec<Target>, target_lang: &str) -> BatchReport {
        if self.running.get() {
            tracing::debug!("翻译正在进行，跳过本次调用");
            return BatchReport::skipped();
        }

        let guard = RunGuard {
            engine: self,
            rearm_watcher: self.watcher.is_armed() && self.config.settings.watch_enabled,
            marked: RefCell::new(Vec::new()),
        };
        self.running.set(true);
        self.watcher.disarm();

        let mut report = BatchReport::default();
        if targets.is_empty() {
            return report;
        }

        self.store.save_originals(&targets);
        let batches = partition(targets, self.config.settings.max_batch_size);
        report.batches = batches.len();
        *guard.marked.borrow_mut() = self.mark_hosts(&batches);

        tracing::info!(
            "开始翻译: {} 个批次, 目标语言 {}, 后端 {}",
            batches.len(),
            target_lang,
            self.config.provider.name()
        );

        let total = batches.len();
        let mut error_shown = false;
        for batch in &batches {
            // 错误提示出现后不再刷新进度，留给它自动消失
            if !error_shown {
                self.indicator.show_progress(total, batch.index + 1);
            }

            let texts = batch.texts();
            if !has_translatable_text(&texts, &self.filter) {
                tracing::debug!("批次 {}/{} 没有足够长的文本，跳过", batch.index + 1, total);
                continue;
            }

            report.calls += 1;
            // 不跨 await 持有任何借用
            let result = self.config.provider.translate(&texts, target_lang).await;
            match result {
                Ok(translations) => {
                    if translations.len() != texts.len() {
                        tracing::warn!(
                            "批次 {}/{} 返回条数不符: 期望 {}, 实际 {}",
                            batch.index + 1,
                            total,
                            texts.len(),
                            translations.len()
                        );
                        report.mismatched_batches += 1;
                        continue;
                    }
                    report.applied += self.apply(batch, &translations);
                    tracing::debug!("批次 {}/{} 完成", batch.index + 1, total);
                }
                Err(error) => {
                    report.failed_batches += 1;
                    tracing::error!("批次 {}/{} 翻译失败: {}", batch.index + 1, total, error);
                    if !error_shown {
                        error_shown = true;
                        let category = error.category();
                        let details = category.details(&error.to_string());
                        self.indicator.show_error(category.label(), Some(&details));
                    }
                }
            }
        }

        tracing::info!("翻译结束: {}", report.summary());
        drop(guard);
        report
    }

    /// 写回一个批次的译文，返回写回的目标数
    fn apply(&self, batch: &Batch, translations: &[String]) -> usize {
        let mut applied = 0;
        for (target, translated) in batch.targets.iter().zip(translations) {
            if translated.trim().is_empty() {
                continue;
            }
            let key = self.store.key_of(target);
            let original = match self.store.get(&key) {
                Some(entry) => entry.original,
                None => continue,
            };
            target.set(&self.document, translated);
            self.store.set_current(&key, translated);
            self.presenter.attach(target, &original);
            applied += 1;
        }
        applied
    }

    /// 为宿主加上 `data-translating`
    ///
    /// 已有标记的宿主和祖先已被标记的宿主都跳过，返回本次新加标记的宿主。
    fn mark_hosts(&self, batches: &[Batch]) -> Vec<Handle> {
        let mut marked: Vec<Handle> = Vec::new();
        let hosts = batches
            .iter()
            .flat_map(|batch| batch.targets.iter().map(|target| target.host.clone()));
        for host in hosts {
            if marked.iter().any(|existing| same_node(existing, &host)) {
                continue;
            }
            if has_node_attr(&host, constants::ATTR_TRANSLATING) {
                continue;
            }
            let inside_marked = dom::ancestors(&host)
                .iter()
                .any(|ancestor| has_node_attr(ancestor, constants::ATTR_TRANSLATING));
            if inside_marked {
                continue;
            }
            self.document
                .set_attribute(&host, constants::ATTR_TRANSLATING, "true");
            marked.push(host);
        }
        marked
    }
}
