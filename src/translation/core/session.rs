//! 翻译会话
//!
//! 每次注入页面对应一个会话，持有文档、配置、节点标识、翻译状态、引擎、
//! 监视器、浮层和定时器。所有方法都取 `&self`，内部状态放在 `Cell`/`RefCell` 中，
//! 并且不会跨 `.await` 持有借用。
//!
//! ## 对外操作
//!
//! - [`TranslatorSession::translate_page`] / [`TranslatorSession::translate_selection`]
//! - [`TranslatorSession::restore_original`]
//! - [`TranslatorSession::reload_config`]
//! - [`TranslatorSession::handle_command`] / [`TranslatorSession::handle_message_json`]
//!
//! 浏览器事件循环的三个入口由调用方驱动：
//! [`deliver_mutations`](TranslatorSession::deliver_mutations) 相当于微任务检查点，
//! [`dispatch_pointer`](TranslatorSession::dispatch_pointer) 投递指针事件，
//! [`run_due_timers`](TranslatorSession::run_due_timers) 执行到期的延时任务。

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};

use super::engine::BatchTranslationEngine;
use super::watcher::MutationWatcher;
use crate::parsers::html::document::{Document, MutationRecord};
use crate::parsers::html::dom::get_node_attr;
use crate::parsers::html::layout::{LayoutProbe, NoLayout};
use crate::parsers::html::selection::SelectionRange;
use crate::translation::config::{constants, MemorySettingsStore, SettingsStore, TranslatorConfig};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::batch::BatchReport;
use crate::translation::pipeline::collector::TargetCollector;
use crate::translation::pipeline::target::{Target, TargetKind};
use crate::translation::presenter::{
    OverlayPresenter, PointerEvent, ProgressIndicator, TimerQueue, TimerTask,
};
use crate::translation::storage::{
    NodeIdentity, NodeLocator, TranslationStateEntry, TranslationStateStore,
};

/// 来自弹出页或后台的命令
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    TranslatePage {
        #[serde(rename = "targetLang", default, skip_serializing_if = "Option::is_none")]
        target_lang: Option<String>,
    },
    TranslateSelection {
        #[serde(rename = "targetLang", default, skip_serializing_if = "Option::is_none")]
        target_lang: Option<String>,
    },
    RestoreOriginal,
    ReloadConfig,
}

/// 命令响应
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// 翻译会话
pub struct TranslatorSession {
    document: Rc<Document>,
    config: TranslatorConfig,
    store: Rc<TranslationStateStore>,
    locator: NodeLocator,
    collector: TargetCollector,
    timers: Rc<TimerQueue>,
    indicator: Rc<ProgressIndicator>,
    presenter: Rc<OverlayPresenter>,
    watcher: Rc<MutationWatcher>,
    engine: BatchTranslationEngine,
    settings_store: Rc<dyn SettingsStore>,
    active_lang: RefCell<Option<String>>,
    selection: RefCell<Option<SelectionRange>>,
}

impl std::fmt::Debug for TranslatorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorSession")
            .field("config", &self.config)
            .field("entries", &self.store.len())
            .field("active_lang", &self.active_lang.borrow())
            .field("watching", &self.watcher.is_armed())
            .finish()
    }
}

impl TranslatorSession {
    /// 使用内存设置存储、不提供几何信息的会话
    pub fn new(document: Document, config: TranslatorConfig) -> Self {
        Self::with_environment(
            document,
            config,
            Rc::new(MemorySettingsStore::default()),
            Rc::new(NoLayout),
        )
    }

    pub fn with_environment(
        document: Document,
        config: TranslatorConfig,
        settings_store: Rc<dyn SettingsStore>,
        layout: Rc<dyn LayoutProbe>,
    ) -> Self {
        let document = Rc::new(document);
        let identity = Rc::new(NodeIdentity::new());
        let store = Rc::new(TranslationStateStore::new(identity.clone()));
        let timers = Rc::new(TimerQueue::new());
        let attribute_names = config.settings.attribute_names.clone();

        let indicator = Rc::new(ProgressIndicator::new(document.clone(), timers.clone()));
        let presenter = Rc::new(OverlayPresenter::new(
            document.clone(),
            store.clone(),
            timers.clone(),
            layout,
            attribute_names.clone(),
        ));
        let watcher = Rc::new(MutationWatcher::new(document.clone(), attribute_names));
        let engine = BatchTranslationEngine::new(
            document.clone(),
            config.clone(),
            store.clone(),
            presenter.clone(),
            indicator.clone(),
            watcher.clone(),
        );

        Self {
            collector: TargetCollector::from_settings(&config.settings),
            locator: NodeLocator::new(identity),
            document,
            config,
            store,
            timers,
            indicator,
            presenter,
            watcher,
            engine,
            settings_store,
            active_lang: RefCell::new(None),
            selection: RefCell::new(None),
        }
    }

    // ------------------------------------------------------------------
    // 访问器
    // ------------------------------------------------------------------

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn store(&self) -> &Rc<TranslationStateStore> {
        &self.store
    }

    pub fn presenter(&self) -> &Rc<OverlayPresenter> {
        &self.presenter
    }

    pub fn indicator(&self) -> &Rc<ProgressIndicator> {
        &self.indicator
    }

    pub fn timers(&self) -> &Rc<TimerQueue> {
        &self.timers
    }

    pub fn collector(&self) -> &TargetCollector {
        &self.collector
    }

    pub fn is_translating(&self) -> bool {
        self.engine.is_running()
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_armed()
    }

    pub fn active_lang(&self) -> Option<String> {
        self.active_lang.borrow().clone()
    }

    /// 设置当前选区（`None` 表示没有选区）
    pub fn set_selection(&self, range: Option<SelectionRange>) {
        *self.selection.borrow_mut() = range;
    }

    // ------------------------------------------------------------------
    // 翻译
    // ------------------------------------------------------------------

    /// 翻译整页
    pub async fn translate_page(&self, target_lang: &str) -> TranslationResult<BatchReport> {
        if self.engine.is_running() {
            tracing::info!("翻译正在进行，跳过整页翻译请求");
            return Ok(BatchReport::skipped());
        }

        *self.active_lang.borrow_mut() = Some(target_lang.to_string());
        self.reclaim_identities();

        let root = self.document.body_or_root();
        let targets = self.store.filter_new(self.collector.collect(&root));
        if targets.is_empty() {
            tracing::info!("页面上没有新的可翻译内容");
            self.indicator.show_error(
                "No translatable content found",
                Some("This page has no translatable text"),
            );
            return Ok(BatchReport::default());
        }

        tracing::info!("整页翻译: {} 个目标 → {}", targets.len(), target_lang);
        self.store.save_originals(&targets);
        let report = self.engine.translate_in_batches(targets, target_lang).await;

        if self.config.settings.watch_enabled {
            self.watcher.arm();
        }
        Ok(report)
    }

    /// 翻译当前选区
    ///
    /// 没有选区或选中文本过短时直接报错，不启动任何批次。
    pub async fn translate_selection(&self, target_lang: &str) -> TranslationResult<BatchReport> {
        let range = match self.check_selection() {
            Ok(range) => range,
            Err(error) => {
                let (message, details) = match &error {
                    TranslationError::SelectionTooShort { .. } => {
                        ("Selected text is too short", "Select a longer piece of text")
                    }
                    _ => ("No text is selected", "Select the text you want to translate"),
                };
                self.indicator.show_error(message, Some(details));
                return Err(error);
            }
        };

        if self.engine.is_running() {
            tracing::info!("翻译正在进行，跳过选区翻译请求");
            return Ok(BatchReport::skipped());
        }
        self.reclaim_identities();

        let root = self.document.body_or_root();
        let targets = self
            .store
            .filter_new(self.collector.collect_in_selection(&range, &root));
        if targets.is_empty() {
            tracing::info!("选区内没有新的可翻译内容");
            return Ok(BatchReport::default());
        }

        tracing::info!("选区翻译: {} 个目标 → {}", targets.len(), target_lang);
        self.store.save_originals(&targets);
        Ok(self.engine.translate_in_batches(targets, target_lang).await)
    }

    fn check_selection(&self) -> TranslationResult<SelectionRange> {
        let range = self
            .selection
            .borrow()
            .clone()
            .ok_or(TranslationError::NothingSelected)?;
        let text = range.text();
        let selected = text.trim();
        if selected.is_empty() {
            return Err(TranslationError::NothingSelected);
        }
        let min = self.config.settings.min_text_length;
        if selected.chars().count() < min {
            return Err(TranslationError::SelectionTooShort { min });
        }
        Ok(range)
    }

    // ------------------------------------------------------------------
    // 还原
    // ------------------------------------------------------------------

    /// 还原全部原文并清除所有标记和监听器
    ///
    /// 先清理标记再写回原文：`title` 属性目标的原文最终由存储写回。
    pub fn restore_original(&self) {
        self.watcher.disarm();
        self.presenter.detach_all();

        let entries = self.store.entries();
        let located: Vec<_> = entries
            .into_iter()
            .map(|(key, entry)| {
                let target = self.locator.locate(&self.document, &key, Some(&entry));
                (key, entry, target)
            })
            .collect();

        let root = self.document.root().clone();
        let mut hosts: Vec<Handle> = located
            .iter()
            .filter_map(|(_, _, target)| target.as_ref().map(|target| target.host.clone()))
            .collect();
        for marker in [constants::ATTR_TRANSLATED, constants::ATTR_TRANSLATING] {
            hosts.extend(self.document.elements_with_attr(&root, marker));
        }
        for host in &hosts {
            self.clear_markers(host);
        }

        let mut restored = 0;
        for (key, entry, target) in &located {
            if let Some(target) = target {
                self.write_original(target, entry);
                restored += 1;
            }
            self.store.reset_current_to_original(key);
        }

        *self.active_lang.borrow_mut() = None;
        tracing::info!("已还原 {} / {} 个目标", restored, located.len());
        drop(located);
        self.reclaim_identities();
    }

    /// 清理已从文档中释放的节点标识
    fn reclaim_identities(&self) {
        self.store.identity().purge();
    }

    fn clear_markers(&self, host: &Handle) {
        if let Some(title) = get_node_attr(host, constants::ATTR_ORIGINAL_TITLE) {
            self.document.set_attribute(host, "title", &title);
            self.document
                .remove_attribute(host, constants::ATTR_ORIGINAL_TITLE);
        }
        for marker in [
            constants::ATTR_TRANSLATED,
            constants::ATTR_TRANSLATING,
            constants::ATTR_HANDLER_ADDED,
        ] {
            self.document.remove_attribute(host, marker);
        }
        for name in &self.config.settings.attribute_names {
            let marker = format!("{}{}", constants::ATTR_ORIGINAL_PREFIX, name);
            self.document.remove_attribute(host, &marker);
        }
    }

    fn write_original(&self, target: &Target, entry: &TranslationStateEntry) {
        match &target.kind {
            TargetKind::Text { nodes } if !entry.segments.is_empty() => {
                let identity = self.store.identity();
                for segment in &entry.segments {
                    let live = identity
                        .resolve(&segment.node_id)
                        .filter(|node| nodes.iter().any(|member| Rc::ptr_eq(member, node)));
                    if let Some(node) = live {
                        self.document.set_text(&node, &segment.text);
                    }
                }
            }
            _ => target.set(&self.document, &entry.original),
        }
    }

    // ------------------------------------------------------------------
    // 设置
    // ------------------------------------------------------------------

    /// 重新读取"悬停显示原文"设置
    ///
    /// 关闭时移除全部浮层并撤销监听器；打开时为所有已翻译条目重新挂载。
    pub async fn reload_config(&self) -> TranslationResult<bool> {
        let settings = self.settings_store.load().await?;
        let show_original = settings.show_original;
        self.presenter.set_show_original(show_original);

        if !show_original {
            self.presenter.detach_all();
            tracing::info!("已关闭原文显示");
            return Ok(false);
        }

        let mut attached = 0;
        for (key, entry) in self.store.entries() {
            if !entry.is_translated() {
                continue;
            }
            if let Some(target) = self.locator.locate(&self.document, &key, Some(&entry)) {
                if self.presenter.attach(&target, &entry.original).is_some() {
                    attached += 1;
                }
            }
        }
        tracing::info!("已开启原文显示，重新挂载 {} 个目标", attached);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // 事件循环入口
    // ------------------------------------------------------------------

    /// 投递累积的变更记录，必要时翻译新增内容
    ///
    /// 没有记录、引擎正在运行、监视器未武装或没有活动语言时返回 `None`。
    pub async fn deliver_mutations(&self) -> Option<BatchReport> {
        let records = self.document.take_records();
        let report = self.translate_records(records).await;
        // 移除记录持有的节点到这里才真正释放
        self.reclaim_identities();
        report
    }

    async fn translate_records(&self, records: Vec<MutationRecord>) -> Option<BatchReport> {
        if records.is_empty() {
            return None;
        }
        if self.engine.is_running() {
            tracing::debug!("翻译进行中，忽略 {} 条变更记录", records.len());
            return None;
        }
        if !self.watcher.is_armed() {
            return None;
        }
        let lang = self.active_lang.borrow().clone()?;

        let candidates = self.watcher.targets_from_records(&records, &self.collector);
        let targets = self.store.filter_new(candidates);
        if targets.is_empty() {
            return None;
        }

        tracing::info!("动态内容: {} 个新目标", targets.len());
        self.store.save_originals(&targets);
        Some(self.engine.translate_in_batches(targets, &lang).await)
    }

    pub fn dispatch_pointer(&self, target: &Handle, event: PointerEvent) -> bool {
        self.presenter.dispatch_pointer(target, event)
    }

    /// 执行 `now` 之前到期的延时任务，返回执行数量
    pub fn run_due_timers(&self, now: Instant) -> usize {
        let due = self.timers.take_due(now);
        let count = due.len();
        for (_, task) in due {
            match task {
                TimerTask::RemoveOverlay { overlay } => self.presenter.fire_removal(&overlay),
                TimerTask::DismissIndicator { indicator } => self.indicator.dismiss(&indicator),
            }
        }
        count
    }

    // ------------------------------------------------------------------
    // 消息
    // ------------------------------------------------------------------

    pub async fn handle_command(&self, command: Command) -> CommandResponse {
        tracing::debug!("收到命令: {:?}", command);
        let default_lang = &self.config.settings.default_target_lang;
        match command {
            Command::TranslatePage { target_lang } => {
                let lang = target_lang.unwrap_or_else(|| default_lang.clone());
                match self.translate_page(&lang).await {
                    Ok(_) => CommandResponse::ok("Translation completed"),
                    Err(error) => CommandResponse::failed(format!("Translation error: {}", error)),
                }
            }
            Command::TranslateSelection { target_lang } => {
                let lang = target_lang.unwrap_or_else(|| default_lang.clone());
                match self.translate_selection(&lang).await {
                    Ok(_) => CommandResponse::ok("Selected text translated"),
                    Err(error) => CommandResponse::failed(format!("Translation error: {}", error)),
                }
            }
            Command::RestoreOriginal => {
                self.restore_original();
                CommandResponse::ok("Restored original text")
            }
            Command::ReloadConfig => match self.reload_config().await {
                Ok(_) => CommandResponse::ok("Configuration reloaded"),
                Err(error) => {
                    tracing::error!("重新加载设置失败: {}", error);
                    CommandResponse::failed(format!("Failed to reload configuration: {}", error))
                }
            },
        }
    }

    /// JSON 进、JSON 出的消息桥
    pub async fn handle_message_json(&self, message: &str) -> String {
        let response = match serde_json::from_str::<Command>(message) {
            Ok(command) => self.handle_command(command).await,
            Err(error) => {
                tracing::warn!("无法解析消息: {}", error);
                CommandResponse::failed(format!("Unknown message: {}", error))
            }
        };
        serde_json::to_string(&response)
            .unwrap_or_else(|_| r#"{"success":false}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_json_shape() {
        let command: Command =
            serde_json::from_str(r#"{"type":"TRANSLATE_PAGE","targetLang":"de"}"#).unwrap();
        assert_eq!(
            command,
            Command::TranslatePage {
                target_lang: Some("de".to_string())
            }
        );

        let command: Command = serde_json::from_str(r#"{"type":"TRANSLATE_SELECTION"}"#).unwrap();
        assert_eq!(command, Command::TranslateSelection { target_lang: None });

        let command: Command = serde_json::from_str(r#"{"type":"RELOAD_CONFIG"}"#).unwrap();
        assert_eq!(command, Command::ReloadConfig);
        assert!(serde_json::from_str::<Command>(r#"{"type":"UNKNOWN"}"#).is_err());
    }

    #[test]
    fn test_response_omits_missing_message() {
        let response = CommandResponse {
            success: true,
            message: None,
        };
        assert_eq!(serde_json::to_string(&response).unwrap(), r#"{"success":true}"#);
        assert_eq!(
            serde_json::to_string(&CommandResponse::failed("boom")).unwrap(),
            r#"{"success":false,"message":"boom"}"#
        );
    }
}
