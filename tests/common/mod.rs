// 集成测试公共模块
//
// 提供 HTML 样例、可控的翻译后端和会话构建辅助

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use futures::channel::oneshot;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use markup5ever_rcdom::{Handle, SerializableHandle};

use inline_translator::parsers::html::dom;
use inline_translator::parsers::html::{LayoutProbe, NoLayout};
use inline_translator::translation::config::{MemorySettingsStore, Settings};
use inline_translator::translation::providers::{StubProvider, TranslationProvider};
use inline_translator::translation::{
    TranslationError, TranslationResult, TranslatorConfig, TranslatorSession, TranslatorSettings,
};
use inline_translator::Document;

/// HTML 样例
pub struct HtmlFixtures;

#[allow(dead_code)]
impl HtmlFixtures {
    pub fn three_paragraphs() -> &'static str {
        r#"<html><head><title>Fixture</title></head><body><p id="p1">One.</p><p id="p2">Two.</p><p id="p3">Three.</p></body></html>"#
    }

    pub fn image_with_alt() -> &'static str {
        r#"<html><body><img id="cat" alt="A cat" src="cat.png"></body></html>"#
    }

    /// 带行内格式、属性、隐藏内容和已有 title 的页面
    pub fn mixed_page() -> &'static str {
        r##"<html><head><title>Mixed</title></head><body>
<h1 id="heading">Welcome to the test page</h1>
<p id="intro" title="Intro tooltip">Hello <b>bold</b> world</p>
<ul><li id="item">First <a href="#">link</a></li></ul>
<img id="photo" alt="A photo" title="Photo title">
<button id="close" aria-label="Close dialog">X</button>
<p style="display:none">Hidden text</p>
<script>var ignored = "script";</script>
</body></html>"##
    }

    /// `count` 个段落
    pub fn paragraphs(count: usize) -> String {
        let body: String = (0..count)
            .map(|i| format!("<p id=\"p{}\">Paragraph number {}.</p>", i, i))
            .collect();
        format!("<html><body>{}</body></html>", body)
    }
}

/// 会话构建辅助
#[allow(dead_code)]
pub struct SessionBuilder {
    html: String,
    provider: Rc<dyn TranslationProvider>,
    settings: TranslatorSettings,
    user_settings: Rc<MemorySettingsStore>,
    layout: Rc<dyn LayoutProbe>,
}

#[allow(dead_code)]
impl SessionBuilder {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            provider: Rc::new(StubProvider::new()),
            settings: TranslatorSettings::default(),
            user_settings: Rc::new(MemorySettingsStore::new(Settings::default())),
            layout: Rc::new(NoLayout),
        }
    }

    pub fn provider(mut self, provider: Rc<dyn TranslationProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.settings.max_batch_size = max_batch_size;
        self
    }

    pub fn watch_enabled(mut self, watch_enabled: bool) -> Self {
        self.settings.watch_enabled = watch_enabled;
        self
    }

    pub fn min_text_length(mut self, min_text_length: usize) -> Self {
        self.settings.min_text_length = min_text_length;
        self
    }

    pub fn user_settings(mut self, store: Rc<MemorySettingsStore>) -> Self {
        self.user_settings = store;
        self
    }

    pub fn layout(mut self, layout: Rc<dyn LayoutProbe>) -> Self {
        self.layout = layout;
        self
    }

    pub fn build(self) -> TranslatorSession {
        let document = Document::parse(&self.html).expect("fixture should parse");
        TranslatorSession::with_environment(
            document,
            TranslatorConfig::new(self.provider, self.settings),
            self.user_settings,
            self.layout,
        )
    }
}

/// 按 id 取元素
#[allow(dead_code)]
pub fn element(session: &TranslatorSession, id: &str) -> Handle {
    session
        .document()
        .get_element_by_id(id)
        .unwrap_or_else(|| panic!("element #{} should exist", id))
}

#[allow(dead_code)]
pub fn text_of(session: &TranslatorSession, id: &str) -> String {
    dom::text_content(&element(session, id))
}

#[allow(dead_code)]
pub fn attr_of(session: &TranslatorSession, id: &str, name: &str) -> Option<String> {
    dom::get_node_attr(&element(session, id), name)
}

/// 序列化 body 子树
#[allow(dead_code)]
pub fn body_html(document: &Document) -> String {
    let body = document.body().expect("document should have a body");
    let mut buf = Vec::new();
    let serializable: SerializableHandle = body.into();
    serialize(
        &mut buf,
        &serializable,
        SerializeOpts {
            traversal_scope: TraversalScope::IncludeNode,
            ..Default::default()
        },
    )
    .expect("body should serialize");
    String::from_utf8(buf).expect("serialized html should be utf-8")
}

/// 按调用序号失败的后端，其余调用与占位后端一致
#[allow(dead_code)]
pub struct FailingProvider {
    failing_calls: Vec<(usize, TranslationError)>,
    calls: Cell<usize>,
}

#[allow(dead_code)]
impl FailingProvider {
    pub fn new(failing_calls: Vec<(usize, TranslationError)>) -> Self {
        Self {
            failing_calls,
            calls: Cell::new(0),
        }
    }

    /// 每次调用都失败
    pub fn always(error: TranslationError) -> Self {
        Self::new((0..64).map(|call| (call, error.clone())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.calls.get()
    }
}

#[async_trait(?Send)]
impl TranslationProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if let Some((_, error)) = self.failing_calls.iter().find(|(index, _)| *index == call) {
            return Err(error.clone());
        }
        Ok(texts
            .iter()
            .map(|text| format!("[{}] {}", target_lang, text))
            .collect())
    }
}

/// 返回条数总是少一条的后端
#[allow(dead_code)]
#[derive(Default)]
pub struct ShortProvider {
    calls: Cell<usize>,
}

#[allow(dead_code)]
impl ShortProvider {
    pub fn call_count(&self) -> usize {
        self.calls.get()
    }
}

#[async_trait(?Send)]
impl TranslationProvider for ShortProvider {
    fn name(&self) -> &str {
        "short"
    }

    async fn translate(
        &self,
        texts: &[String],
        _target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        self.calls.set(self.calls.get() + 1);
        Ok(texts.iter().skip(1).cloned().collect())
    }
}

/// 在放行之前一直挂起的后端
#[allow(dead_code)]
pub struct BlockingProvider {
    gate: RefCell<Option<oneshot::Receiver<()>>>,
    calls: Cell<usize>,
}

#[allow(dead_code)]
impl BlockingProvider {
    /// 返回后端和放行开关
    pub fn new() -> (Self, oneshot::Sender<()>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                gate: RefCell::new(Some(receiver)),
                calls: Cell::new(0),
            },
            sender,
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.get()
    }
}

#[async_trait(?Send)]
impl TranslationProvider for BlockingProvider {
    fn name(&self) -> &str {
        "blocking"
    }

    async fn translate(
        &self,
        texts: &[String],
        target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        self.calls.set(self.calls.get() + 1);
        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            gate.await
                .map_err(|_| TranslationError::NetworkError("gate dropped".to_string()))?;
        }
        Ok(texts
            .iter()
            .map(|text| format!("[{}] {}", target_lang, text))
            .collect())
    }
}
