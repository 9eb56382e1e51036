//! 错误处理集成测试
//!
//! 覆盖错误分类、用户可见提示、选区错误和消息桥

use std::rc::Rc;
use std::time::{Duration, Instant};

use inline_translator::parsers::html::SelectionRange;
use inline_translator::translation::error::{classify_message, ErrorCategory};
use inline_translator::translation::providers::{ClaudeProvider, StubProvider};
use inline_translator::translation::TranslationError;
use inline_translator::{Command, CommandResponse};

mod common {
    include!("common/mod.rs");
}

use common::{element, text_of, FailingProvider, HtmlFixtures, SessionBuilder};

fn response(json: &str) -> CommandResponse {
    serde_json::from_str(json).expect("response should be valid JSON")
}

#[tokio::test]
async fn test_missing_credential_notice() {
    let provider = Rc::new(ClaudeProvider::new(None).unwrap());
    let session = SessionBuilder::new(HtmlFixtures::three_paragraphs())
        .provider(provider)
        .build();

    let report = session.translate_page("ja").await.unwrap();

    assert_eq!(report.failed_batches, 1);
    assert_eq!(text_of(&session, "p1"), "One.");
    let indicator = session.indicator();
    assert!(indicator.is_error_shown());
    let notice = indicator.text().unwrap();
    assert!(notice.contains("API key is not configured"));
    assert!(notice.contains("Set an API key in the extension settings"));

    // 3 秒后自动消失
    assert_eq!(session.run_due_timers(Instant::now() + Duration::from_secs(4)), 1);
    assert!(!indicator.is_visible());

    println!("✅ 未配置凭据时显示对应提示");
}

#[tokio::test]
async fn test_notice_per_category() {
    let cases = vec![
        (
            TranslationError::InvalidCredential("401 - invalid x-api-key".to_string()),
            "API key is invalid",
            "Check the API key in the extension settings",
        ),
        (
            TranslationError::RateLimitExceeded,
            "API rate limit reached",
            "Wait a moment and try again",
        ),
        (
            TranslationError::ApiError {
                status: 500,
                message: "overloaded".to_string(),
            },
            "An error occurred during translation",
            "API error: 500 - overloaded",
        ),
    ];

    for (error, label, details) in cases {
        let session = SessionBuilder::new(HtmlFixtures::three_paragraphs())
            .provider(Rc::new(FailingProvider::always(error)))
            .build();
        session.translate_page("de").await.unwrap();

        let notice = session.indicator().text().unwrap();
        assert!(notice.contains(label), "notice '{}' lacks '{}'", notice, label);
        assert!(notice.contains(details), "notice '{}' lacks '{}'", notice, details);
    }

    println!("✅ 各类错误显示对应提示");
}

#[test]
fn test_classification_by_message() {
    assert_eq!(
        classify_message("Error: API key is not configured"),
        ErrorCategory::MissingCredential
    );
    assert_eq!(
        classify_message("APIキーが設定されていません"),
        ErrorCategory::MissingCredential
    );
    assert_eq!(
        classify_message("HTTP 401 Unauthorized"),
        ErrorCategory::InvalidCredential
    );
    assert_eq!(classify_message("status 429"), ErrorCategory::RateLimit);
    assert_eq!(classify_message("connection reset"), ErrorCategory::Generic);

    // 状态码出现在通用错误的文本里时按文本归类
    let error = TranslationError::ApiError {
        status: 401,
        message: "unauthorized".to_string(),
    };
    assert_eq!(error.category(), ErrorCategory::InvalidCredential);
    assert_eq!(
        TranslationError::NetworkError("timeout".to_string()).category(),
        ErrorCategory::Generic
    );

    println!("✅ 错误分类正确");
}

#[tokio::test]
async fn test_selection_errors() {
    let stub = Rc::new(StubProvider::new());
    let session = SessionBuilder::new(HtmlFixtures::three_paragraphs())
        .provider(stub.clone())
        .min_text_length(5)
        .build();

    let error = session.translate_selection("de").await.unwrap_err();
    assert!(matches!(error, TranslationError::NothingSelected));
    assert!(session
        .indicator()
        .text()
        .unwrap()
        .contains("No text is selected"));

    let p1 = element(&session, "p1");
    session.set_selection(Some(SelectionRange::select_node_contents(&p1)));
    let error = session.translate_selection("de").await.unwrap_err();
    assert!(matches!(error, TranslationError::SelectionTooShort { min: 5 }));
    let notice = session.indicator().text().unwrap();
    assert!(notice.contains("Selected text is too short"));
    assert!(notice.contains("Select a longer piece of text"));

    assert_eq!(stub.call_count(), 0);
    assert!(session.store().is_empty());

    println!("✅ 选区错误不会启动翻译");
}

#[tokio::test]
async fn test_empty_page_notice() {
    let session =
        SessionBuilder::new("<html><body><script>var x = 1;</script></body></html>").build();

    let report = session.translate_page("de").await.unwrap();

    assert_eq!(report.calls, 0);
    let notice = session.indicator().text().unwrap();
    assert!(notice.contains("No translatable content found"));
    assert!(notice.contains("This page has no translatable text"));

    println!("✅ 没有可翻译内容时提示");
}

#[tokio::test]
async fn test_message_bridge() {
    let session = SessionBuilder::new(HtmlFixtures::three_paragraphs()).build();

    let reply = response(
        &session
            .handle_message_json(r#"{"type":"TRANSLATE_PAGE","targetLang":"de"}"#)
            .await,
    );
    assert_eq!(reply, CommandResponse::ok("Translation completed"));
    assert_eq!(text_of(&session, "p1"), "[de] One.");

    let reply = response(&session.handle_message_json(r#"{"type":"RELOAD_CONFIG"}"#).await);
    assert_eq!(reply, CommandResponse::ok("Configuration reloaded"));

    let reply = response(&session.handle_message_json(r#"{"type":"RESTORE_ORIGINAL"}"#).await);
    assert_eq!(reply, CommandResponse::ok("Restored original text"));
    assert_eq!(text_of(&session, "p1"), "One.");

    let reply = response(&session.handle_message_json(r#"{"type":"TRANSLATE_SELECTION"}"#).await);
    assert!(!reply.success);
    assert_eq!(
        reply.message.as_deref(),
        Some("Translation error: no text is selected")
    );

    let reply = response(&session.handle_message_json(r#"{"type":"SHUTDOWN"}"#).await);
    assert!(!reply.success);
    assert!(reply.message.unwrap().starts_with("Unknown message"));

    let reply = response(&session.handle_message_json("not json").await);
    assert!(!reply.success);

    println!("✅ 消息桥按类型分发");
}

#[tokio::test]
async fn test_command_default_language() {
    let session = SessionBuilder::new(HtmlFixtures::three_paragraphs()).build();

    let reply = session
        .handle_command(Command::TranslatePage { target_lang: None })
        .await;

    assert!(reply.success);
    assert_eq!(text_of(&session, "p1"), "[ja] One.");
    assert_eq!(session.active_lang().as_deref(), Some("ja"));

    println!("✅ 未指定语言时使用默认语言");
}

#[tokio::test]
async fn test_failed_page_still_succeeds_as_command() {
    let session = SessionBuilder::new(HtmlFixtures::three_paragraphs())
        .provider(Rc::new(FailingProvider::always(
            TranslationError::RateLimitExceeded,
        )))
        .build();

    let reply = session
        .handle_command(Command::TranslatePage {
            target_lang: Some("de".to_string()),
        })
        .await;

    // 批次错误通过提示条呈现，命令本身完成
    assert!(reply.success);
    assert!(session
        .indicator()
        .text()
        .unwrap()
        .contains("API rate limit reached"));

    println!("✅ 批次失败不影响命令响应");
}
