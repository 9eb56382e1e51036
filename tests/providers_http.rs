//! 翻译后端 HTTP 集成测试
//!
//! 使用 wiremock 模拟 Anthropic Messages API 和 LibreTranslate

use std::rc::Rc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use inline_translator::translation::providers::{
    ClaudeProvider, LibreTranslateProvider, TranslationProvider,
};
use inline_translator::translation::TranslationError;

mod common {
    include!("common/mod.rs");
}

use common::{text_of, HtmlFixtures, SessionBuilder};

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn claude(server: &MockServer) -> ClaudeProvider {
    ClaudeProvider::new(Some("test-key".to_string()))
        .unwrap()
        .with_model("claude-test")
        .with_endpoint(&server.uri())
}

fn message_body(text: &str) -> serde_json::Value {
    json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }]
    })
}

#[tokio::test]
async fn test_claude_numbered_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({ "model": "claude-test" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_body("1. Hallo\n2. Welt")))
        .expect(1)
        .mount(&server)
        .await;

    let result = claude(&server)
        .translate(&texts(&["Hello", "World"]), "de")
        .await
        .unwrap();

    assert_eq!(result, vec!["Hallo", "Welt"]);

    println!("✅ Claude 编号列表响应解析正确");
}

#[tokio::test]
async fn test_claude_status_mapping() {
    let cases = vec![
        (
            ResponseTemplate::new(401).set_body_json(json!({
                "type": "error",
                "error": { "type": "authentication_error", "message": "invalid x-api-key" }
            })),
            "invalid",
        ),
        (ResponseTemplate::new(429), "rate"),
        (ResponseTemplate::new(529), "api"),
    ];

    for (template, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(template)
            .mount(&server)
            .await;

        let error = claude(&server)
            .translate(&texts(&["Hello"]), "de")
            .await
            .unwrap_err();

        match expected {
            "invalid" => {
                assert!(matches!(&error, TranslationError::InvalidCredential(message) if message.contains("invalid x-api-key")))
            }
            "rate" => assert!(matches!(error, TranslationError::RateLimitExceeded)),
            _ => assert!(matches!(error, TranslationError::ApiError { status: 529, .. })),
        }
    }

    println!("✅ Claude 错误状态映射正确");
}

#[tokio::test]
async fn test_claude_empty_content_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": [] })))
        .mount(&server)
        .await;

    let error = claude(&server)
        .translate(&texts(&["Hello"]), "de")
        .await
        .unwrap_err();

    assert!(matches!(error, TranslationError::MalformedResponse(_)));

    println!("✅ 空响应视为格式错误");
}

#[tokio::test]
async fn test_claude_page_translation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(message_body("1. Eins.\n2. Zwei.\n3. Drei.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = SessionBuilder::new(HtmlFixtures::three_paragraphs())
        .provider(Rc::new(claude(&server)))
        .build();
    let report = session.translate_page("de").await.unwrap();

    assert_eq!(report.applied, 3);
    assert_eq!(text_of(&session, "p1"), "Eins.");
    assert_eq!(text_of(&session, "p3"), "Drei.");

    println!("✅ Claude 整页翻译完成");
}

#[tokio::test]
async fn test_claude_unauthorized_notice_on_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let session = SessionBuilder::new(HtmlFixtures::three_paragraphs())
        .provider(Rc::new(claude(&server)))
        .build();
    session.translate_page("de").await.unwrap();

    let notice = session.indicator().text().unwrap();
    assert!(notice.contains("API key is invalid"));
    assert_eq!(text_of(&session, "p1"), "One.");

    println!("✅ 凭据无效时页面显示提示");
}

#[tokio::test]
async fn test_libre_batch_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/translate"))
        .and(body_partial_json(json!({
            "q": ["Hello", "World"],
            "source": "en",
            "target": "de",
            "format": "text"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "translatedText": ["Hallo", "Welt"] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = LibreTranslateProvider::new(&server.uri(), None)
        .unwrap()
        .with_source_lang("en");
    let result = provider
        .translate(&texts(&["Hello", "World"]), "de")
        .await
        .unwrap();

    assert_eq!(result, vec!["Hallo", "Welt"]);

    println!("✅ LibreTranslate 批量响应解析正确");
}

#[tokio::test]
async fn test_libre_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/translate"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let provider = LibreTranslateProvider::new(&server.uri(), Some("bad".to_string())).unwrap();
    let error = provider
        .translate(&texts(&["Hello"]), "de")
        .await
        .unwrap_err();

    assert!(matches!(error, TranslationError::InvalidCredential(_)));

    println!("✅ LibreTranslate 拒绝凭据");
}
