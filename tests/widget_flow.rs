//! End-to-end tests: a widget mounted on an in-memory surface talking to a
//! mock chat endpoint over HTTP.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use floatchat::{
    HttpTransport, Key, KeyOutcome, MemorySurface, Modifiers, RenderMode, Sender, Widget,
    WidgetBuilder, WidgetOptions,
};
use mockito::Matcher;
use serde_json::json;
use url::Url;

async fn wait_until(widget: &Widget, done: impl Fn(&Widget) -> bool) {
    for _ in 0..500 {
        if done(widget) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for widget: {widget:?}");
}

/// True once `count` messages are in the log and none is pending.
fn settled_with(widget: &Widget, count: usize) -> bool {
    let messages = widget.messages();
    messages.len() == count
        && messages
            .iter()
            .all(|m| m.mode != RenderMode::Loading && m.settled)
}

fn build(server: &mockito::ServerGuard, options: WidgetOptions) -> (Widget, MemorySurface) {
    let surface = MemorySurface::new();
    let endpoint = Url::parse(&format!("{}/chat", server.url())).unwrap();
    let widget = WidgetBuilder::new(options)
        .surface(surface.clone())
        .transport(HttpTransport::new(endpoint).unwrap())
        .browser_language("en-GB")
        .build()
        .unwrap();
    (widget, surface)
}

#[tokio::test]
async fn typed_message_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let session_id = "fcw-integration";
    let mock = server
        .mock("POST", "/chat")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "chatInput": "What do you do?",
            "sessionId": session_id,
            "lang": "en",
        })))
        .with_header("content-type", "application/json")
        .with_body(r#"{"reply": "We build **bots**. See https://example.com"}"#)
        .create_async()
        .await;

    let options = WidgetOptions::new()
        .with_session_id(session_id)
        .with_title("Helper");
    let (widget, surface) = build(&server, options);
    let sent = Arc::new(Mutex::new(Vec::new()));
    let received = Arc::new(Mutex::new(Vec::new()));
    let sent_sink = sent.clone();
    let received_sink = received.clone();
    widget.on_message_sent(move |text| sent_sink.lock().unwrap().push(text.to_string()));
    widget.on_message_received(move |text| received_sink.lock().unwrap().push(text.to_string()));

    widget.toggle();
    widget.set_draft("What do you do?\n");
    assert_eq!(
        widget.handle_key(Key::Enter, Modifiers::NONE),
        KeyOutcome::Submitted
    );
    assert!(!widget.has_suggestions());
    wait_until(&widget, |w| settled_with(w, 3)).await;
    mock.assert_async().await;

    let messages = widget.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].sender, Sender::User);
    assert_eq!(messages[1].text, "What do you do?");
    let reply = &messages[2];
    assert_eq!(reply.sender, Sender::Bot);
    assert_eq!(
        surface.node_content(reply.id).as_deref(),
        Some(
            r#"We build <b>bots</b>. See <a href="https://example.com" target="_blank" rel="noopener noreferrer">https://example.com</a>"#
        )
    );
    assert_eq!(*sent.lock().unwrap(), vec!["What do you do?".to_string()]);
    assert_eq!(
        *received.lock().unwrap(),
        vec![
            "What do you do?".to_string(),
            "We build **bots**. See https://example.com".to_string()
        ]
    );
    assert_eq!(widget.unread(), 0);
}

#[tokio::test]
async fn server_error_shows_localized_fallback() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat")
        .with_status(502)
        .create_async()
        .await;
    let (widget, _surface) = build(&server, WidgetOptions::new().with_lang("fr"));
    assert!(widget.choose_suggestion(2));
    wait_until(&widget, |w| settled_with(w, 3)).await;
    let last = widget.messages().pop().unwrap();
    assert_eq!(last.text, "Erreur de connexion.");
    assert_eq!(widget.unread(), 2);
}

#[tokio::test]
async fn unexpected_shape_shows_not_understood() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat")
        .with_header("content-type", "application/json")
        .with_body(r#"{"answer": "wrong key"}"#)
        .create_async()
        .await;
    let (widget, _surface) = build(&server, WidgetOptions::new().with_streaming(false));
    widget.send("hello");
    wait_until(&widget, |w| settled_with(w, 2)).await;
    let last = widget.messages().pop().unwrap();
    assert_eq!(last.text, "Sorry, I did not understand.");
}

#[tokio::test]
async fn options_document_drives_the_page() {
    let server = mockito::Server::new_async().await;
    let yaml = r##"
theme: custom
position: bottom-left
customColors:
  primary: "#123456"
title: Docs Bot
zIndex: 500
translations:
  en:
    placeholder: Ask the docs...
    welcomeMessage: "Hi!\n- search\n- browse"
    suggestions:
      - text: Search
        message: How do I search?
unknownKey: ignored
"##;
    let options = WidgetOptions::from_yaml(yaml).unwrap();
    let (widget, surface) = build(&server, options);
    assert_eq!(widget.config().lang, "en");
    let page = surface.render_document();
    assert!(page.contains("--fcw-primary:#123456;"));
    assert!(page.contains(".fcw-bubble{position:fixed;left:24px;"));
    assert!(page.contains("z-index:500"));
    assert!(page.contains("Docs Bot"));
    assert!(page.contains(r#"placeholder="Ask the docs...""#));
    assert!(page.contains("<ul>Hi!<li>search</li><li>browse</li></ul>"));
    assert!(page.contains(r#"data-suggestion="0">Search<"#));
    assert!(page.contains(r#"<div class="fcw-unread">1</div>"#));
}
