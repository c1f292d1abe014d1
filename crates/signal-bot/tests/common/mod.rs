//! Common test utilities for integration tests.
#![allow(dead_code)]

use chat_commands::DispatchOutcome;
use serde_json::{json, Value};
use signal_bot::config::{BotConfig, CommandsConfig, Config, SignalConfig};
use signal_bot::Bot;
use signal_client::BotMessage;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BOT_NUMBER: &str = "+15550000000";
pub const OWNER: &str = "+15550001111";
pub const USER: &str = "+15550002222";
pub const SENT_TIMESTAMP: i64 = 1_700_000_000_100;

/// Start a mock Signal REST API that accepts sends and deletes.
pub async fn mock_signal_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/send"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "timestamp": SENT_TIMESTAMP.to_string() })),
        )
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path_regex(r"^/v1/remote-delete/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .mount(&server)
        .await;

    server
}

/// Bot configuration pointing at a mock server, owned by [`OWNER`].
pub fn test_config(server: &MockServer) -> Config {
    Config {
        signal: SignalConfig {
            service_url: server.uri(),
            phone_number: BOT_NUMBER.to_string(),
            api_token: None,
            poll_interval: Duration::from_millis(10),
        },
        bot: BotConfig {
            owners: vec![OWNER.to_string()],
            ..BotConfig::default()
        },
        commands: CommandsConfig::default(),
    }
}

pub fn direct_message(source: &str, text: &str, timestamp: i64) -> BotMessage {
    BotMessage {
        source: source.to_string(),
        source_name: None,
        text: text.to_string(),
        timestamp,
        is_group: false,
        group_id: None,
        mentions: Vec::new(),
        edit_target: None,
        receiving_account: BOT_NUMBER.to_string(),
    }
}

pub fn group_message(source: &str, group: &str, text: &str, timestamp: i64) -> BotMessage {
    BotMessage {
        is_group: true,
        group_id: Some(group.to_string()),
        ..direct_message(source, text, timestamp)
    }
}

/// An edit of the message originally sent at `target`.
pub fn edited(mut message: BotMessage, target: i64) -> BotMessage {
    message.edit_target = Some(target);
    message
}

/// Bodies of every send request the mock server has seen, in order.
pub async fn sent_bodies(server: &MockServer) -> Vec<Value> {
    requests_to(server, "/v2/send").await
}

pub async fn delete_bodies(server: &MockServer) -> Vec<Value> {
    requests_to(server, "/v1/remote-delete/").await
}

async fn requests_to(server: &MockServer, prefix: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path().starts_with(prefix))
        .map(|r| r.body_json::<Value>().unwrap())
        .collect()
}

/// Poll until the mock server has seen `count` sends.
pub async fn wait_for_sends(server: &MockServer, count: usize) {
    for _ in 0..200 {
        if sent_bodies(server).await.len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} sends");
}

/// Handle a message and wait for its dispatch; filtered messages are `Ignored`.
pub async fn dispatch(bot: &Bot, message: BotMessage) -> DispatchOutcome {
    match bot.handle(message) {
        Some(task) => task.await.unwrap(),
        None => DispatchOutcome::Ignored,
    }
}
