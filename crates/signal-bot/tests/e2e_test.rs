//! End-to-end tests: Signal messages through the dispatcher to a mock REST API.

mod common;

use async_trait::async_trait;
use chat_commands::{
    ArgumentInfo, Command, CommandArgs, CommandError, CommandInfo, CommandInvocation,
    DispatchOutcome, SentMessage,
};
use common::*;
use signal_bot::Bot;
use signal_client::SignalClient;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

struct RollCommand {
    info: CommandInfo,
}

impl RollCommand {
    fn new() -> Self {
        Self {
            info: CommandInfo::new("roll", "games", "Rolls a die.").arg(
                ArgumentInfo::new("sides", "How many sides?")
                    .of_type("integer")
                    .min(2.0),
            ),
        }
    }
}

#[async_trait]
impl Command for RollCommand {
    fn info(&self) -> &CommandInfo {
        &self.info
    }

    async fn run(
        &self,
        invocation: &CommandInvocation,
        args: CommandArgs,
        _from_pattern: bool,
    ) -> Result<Vec<SentMessage>, CommandError> {
        let sides = match &args {
            CommandArgs::Collected(values) => values.get("sides").and_then(|v| v.as_i64()),
            _ => None,
        }
        .unwrap_or_default();
        Ok(vec![invocation.reply(&format!("Rolled a d{sides}.")).await?])
    }
}

fn test_bot(server: &MockServer) -> Bot {
    let config = test_config(server);
    let signal = SignalClient::new(server.uri(), BOT_NUMBER).unwrap();
    Bot::new(&config, signal, vec![Arc::new(RollCommand::new())]).unwrap()
}

#[tokio::test]
async fn test_prefix_shows_current_prefix() {
    let server = mock_signal_server().await;
    let bot = test_bot(&server);

    let outcome = dispatch(&bot, direct_message(USER, "!prefix", 1_000)).await;
    assert!(matches!(outcome, DispatchOutcome::Executed(ref sent) if sent.len() == 1));

    let sent = sent_bodies(&server).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["recipients"][0], USER);
    assert_eq!(sent[0]["number"], BOT_NUMBER);
    let text = sent[0]["message"].as_str().unwrap();
    assert!(text.starts_with("The command prefix is `!`.\nTo run commands, use `!command`"));
    assert!(sent[0].get("quote_timestamp").is_none());
}

#[tokio::test]
async fn test_owner_changes_prefix() {
    let server = mock_signal_server().await;
    let bot = test_bot(&server);

    dispatch(&bot, direct_message(OWNER, "!prefix ?", 1_000)).await;
    dispatch(&bot, direct_message(USER, "?prefix", 2_000)).await;

    let sent = sent_bodies(&server).await;
    assert_eq!(sent.len(), 2);
    assert!(sent[0]["message"]
        .as_str()
        .unwrap()
        .starts_with("Set the command prefix to `?`."));
    // Replies in a direct chat are not quoted.
    assert!(sent[0].get("quote_timestamp").is_none());
    assert!(sent[1]["message"]
        .as_str()
        .unwrap()
        .starts_with("The command prefix is `?`."));
}

#[tokio::test]
async fn test_non_owner_cannot_change_prefix() {
    let server = mock_signal_server().await;
    let bot = test_bot(&server);

    dispatch(&bot, direct_message(USER, "!prefix ?", 1_000)).await;
    dispatch(&bot, direct_message(USER, "!prefix", 2_000)).await;

    let sent = sent_bodies(&server).await;
    assert_eq!(
        sent[0]["message"],
        "Only the bot owner may change the command prefix."
    );
    assert!(sent[1]["message"]
        .as_str()
        .unwrap()
        .starts_with("The command prefix is `!`."));
}

#[tokio::test]
async fn test_help_in_group_is_sent_privately() {
    let server = mock_signal_server().await;
    let bot = test_bot(&server);

    dispatch(&bot, group_message(USER, "group-1", "!help prefix", 1_000)).await;

    let sent = sent_bodies(&server).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0]["recipients"][0], USER);
    assert!(sent[0]["message"]
        .as_str()
        .unwrap()
        .starts_with("__Command **prefix**:__ Shows or sets the command prefix."));
    assert_eq!(sent[1]["recipients"][0], "group-1");
    assert_eq!(sent[1]["message"], "Sent you a DM with information.");
    assert_eq!(sent[1]["quote_timestamp"], 1_000);
    assert_eq!(sent[1]["quote_author"], USER);
}

#[tokio::test]
async fn test_missing_argument_is_prompted_for() {
    let server = mock_signal_server().await;
    let bot = test_bot(&server);

    let pending = bot.handle(direct_message(USER, "!roll", 1_000)).unwrap();
    wait_for_sends(&server, 1).await;
    // Let the collector start listening after the prompt went out.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The answer goes to the prompt and is never dispatched itself.
    assert!(bot.handle(direct_message(USER, "20", 2_000)).is_none());

    let outcome = pending.await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Executed(_)));

    let sent = sent_bodies(&server).await;
    assert_eq!(sent.len(), 2);
    assert!(sent[0]["message"]
        .as_str()
        .unwrap()
        .starts_with("How many sides?\nRespond with `cancel` to cancel the command."));
    assert_eq!(sent[1]["message"], "Rolled a d20.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_prompt_answers_never_run_as_commands() {
    let server = mock_signal_server().await;
    let bot = test_bot(&server);

    for round in 0..5i64 {
        let base = round * 10;
        let pending = bot
            .handle(direct_message(USER, "!roll", 1_000 + base))
            .unwrap();
        wait_for_sends(&server, (round as usize) * 2 + 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(bot
            .handle(direct_message(USER, "12", 2_000 + base))
            .is_none());
        assert!(matches!(
            pending.await.unwrap(),
            DispatchOutcome::Executed(_)
        ));
    }

    let sent = sent_bodies(&server).await;
    assert_eq!(sent.len(), 10);
    assert!(sent
        .iter()
        .all(|body| !body["message"].as_str().unwrap().starts_with("Unknown command")));
}

#[tokio::test]
async fn test_edited_command_edits_response() {
    let server = mock_signal_server().await;
    let bot = test_bot(&server);

    dispatch(&bot, direct_message(USER, "!prefix", 1_000)).await;
    let edit = edited(direct_message(USER, "!PREFIX", 2_000), 1_000);
    let outcome = dispatch(&bot, edit).await;
    assert!(matches!(outcome, DispatchOutcome::Executed(_)));

    let sent = sent_bodies(&server).await;
    assert_eq!(sent.len(), 2);
    assert!(sent[0].get("edit_timestamp").is_none());
    assert_eq!(sent[1]["edit_timestamp"], SENT_TIMESTAMP);
    assert_eq!(sent[1]["message"], sent[0]["message"]);
}

#[tokio::test]
async fn test_command_edited_into_text_deletes_response() {
    let server = mock_signal_server().await;
    let bot = test_bot(&server);

    dispatch(&bot, group_message(USER, "group-1", "!prefix", 1_000)).await;
    let edit = edited(group_message(USER, "group-1", "never mind", 2_000), 1_000);
    let outcome = dispatch(&bot, edit).await;
    assert!(matches!(outcome, DispatchOutcome::Ignored));

    let deleted = delete_bodies(&server).await;
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0]["recipient"], "group-1");
    assert_eq!(deleted[0]["timestamp"], SENT_TIMESTAMP);
    assert_eq!(sent_bodies(&server).await.len(), 1);
}

#[tokio::test]
async fn test_unknown_command_in_direct_message() {
    let server = mock_signal_server().await;
    let bot = test_bot(&server);

    let outcome = dispatch(&bot, direct_message(USER, "dance", 1_000)).await;
    assert!(matches!(outcome, DispatchOutcome::UnknownCommand));

    let sent = sent_bodies(&server).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0]["message"]
        .as_str()
        .unwrap()
        .starts_with("Unknown command."));
}
