// ABOUTME: End-to-end routing tests for the Dispatcher with mock chat and inference
// ABOUTME: Verifies command handling, conversation turns, and ledger bookkeeping

use lmgram_core::messages;
use lmgram_core::testing::{MockChat, MockInference};
use lmgram_core::{
    ChatId, Dispatcher, IncomingMessage, InferenceError, MessageId, SessionStore, Turn, UserId,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    chat: Arc<MockChat>,
    inference: Arc<MockInference>,
    store: SessionStore,
    dispatcher: Dispatcher,
}

fn harness(inference: MockInference) -> Harness {
    let chat = Arc::new(MockChat::new());
    let inference = Arc::new(inference);
    let store = SessionStore::new();
    let dispatcher = Dispatcher::new(store.clone(), chat.clone(), inference.clone());
    Harness {
        chat,
        inference,
        store,
        dispatcher,
    }
}

fn incoming(user: &str, message_id: &str, body: &str) -> IncomingMessage {
    IncomingMessage {
        user: UserId::new(user),
        chat: ChatId::new(user),
        message_id: MessageId::new(message_id),
        body: body.to_string(),
    }
}

#[tokio::test]
async fn test_hello_scenario() {
    let h = harness(MockInference::new().respond("hi"));
    let user = UserId::new("1");

    h.dispatcher.dispatch(incoming("1", "10", "hello")).await;

    assert_eq!(
        h.store.transcript(&user),
        vec![Turn::user("hello"), Turn::assistant("hi")]
    );
    let reply = h.chat.last_sent().unwrap();
    assert_eq!(reply.text, "hi");
    assert_eq!(reply.chat, ChatId::new("1"));
    // inbound id first, then the bot's reply
    assert_eq!(h.store.ledger(&user), vec![MessageId::new("10"), reply.id]);
    assert_eq!(h.chat.typing_count(), 1);
}

#[tokio::test]
async fn test_inference_failure_sends_apology_and_ledgers_it() {
    let h = harness(MockInference::new().fail(InferenceError::Http {
        status: 503,
        body: "loading model".into(),
    }));
    let user = UserId::new("1");

    h.dispatcher.dispatch(incoming("1", "10", "hello")).await;

    assert_eq!(h.store.transcript(&user), vec![Turn::user("hello")]);
    let apology = h.chat.last_sent().unwrap();
    assert_eq!(apology.text, messages::INFERENCE_FAILED);
    assert_eq!(h.store.ledger(&user), vec![MessageId::new("10"), apology.id]);
}

#[tokio::test]
async fn test_start_sends_help_and_records_both_ids() {
    let h = harness(MockInference::new());
    let user = UserId::new("1");

    h.dispatcher.dispatch(incoming("1", "3", "/start")).await;

    let help = h.chat.last_sent().unwrap();
    assert_eq!(help.text, messages::HELP_TEXT);
    assert_eq!(h.store.ledger(&user), vec![MessageId::new("3"), help.id]);
    assert!(h.inference.requests().is_empty());
}

#[tokio::test]
async fn test_clear_resets_transcript_but_keeps_ledger() {
    let h = harness(MockInference::new().respond("hi").respond("fresh"));
    let user = UserId::new("1");

    h.dispatcher.dispatch(incoming("1", "10", "hello")).await;
    h.dispatcher.dispatch(incoming("1", "12", "/clear")).await;

    assert!(h.store.transcript(&user).is_empty());
    assert_eq!(h.chat.last_sent().unwrap().text, messages::CONTEXT_CLEARED);
    // hello, reply, /clear, confirmation
    assert_eq!(h.store.ledger(&user).len(), 4);

    h.dispatcher.dispatch(incoming("1", "14", "again")).await;
    assert_eq!(h.inference.requests()[1], vec![Turn::user("again")]);
}

#[tokio::test]
async fn test_purge_deletes_everything_including_the_command() {
    let h = harness(MockInference::new().respond("hi"));
    let user = UserId::new("1");

    h.dispatcher.dispatch(incoming("1", "10", "hello")).await;
    let reply_id = h.chat.last_sent().unwrap().id;
    h.dispatcher.dispatch(incoming("1", "12", "/del_message")).await;

    assert_eq!(
        h.chat.deletions(),
        vec![MessageId::new("10"), reply_id, MessageId::new("12")]
    );
    let confirmation = h.chat.last_sent().unwrap();
    assert_eq!(confirmation.text, messages::PURGE_CONFIRMED);
    assert_eq!(h.store.ledger(&user), vec![confirmation.id]);
    assert_eq!(h.store.transcript(&user).len(), 2);
}

#[tokio::test]
async fn test_purge_with_only_the_command_deletes_the_command() {
    let h = harness(MockInference::new());

    h.dispatcher.dispatch(incoming("1", "5", "/del_message")).await;

    // The command's own id is ledgered first, so there is always
    // something to delete when the command arrives as a message.
    assert_eq!(h.chat.deletions(), vec![MessageId::new("5")]);
    assert_eq!(h.chat.last_sent().unwrap().text, messages::PURGE_CONFIRMED);
}

#[tokio::test]
async fn test_purge_failure_sends_permission_hint() {
    let h = harness(MockInference::new());
    let user = UserId::new("1");
    h.store.record_message_id(&user, MessageId::new("9"));
    // The confirmation fails, the hint that follows goes through
    h.chat.fail_next_sends(1);

    h.dispatcher.dispatch(incoming("1", "10", "/del_message")).await;

    assert_eq!(h.chat.deletions(), vec![MessageId::new("9"), MessageId::new("10")]);
    let hint = h.chat.last_sent().unwrap();
    assert_eq!(hint.text, messages::PURGE_FAILED);
    assert_eq!(h.chat.sent().len(), 1);
    assert_eq!(h.store.ledger(&user), vec![hint.id]);
}

#[tokio::test]
async fn test_purge_with_every_send_failing_ledgers_nothing() {
    let h = harness(MockInference::new());
    let user = UserId::new("1");
    h.store.record_message_id(&user, MessageId::new("9"));
    h.chat.fail_sends(true);

    h.dispatcher.dispatch(incoming("1", "10", "/del_message")).await;

    assert!(h.chat.sent().is_empty());
    assert!(h.store.ledger(&user).is_empty());

    h.chat.fail_sends(false);
    h.store.record_message_id(&user, MessageId::new("20"));
    h.dispatcher.dispatch(incoming("1", "21", "/purge")).await;
    assert_eq!(h.chat.last_sent().unwrap().text, messages::PURGE_CONFIRMED);
}

#[tokio::test]
async fn test_partially_sent_reply_keeps_delivered_ids() {
    let h = harness(MockInference::new().respond("part one\npart two\npart three"));
    let user = UserId::new("1");
    h.chat.split_lines(true);
    h.chat.fail_after(1);

    h.dispatcher.dispatch(incoming("1", "10", "hello")).await;

    assert_eq!(h.chat.sent_texts(), vec!["part one"]);
    let delivered = h.chat.last_sent().unwrap().id;
    assert_eq!(h.store.ledger(&user), vec![MessageId::new("10"), delivered]);
    // The turn itself succeeded
    assert_eq!(h.store.transcript(&user).len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_clear_waits_for_in_flight_turn() {
    let inference = MockInference::new()
        .respond("late reply")
        .delay(Duration::from_millis(300));
    let h = Arc::new(harness(inference));
    let user = UserId::new("1");

    let turn = {
        let h = Arc::clone(&h);
        tokio::spawn(async move {
            h.dispatcher.dispatch(incoming("1", "10", "hello")).await;
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.dispatcher.dispatch(incoming("1", "11", "/clear")).await;
    turn.await.unwrap();

    // The reply landed before the clear, not as an orphan after it
    assert!(h.store.transcript(&user).is_empty());
    assert_eq!(h.store.ledger(&user).len(), 4);

    h.inference.push(Ok("fresh".to_string()));
    h.dispatcher.dispatch(incoming("1", "12", "again")).await;
    assert_eq!(h.inference.requests().last().unwrap(), &vec![Turn::user("again")]);
    assert_eq!(
        h.store.transcript(&user),
        vec![Turn::user("again"), Turn::assistant("fresh")]
    );
}

#[tokio::test]
async fn test_unknown_command_is_ledgered_but_not_answered() {
    let h = harness(MockInference::new());
    let user = UserId::new("1");

    h.dispatcher.dispatch(incoming("1", "8", "/weather")).await;

    assert!(h.chat.sent().is_empty());
    assert!(h.inference.requests().is_empty());
    assert_eq!(h.store.ledger(&user), vec![MessageId::new("8")]);
}

#[tokio::test]
async fn test_send_failure_does_not_poison_session() {
    let h = harness(MockInference::new().respond("lost").respond("delivered"));
    let user = UserId::new("1");
    h.chat.fail_sends(true);

    h.dispatcher.dispatch(incoming("1", "10", "one")).await;
    assert_eq!(h.store.ledger(&user), vec![MessageId::new("10")]);

    h.chat.fail_sends(false);
    h.dispatcher.dispatch(incoming("1", "11", "two")).await;
    assert_eq!(h.chat.last_sent().unwrap().text, "delivered");
    assert_eq!(h.store.transcript(&user).len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_users_do_not_share_state() {
    let inference = MockInference::new();
    for i in 0..20 {
        inference.push(Ok(format!("reply {i}")));
    }
    let h = Arc::new(harness(inference));

    let mut tasks = Vec::new();
    for user in 0..20 {
        let h = Arc::clone(&h);
        tasks.push(tokio::spawn(async move {
            let user_id = user.to_string();
            h.dispatcher
                .dispatch(incoming(&user_id, &format!("{user}00"), "hello"))
                .await;
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    assert_eq!(h.store.user_count(), 20);
    for user in 0..20 {
        let user = UserId::new(user.to_string());
        let transcript = h.store.transcript(&user);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0], Turn::user("hello"));
        assert_eq!(h.store.ledger(&user).len(), 2);
    }
}
