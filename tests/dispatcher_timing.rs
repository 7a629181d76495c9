mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{RecordingBackend, dispatcher, drain};
use stickerbot::{DispatcherConfig, OutboundMessage, RecipientId};
use tokio::sync::watch;
use tokio::time::{Instant, sleep};

fn assert_at(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected {expected:?}, got {actual:?}"
    );
}

fn config(cooldown_ms: u64) -> DispatcherConfig {
    DispatcherConfig {
        cooldown: Duration::from_millis(cooldown_ms),
        tick_interval: Duration::from_secs(1),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn two_recipients_are_served_on_consecutive_ticks() {
    let backend = Arc::new(RecordingBackend::default());
    let (dispatcher, dispatch_loop, mut results) = dispatcher(backend.clone(), config(300), 17);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let start = Instant::now();
    let m1 = dispatcher.enqueue(OutboundMessage::text(RecipientId(1), "M1")).await.unwrap();
    let m2 = dispatcher.enqueue(OutboundMessage::text(RecipientId(2), "M2")).await.unwrap();
    let handle = tokio::spawn(dispatch_loop.run(shutdown_rx));

    sleep(Duration::from_millis(500)).await;
    assert!(drain(&mut results).is_empty());

    sleep(Duration::from_millis(600)).await;
    let first = drain(&mut results);
    assert_eq!(first.len(), 1);

    sleep(Duration::from_secs(1)).await;
    let second = drain(&mut results);
    assert_eq!(second.len(), 1);

    let mut tickets = [first[0].ticket, second[0].ticket];
    tickets.sort_by_key(|t| t.0);
    let mut expected = [m1, m2];
    expected.sort_by_key(|t| t.0);
    assert_eq!(tickets, expected);
    assert_ne!(first[0].recipient, second[0].recipient);

    let sent = backend.sent();
    assert_at(sent[0].at - start, Duration::from_secs(1));
    assert_at(sent[1].at - start, Duration::from_secs(2));

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn second_message_waits_for_the_next_tick_not_the_cooldown() {
    let backend = Arc::new(RecordingBackend::default());
    let (dispatcher, dispatch_loop, _results) = dispatcher(backend.clone(), config(300), 3);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let start = Instant::now();
    dispatcher.enqueue(OutboundMessage::text(RecipientId(1), "first")).await.unwrap();
    dispatcher.enqueue(OutboundMessage::text(RecipientId(1), "second")).await.unwrap();
    let handle = tokio::spawn(dispatch_loop.run(shutdown_rx));

    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(backend.sent().len(), 1);

    sleep(Duration::from_millis(1_000)).await;
    let sent = backend.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].text, "first");
    assert_eq!(sent[1].text, "second");
    assert_at(sent[0].at - start, Duration::from_secs(1));
    assert_at(sent[1].at - start, Duration::from_secs(2));

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn never_more_than_one_dispatch_per_interval() {
    let backend = Arc::new(RecordingBackend::default());
    let (dispatcher, dispatch_loop, _results) = dispatcher(backend.clone(), config(0), 8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    for recipient in 1..=10 {
        for n in 0..5 {
            dispatcher
                .enqueue(OutboundMessage::text(RecipientId(recipient), format!("{n}")))
                .await
                .unwrap();
        }
    }
    let handle = tokio::spawn(dispatch_loop.run(shutdown_rx));

    let window = Duration::from_millis(10_500);
    sleep(window).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    let sent = backend.sent();
    assert_eq!(sent.len(), 10);
    for pair in sent.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_secs(1));
    }
}

#[tokio::test(start_paused = true)]
async fn slow_sends_push_back_the_next_tick() {
    let backend = Arc::new(RecordingBackend::with_delay(Duration::from_millis(2_500)));
    let (dispatcher, dispatch_loop, _results) = dispatcher(backend.clone(), config(0), 4);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    for n in 0..10 {
        dispatcher
            .enqueue(OutboundMessage::text(RecipientId(n % 3), format!("{n}")))
            .await
            .unwrap();
    }
    let handle = tokio::spawn(dispatch_loop.run(shutdown_rx));

    sleep(Duration::from_secs(12)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    let sent = backend.sent();
    assert!(!sent.is_empty());
    assert!(sent.len() <= 12);
    for pair in sent.windows(2) {
        // a 2.5s send followed by a full interval before the next start
        assert!(pair[1].at - pair[0].at >= Duration::from_millis(3_500));
    }
}

#[tokio::test(start_paused = true)]
async fn shutdown_abandons_queued_messages() {
    let backend = Arc::new(RecordingBackend::default());
    let (dispatcher, dispatch_loop, mut results) = dispatcher(backend.clone(), config(300), 6);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    for n in 0..3 {
        dispatcher
            .enqueue(OutboundMessage::text(RecipientId(1), format!("{n}")))
            .await
            .unwrap();
    }
    let handle = tokio::spawn(dispatch_loop.run(shutdown_rx));

    sleep(Duration::from_millis(1_100)).await;
    drop(shutdown_tx);
    handle.await.unwrap();

    assert_eq!(drain(&mut results).len(), 1);
    assert_eq!(dispatcher.pending(RecipientId(1)).await, 2);
    // loop is gone, so the channel is closed
    assert!(results.recv().await.is_none());
}
