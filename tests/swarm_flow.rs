//! Whole-swarm run against a fake room server

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures::{SinkExt, StreamExt};
use paint_bots::app;
use paint_bots::config::Config;
use paint_bots::util::time::SETTLE_DELAY;
use paint_bots::ws::protocol::MessageKind;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{accept_async, tungstenite::Message};

use common::*;

const ROOM: &[u8; 4] = b"SWRM";

#[derive(Default)]
struct Counters {
    hosts: AtomicUsize,
    joins: AtomicUsize,
    starts: AtomicUsize,
    actions: AtomicUsize,
    leaves: AtomicUsize,
}

/// One connection: the client gets id `id`, and hosting or joining puts it
/// straight into a playing room of its own
async fn serve_client(stream: TcpStream, id: i16, counters: Arc<Counters>) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };
    if ws.send(Message::Binary(connected(id, "bot"))).await.is_err() {
        return;
    }

    while let Some(Ok(message)) = ws.next().await {
        let Message::Binary(frame) = message else {
            continue;
        };
        let Some(kind) = frame.first().and_then(|&tag| MessageKind::from_u8(tag)) else {
            continue;
        };

        let entered = match kind {
            MessageKind::Host => {
                counters.hosts.fetch_add(1, Ordering::SeqCst);
                Some(hosted(ROOM))
            }
            MessageKind::Join => {
                assert_eq!(&frame[1..], ROOM);
                counters.joins.fetch_add(1, Ordering::SeqCst);
                Some(joined(ROOM))
            }
            MessageKind::Start => {
                counters.starts.fetch_add(1, Ordering::SeqCst);
                None
            }
            MessageKind::Leave => {
                counters.leaves.fetch_add(1, Ordering::SeqCst);
                None
            }
            MessageKind::Move | MessageKind::Mouse | MessageKind::Shoot => {
                counters.actions.fetch_add(1, Ordering::SeqCst);
                None
            }
            _ => None,
        };

        if let Some(reply) = entered {
            let frames = [
                reply,
                empty_map(3, 3),
                state_with_player(ROOM, PHASE_PLAYING, id, 1.5, 1.5),
            ];
            for frame in frames {
                if ws.send(Message::Binary(frame)).await.is_err() {
                    return;
                }
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hosted_swarm_plays_until_shutdown() {
    let (listener, url) = listen().await;
    let counters = Arc::new(Counters::default());

    let server_counters = Arc::clone(&counters);
    tokio::spawn(async move {
        let mut next_id = 1;
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve_client(stream, next_id, Arc::clone(&server_counters)));
            next_id += 1;
        }
    });

    let config = Config::try_parse_from([
        "paint-bots",
        "--url",
        url.as_str(),
        "--amount",
        "3",
        "--start",
        "--strategy",
        "easy",
        "--tick-rate",
        "50",
        "--seed",
        "5",
        "--no-log-files",
    ])
    .unwrap();
    config.validate().unwrap();

    let shutdown = sleep(SETTLE_DELAY + Duration::from_millis(600));
    let stats = timeout(Duration::from_secs(10), app::run(&config, shutdown))
        .await
        .expect("swarm did not stop")
        .unwrap();

    assert!(stats.ticks > 0, "{stats:?}");
    assert!(stats.actions > 0, "{stats:?}");

    // Let the server drain the final frames
    sleep(Duration::from_millis(100)).await;
    assert_eq!(counters.hosts.load(Ordering::SeqCst), 1);
    assert_eq!(counters.joins.load(Ordering::SeqCst), 2);
    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    assert_eq!(counters.leaves.load(Ordering::SeqCst), 3);
    assert!(counters.actions.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn swarm_fails_when_server_is_down() {
    let (listener, url) = listen().await;
    drop(listener);

    let config = Config::try_parse_from([
        "paint-bots",
        "--url",
        url.as_str(),
        "--amount",
        "2",
        "--no-log-files",
    ])
    .unwrap();

    let result = timeout(
        Duration::from_secs(10),
        app::run(&config, std::future::pending()),
    )
    .await
    .expect("swarm did not give up");
    let err = result.unwrap_err();
    assert!(err.to_string().contains("failed to connect"), "{err}");
}
