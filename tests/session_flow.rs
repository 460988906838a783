//! End-to-end session behaviour against a local WebSocket server

mod common;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use paint_bots::bot::{ConnectionState, RoomPhase, Session, SessionError};
use paint_bots::game::{Snapshot, Tile};
use paint_bots::strategy::Action;
use paint_bots::util::BotLog;
use paint_bots::ws::protocol::{Direction, MessageKind};
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};
use tokio_test::assert_ok;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use common::*;

const ROOM: &[u8; 4] = b"ROOM";

/// Poll until `check` yields a value, failing after a few seconds
async fn eventually<T>(mut check: impl FnMut() -> Option<T>) -> T {
    timeout(Duration::from_secs(5), async {
        loop {
            if let Some(value) = check() {
                return value;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}

/// Serve one client: greet, wait for its join, push a playing room, then
/// record every binary frame until the client closes
async fn serve_one_room(listener: TcpListener) -> Vec<Vec<u8>> {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = accept_async(stream).await.unwrap();
    ws.send(Message::Binary(connected(7, "seven"))).await.unwrap();

    let mut frames = Vec::new();
    while let Some(Ok(message)) = ws.next().await {
        match message {
            Message::Binary(frame) => {
                if frame.first() == Some(&MessageKind::Join.tag()) {
                    ws.send(Message::Binary(joined(ROOM))).await.unwrap();
                    ws.send(Message::Binary(empty_map(3, 2))).await.unwrap();
                    ws.send(Message::Binary(state_with_player(ROOM, PHASE_PLAYING, 7, 0.5, 0.5)))
                        .await
                        .unwrap();
                    ws.send(Message::Binary(shot(1, 0, 1))).await.unwrap();
                }
                frames.push(frame);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    frames
}

#[tokio::test]
async fn session_tracks_room_and_sends_actions() {
    let (listener, url) = listen().await;
    let server = tokio::spawn(serve_one_room(listener));

    let mut session = Session::open(1, url, BotLog::detached(1));
    assert_ok!(session.connect().await);
    assert_ok!(session.join("ROOM"));

    let snapshot: Snapshot = eventually(|| {
        session
            .snapshot()
            .filter(|s| s.map.get(1, 0) == Some(Tile::TeamA))
    })
    .await;

    assert_eq!(snapshot.id, 7);
    assert_eq!(snapshot.map.width(), 3);
    assert_eq!(snapshot.map.get(0, 0), Some(Tile::Empty));
    assert_eq!(snapshot.me().map(|p| p.username.as_str()), Some("bot7"));

    let status = eventually(|| Some(session.status()).filter(|s| s.is_playing())).await;
    assert_eq!(status.phase, RoomPhase::Playing);
    assert_eq!(status.room.map(|r| r.to_string()), Some("ROOM".to_string()));

    assert_ok!(session.switch_team());
    assert_ok!(session.select_weapon(2));
    assert_ok!(session.perform(Action::Move(Direction::Right)));
    assert_ok!(session.perform(Action::Look { x: 2, y: 1 }));
    assert_ok!(session.perform(Action::Idle));

    session.close().await;
    session.close().await;
    assert!(session.snapshot().is_none());

    let frames = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    let tags: Vec<u8> = frames.iter().map(|f| f[0]).collect();
    assert_eq!(
        tags,
        vec![
            MessageKind::Join.tag(),
            MessageKind::Team.tag(),
            MessageKind::Weapon.tag(),
            MessageKind::Move.tag(),
            MessageKind::Mouse.tag(),
            MessageKind::Leave.tag(),
        ]
    );
    assert_eq!(&frames[0][1..], b"ROOM");
    assert_eq!(frames[1].len(), 1);
    assert_eq!(&frames[2][1..], &[2]);
    assert_eq!(frames[3][1], Direction::Right.flag() | 1 << 4);
    assert_eq!(&frames[4][1..5], &2i32.to_le_bytes());
    assert_eq!(&frames[4][5..9], &1i32.to_le_bytes());
}

#[tokio::test]
async fn connect_to_closed_port_fails() {
    let (listener, url) = listen().await;
    drop(listener);

    let mut session = Session::open(2, url, BotLog::detached(2));
    let result = session.connect().await;
    assert!(matches!(result, Err(SessionError::Transport(_))), "{result:?}");
    assert!(matches!(
        session.status().connection,
        ConnectionState::Inactive { .. }
    ));
    assert!(matches!(
        session.perform(Action::Shoot),
        Err(SessionError::Transport(_))
    ));
    // Fire-and-forget intents stay silent once inactive
    assert_ok!(session.join("ROOM"));

    session.close().await;
    session.close().await;
}

#[tokio::test]
async fn server_close_makes_session_inactive() {
    let (listener, url) = listen().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        // Wait for the client to prove it is connected, then hang up
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Binary(frame) = message {
                assert_eq!(frame[0], MessageKind::Chat.tag());
                break;
            }
        }
        ws.close(None).await.unwrap();
    });

    let mut session = Session::open(3, url, BotLog::detached(3));
    assert_ok!(session.connect().await);
    assert_ok!(session.chat("hello"));

    let reason = eventually(|| match session.status().connection {
        ConnectionState::Inactive { reason } => Some(reason),
        _ => None,
    })
    .await;
    assert!(reason.contains("closed by server"), "{reason}");

    match session.perform(Action::Shoot) {
        Err(SessionError::Transport(r)) => assert_eq!(r, reason),
        other => panic!("unexpected {other:?}"),
    }

    session.close().await;
    server.await.unwrap();
}

#[tokio::test]
async fn close_while_connecting_is_safe() {
    // Accepts TCP but never completes the WebSocket handshake
    let (listener, url) = listen().await;
    let _hold = tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        sleep(Duration::from_secs(10)).await;
    });

    let mut session = Session::open(4, url, BotLog::detached(4));
    assert_eq!(session.status().connection, ConnectionState::Connecting);

    // Commands are refused until the handshake completes
    assert!(matches!(session.host(), Err(SessionError::NotActive)));
    assert!(matches!(session.start(), Err(SessionError::NotActive)));
    assert!(matches!(session.switch_team(), Err(SessionError::NotActive)));
    assert!(matches!(session.select_weapon(1), Err(SessionError::NotActive)));
    assert!(matches!(session.chat("hi"), Err(SessionError::NotActive)));
    assert!(matches!(session.perform(Action::Shoot), Err(SessionError::NotActive)));
    timeout(Duration::from_secs(2), session.close())
        .await
        .expect("close must not wait for the handshake");
    assert!(!session.status().is_active());
}
