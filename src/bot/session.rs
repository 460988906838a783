//! Async session handle: owns the transport task and the shared state

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use url::Url;

use super::state::{ConnectionState, SessionError, SessionEvent, SessionState, SessionStatus};
use crate::game::snapshot::Snapshot;
use crate::strategy::Action;
use crate::util::bot_log::BotLog;
use crate::util::time::CLOSE_FLUSH_TIMEOUT;
use crate::ws::codec::{decode, encode};
use crate::ws::connection::{self, Outbound};
use crate::ws::protocol::{Message, RoomCode};

/// State shared between a [`Session`] and its transport task.
///
/// The mutex is held for one message application or one snapshot clone,
/// never across an await point.
pub(crate) struct SessionShared {
    bot_id: u32,
    state: Mutex<SessionState>,
    status: watch::Sender<SessionStatus>,
    log: BotLog,
}

impl SessionShared {
    fn new(bot_id: u32, log: BotLog) -> (Arc<Self>, watch::Receiver<SessionStatus>) {
        let state = SessionState::new();
        let (status, status_rx) = watch::channel(state.status());
        let shared = Arc::new(Self {
            bot_id,
            state: Mutex::new(state),
            status,
            log,
        });
        (shared, status_rx)
    }

    pub(crate) fn bot_id(&self) -> u32 {
        self.bot_id
    }

    /// Run `f` under the lock and publish the status if it changed.
    ///
    /// Publishing happens before the lock is released so concurrent writers
    /// cannot reorder status updates.
    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.lock();
        let result = f(&mut state);
        let status = state.status();
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        result
    }

    pub(crate) fn opened(&self) {
        if self.with_state(SessionState::on_open) {
            info!(bot_id = self.bot_id, "Connected");
            self.log.line("Connected");
        }
    }

    pub(crate) fn failed(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.with_state(|state| state.on_transport_error(reason.clone())) {
            warn!(bot_id = self.bot_id, reason = %reason, "Session inactive");
            self.log.line(format!("Error: {reason}"));
        }
    }

    /// Decode and apply one binary frame. Bad frames are logged and dropped.
    pub(crate) fn handle_frame(&self, frame: &[u8]) {
        let result = decode(frame)
            .map_err(SessionError::from)
            .and_then(|message| self.with_state(|state| state.apply(message)));

        match result {
            Ok(Some(event)) => self.log_event(event),
            Ok(None) => {}
            Err(e) => {
                warn!(bot_id = self.bot_id, error = %e, "Dropped inbound frame");
                self.log.line(format!("Error: {e}"));
            }
        }
    }

    pub(crate) fn handle_text(&self, text: &str) {
        debug!(bot_id = self.bot_id, len = text.len(), "Ignoring text frame");
        self.log.line(format!("Ignored text frame: {text}"));
    }

    fn log_event(&self, event: SessionEvent) {
        let bot_id = self.bot_id;
        match event {
            SessionEvent::IdentityBound(identity) => {
                info!(bot_id, player_id = identity.id, username = %identity.username, "Identity bound");
                self.log.line(format!("Playing as {}", identity.username));
            }
            SessionEvent::Hosted(room) => {
                info!(bot_id, room = %room, "Hosted room");
                self.log.line(format!("Hosted room {room}"));
            }
            SessionEvent::Joined(room) => {
                info!(bot_id, room = %room, "Joined room");
                self.log.line(format!("Joined room {room}"));
            }
            SessionEvent::Left => {
                info!(bot_id, "Left room");
                self.log.line("Left room");
            }
            SessionEvent::PhaseChanged { from, to } => {
                debug!(bot_id, ?from, ?to, "Room phase changed");
                self.log.line(format!("Phase {from:?} -> {to:?}"));
            }
            SessionEvent::MapReplaced { width, height } => {
                debug!(bot_id, width, height, "Map received");
            }
            SessionEvent::MapPatched { cells } => {
                trace!(bot_id, cells, "Map patched");
            }
            SessionEvent::Chat { from, message } => {
                self.log.line(format!("Chat from {from}: {message}"));
            }
            SessionEvent::System { kind, message } => {
                self.log.line(format!("System ({kind:?}): {message}"));
            }
            SessionEvent::ServerError(message) => {
                warn!(bot_id, message = %message, "Server error");
                self.log.line(format!("Error: {message}"));
            }
        }
    }
}

/// One bot's connection to the game server.
///
/// Created with [`Session::open`], which spawns the transport task right
/// away. Must be created inside a tokio runtime.
pub struct Session {
    shared: Arc<SessionShared>,
    status_rx: watch::Receiver<SessionStatus>,
    outbound: mpsc::UnboundedSender<Outbound>,
    task: Option<JoinHandle<()>>,
}

impl Session {
    pub fn open(bot_id: u32, url: Url, log: BotLog) -> Self {
        let (shared, status_rx) = SessionShared::new(bot_id, log);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        shared.log.line("Connecting...");
        debug!(bot_id, url = %url, "Opening session");
        let task = tokio::spawn(connection::run(url, Arc::clone(&shared), outbound_rx));

        Self {
            shared,
            status_rx,
            outbound,
            task: Some(task),
        }
    }

    pub fn bot_id(&self) -> u32 {
        self.shared.bot_id
    }

    pub fn log(&self) -> &BotLog {
        &self.shared.log
    }

    /// Wait until the socket is open or has failed
    pub async fn connect(&self) -> Result<(), SessionError> {
        let mut status_rx = self.status_rx.clone();
        let status = status_rx
            .wait_for(|status| status.connection != ConnectionState::Connecting)
            .await
            .map_err(|_| SessionError::Transport("session dropped".to_string()))?
            .clone();

        match status.connection {
            ConnectionState::Active => Ok(()),
            ConnectionState::Inactive { reason } => Err(SessionError::Transport(reason)),
            ConnectionState::Connecting => Err(SessionError::NotActive),
        }
    }

    /// Ask to join `room`. Ignored unless connected and outside a room.
    pub fn join(&self, room: &str) -> Result<(), SessionError> {
        let status = self.status();
        if !status.is_active() {
            return Ok(());
        }
        if status.in_room() {
            self.shared.log.line("Asked to join while in room");
            return Ok(());
        }
        let room = RoomCode::new(room);
        self.send(&Message::Join { room })?;
        self.shared.log.line(format!("Sent join {room}"));
        Ok(())
    }

    /// Ask to leave the current room. Ignored unless in one.
    pub fn leave(&self) -> Result<(), SessionError> {
        let status = self.status();
        if !status.is_active() {
            return Ok(());
        }
        if !status.in_room() {
            self.shared.log.line("Asked to leave while idle");
            return Ok(());
        }
        self.send(&Message::Leave)?;
        self.shared.log.line("Sent leave");
        Ok(())
    }

    pub fn host(&self) -> Result<(), SessionError> {
        self.send(&Message::Host)?;
        self.shared.log.line("Sent host");
        Ok(())
    }

    pub fn start(&self) -> Result<(), SessionError> {
        self.send(&Message::Start)?;
        self.shared.log.line("Sent start");
        Ok(())
    }

    pub fn switch_team(&self) -> Result<(), SessionError> {
        self.send(&Message::Team)
    }

    pub fn select_weapon(&self, weapon: u8) -> Result<(), SessionError> {
        self.send(&Message::Weapon { weapon })
    }

    pub fn chat(&self, message: impl Into<String>) -> Result<(), SessionError> {
        self.send(&Message::Chat {
            message: message.into(),
        })
    }

    /// Wait until the server has put this bot in a room
    pub async fn wait_for_room(&self, timeout: Duration) -> Option<RoomCode> {
        let mut status_rx = self.status_rx.clone();
        let wait = status_rx.wait_for(|status| {
            status.room.is_some() || matches!(status.connection, ConnectionState::Inactive { .. })
        });
        let room = match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(status)) => status.room,
            _ => None,
        };
        room
    }

    /// Translate a strategy action into wire commands
    pub fn perform(&self, action: Action) -> Result<(), SessionError> {
        let message = match action {
            Action::Move(direction) => Message::Move {
                direction,
                pressed: true,
            },
            Action::Stop(direction) => Message::Move {
                direction,
                pressed: false,
            },
            Action::Shoot => Message::Shoot,
            Action::Look { x, y } => Message::Mouse { x, y },
            Action::Idle => return Ok(()),
        };
        self.send(&message)
    }

    /// Consistent read view for the decision layer
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.shared.state.lock().snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        self.status_rx.borrow().clone()
    }

    /// Tear the session down. Safe in any state; only the first call acts.
    pub async fn close(&mut self) {
        let Some(mut task) = self.task.take() else {
            return;
        };

        let status = self.status();
        if status.is_active() && status.in_room() {
            if let Err(e) = self.leave() {
                debug!(bot_id = self.shared.bot_id, error = %e, "Leave on close failed");
            }
        }

        if status.connection == ConnectionState::Connecting {
            task.abort();
        } else {
            let _ = self.outbound.send(Outbound::Close);
            if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut task).await.is_err() {
                task.abort();
            }
        }

        self.shared.with_state(|state| {
            state.on_transport_error("closed");
            state.clear_world();
        });
        self.shared.log.close();
        debug!(bot_id = self.shared.bot_id, "Session closed");
    }

    fn send(&self, message: &Message) -> Result<(), SessionError> {
        self.ensure_active()?;
        let frame = encode(message)?;
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| SessionError::Transport("transport task stopped".to_string()))
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        match self.shared.state.lock().connection() {
            ConnectionState::Active => Ok(()),
            ConnectionState::Inactive { reason } => Err(SessionError::Transport(reason.clone())),
            ConnectionState::Connecting => Err(SessionError::NotActive),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_status_tracks_state_under_racing_writers() {
        for round in 0..200 {
            let (shared, status_rx) = SessionShared::new(round, BotLog::detached(round));
            let opener = {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || shared.opened())
            };
            let closer = {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || shared.failed("closed"))
            };
            opener.join().unwrap();
            closer.join().unwrap();

            let published = status_rx.borrow().clone();
            assert_eq!(published, shared.state.lock().status(), "round {round}");
            assert!(matches!(published.connection, ConnectionState::Inactive { .. }));
        }
    }
}
