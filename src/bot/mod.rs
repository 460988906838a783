//! Bots: a session plus a strategy, advanced once per tick

pub mod session;
pub mod state;

use tracing::{debug, warn};

use crate::strategy::{Action, Strategy};

pub use session::Session;
pub use state::{
    ConnectionState, Identity, RoomPhase, SessionError, SessionEvent, SessionState, SessionStatus,
};

/// One simulated player
pub struct Bot {
    id: u32,
    session: Session,
    strategy: Box<dyn Strategy>,
    reported_inactive: bool,
}

impl Bot {
    pub fn new(session: Session, strategy: Box<dyn Strategy>) -> Self {
        Self {
            id: session.bot_id(),
            session,
            strategy,
            reported_inactive: false,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> String {
        format!("Bot {}", self.id)
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run one decision if the bot is connected and its room is playing.
    ///
    /// Returns the action taken, or `None` when the bot sat the tick out.
    pub fn update(&mut self) -> Option<Action> {
        let status = self.session.status();
        if let ConnectionState::Inactive { reason } = &status.connection {
            if !self.reported_inactive {
                self.reported_inactive = true;
                warn!(bot_id = self.id, reason = %reason, "Bot inactive, skipping updates");
                self.session.log().line(format!("Inactive: {reason}"));
            }
            return None;
        }
        if !status.is_playing() {
            return None;
        }

        let snapshot = self.session.snapshot()?;
        let action = match self.strategy.decide(&snapshot) {
            Ok(action) => action,
            Err(e) => {
                debug!(bot_id = self.id, error = %e, "Decision failed, idling");
                self.session.log().line(format!("Error: {e}"));
                Action::Idle
            }
        };

        if let Err(e) = self.session.perform(action) {
            debug!(bot_id = self.id, error = %e, %action, "Action not sent");
            self.session.log().line(format!("Error: {e}"));
        }
        Some(action)
    }

    pub async fn close(&mut self) {
        self.session.close().await;
    }
}
