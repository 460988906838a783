//! Per-bot append-only log sink

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Line-oriented log for a single bot.
///
/// Lines go to `<dir>/<bot_id>.log` when a directory is configured and are
/// always mirrored as tracing events carrying `bot_id`. Cloning shares the
/// same file.
#[derive(Clone)]
pub struct BotLog {
    bot_id: u32,
    inner: Arc<Mutex<LogSink>>,
}

struct LogSink {
    file: Option<File>,
    closed: bool,
}

impl LogSink {
    fn new(file: Option<File>) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            file,
            closed: false,
        }))
    }
}

impl BotLog {
    /// Create (or truncate) the bot's log file
    pub fn create(bot_id: u32, dir: Option<&Path>) -> io::Result<Self> {
        let file = match dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                Some(File::create(Self::path_in(dir, bot_id))?)
            }
            None => None,
        };
        Ok(Self {
            bot_id,
            inner: LogSink::new(file),
        })
    }

    /// Tracing-only log
    pub fn detached(bot_id: u32) -> Self {
        Self {
            bot_id,
            inner: LogSink::new(None),
        }
    }

    pub fn path_in(dir: &Path, bot_id: u32) -> PathBuf {
        dir.join(format!("{bot_id}.log"))
    }

    pub fn bot_id(&self) -> u32 {
        self.bot_id
    }

    /// Append one line
    pub fn line(&self, line: impl AsRef<str>) {
        let line = line.as_ref();
        debug!(bot_id = self.bot_id, "{}", line);

        let mut sink = self.inner.lock();
        let failed = match sink.file.as_mut() {
            Some(file) => writeln!(file, "{line}").err(),
            None => None,
        };
        if let Some(e) = failed {
            warn!(bot_id = self.bot_id, error = %e, "Failed to write bot log, detaching file");
            sink.file = None;
        }
    }

    /// Write the final line and release the file. Later calls are no-ops.
    pub fn close(&self) -> bool {
        let mut sink = self.inner.lock();
        if sink.closed {
            return false;
        }
        sink.closed = true;
        debug!(bot_id = self.bot_id, "Closed");
        if let Some(mut file) = sink.file.take() {
            let _ = writeln!(file, "Closed");
            let _ = file.flush();
        }
        true
    }
}
