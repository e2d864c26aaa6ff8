use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use portable_pty::{native_pty_system, Child, ExitStatus, MasterPty};
use tracing::{debug, trace};

use crate::error::HarnessError;
use crate::pty::spawn_config::SpawnConfig;
use crate::sink::Transcript;

/// Default per-expectation timeout applied to every session.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `terminate` waits between SIGTERM and escalation.
const TERMINATE_GRACE: Duration = Duration::from_millis(500);
const REAP_POLL: Duration = Duration::from_millis(20);

/// Lifecycle of a session handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Spawned, no traffic yet.
    Spawned,
    /// At least one send or read has happened.
    Running,
    /// Child reaped, terminal released.
    Terminated,
}

/// Result of one deadline-bounded read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEvent {
    /// This many bytes were appended to the session buffer.
    Data(usize),
    /// The child closed its output; the buffer holds everything it wrote.
    Eof,
    /// The deadline passed with nothing to read.
    Idle,
}

/// Bytes arriving from the reader thread, waiting to be claimed by
/// `read_available`.
struct Inbox {
    state: Mutex<InboxState>,
    cond: Condvar,
}

#[derive(Default)]
struct InboxState {
    data: Vec<u8>,
    eof: bool,
}

/// A child process attached to a pseudo-terminal.
///
/// Owns the PTY master, the child handle, a reader thread continuously
/// draining the master (so the child never blocks on a full terminal
/// buffer), and the accumulated output buffer that expectations match
/// against. Exactly one scenario owns a session at a time.
pub struct PtySession {
    child: Box<dyn Child + Send + Sync>,
    master: Option<Box<dyn MasterPty + Send>>,
    writer: Option<Box<dyn Write + Send>>,
    inbox: Arc<Inbox>,
    reader_handle: Option<thread::JoinHandle<()>>,
    buffer: Vec<u8>,
    default_timeout: Duration,
    transcript: Option<Transcript>,
    state: SessionState,
    exit_status: Option<ExitStatus>,
}

impl PtySession {
    pub fn spawn(config: &SpawnConfig) -> Result<Self, HarnessError> {
        Self::spawn_with_transcript(config, None)
    }

    /// Spawn with an optional transcript mirroring all traffic.
    pub fn spawn_with_transcript(
        config: &SpawnConfig,
        transcript: Option<Transcript>,
    ) -> Result<Self, HarnessError> {
        let spawn_err = |source: anyhow::Error| HarnessError::Spawn {
            command: config.command().to_string(),
            source: source.into(),
        };

        let pty_system = native_pty_system();
        let pair = pty_system.openpty(config.pty_size()).map_err(spawn_err)?;

        let child = pair
            .slave
            .spawn_command(config.command_builder())
            .map_err(spawn_err)?;
        drop(pair.slave);

        let reader = pair.master.try_clone_reader().map_err(spawn_err)?;
        let writer = pair.master.take_writer().map_err(spawn_err)?;

        let inbox = Arc::new(Inbox {
            state: Mutex::new(InboxState::default()),
            cond: Condvar::new(),
        });

        let reader_inbox = Arc::clone(&inbox);
        let reader_transcript = transcript.clone();
        let reader_handle = thread::spawn(move || {
            let mut reader = reader;
            let mut chunk = [0u8; 8192];
            loop {
                let count = match reader.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(count) => count,
                    Err(_) => break,
                };
                if let Some(transcript) = &reader_transcript {
                    transcript.record(&chunk[..count]);
                }
                let mut state = reader_inbox.state.lock();
                state.data.extend_from_slice(&chunk[..count]);
                reader_inbox.cond.notify_all();
            }
            let mut state = reader_inbox.state.lock();
            state.eof = true;
            reader_inbox.cond.notify_all();
        });

        debug!(command = config.command(), "spawned child on pty");

        Ok(Self {
            child,
            master: Some(pair.master),
            writer: Some(writer),
            inbox,
            reader_handle: Some(reader_handle),
            buffer: Vec::new(),
            default_timeout: DEFAULT_TIMEOUT,
            transcript,
            state: SessionState::Spawned,
            exit_status: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Default timeout applied by expectations that don't override it.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.default_timeout = timeout;
    }

    /// Output accumulated so far and not yet consumed by a match.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard buffered output up to `end` (exclusive).
    pub(crate) fn consume(&mut self, end: usize) {
        self.buffer.drain(..end);
    }

    /// Discard and return all buffered output.
    pub fn drain_buffer(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Write `text` plus a newline to the child's terminal.
    pub fn send_line(&mut self, text: &str) -> Result<(), HarnessError> {
        self.mark_running();
        let io_err = |source| HarnessError::Io {
            operation: "send_line",
            source,
        };
        let writer = self.writer.as_mut().ok_or_else(|| {
            io_err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "pty writer closed",
            ))
        })?;
        writer.write_all(text.as_bytes()).map_err(io_err)?;
        writer.write_all(b"\n").map_err(io_err)?;
        writer.flush().map_err(io_err)?;
        if let Some(transcript) = &self.transcript {
            transcript.record(text.as_bytes());
            transcript.record(b"\n");
        }
        trace!(line = text, "sent line");
        Ok(())
    }

    /// Move any bytes the reader thread has collected into the session
    /// buffer, waiting at most until `deadline`.
    ///
    /// Never blocks past `deadline`. `Eof` is only reported once all data
    /// that arrived before closure has been claimed.
    pub fn read_available(&mut self, deadline: Instant) -> Result<ReadEvent, HarnessError> {
        self.mark_running();
        loop {
            let mut state = self.inbox.state.lock();
            if !state.data.is_empty() {
                let bytes = std::mem::take(&mut state.data);
                drop(state);
                self.buffer.extend_from_slice(&bytes);
                trace!(count = bytes.len(), "buffered child output");
                return Ok(ReadEvent::Data(bytes.len()));
            }
            if state.eof {
                return Ok(ReadEvent::Eof);
            }
            if Instant::now() >= deadline {
                return Ok(ReadEvent::Idle);
            }
            let _ = self.inbox.cond.wait_until(&mut state, deadline);
        }
    }

    /// Terminate the child: SIGTERM first, escalating to SIGKILL after a
    /// short grace period when `force` is set. Reaps the child, joins the
    /// reader thread and releases the terminal. Calling this on an
    /// already terminated session is a no-op.
    pub fn terminate(&mut self, force: bool) -> Result<(), HarnessError> {
        if self.state == SessionState::Terminated {
            return Ok(());
        }
        // Writer goes first so the child sees EOF before any signal.
        self.writer = None;

        if self.try_reap()?.is_none() {
            #[cfg(unix)]
            if let Some(pid) = self.child.process_id() {
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGTERM);
                }
            }
            let grace_deadline = Instant::now() + TERMINATE_GRACE;
            while self.try_reap()?.is_none() {
                if Instant::now() >= grace_deadline {
                    break;
                }
                thread::sleep(REAP_POLL);
            }
            if self.exit_status.is_none() {
                if !force {
                    // Caller declined escalation; leave the child running
                    // so a later forced terminate can finish the job.
                    return Ok(());
                }
                self.child.kill().map_err(|source| HarnessError::Io {
                    operation: "kill",
                    source,
                })?;
                let status = self.child.wait().map_err(|source| HarnessError::Io {
                    operation: "wait",
                    source,
                })?;
                self.exit_status = Some(status);
            }
        }

        self.state = SessionState::Terminated;
        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.join();
        }
        self.master = None;
        debug!(status = ?self.exit_status, "session terminated");
        Ok(())
    }

    /// Exit status observed when the child was reaped, if it has been.
    pub fn exit_status(&self) -> Option<&ExitStatus> {
        self.exit_status.as_ref()
    }

    pub fn exit_code(&self) -> Option<u32> {
        self.exit_status.as_ref().map(|status| status.exit_code())
    }

    fn mark_running(&mut self) {
        if self.state == SessionState::Spawned {
            self.state = SessionState::Running;
        }
    }

    fn try_reap(&mut self) -> Result<Option<&ExitStatus>, HarnessError> {
        if self.exit_status.is_none() {
            let reaped = self.child.try_wait().map_err(|source| HarnessError::Io {
                operation: "try_wait",
                source,
            })?;
            if let Some(status) = reaped {
                self.exit_status = Some(status);
            }
        }
        Ok(self.exit_status.as_ref())
    }
}

impl Drop for PtySession {
    fn drop(&mut self) {
        if self.state != SessionState::Terminated {
            let _ = self.terminate(true);
        }
    }
}
