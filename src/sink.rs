//! Optional byte-level transcript of a session.
//!
//! When attached, every byte written to the child and every byte read back
//! is mirrored to the sink, interleaved in arrival order. The transcript is
//! purely observational: attaching one never changes harness behavior, and
//! a failing sink is noted once and then ignored rather than failing the
//! scenario it was meant to help debug.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

/// A shared, thread-safe mirror for session traffic.
///
/// Cloning is cheap; all clones write to the same underlying sink.
#[derive(Clone)]
pub struct Transcript {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Transcript {
    /// Mirror traffic into any writer.
    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Mirror traffic into a file, truncating any existing content.
    pub fn to_file(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::to_writer(File::create(path)?))
    }

    pub(crate) fn record(&self, bytes: &[u8]) {
        let mut sink = self.sink.lock();
        if let Err(err) = sink.write_all(bytes).and_then(|_| sink.flush()) {
            warn!(error = %err, "transcript sink write failed");
        }
    }
}

impl std::fmt::Debug for Transcript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcript").finish_non_exhaustive()
    }
}
