//! The expectation loop: read, match, repeat until matched, timed out or
//! the child closes its stream.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::HarnessError;
use crate::expect::matcher::{search, Match};
use crate::expect::pattern::PatternSet;
use crate::pty::{PtySession, ReadEvent};

/// How one expectation resolved.
///
/// `TimedOut` and `Closed` are ordinary, assertable outcomes; a caller
/// that wants them to fail the test converts them itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectOutcome {
    /// A pattern matched; the buffer was consumed through the end of the
    /// match, so the next expectation starts right after it.
    Matched(Match),
    /// The time budget elapsed with no match.
    TimedOut,
    /// The child closed its output stream with no match.
    Closed,
}

/// Wait until one of `patterns` appears in the session's output.
///
/// Starts by scanning output already buffered, then alternates reads and
/// scans. Total wall-clock time is bounded by `timeout` (falling back to
/// the session's default timeout policy).
pub fn expect(
    session: &mut PtySession,
    patterns: &PatternSet,
    timeout: Option<Duration>,
) -> Result<ExpectOutcome, HarnessError> {
    let budget = timeout.unwrap_or_else(|| session.default_timeout());
    let deadline = Instant::now() + budget;
    loop {
        if let Some(found) = search(session.buffer(), patterns) {
            trace!(index = found.index, offset = found.start, "pattern matched");
            session.consume(found.end);
            return Ok(ExpectOutcome::Matched(found));
        }
        match session.read_available(deadline)? {
            ReadEvent::Data(_) => continue,
            ReadEvent::Eof => {
                debug!(expected = %patterns.describe(), "stream closed before match");
                return Ok(ExpectOutcome::Closed);
            }
            ReadEvent::Idle => {
                debug!(expected = %patterns.describe(), ?budget, "expectation timed out");
                return Ok(ExpectOutcome::TimedOut);
            }
        }
    }
}
