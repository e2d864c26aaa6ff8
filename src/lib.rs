//! Drive an interactive, line-oriented process through a pseudo-terminal
//! and assert on what it prints.
//!
//! The harness spawns a child with its standard streams attached to a PTY,
//! sends it input lines, and waits with a bounded timeout for output
//! matching literal or regex patterns. Scenarios compose those primitives
//! into ordered send/expect test cases with guaranteed child teardown.
//!
//! ```no_run
//! use ptydrive::{Scenario, ScenarioRunner, SpawnConfig};
//!
//! let spawn = SpawnConfig::new("sh").arg("my-shell-stub.sh");
//! let scenario = Scenario::new()
//!     .send("addDigits 18")
//!     .expect_literal("9");
//!
//! let report = ScenarioRunner::new(spawn).run(&scenario);
//! assert!(report.passed(), "{:?}", report.failure);
//! ```
//!
//! Plain strings always match as literals; regex semantics are opt-in via
//! [`Pattern::regex`]. A timed-out expectation and a child that exited
//! before producing output are distinct outcomes, so failures can tell
//! "hung" apart from "crashed".

pub mod error;
pub mod expect;
pub mod pty;
pub mod scenario;
pub mod sink;

pub use error::HarnessError;
pub use expect::{ExpectOutcome, Match, Pattern, PatternSet};
pub use pty::{PtySession, SpawnConfig};
pub use scenario::{Scenario, ScenarioConfig, ScenarioReport, ScenarioRunner};
pub use sink::Transcript;
