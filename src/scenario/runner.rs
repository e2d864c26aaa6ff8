//! Scenario execution: an ordered list of send/expect steps driven
//! against one child process, with unconditional teardown.

use std::time::Duration;

use scopeguard::guard;
use tracing::{debug, info, warn};

use crate::error::HarnessError;
use crate::expect::{self, ExpectOutcome, Pattern, PatternSet};
use crate::pty::{PtySession, SpawnConfig, DEFAULT_TIMEOUT};
use crate::sink::Transcript;

/// One step of a scenario.
#[derive(Debug, Clone)]
pub enum Step {
    /// Send this line to the child.
    Send(String),
    /// Wait for one of `patterns` and assert that the pattern at `index`
    /// is the one that matches.
    Expect {
        patterns: PatternSet,
        index: usize,
        timeout: Option<Duration>,
    },
}

/// An ordered list of send/expect steps constituting one test case.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(mut self, text: impl Into<String>) -> Self {
        self.steps.push(Step::Send(text.into()));
        self
    }

    /// Expect a single literal pattern.
    pub fn expect_literal(self, text: impl Into<String>) -> Self {
        self.expect_step(Pattern::literal(text).into(), 0, None)
    }

    /// Expect a single pattern (literal or regex).
    pub fn expect_pattern(self, pattern: Pattern) -> Self {
        self.expect_step(pattern.into(), 0, None)
    }

    /// Expect one of several candidate patterns and assert which wins.
    pub fn expect_any(self, patterns: PatternSet, index: usize) -> Self {
        self.expect_step(patterns, index, None)
    }

    /// Fully explicit expect step, with an optional per-step timeout
    /// overriding the session default.
    pub fn expect_step(
        mut self,
        patterns: PatternSet,
        index: usize,
        timeout: Option<Duration>,
    ) -> Self {
        self.steps.push(Step::Expect {
            patterns,
            index,
            timeout,
        });
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Lifecycle of one scenario execution. Terminal states are final: a
/// runner is consumed by [`ScenarioRunner::run`] and cannot be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioState {
    Idle,
    Running,
    Passed,
    Failed,
}

/// Outcome of one scenario, with the child's exit status for diagnostics.
///
/// A nonzero exit caused by forced termination never fails a scenario by
/// itself; `failure` is set only when a step failed.
#[derive(Debug)]
pub struct ScenarioReport {
    pub state: ScenarioState,
    /// Steps completed before the scenario ended.
    pub steps_run: usize,
    /// Exit code of the child after teardown, when it could be reaped.
    pub exit_code: Option<u32>,
    pub failure: Option<HarnessError>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.state == ScenarioState::Passed
    }

    /// Convert a failed report into its error.
    pub fn into_result(self) -> Result<Self, HarnessError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// Executes one [`Scenario`] against a freshly spawned child.
///
/// The runner owns spawn parameters, the default timeout policy and an
/// optional transcript. `run` consumes the runner: each instance drives
/// exactly one process through exactly one scenario.
pub struct ScenarioRunner {
    spawn: SpawnConfig,
    default_timeout: Duration,
    transcript: Option<Transcript>,
}

impl ScenarioRunner {
    pub fn new(spawn: SpawnConfig) -> Self {
        Self {
            spawn,
            default_timeout: DEFAULT_TIMEOUT,
            transcript: None,
        }
    }

    /// Default timeout for every expect step that doesn't override it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Mirror all sent/received bytes into `transcript`.
    pub fn transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Run the scenario to completion.
    ///
    /// The child is force-terminated on every exit path (pass, fail, or a
    /// panic inside a step) before the report is produced.
    pub fn run(self, scenario: &Scenario) -> ScenarioReport {
        debug!(command = self.spawn.command(), steps = scenario.len(), "scenario starting");
        let session = match PtySession::spawn_with_transcript(&self.spawn, self.transcript.clone())
        {
            Ok(mut session) => {
                session.set_timeout(self.default_timeout);
                session
            }
            Err(err) => {
                return ScenarioReport {
                    state: ScenarioState::Failed,
                    steps_run: 0,
                    exit_code: None,
                    failure: Some(err),
                }
            }
        };

        // Teardown must happen on every exit path, including a panic in
        // drive(); the guard owns the session until we disarm it below.
        let mut session = guard(session, |mut session| {
            if let Err(err) = session.terminate(true) {
                warn!(error = %err, "session teardown failed");
            }
        });

        let outcome = drive(&mut session, scenario);

        // Terminate explicitly so the exit status can be reported; the
        // guard then fires as a no-op.
        if let Err(err) = session.terminate(true) {
            warn!(error = %err, "session teardown failed");
        }
        let exit_code = session.exit_code();

        match outcome {
            Ok(steps_run) => {
                info!(steps_run, exit_code, "scenario passed");
                ScenarioReport {
                    state: ScenarioState::Passed,
                    steps_run,
                    exit_code,
                    failure: None,
                }
            }
            Err((steps_run, err)) => {
                info!(steps_run, exit_code, error = %err, "scenario failed");
                ScenarioReport {
                    state: ScenarioState::Failed,
                    steps_run,
                    exit_code,
                    failure: Some(err),
                }
            }
        }
    }
}

/// Execute the steps in program order. Returns the number of completed
/// steps on success, or the index of the failing step and its error.
fn drive(
    session: &mut PtySession,
    scenario: &Scenario,
) -> Result<usize, (usize, HarnessError)> {
    let mut last_sent: Option<String> = None;
    for (position, step) in scenario.steps().iter().enumerate() {
        let result = match step {
            Step::Send(text) => match session.send_line(text) {
                Ok(()) => {
                    last_sent = Some(text.clone());
                    Ok(())
                }
                Err(err) => Err(err),
            },
            Step::Expect {
                patterns,
                index,
                timeout,
            } => check_expect(session, patterns, *index, *timeout, &last_sent),
        };
        if let Err(err) = result {
            return Err((position, err));
        }
    }
    Ok(scenario.len())
}

fn check_expect(
    session: &mut PtySession,
    patterns: &PatternSet,
    index: usize,
    timeout: Option<Duration>,
    last_sent: &Option<String>,
) -> Result<(), HarnessError> {
    let budget = timeout.unwrap_or_else(|| session.default_timeout());
    match expect::expect(session, patterns, timeout)? {
        ExpectOutcome::Matched(found) if found.index == index => Ok(()),
        ExpectOutcome::Matched(found) => Err(HarnessError::Assertion {
            message: format!(
                "expected pattern #{index} ({}) but #{} ({}) matched first",
                describe_at(patterns, index),
                found.index,
                describe_at(patterns, found.index),
            ),
        }),
        ExpectOutcome::TimedOut => Err(HarnessError::Timeout {
            sent: last_sent.clone(),
            expected: patterns.describe(),
            elapsed: budget,
        }),
        ExpectOutcome::Closed => Err(HarnessError::Closed {
            sent: last_sent.clone(),
            expected: patterns.describe(),
        }),
    }
}

fn describe_at(patterns: &PatternSet, index: usize) -> String {
    patterns
        .get(index)
        .map(Pattern::describe)
        .unwrap_or_else(|| format!("<no pattern at index {index}>"))
}
