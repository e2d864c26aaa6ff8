use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::expect::Pattern;
use crate::pty::SpawnConfig;
use crate::scenario::runner::Scenario;

/// On-disk description of one scenario.
///
/// ```toml
/// shell = "sh"
/// args = ["stub.sh"]
/// timeout_seconds = 5
///
/// [[steps]]
/// send = "addDigits 18"
///
/// [[steps]]
/// expect = "9"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Command driven through the pseudo-terminal.
    pub shell: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Default per-expectation timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Optional file mirroring all sent/received bytes.
    #[serde(default)]
    pub log: Option<PathBuf>,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

fn default_timeout_seconds() -> u64 {
    5
}

/// One step as written in a scenario file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepSpec {
    Send {
        send: String,
    },
    Expect {
        expect: PatternSpec,
        #[serde(default)]
        timeout_seconds: Option<u64>,
    },
}

/// A pattern as written in a scenario file: a bare string is a literal,
/// regex semantics require the explicit `{ regex = "..." }` form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternSpec {
    Literal(String),
    Regex { regex: String },
}

impl PatternSpec {
    pub(crate) fn compile(&self) -> Result<Pattern, HarnessError> {
        match self {
            PatternSpec::Literal(text) => Ok(Pattern::literal(text)),
            PatternSpec::Regex { regex } => Pattern::regex(regex),
        }
    }
}

impl ScenarioConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn spawn_config(&self) -> SpawnConfig {
        let mut spawn = SpawnConfig::new(&self.shell).args(self.args.iter().cloned());
        for (key, value) in &self.env {
            spawn = spawn.env(key, value);
        }
        spawn
    }

    /// Compile the step list into a runnable [`Scenario`].
    pub fn to_scenario(&self) -> Result<Scenario, HarnessError> {
        let mut scenario = Scenario::new();
        for step in &self.steps {
            scenario = match step {
                StepSpec::Send { send } => scenario.send(send),
                StepSpec::Expect {
                    expect,
                    timeout_seconds,
                } => scenario.expect_step(
                    expect.compile()?.into(),
                    0,
                    timeout_seconds.map(Duration::from_secs),
                ),
            };
        }
        Ok(scenario)
    }
}
