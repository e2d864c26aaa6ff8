//! End-to-end scenarios against a stub line-oriented shell.
//!
//! The stub implements the observable contract of an `addDigits` builtin:
//! prints "0" when called bare or with a non-numeric argument, otherwise
//! prints the digit sum of its argument.

#[cfg(unix)]
mod shell_scenarios {
    use std::error::Error;
    use std::fs;
    use std::time::{Duration, Instant};

    use ptydrive::error::HarnessError;
    use ptydrive::scenario::{Scenario, ScenarioConfig, ScenarioRunner, ScenarioState};
    use ptydrive::sink::Transcript;
    use ptydrive::SpawnConfig;
    use tempfile::TempDir;

    const STUB_SHELL: &str = r#"
while read -r cmd arg; do
  case "$cmd" in
    addDigits)
      case "$arg" in
        ""|*[!0-9]*) echo "0" ;;
        *)
          sum=0
          n=$arg
          while [ "$n" -gt 0 ]; do
            sum=$((sum + n % 10))
            n=$((n / 10))
          done
          echo "Sum of the digits is: $sum"
          ;;
      esac
      ;;
    silent) : ;;
    quit) exit 0 ;;
  esac
done
"#;

    fn stub_spawn(dir: &TempDir) -> Result<SpawnConfig, Box<dyn Error>> {
        let script = dir.path().join("stub.sh");
        fs::write(&script, STUB_SHELL)?;
        Ok(SpawnConfig::new("sh").arg(script.to_string_lossy()))
    }

    #[test]
    fn add_digits_session_passes() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let scenario = Scenario::new()
            .send("addDigits")
            .expect_literal("0")
            .send("addDigits 18")
            .expect_literal("9")
            .send("addDigits test")
            .expect_literal("0");

        let report = ScenarioRunner::new(stub_spawn(&dir)?)
            .timeout(Duration::from_secs(5))
            .run(&scenario);

        assert!(report.passed(), "scenario failed: {:?}", report.failure);
        assert_eq!(report.steps_run, 6);
        Ok(())
    }

    #[test]
    fn silent_command_times_out_with_descriptive_failure() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let scenario = Scenario::new().send("silent").expect_step(
            ptydrive::PatternSet::literals(["anything"]),
            0,
            Some(Duration::from_secs(1)),
        );

        let started = Instant::now();
        let report = ScenarioRunner::new(stub_spawn(&dir)?).run(&scenario);
        let elapsed = started.elapsed();

        assert_eq!(report.state, ScenarioState::Failed);
        assert_eq!(report.steps_run, 1);
        // 1 s budget plus spawn and teardown slack.
        assert!(elapsed >= Duration::from_secs(1), "returned too early: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(4), "timeout not bounded: {elapsed:?}");

        match &report.failure {
            Some(HarnessError::Timeout { sent, expected, .. }) => {
                assert_eq!(sent.as_deref(), Some("silent"));
                assert!(expected.contains("anything"));
            }
            other => panic!("expected a timeout failure, got {other:?}"),
        }
        // The stub was reaped during teardown.
        assert!(report.exit_code.is_some(), "child was not reaped");
        Ok(())
    }

    #[test]
    fn immediate_exit_reports_closed_not_timeout() {
        let scenario = Scenario::new().expect_literal("never-printed");
        let spawn = SpawnConfig::new("sh").args(["-c", "exit 0"]);

        let report = ScenarioRunner::new(spawn)
            .timeout(Duration::from_secs(5))
            .run(&scenario);

        assert!(matches!(
            report.failure,
            Some(HarnessError::Closed { .. })
        ));
    }

    #[test]
    fn scenario_file_drives_the_stub() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let script = dir.path().join("stub.sh");
        fs::write(&script, STUB_SHELL)?;

        let scenario_path = dir.path().join("add_digits.toml");
        fs::write(
            &scenario_path,
            format!(
                r#"
shell = "sh"
args = ["{}"]
timeout_seconds = 5

[[steps]]
send = "addDigits 18"

[[steps]]
expect = {{ regex = 'Sum of the digits' }}

[[steps]]
expect = "9"
"#,
                script.display()
            ),
        )?;

        let config = ScenarioConfig::load(&scenario_path)?;
        let scenario = config.to_scenario()?;
        let report = ScenarioRunner::new(config.spawn_config())
            .timeout(config.default_timeout())
            .run(&scenario);

        assert!(report.passed(), "scenario failed: {:?}", report.failure);
        Ok(())
    }

    #[test]
    fn transcript_mirrors_sent_and_received_bytes() -> Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let log_path = dir.path().join("session.log");
        let scenario = Scenario::new().send("addDigits 18").expect_literal("9");

        let report = ScenarioRunner::new(stub_spawn(&dir)?)
            .transcript(Transcript::to_file(&log_path)?)
            .run(&scenario);
        assert!(report.passed(), "scenario failed: {:?}", report.failure);

        let log = fs::read_to_string(&log_path)?;
        assert!(log.contains("addDigits 18"), "sent line missing from log");
        assert!(log.contains('9'), "child output missing from log");
        Ok(())
    }
}
