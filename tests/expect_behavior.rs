//! Session-level behavior of the expectation engine: timeout bounds,
//! closed-versus-timed-out, consumption, ordering and termination.

#[cfg(unix)]
mod expect_behavior {
    use std::error::Error;
    use std::time::{Duration, Instant};

    use ptydrive::expect::{expect, ExpectOutcome};
    use ptydrive::pty::{PtySession, SessionState};
    use ptydrive::{Pattern, PatternSet, SpawnConfig};

    fn spawn_sh(script: &str) -> Result<PtySession, Box<dyn Error>> {
        Ok(PtySession::spawn(
            &SpawnConfig::new("sh").args(["-c", script]),
        )?)
    }

    #[test]
    fn earliest_match_wins_across_patterns() -> Result<(), Box<dyn Error>> {
        let mut session = spawn_sh("printf 'early then later'")?;
        // "later" has priority index 0 but appears after "early".
        let patterns = PatternSet::literals(["later", "early"]);

        match expect(&mut session, &patterns, None)? {
            ExpectOutcome::Matched(found) => assert_eq!(found.index, 1),
            other => panic!("expected a match, got {other:?}"),
        }
        session.terminate(true)?;
        Ok(())
    }

    #[test]
    fn regex_pattern_matches_child_output() -> Result<(), Box<dyn Error>> {
        let mut session = spawn_sh("echo 'version 1.2.3'")?;
        let patterns: PatternSet = Pattern::regex(r"version \d+\.\d+\.\d+")?.into();

        let outcome = expect(&mut session, &patterns, None)?;
        assert!(matches!(outcome, ExpectOutcome::Matched(found) if found.index == 0));
        session.terminate(true)?;
        Ok(())
    }

    #[test]
    fn timeout_is_bounded_and_leaves_child_running() -> Result<(), Box<dyn Error>> {
        let mut session = PtySession::spawn(&SpawnConfig::new("cat"))?;
        let patterns = PatternSet::literals(["never-appears"]);

        let started = Instant::now();
        let outcome = expect(&mut session, &patterns, Some(Duration::from_millis(500)))?;
        let elapsed = started.elapsed();

        assert_eq!(outcome, ExpectOutcome::TimedOut);
        assert!(elapsed >= Duration::from_millis(500), "returned early: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "overran budget: {elapsed:?}");

        // A timeout must not terminate the child: it still answers.
        session.send_line("ping")?;
        let outcome = expect(
            &mut session,
            &PatternSet::literals(["ping"]),
            Some(Duration::from_secs(5)),
        )?;
        assert!(matches!(outcome, ExpectOutcome::Matched(_)));

        session.terminate(true)?;
        Ok(())
    }

    #[test]
    fn closed_is_distinct_from_timed_out() -> Result<(), Box<dyn Error>> {
        let mut session = spawn_sh("exit 0")?;
        let patterns = PatternSet::literals(["anything"]);

        let outcome = expect(&mut session, &patterns, Some(Duration::from_secs(5)))?;
        assert_eq!(outcome, ExpectOutcome::Closed);
        Ok(())
    }

    #[test]
    fn matched_output_is_never_rematched() -> Result<(), Box<dyn Error>> {
        let mut session = spawn_sh("printf 'token\\n'")?;
        let patterns = PatternSet::literals(["token"]);

        let first = expect(&mut session, &patterns, None)?;
        assert!(matches!(first, ExpectOutcome::Matched(_)));

        // The only occurrence was consumed; with the child gone this must
        // resolve as Closed, not a stale rematch.
        let second = expect(&mut session, &patterns, Some(Duration::from_secs(2)))?;
        assert_eq!(second, ExpectOutcome::Closed);
        Ok(())
    }

    #[test]
    fn sends_arrive_in_program_order() -> Result<(), Box<dyn Error>> {
        let mut session = PtySession::spawn(&SpawnConfig::new("cat"))?;
        session.send_line("first-line")?;
        session.send_line("second-line")?;

        let first = expect(&mut session, &PatternSet::literals(["first-line"]), None)?;
        assert!(matches!(first, ExpectOutcome::Matched(_)));
        let second = expect(&mut session, &PatternSet::literals(["second-line"]), None)?;
        assert!(matches!(second, ExpectOutcome::Matched(_)));

        session.terminate(true)?;
        Ok(())
    }

    #[test]
    fn terminate_is_idempotent() -> Result<(), Box<dyn Error>> {
        let mut session = PtySession::spawn(&SpawnConfig::new("cat"))?;
        session.terminate(true)?;
        assert_eq!(session.state(), SessionState::Terminated);
        let exit_code = session.exit_code();
        assert!(session.exit_status().is_some(), "child was not reaped");

        // Second call is a no-op with the same observable state.
        session.terminate(true)?;
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.exit_code(), exit_code);
        Ok(())
    }

    #[test]
    fn send_after_terminate_is_an_io_error() -> Result<(), Box<dyn Error>> {
        let mut session = PtySession::spawn(&SpawnConfig::new("cat"))?;
        session.terminate(true)?;

        let err = session.send_line("too late").unwrap_err();
        assert!(matches!(err, ptydrive::HarnessError::Io { .. }));
        Ok(())
    }

    #[test]
    fn default_timeout_policy_applies_when_not_overridden() -> Result<(), Box<dyn Error>> {
        let mut session = PtySession::spawn(&SpawnConfig::new("cat"))?;
        session.set_timeout(Duration::from_millis(300));

        let started = Instant::now();
        let outcome = expect(&mut session, &PatternSet::literals(["nope"]), None)?;
        assert_eq!(outcome, ExpectOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(2));

        session.terminate(true)?;
        Ok(())
    }
}
