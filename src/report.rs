use std::fmt::{Display, Formatter};

use tracing::{debug, error};

/// How a failure affects the rest of the test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Ends the test case immediately.
    Fatal,
    /// Recorded; the remaining assertions still run unless the case is
    /// fail-fast.
    Reported,
}

/// Where an execution was when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Built,
    Sent,
    BodyRead,
    Asserted,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub severity: Severity,
    pub message: String,
}

/// Outcome of running one test case.
#[derive(Debug, Clone)]
pub struct Report {
    name: String,
    logs: Vec<String>,
    failures: Vec<Failure>,
    stage: Stage,
    aborted: bool,
}

impl Report {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn named(mut self, name: &str) -> Report {
        self.name = name.to_string();
        self
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// The stage the execution stopped in, or `None` if it ran to the end.
    pub fn stopped_at(&self) -> Option<Stage> {
        self.aborted.then_some(self.stage)
    }

    pub fn is_fatal(&self) -> bool {
        self.failures
            .iter()
            .any(|failure| failure.severity == Severity::Fatal)
    }

    /// Panics with every failure message if the test case failed.
    pub fn assert_passed(&self) {
        if !self.passed() {
            panic!("{}", self);
        }
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.passed() {
            return write!(f, "--- PASS: {}", self.name);
        }
        writeln!(f, "--- FAIL: {}", self.name)?;
        for failure in &self.failures {
            writeln!(f, "    {}", failure.message)?;
        }
        Ok(())
    }
}

/// Marker returned once the current test case must not go on.
#[derive(Debug)]
pub(crate) struct Abort;

/// Collects logs and failures while a test case runs and applies its
/// failure policy.
pub(crate) struct Recorder {
    report: Report,
    fail_fast: bool,
}

impl Recorder {
    pub(crate) fn new(name: String, fail_fast: bool) -> Recorder {
        Recorder {
            report: Report {
                name,
                logs: Vec::new(),
                failures: Vec::new(),
                stage: Stage::Built,
                aborted: false,
            },
            fail_fast,
        }
    }

    pub(crate) fn advance(&mut self, stage: Stage) {
        debug!(?stage, "test case advanced");
        self.report.stage = stage;
    }

    pub(crate) fn log(&mut self, message: String) {
        debug!("{}", message);
        self.report.logs.push(message);
    }

    /// Records a failed assertion. Under fail-fast the test case stops here.
    pub(crate) fn fail(&mut self, message: String) -> Result<(), Abort> {
        error!(fail_fast = self.fail_fast, "{}", message);
        self.report.failures.push(Failure {
            severity: Severity::Reported,
            message,
        });
        if self.fail_fast {
            self.report.aborted = true;
            return Err(Abort);
        }
        Ok(())
    }

    /// Records a failure that never stops the test case, fail-fast or not.
    pub(crate) fn report(&mut self, message: String) {
        error!("{}", message);
        self.report.failures.push(Failure {
            severity: Severity::Reported,
            message,
        });
    }

    pub(crate) fn fatal(&mut self, error: impl Display) -> Abort {
        let message = error.to_string();
        error!(fatal = true, "{}", message);
        self.report.failures.push(Failure {
            severity: Severity::Fatal,
            message,
        });
        self.report.aborted = true;
        Abort
    }

    pub(crate) fn finish(self) -> Report {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reported_failures_accumulate() {
        let mut recorder = Recorder::new("GET /".into(), false);
        assert!(recorder.fail("first".into()).is_ok());
        assert!(recorder.fail("second".into()).is_ok());
        recorder.advance(Stage::Done);
        let report = recorder.finish();
        assert!(!report.passed());
        assert!(!report.is_fatal());
        assert_eq!(report.stopped_at(), None);
        assert_eq!(report.failures().len(), 2);
    }

    #[test]
    fn fail_fast_aborts_but_keeps_severity() {
        let mut recorder = Recorder::new("GET /".into(), true);
        recorder.advance(Stage::BodyRead);
        assert!(recorder.fail("boom".into()).is_err());
        let report = recorder.finish();
        assert_eq!(report.stopped_at(), Some(Stage::BodyRead));
        assert_eq!(
            report.failures(),
            &[Failure {
                severity: Severity::Reported,
                message: "boom".into()
            }]
        );
    }

    #[test]
    fn report_never_aborts() {
        let mut recorder = Recorder::new("GET /".into(), true);
        recorder.advance(Stage::BodyRead);
        recorder.report("error reading body: unexpected end of file".into());
        assert!(recorder.fail("status".into()).is_err());
        let report = recorder.finish();
        let severities: Vec<Severity> = report.failures().iter().map(|f| f.severity).collect();
        assert_eq!(severities, vec![Severity::Reported, Severity::Reported]);
        assert_eq!(report.failures()[1].message, "status");
    }

    #[test]
    fn fatal_aborts_regardless_of_policy() {
        let mut recorder = Recorder::new("GET /".into(), false);
        let _ = recorder.fatal("connection refused");
        let report = recorder.finish();
        assert!(report.is_fatal());
        assert_eq!(report.stopped_at(), Some(Stage::Built));
    }

    #[test]
    fn display_lists_failures() {
        let mut recorder = Recorder::new("POST /greet".into(), false);
        let _ = recorder.fail("[POST /greet] unexpected response code: want 400, got 200".into());
        let report = recorder.finish().named("greet: missing name");
        assert_eq!(
            report.to_string(),
            "--- FAIL: greet: missing name\n    [POST /greet] unexpected response code: want 400, got 200\n"
        );
    }

    #[test]
    #[should_panic(expected = "want 400, got 200")]
    fn assert_passed_panics_on_failure() {
        let mut recorder = Recorder::new("POST /greet".into(), false);
        let _ = recorder.fail("want 400, got 200".into());
        recorder.finish().assert_passed();
    }
}
