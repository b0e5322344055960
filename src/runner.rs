use tracing::{error, info};

use crate::report::Report;
use crate::suite::TestFn;

/// Runs named test cases one after another and fails at the end if any of
/// them failed, so one broken case does not hide the others.
#[derive(Debug, Default)]
pub struct TestGroup {
    reports: Vec<Report>,
}

impl TestGroup {
    pub fn new() -> TestGroup {
        TestGroup::default()
    }

    /// Runs `test` under `name`; returns whether it passed.
    pub fn run(&mut self, name: &str, test: TestFn) -> bool {
        let report = test.run().named(name);
        let passed = report.passed();
        if passed {
            info!(test = name, "passed");
        } else {
            error!(test = name, failures = report.failures().len(), "failed");
        }
        self.reports.push(report);
        passed
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn failed(&self) -> impl Iterator<Item = &Report> {
        self.reports.iter().filter(|report| !report.passed())
    }

    /// Panics listing every failed test case.
    pub fn finish(self) {
        let failed: Vec<String> = self.failed().map(Report::to_string).collect();
        if !failed.is_empty() {
            panic!(
                "{} of {} test cases failed:\n{}",
                failed.len(),
                self.reports.len(),
                failed.join("\n")
            );
        }
    }
}
