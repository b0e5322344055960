use std::io::Read;

use reqwest::blocking::ClientBuilder;
use tracing::info_span;

use crate::errors::Error;
use crate::report::{Abort, Recorder, Report, Stage};
use crate::request::build_request;
use crate::test_case::TestCase;

/// What an execution needs from the server under test.
pub struct ExecutionContext {
    pub base_url: String,
    pub client: ClientBuilder,
}

/// Sends the request described by `case` and checks the response.
///
/// Assertions run in a fixed order: status, headers, raw body, structured
/// body, then the capture. The case is consumed; it describes exactly one
/// request.
pub fn execute(case: TestCase, context: ExecutionContext) -> Report {
    let span = info_span!("http_test", method = %case.method, path = %case.path);
    let _enter = span.enter();

    let mut recorder = Recorder::new(case.name(), case.fail_fast);
    if run(case, context, &mut recorder).is_ok() {
        recorder.advance(Stage::Done);
    }
    recorder.finish()
}

fn run(mut case: TestCase, context: ExecutionContext, rec: &mut Recorder) -> Result<(), Abort> {
    let mut builder = context.client;
    if let Some(jar) = case.jar.take() {
        builder = builder.cookie_provider(jar);
    }
    let client = builder
        .build()
        .map_err(|source| rec.fatal(Error::BuildClient { source }))?;
    let request = build_request(&client, &context.base_url, &mut case).map_err(|e| rec.fatal(e))?;

    let mut response = client
        .execute(request)
        .map_err(|source| rec.fatal(Error::Transport { source }))?;
    rec.advance(Stage::Sent);

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let mut raw = Vec::new();
    let read = response.read_to_end(&mut raw);
    rec.advance(Stage::BodyRead);
    rec.log(format!("output:\n{}", String::from_utf8_lossy(&raw)));
    // the checks below run against whatever part of the body arrived
    if let Err(err) = read {
        rec.report(format!("error reading body: {}", err));
    }

    let label = format!("[{}]", case.name());

    if let Some(want) = case.expect_status {
        if status != want {
            rec.fail(format!(
                "{} unexpected response code: want {}, got {}",
                label, want, status
            ))?;
        }
    }

    for (name, want) in &case.expect_headers {
        let got = headers
            .get(name.as_str())
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_default();
        if &got != want {
            rec.log(format!("header dump: {:?}", headers));
            rec.fail(format!(
                "{} unexpected response header ({}): want {}, got {}",
                label, name, want, got
            ))?;
        }
    }

    if let Some(want) = &case.expect_raw {
        if want != &raw {
            rec.fail(format!(
                "{} raw output mismatch:\nwant: {}\ngot: {}",
                label,
                String::from_utf8_lossy(want),
                String::from_utf8_lossy(&raw)
            ))?;
        }
    }

    if let Some(expectation) = &case.expect_json {
        let diff = expectation.diff(&raw).map_err(|e| rec.fatal(e))?;
        if !diff.is_empty() {
            rec.fail(format!("{} output mismatch (-want +got):\n{}", label, diff))?;
        }
    }

    if let Some(capture) = case.capture.take() {
        capture(&raw).map_err(|e| rec.fatal(e))?;
    }
    rec.advance(Stage::Asserted);
    Ok(())
}
