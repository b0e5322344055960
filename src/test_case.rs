use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};

use reqwest::blocking::{Body, Request};
use reqwest::cookie::Jar;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::compare::{self, CompareOption};
use crate::errors::{Error, Result};

pub(crate) type RequestMutator = Box<dyn FnOnce(&mut Request) -> Result<()>>;

type CaptureFn = Box<dyn FnOnce(&[u8]) -> Result<()>>;

/// Everything one request under test needs: what to send and what to expect back.
///
/// A test case is populated by applying [`TestOption`]s in order and is then
/// consumed by exactly one execution.
pub struct TestCase {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) mutators: Vec<RequestMutator>,
    pub(crate) body: Option<Body>,
    pub(crate) deferred: Option<Error>,
    pub(crate) jar: Option<Arc<Jar>>,
    pub(crate) expect_status: Option<u16>,
    pub(crate) expect_headers: Vec<(String, String)>,
    pub(crate) expect_raw: Option<Vec<u8>>,
    pub(crate) expect_json: Option<Box<dyn StructuredExpectation>>,
    pub(crate) capture: Option<CaptureFn>,
    pub(crate) fail_fast: bool,
}

impl TestCase {
    pub fn new(method: &str, path: &str) -> TestCase {
        TestCase {
            method: method.to_string(),
            path: path.to_string(),
            mutators: Vec::new(),
            body: None,
            deferred: None,
            jar: None,
            expect_status: None,
            expect_headers: Vec::new(),
            expect_raw: None,
            expect_json: None,
            capture: None,
            fail_fast: false,
        }
    }

    /// Builds a test case by applying `options` left to right.
    pub fn with_options(
        method: &str,
        path: &str,
        options: impl IntoIterator<Item = TestOption>,
    ) -> TestCase {
        let mut case = TestCase::new(method, path);
        for option in options {
            option.apply(&mut case);
        }
        case
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Short `METHOD path` label used to prefix failure messages.
    pub fn name(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Queues a request mutation; mutations run in the order they were queued.
    pub fn push_mutator(&mut self, mutator: impl FnOnce(&mut Request) -> Result<()> + 'static) {
        self.mutators.push(Box::new(mutator));
    }

    /// Records an error raised while applying an option. Only the first one
    /// is kept; it fails the test before the request is sent.
    pub(crate) fn defer_error(&mut self, error: Error) {
        if self.deferred.is_none() {
            self.deferred = Some(error);
        }
    }

    /// Sets an expected header, replacing an earlier expectation for the
    /// same (case-insensitive) name in place.
    pub(crate) fn set_expected_header(&mut self, name: &str, value: &str) {
        match self
            .expect_headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self
                .expect_headers
                .push((name.to_string(), value.to_string())),
        }
    }

    pub(crate) fn set_capture<T>(&mut self, capture: Capture<T>)
    where
        T: DeserializeOwned + 'static,
    {
        self.capture = Some(Box::new(move |raw: &[u8]| {
            let value: T =
                serde_json::from_slice(raw).map_err(|source| Error::DecodeResponse { source })?;
            capture.set(value);
            Ok(())
        }));
    }
}

impl Debug for TestCase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("mutators", &self.mutators.len())
            .field("body", &self.body.is_some())
            .field("deferred", &self.deferred)
            .field("jar", &self.jar.is_some())
            .field("expect_status", &self.expect_status)
            .field("expect_headers", &self.expect_headers)
            .field("expect_raw", &self.expect_raw.as_ref().map(|raw| raw.len()))
            .field("expect_json", &self.expect_json.is_some())
            .field("capture", &self.capture.is_some())
            .field("fail_fast", &self.fail_fast)
            .finish()
    }
}

/// A deferred mutation of a [`TestCase`].
pub struct TestOption(Box<dyn FnOnce(&mut TestCase)>);

impl TestOption {
    pub fn new(f: impl FnOnce(&mut TestCase) + 'static) -> TestOption {
        TestOption(Box::new(f))
    }

    pub fn apply(self, case: &mut TestCase) {
        (self.0)(case)
    }
}

/// Decodes the raw response into the expected value's type and diffs the two.
pub(crate) trait StructuredExpectation {
    fn diff(&self, raw: &[u8]) -> Result<String>;
}

pub(crate) struct JsonExpectation<T> {
    pub(crate) want: T,
    pub(crate) options: Vec<CompareOption>,
}

impl<T> StructuredExpectation for JsonExpectation<T>
where
    T: Serialize + DeserializeOwned,
{
    fn diff(&self, raw: &[u8]) -> Result<String> {
        let got: T =
            serde_json::from_slice(raw).map_err(|source| Error::DecodeResponse { source })?;
        compare::diff(&self.want, &got, &self.options)
    }
}

/// Out-parameter that receives the decoded response body of a test case.
///
/// Clones share the same slot, so keep one handle and pass a clone to
/// [`grab_json_response`](crate::grab_json_response).
#[derive(Debug)]
pub struct Capture<T>(Arc<Mutex<Option<T>>>);

impl<T> Capture<T> {
    pub fn new() -> Capture<T> {
        Capture(Arc::new(Mutex::new(None)))
    }

    pub fn take(&self) -> Option<T> {
        self.slot().take()
    }

    pub fn is_set(&self) -> bool {
        self.slot().is_some()
    }

    pub(crate) fn set(&self, value: T) {
        *self.slot() = Some(value);
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<T>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone> Capture<T> {
    pub fn get(&self) -> Option<T> {
        self.slot().clone()
    }
}

impl<T> Clone for Capture<T> {
    fn clone(&self) -> Self {
        Capture(Arc::clone(&self.0))
    }
}

impl<T> Default for Capture<T> {
    fn default() -> Self {
        Capture::new()
    }
}
