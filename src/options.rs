//! The option vocabulary used to describe a test case.
//!
//! Options are applied in argument order. Body encodings queue a
//! `Content-Type` mutation, so a [`with_header`] naming `Content-Type` only
//! overrides it when it comes later in the list.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use reqwest::blocking::{Body, Request};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::compare::CompareOption;
use crate::errors::Error;
use crate::test_case::{Capture, JsonExpectation, TestCase, TestOption};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Streams the request body from `reader`.
pub fn with_input(reader: impl Read + Send + 'static) -> TestOption {
    TestOption::new(move |tc| tc.body = Some(Body::new(reader)))
}

/// Sends `body` as-is.
pub fn with_body(body: impl Into<Vec<u8>>) -> TestOption {
    let body = body.into();
    TestOption::new(move |tc| tc.body = Some(Body::from(body)))
}

/// Sends `input` encoded as JSON with an `application/json` content type.
/// The content type can be overridden with a later [`with_header`].
pub fn with_json_input<T: Serialize + ?Sized>(input: &T) -> TestOption {
    let encoded = serde_json::to_vec(input);
    TestOption::new(move |tc| match encoded {
        Ok(raw) => {
            tc.body = Some(Body::from(raw));
            set_content_type(tc, JSON_CONTENT_TYPE);
        }
        Err(source) => tc.defer_error(Error::EncodeBody { source }),
    })
}

/// Sends `values` form-encoded with an `application/x-www-form-urlencoded`
/// content type. Keys are sorted; repeated values keep their order.
/// The content type can be overridden with a later [`with_header`].
pub fn with_form_input<I, K, V, S>(values: I) -> TestOption
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut sorted: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, vals) in values {
        sorted
            .entry(key.into())
            .or_default()
            .extend(vals.into_iter().map(Into::into));
    }
    let encoded = encode_form(&sorted);
    TestOption::new(move |tc| {
        tc.body = Some(Body::from(encoded));
        set_content_type(tc, FORM_CONTENT_TYPE);
    })
}

fn encode_form(values: &BTreeMap<String, Vec<String>>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, vals) in values {
        for val in vals {
            serializer.append_pair(key, val);
        }
    }
    serializer.finish()
}

fn set_content_type(tc: &mut TestCase, content_type: &'static str) {
    tc.push_mutator(move |req: &mut Request| {
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Ok(())
    });
}

/// Adds a request header. `Content-Type` replaces any earlier value so it
/// can override the body encodings; every other header is appended.
pub fn with_header(name: &str, value: &str) -> TestOption {
    let name = name.to_string();
    let value = value.to_string();
    TestOption::new(move |tc| {
        tc.push_mutator(move |req: &mut Request| {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidHeader { name: name.clone() })?;
            let value = HeaderValue::from_str(&value)
                .map_err(|_| Error::InvalidHeader { name: name.clone() })?;
            if header == CONTENT_TYPE {
                req.headers_mut().insert(header, value);
            } else {
                req.headers_mut().append(header, value);
            }
            Ok(())
        })
    })
}

/// Runs `f` against the outbound request after the options queued before it.
pub fn with_request(f: impl FnOnce(&mut Request) + 'static) -> TestOption {
    TestOption::new(move |tc| {
        tc.push_mutator(move |req: &mut Request| {
            f(req);
            Ok(())
        })
    })
}

/// Sends and stores cookies through `jar`. Share the jar between test cases
/// to keep a session across requests.
pub fn with_cookie_jar(jar: &Arc<Jar>) -> TestOption {
    let jar = Arc::clone(jar);
    TestOption::new(move |tc| tc.jar = Some(jar))
}

/// Expects the response status to be `code`. Zero disables the check.
pub fn expect_status_code(code: u16) -> TestOption {
    TestOption::new(move |tc| tc.expect_status = (code != 0).then_some(code))
}

/// Expects the first value of response header `name` to equal `value`.
/// A missing header reads as the empty string.
pub fn expect_header(name: &str, value: &str) -> TestOption {
    let name = name.to_string();
    let value = value.to_string();
    TestOption::new(move |tc| tc.set_expected_header(&name, &value))
}

/// Expects the response body to be exactly `body`.
pub fn expect_raw_response(body: impl Into<Vec<u8>>) -> TestOption {
    let body = body.into();
    TestOption::new(move |tc| tc.expect_raw = Some(body))
}

/// Decodes the response body as JSON into `T` and compares it with `want`.
///
/// The comparison honours `options`, see [`crate::compare`].
pub fn expect_json_response<T>(
    want: T,
    options: impl IntoIterator<Item = CompareOption>,
) -> TestOption
where
    T: Serialize + DeserializeOwned + 'static,
{
    let options: Vec<CompareOption> = options.into_iter().collect();
    TestOption::new(move |tc| tc.expect_json = Some(Box::new(JsonExpectation { want, options })))
}

/// Decodes the response body as JSON into `capture` for use after the test.
pub fn grab_json_response<T>(capture: &Capture<T>) -> TestOption
where
    T: DeserializeOwned + 'static,
{
    let capture = capture.clone();
    TestOption::new(move |tc| tc.set_capture(capture))
}

/// Stops at the first failed assertion.
pub fn fatal_failure() -> TestOption {
    TestOption::new(|tc| tc.fail_fast = true)
}
