//! Declarative tests for HTTP endpoints.
//!
//! A test case is described by a method, a path and a list of options, then
//! run once: the request is sent, the whole response body is read, and every
//! expectation is checked. Failed expectations are collected (or stop the
//! case with [`fatal_failure`]); malformed requests, transport errors and
//! undecodable bodies end the case immediately.

pub mod compare;
pub mod errors;
pub mod executor;
pub mod options;
pub mod parse;
pub mod report;
mod request;
pub mod runner;
pub mod suite;
pub mod test_case;

pub use compare::{
    equate_approx_time, ignore_field, ignore_unexported, not_empty, sort_slices, CompareOption,
};
pub use errors::{Error, Result};
pub use options::*;
pub use parse::{parse_html, parse_url, resolve_url, try_parse_url, Href};
pub use report::{Failure, Report, Severity, Stage};
pub use reqwest::cookie::Jar;
pub use runner::TestGroup;
pub use suite::{Http, Remote, Server, TestFn};
pub use test_case::{Capture, TestCase, TestOption};
