use reqwest::blocking::{Client, ClientBuilder};

use crate::errors::{Error, Result};
use crate::executor::{execute, ExecutionContext};
use crate::report::Report;
use crate::test_case::{TestCase, TestOption};

/// A running HTTP server that test cases are sent to.
pub trait Server {
    /// Base URL without a trailing slash, like `http://127.0.0.1:8080`.
    fn url(&self) -> String;

    /// Client configuration for requests to this server. Every test case
    /// builds its own client from it.
    fn client_builder(&self) -> ClientBuilder {
        Client::builder()
    }
}

/// A server that is already running somewhere else.
#[derive(Debug, Clone)]
pub struct Remote {
    base_url: String,
}

impl Remote {
    pub fn new(base_url: &str) -> Remote {
        Remote {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Reads the base URL from environment variable `name`.
    pub fn from_env(name: &str) -> Result<Remote> {
        match std::env::var(name) {
            Ok(url) if !url.is_empty() => Ok(Remote::new(&url)),
            _ => Err(Error::MissingEnv {
                name: name.to_string(),
            }),
        }
    }
}

impl Server for Remote {
    fn url(&self) -> String {
        self.base_url.clone()
    }
}

/// A test suite for one server.
///
/// ```no_run
/// use httpcheck::{expect_raw_response, expect_status_code, Http, Remote, TestGroup};
///
/// let suite = Http::new(Remote::new("http://127.0.0.1:8080"));
/// let mut t = TestGroup::new();
/// t.run(
///     "index says hello world",
///     suite.test("GET", "/", [expect_status_code(200), expect_raw_response("hello world")]),
/// );
/// t.finish();
/// ```
pub struct Http<S> {
    server: S,
}

impl<S: Server> Http<S> {
    pub fn new(server: S) -> Http<S> {
        Http { server }
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    /// Absolute URL of `path` on the server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.url(), path)
    }

    /// Describes a request to `path` and what its response must look like.
    /// Nothing is sent until the returned test is run.
    pub fn test(
        &self,
        method: &str,
        path: &str,
        options: impl IntoIterator<Item = TestOption>,
    ) -> TestFn {
        TestFn {
            case: TestCase::with_options(method, path, options),
            context: ExecutionContext {
                base_url: self.server.url(),
                client: self.server.client_builder(),
            },
        }
    }
}

/// A test case ready to run.
pub struct TestFn {
    case: TestCase,
    context: ExecutionContext,
}

impl TestFn {
    /// `METHOD path` of the request under test.
    pub fn name(&self) -> String {
        self.case.name()
    }

    pub fn run(self) -> Report {
        execute(self.case, self.context)
    }
}
