//! Parsers for inspecting responses and building follow-up requests.
//!
//! They are meant to be called from test code: invalid input panics with
//! the parse error and the offending input, which fails the enclosing test.

use std::fmt::{Display, Formatter};

use scraper::Html;
use tracing::debug;
use url::{ParseError, Position, Url};

use crate::errors::{Error, Result};

/// Parses an HTML document. Malformed markup is recovered from the way
/// browsers do; the recovered errors are logged.
pub fn parse_html(body: &str) -> Html {
    let document = Html::parse_document(body);
    if !document.errors.is_empty() {
        debug!(errors = ?document.errors, "recovered from malformed HTML");
    }
    document
}

// host standing in for the page a relative reference came from
const RELATIVE_HOST: &str = "relative.invalid";

/// A URL as found in a link or a header: absolute, or relative to the page
/// it came from, like `/greet?name=greg`.
///
/// Relative references are taken from the root, so `next` and `/next` both
/// have the path `/next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Href {
    url: Url,
    relative: bool,
}

impl Href {
    pub fn is_relative(&self) -> bool {
        self.relative
    }

    /// The absolute URL, `None` for a relative reference.
    pub fn absolute(&self) -> Option<&Url> {
        (!self.relative).then_some(&self.url)
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    pub fn query_pairs(&self) -> url::form_urlencoded::Parse<'_> {
        self.url.query_pairs()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.url.fragment()
    }

    /// Path and query, as passed to [`Http::test`](crate::Http::test).
    pub fn request_target(&self) -> &str {
        &self.url[Position::BeforePath..Position::AfterQuery]
    }

    fn join(&self, href: &str) -> std::result::Result<Href, url::ParseError> {
        let url = self.url.join(href)?;
        let relative = self.relative && url.host_str() == Some(RELATIVE_HOST);
        Ok(Href { url, relative })
    }
}

impl Display for Href {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.relative {
            f.write_str(&self.url[Position::BeforePath..])
        } else {
            f.write_str(self.url.as_str())
        }
    }
}

pub fn try_parse_url(href: &str) -> Result<Href> {
    let parsed = match Url::parse(href) {
        Ok(url) => Ok(Href {
            url,
            relative: false,
        }),
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{}/", RELATIVE_HOST))
            .and_then(|url| {
                Href {
                    url,
                    relative: true,
                }
                .join(href)
            }),
        Err(source) => Err(source),
    };
    parsed.map_err(|source| Error::ParseUrl {
        href: href.to_string(),
        source,
    })
}

/// Parses an absolute URL or a relative reference.
///
/// # Panics
///
/// If `href` is not a valid URL reference.
pub fn parse_url(href: &str) -> Href {
    match try_parse_url(href) {
        Ok(url) => url,
        Err(err) => panic!("{}", err),
    }
}

/// Resolves `href`, which may be relative like a `Location` header, against
/// `base`. The result is relative only if both are.
///
/// # Panics
///
/// If the result is not a valid URL.
pub fn resolve_url(base: &Href, href: &str) -> Href {
    match base.join(href) {
        Ok(url) => url,
        Err(source) => panic!(
            "{}",
            Error::ParseUrl {
                href: href.to_string(),
                source
            }
        ),
    }
}
