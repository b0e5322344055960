use reqwest::blocking::{Client, Request};
use reqwest::{Method, Url};

use crate::errors::{Error, Result};
use crate::test_case::TestCase;

/// Turns `case` into a request against `base_url`.
///
/// Takes the body and the queued mutators out of `case`; mutators run in
/// the order they were queued, so later ones win.
pub(crate) fn build_request(client: &Client, base_url: &str, case: &mut TestCase) -> Result<Request> {
    if let Some(error) = case.deferred.take() {
        return Err(error);
    }

    let method = Method::from_bytes(case.method.as_bytes()).map_err(|_| Error::InvalidMethod {
        method: case.method.clone(),
    })?;
    let raw_url = format!("{}{}", base_url, case.path);
    let url = Url::parse(&raw_url).map_err(|source| Error::InvalidUrl {
        url: raw_url.clone(),
        source,
    })?;

    let mut builder = client.request(method, url);
    if let Some(body) = case.body.take() {
        builder = builder.body(body);
    }
    let mut request = builder
        .build()
        .map_err(|source| Error::BuildRequest { source })?;

    for mutator in case.mutators.drain(..) {
        mutator(&mut request)?;
    }
    Ok(request)
}
