//! Blocking libcurl round-trips: JSON GET/POST and multipart POST.
//!
//! Runs in the current thread; [`super::HttpClient`] calls these from
//! `spawn_blocking`. The cancellation token is checked from curl's progress
//! callback so an in-flight transfer stops shortly after cancel.

use std::collections::HashMap;
use std::path::PathBuf;

use curl::easy::{Easy, Form, List};
use tokio_util::sync::CancellationToken;

use super::error::{from_curl, TransportError};
use super::HttpOptions;

/// One field of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        path: PathBuf,
        content_type: Option<String>,
        filename: Option<String>,
    },
}

impl FormPart {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        FormPart::Text {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

pub(crate) enum RequestBody {
    Empty,
    Json(Vec<u8>),
    Form(Vec<FormPart>),
}

/// Status and body of a completed round-trip.
#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub status: u32,
    pub body: Vec<u8>,
}

/// Shared handle setup: URL, redirects, timeouts, headers, cancel hook.
pub(super) fn configure(
    easy: &mut Easy,
    url: &str,
    headers: &HashMap<String, String>,
    extra: &[&str],
    opts: &HttpOptions,
) -> Result<(), TransportError> {
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.timeout(opts.timeout)?;
    easy.progress(true)?;

    let mut list = List::new();
    for (k, v) in headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    for line in extra {
        list.append(line)?;
    }
    if !headers.is_empty() || !extra.is_empty() {
        easy.http_headers(list)?;
    }
    Ok(())
}

/// Performs one request and returns the body of a 2xx response.
pub(crate) fn perform(
    method: &str,
    url: &str,
    headers: &HashMap<String, String>,
    body: RequestBody,
    opts: &HttpOptions,
    cancel: &CancellationToken,
) -> Result<HttpResponse, TransportError> {
    let mut easy = Easy::new();
    let mut extra: Vec<&str> = vec!["Accept: application/json"];
    match &body {
        RequestBody::Json(_) => extra.push("Content-Type: application/json"),
        // Let curl pick the multipart boundary.
        RequestBody::Form(_) | RequestBody::Empty => {}
    }
    configure(&mut easy, url, headers, &extra, opts)?;

    match body {
        RequestBody::Empty => {
            if method != "GET" {
                easy.custom_request(method)?;
            }
        }
        RequestBody::Json(bytes) => {
            easy.post(true)?;
            easy.post_fields_copy(&bytes)?;
        }
        RequestBody::Form(parts) => {
            easy.httppost(build_form(&parts)?)?;
        }
    }

    let mut received = Vec::new();
    {
        let cancel = cancel.clone();
        let mut transfer = easy.transfer();
        transfer.progress_function(move |_, _, _, _| !cancel.is_cancelled())?;
        transfer.write_function(|data| {
            received.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform().map_err(from_curl)?;
    }

    let status = easy.response_code()?;
    tracing::debug!(method, url, status, bytes = received.len(), "http round-trip");
    if !(200..300).contains(&status) {
        return Err(TransportError::from_status(status, &received));
    }
    Ok(HttpResponse {
        status,
        body: received,
    })
}

fn build_form(parts: &[FormPart]) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for part in parts {
        match part {
            FormPart::Text { name, value } => {
                form.part(name).contents(value.as_bytes()).add()?;
            }
            FormPart::File {
                name,
                path,
                content_type,
                filename,
            } => {
                let mut p = form.part(name);
                p.file(path);
                if let Some(ct) = content_type {
                    p.content_type(ct);
                }
                if let Some(fname) = filename {
                    p.filename(fname);
                }
                p.add()?;
            }
        }
    }
    Ok(form)
}

/// Parse a 2xx body as JSON; an empty body is `null`.
pub(crate) fn parse_json(body: &[u8]) -> Result<serde_json::Value, TransportError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_json_empty_is_null() {
        assert_eq!(parse_json(b"").unwrap(), serde_json::Value::Null);
        assert_eq!(parse_json(b" \n").unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn parse_json_rejects_html() {
        assert!(matches!(
            parse_json(b"<html>502 Bad Gateway</html>"),
            Err(TransportError::Json(_))
        ));
    }

    #[test]
    fn form_builds_text_parts() {
        let parts = vec![FormPart::text("storeId", "7"), FormPart::text("type", "IMAGE")];
        assert!(build_form(&parts).is_ok());
    }
}
