//! Streaming GET into a local file, and the pre-flight request used before
//! authenticated downloads.

use std::cell::Cell;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use curl::easy::Easy;
use tokio_util::sync::CancellationToken;

use super::error::{from_curl, TransportError};
use super::request::configure;
use super::HttpOptions;
use crate::storage;

/// Error bodies are small JSON envelopes; anything past this is dropped.
const ERROR_BODY_LIMIT: usize = 64 * 1024;

/// Tracks the status (and filename hint) of the final response in a redirect chain.
#[derive(Default)]
struct StatusLine(Cell<Option<u32>>, Cell<Option<&'static str>>);

impl StatusLine {
    fn observe(&self, header: &[u8]) {
        if let Some(code) = parse_status_line(header) {
            self.0.set(Some(code));
            self.1.set(None);
            return;
        }
        let Ok(line) = std::str::from_utf8(header) else {
            return;
        };
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-disposition") {
                self.1.set(storage::extension_from_disposition(value.trim()));
            }
        }
    }

    /// Extension named by the server's `Content-Disposition`, if any.
    fn extension_hint(&self) -> Option<&'static str> {
        self.1.get()
    }

    fn is_success(&self) -> bool {
        matches!(self.0.get(), Some(c) if (200..300).contains(&c))
    }
}

/// Parse `HTTP/1.1 403 Forbidden` into 403. Other header lines yield `None`.
pub(crate) fn parse_status_line(header: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(header).ok()?.trim();
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Downloads `url` into `dest`, going through `<dest>.part` and renaming on success.
/// Non-2xx bodies are kept in memory and turned into a [`TransportError::Http`].
///
/// When the server names an image file with a different extension in
/// `Content-Disposition`, the final file takes that extension instead; the
/// returned path is authoritative. No `.part` file survives a failure.
pub(crate) fn download_to_file(
    url: &str,
    dest: &Path,
    headers: &HashMap<String, String>,
    opts: &HttpOptions,
    cancel: &CancellationToken,
) -> Result<PathBuf, TransportError> {
    let part_path = storage::temp_path(dest);
    let result = download_part(url, dest, &part_path, headers, opts, cancel);
    if result.is_err() {
        let _ = std::fs::remove_file(&part_path);
    }
    result
}

fn download_part(
    url: &str,
    dest: &Path,
    part_path: &Path,
    headers: &HashMap<String, String>,
    opts: &HttpOptions,
    cancel: &CancellationToken,
) -> Result<PathBuf, TransportError> {
    let status = StatusLine::default();
    let mut error_body = Vec::new();
    let mut write_error: Option<std::io::Error> = None;
    let mut written = 0u64;

    let mut easy = Easy::new();
    configure(&mut easy, url, headers, &[], opts)?;
    let mut file = File::create(part_path)?;
    let result = {
        let cancel = cancel.clone();
        let mut transfer = easy.transfer();
        transfer.progress_function(move |_, _, _, _| !cancel.is_cancelled())?;
        transfer.header_function(|h| {
            status.observe(h);
            true
        })?;
        transfer.write_function(|data| {
            if !status.is_success() {
                let room = ERROR_BODY_LIMIT.saturating_sub(error_body.len());
                error_body.extend_from_slice(&data[..data.len().min(room)]);
                return Ok(data.len());
            }
            match file.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    write_error = Some(e);
                    Ok(0) // abort transfer
                }
            }
        })?;
        transfer.perform()
    };

    if let Err(e) = result {
        if e.is_write_error() {
            if let Some(io) = write_error {
                return Err(TransportError::Io(io));
            }
        }
        return Err(from_curl(e));
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(TransportError::from_status(code, &error_body));
    }

    file.sync_all()?;
    drop(file);
    let final_path = match status.extension_hint() {
        Some(ext) if dest.extension().and_then(|e| e.to_str()) != Some(ext) => {
            dest.with_extension(ext)
        }
        _ => dest.to_path_buf(),
    };
    std::fs::rename(part_path, &final_path)?;
    tracing::debug!(url, dest = %final_path.display(), bytes = written, "download complete");
    Ok(final_path)
}

/// Issues a one-byte ranged GET and reports the server's structured error, if any.
///
/// Once a 2xx status is seen the body is not read; the aborted transfer
/// still counts as success.
pub(crate) fn preflight(
    url: &str,
    headers: &HashMap<String, String>,
    opts: &HttpOptions,
    cancel: &CancellationToken,
) -> Result<(), TransportError> {
    let status = StatusLine::default();
    let mut error_body = Vec::new();

    let mut easy = Easy::new();
    configure(&mut easy, url, headers, &[], opts)?;
    easy.range("0-0")?;
    let result = {
        let cancel = cancel.clone();
        let mut transfer = easy.transfer();
        transfer.progress_function(move |_, _, _, _| !cancel.is_cancelled())?;
        transfer.header_function(|h| {
            status.observe(h);
            true
        })?;
        transfer.write_function(|data| {
            if status.is_success() {
                return Ok(0);
            }
            let room = ERROR_BODY_LIMIT.saturating_sub(error_body.len());
            error_body.extend_from_slice(&data[..data.len().min(room)]);
            Ok(data.len())
        })?;
        transfer.perform()
    };

    match result {
        Ok(()) => {}
        Err(e) if e.is_write_error() && status.is_success() => {}
        Err(e) => return Err(from_curl(e)),
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(TransportError::from_status(code, &error_body));
    }
    Ok(())
}
