use std::path::PathBuf;

use futures_util::StreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use tasksync_logging::{sync_debug, sync_info};
use url::Url;

use crate::api::{map_reqwest_error, ReqwestTaskApi};
use crate::device::DEVICE_ID_HEADER;
use crate::persist::{PersistError, StagedFile};
use crate::{ApiError, FailureKind};

/// Streams finished artifacts into the download directory.
pub struct ArtifactSaver {
    client: reqwest::Client,
    device_id: String,
    download_dir: PathBuf,
}

impl ArtifactSaver {
    pub fn new(api: &ReqwestTaskApi, download_dir: PathBuf) -> Self {
        Self {
            client: api.client().clone(),
            device_id: api.device_id().as_str().to_string(),
            download_dir,
        }
    }

    /// Downloads `url` and returns the saved path.
    ///
    /// The file name comes from `Content-Disposition`, falling back to
    /// `<task_id>.zip`. Nothing is left behind if the transfer fails midway.
    pub async fn save(&self, url: &str, task_id: &str) -> Result<PathBuf, ApiError> {
        let parsed =
            Url::parse(url).map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let response = self
            .client
            .get(parsed)
            .header(DEVICE_ID_HEADER, self.device_id.as_str())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_disposition)
            .map(|name| sanitize_filename(&name))
            .unwrap_or_else(|| format!("{}.zip", sanitize_filename(task_id)));

        let mut staged = StagedFile::create(&self.download_dir, &filename).map_err(persist_failure)?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            staged.write_chunk(&chunk).map_err(persist_failure)?;
            written += chunk.len() as u64;
            sync_debug!("task {task_id}: {written} bytes received");
        }
        let path = staged.commit().map_err(persist_failure)?;
        sync_info!("saved task {task_id} to {} ({written} bytes)", path.display());
        Ok(path)
    }
}

fn persist_failure(err: PersistError) -> ApiError {
    ApiError::new(FailureKind::Io, err.to_string())
}

/// Extracts the file name from a `Content-Disposition` value.
///
/// Prefers the RFC 5987 `filename*` form, which carries non-ASCII names.
pub(crate) fn filename_from_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("filename*") {
            // charset'lang'percent-encoded
            let Some(encoded) = raw.trim().splitn(3, '\'').nth(2) else {
                continue;
            };
            // Percent-decoding only; a literal `+` is not a space here.
            let escaped = encoded.replace('+', "%2B");
            let decoded = url::form_urlencoded::parse(format!("f={escaped}").as_bytes())
                .map(|(_, v)| v.into_owned())
                .next();
            if let Some(decoded) = decoded.filter(|name| !name.is_empty()) {
                return Some(decoded);
            }
        } else if key.eq_ignore_ascii_case("filename") {
            let unquoted = raw.trim().trim_matches('"');
            if !unquoted.is_empty() {
                plain = Some(unquoted.to_string());
            }
        }
    }
    plain
}

/// Makes a server-supplied name safe to create on any desktop filesystem.
pub fn sanitize_filename(input: &str) -> String {
    let mut cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]).to_string();
    if cleaned.is_empty() {
        cleaned = "download".to_string();
    }

    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    if compacted.chars().count() > 120 {
        compacted = compacted.chars().take(120).collect();
    }
    let stem_len = compacted.find('.').unwrap_or(compacted.len());
    if is_reserved_windows_name(&compacted[..stem_len]) {
        compacted.insert(stem_len, '_');
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}')
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
