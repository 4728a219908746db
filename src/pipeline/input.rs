//! Input resolution: turn a user-supplied path or URL into a [`SelectedFile`].
//!
//! A selection carries a display name, the bytes, and a MIME type. The type
//! decides whether the controller accepts the file; it comes from the caller
//! when known (an upload's `Content-Type`) and is otherwise sniffed from the
//! `%PDF` magic bytes. Nothing is validated here beyond reachability: a file
//! of the wrong type is still returned so the controller can reject it the
//! same way for every front end.

use crate::error::Resume2JsonError;
use std::path::Path;
use tracing::{debug, info};

/// MIME type accepted by the pipeline.
pub const PDF_MIME_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF";

/// One file chosen for conversion.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// A selection whose MIME type is sniffed from `bytes`.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mime_type = sniff_mime_type(&bytes).map(str::to_string);
        Self {
            name: name.into(),
            mime_type,
            bytes,
        }
    }

    /// A selection with a caller-declared MIME type.
    pub fn with_mime_type(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: Some(mime_type.into()),
            bytes,
        }
    }

    /// True when the MIME type is `application/pdf`, ignoring parameters
    /// and case.
    pub fn is_pdf(&self) -> bool {
        self.mime_type
            .as_deref()
            .and_then(|m| m.split(';').next())
            .is_some_and(|m| m.trim().eq_ignore_ascii_case(PDF_MIME_TYPE))
    }
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// `application/pdf` when `bytes` start with the PDF header.
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    bytes.starts_with(PDF_MAGIC).then_some(PDF_MIME_TYPE)
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a local path or HTTP(S) URL into a [`SelectedFile`].
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SelectedFile, Resume2JsonError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input)).await
    }
}

async fn resolve_local(path: &Path) -> Result<SelectedFile, Resume2JsonError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Resume2JsonError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Resume2JsonError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    debug!("Read local file: {} ({} bytes)", path.display(), bytes.len());
    Ok(SelectedFile::from_bytes(file_name_of(path), bytes))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<SelectedFile, Resume2JsonError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| Resume2JsonError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Resume2JsonError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    info!("Downloaded {} bytes", bytes.len());

    Ok(SelectedFile::from_bytes(filename_from_url(url), bytes.to_vec()))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Last path segment of `url` when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/cv.pdf"));
        assert!(is_url("http://example.com/cv.pdf"));
        assert!(!is_url("/tmp/cv.pdf"));
        assert!(!is_url("cv.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_sniff_pdf_magic() {
        let file = SelectedFile::from_bytes("cv.pdf", b"%PDF-1.7\n".to_vec());
        assert_eq!(file.mime_type.as_deref(), Some(PDF_MIME_TYPE));
        assert!(file.is_pdf());

        let file = SelectedFile::from_bytes("cv.pdf", b"PK\x03\x04".to_vec());
        assert_eq!(file.mime_type, None);
        assert!(!file.is_pdf());
    }

    #[test]
    fn test_declared_mime_type_wins() {
        assert!(SelectedFile::with_mime_type("a", "Application/PDF", vec![]).is_pdf());
        assert!(SelectedFile::with_mime_type("a", "application/pdf; charset=binary", vec![]).is_pdf());
        assert!(!SelectedFile::with_mime_type("a", "image/png", b"%PDF".to_vec()).is_pdf());
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(filename_from_url("https://x.test/files/jane.pdf?dl=1"), "jane.pdf");
        assert_eq!(filename_from_url("https://x.test/download/"), "downloaded.pdf");
    }

    #[test]
    fn test_debug_hides_bytes() {
        let file = SelectedFile::from_bytes("cv.pdf", vec![0; 10]);
        assert!(format!("{file:?}").contains("bytes: 10"));
    }

    #[tokio::test]
    async fn test_resolve_local_file() {
        let mut tmp = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        tmp.write_all(b"%PDF-1.4 minimal").unwrap();
        let file = resolve_input(tmp.path().to_str().unwrap(), 5).await.unwrap();
        assert!(file.is_pdf());
        assert!(file.name.ends_with(".pdf"));
        assert_eq!(file.bytes, b"%PDF-1.4 minimal");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/here/cv.pdf", 5).await.unwrap_err();
        assert!(matches!(err, Resume2JsonError::FileNotFound { .. }));
    }
}
