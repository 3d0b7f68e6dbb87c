//! Image pinning through the Pinata HTTP API.
//!
//! Without credentials a fixed mock hash is returned so the rest of the app
//! keeps working in development.

use crate::config::Config;
use crate::notify::{Notifier, Toast};
use crate::rpc::http_client;
use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::{json, Value};

pub const PIN_FILE_ENDPOINT: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";
pub const PINATA_GATEWAY: &str = "https://gateway.pinata.cloud/ipfs/";
pub const MOCK_HASH: &str = "QmNMELyizsfFdNZW3yKTi1SE2pEDjd1XLHf6MmuiXp6FVd";
pub const MOCK_GATEWAY: &str = "https://ipfs.io/ipfs/";
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_UPLOAD_TIMEOUT_MS: u64 = 60_000;

/// An image picked for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file, guessing the content type from its extension.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Ok(Self::new(name, content_type_for(&ext), bytes))
    }
}

pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageError {
    InvalidType,
    TooLarge,
}

impl ImageError {
    pub fn toast(&self) -> Toast {
        match self {
            ImageError::InvalidType => {
                Toast::error("Invalid file type", "Please select an image file")
            }
            ImageError::TooLarge => {
                Toast::error("File too large", "Please select an image smaller than 5MB")
            }
        }
    }
}

pub fn validate_image(file: &ImageFile) -> Result<(), ImageError> {
    if !file.content_type.starts_with("image/") {
        return Err(ImageError::InvalidType);
    }
    if file.bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge);
    }
    Ok(())
}

/// `data:` URL for showing the image before it is uploaded.
pub fn preview_data_url(file: &ImageFile) -> String {
    format!("data:{};base64,{}", file.content_type, STANDARD.encode(&file.bytes))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResult {
    fn ok(hash: &str, gateway: &str) -> Self {
        Self {
            success: true,
            hash: Some(hash.to_string()),
            url: Some(format!("{gateway}{hash}")),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[derive(Clone)]
struct Credentials {
    api_key: String,
    secret_api_key: String,
}

#[derive(Clone)]
pub struct PinningClient {
    credentials: Option<Credentials>,
    endpoint: String,
    timeout_ms: u64,
}

impl PinningClient {
    /// Both keys must be non-empty, otherwise uploads are mocked.
    pub fn new(api_key: Option<String>, secret_api_key: Option<String>) -> Self {
        let credentials = match (api_key, secret_api_key) {
            (Some(api_key), Some(secret_api_key))
                if !api_key.is_empty() && !secret_api_key.is_empty() =>
            {
                Some(Credentials {
                    api_key,
                    secret_api_key,
                })
            }
            _ => None,
        };
        Self {
            credentials,
            endpoint: PIN_FILE_ENDPOINT.to_string(),
            timeout_ms: DEFAULT_UPLOAD_TIMEOUT_MS,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.pinata_api_key.clone(), cfg.pinata_secret_api_key.clone())
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Whole-request limit for uploads (native only; browsers apply their own).
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn is_mock(&self) -> bool {
        self.credentials.is_none()
    }

    /// Upload, falling back to the mock hash without credentials.
    /// Failures come back inside the result.
    pub async fn upload(&self, file: &ImageFile) -> UploadResult {
        let Some(creds) = &self.credentials else {
            log::warn!("⚠️ IPFS API keys not configured, using mock service");
            return UploadResult::ok(MOCK_HASH, MOCK_GATEWAY);
        };

        match self.pin(creds, file).await {
            Ok(hash) => {
                log::info!("📌 Pinned {} as {hash}", file.name);
                UploadResult::ok(&hash, PINATA_GATEWAY)
            }
            Err(e) => {
                log::error!("❌ Error uploading to IPFS: {e:#}");
                UploadResult::failed(e.to_string())
            }
        }
    }

    async fn pin(&self, creds: &Credentials, file: &ImageFile) -> Result<String> {
        let now = chrono::Utc::now();
        let metadata = json!({
            "name": format!("disaster-image-{}", now.timestamp_millis()),
            "keyvalues": {
                "type": "disaster-report-image",
                "timestamp": now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            }
        });

        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("pinataMetadata", metadata.to_string())
            .text("pinataOptions", json!({"cidVersion": 0}).to_string());

        let req = http_client()
            .post(&self.endpoint)
            .header("pinata_api_key", &creds.api_key)
            .header("pinata_secret_api_key", &creds.secret_api_key)
            .multipart(form);
        #[cfg(not(target_arch = "wasm32"))]
        let req = req.timeout(std::time::Duration::from_millis(self.timeout_ms));

        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP error! status: {}", status.as_u16());
        }

        let body: Value = resp.json().await.context("Invalid pinning response")?;
        body["IpfsHash"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Pinning response missing IpfsHash"))
    }
}

/// Validate, upload and report the outcome as toasts. Returns the image URL.
pub async fn upload_image(
    client: &PinningClient,
    file: &ImageFile,
    notifier: &dyn Notifier,
) -> Option<String> {
    if let Err(e) = validate_image(file) {
        notifier.notify(e.toast());
        return None;
    }

    let result = client.upload(file).await;
    match (result.success, result.url) {
        (true, Some(url)) => {
            notifier.notify(Toast::info(
                "Image uploaded successfully",
                "Your image has been stored on IPFS",
            ));
            Some(url)
        }
        _ => {
            notifier.notify(Toast::error(
                "Upload failed",
                result
                    .error
                    .unwrap_or_else(|| "Failed to upload image".to_string()),
            ));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChannelNotifier;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn png(len: usize) -> ImageFile {
        ImageFile::new("flood.png", "image/png", vec![0x89; len])
    }

    /// One-shot HTTP server answering with a canned response.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let mut seen = Vec::new();
            // Read until the multipart terminator shows up
            loop {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                seen.extend_from_slice(&buf[..n]);
                if String::from_utf8_lossy(&seen).contains("name=\"pinataOptions\"")
                    && (seen.ends_with(b"--\r\n") || seen.ends_with(b"\r\n0\r\n\r\n"))
                {
                    break;
                }
            }
            let resp = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/pinning/pinFileToIPFS")
    }

    #[test]
    fn validates_type_and_size() {
        assert_eq!(validate_image(&png(10)), Ok(()));
        assert_eq!(validate_image(&png(MAX_IMAGE_BYTES)), Ok(()));
        assert_eq!(
            validate_image(&png(MAX_IMAGE_BYTES + 1)),
            Err(ImageError::TooLarge)
        );
        let pdf = ImageFile::new("doc.pdf", "application/pdf", vec![1]);
        assert_eq!(validate_image(&pdf), Err(ImageError::InvalidType));
    }

    #[test]
    fn preview_is_base64_data_url() {
        let file = ImageFile::new("a.gif", "image/gif", b"GIF89a".to_vec());
        assert_eq!(preview_data_url(&file), "data:image/gif;base64,R0lGODlh");
    }

    #[test]
    fn guesses_content_type() {
        assert_eq!(content_type_for("jpeg"), "image/jpeg");
        assert_eq!(content_type_for("txt"), "application/octet-stream");
    }

    #[tokio::test]
    async fn missing_credentials_use_mock() {
        let client = PinningClient::new(Some("key".into()), Some(String::new()));
        assert!(client.is_mock());
        let result = client.upload(&png(4)).await;
        assert!(result.success);
        assert_eq!(result.hash.as_deref(), Some(MOCK_HASH));
        assert_eq!(
            result.url.as_deref(),
            Some("https://ipfs.io/ipfs/QmNMELyizsfFdNZW3yKTi1SE2pEDjd1XLHf6MmuiXp6FVd")
        );
    }

    #[tokio::test]
    async fn pins_through_gateway() {
        let url = serve_once("200 OK", r#"{"IpfsHash":"QmTestHash","PinSize":4}"#).await;
        let client = PinningClient::new(Some("k".into()), Some("s".into())).with_endpoint(url);
        let result = client.upload(&png(4)).await;
        assert!(result.success, "{result:?}");
        assert_eq!(
            result.url.as_deref(),
            Some("https://gateway.pinata.cloud/ipfs/QmTestHash")
        );
    }

    #[tokio::test]
    async fn http_error_is_a_value() {
        let url = serve_once("401 Unauthorized", r#"{"error":"bad key"}"#).await;
        let client = PinningClient::new(Some("k".into()), Some("s".into())).with_endpoint(url);
        let result = client.upload(&png(4)).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("HTTP error! status: 401"));
    }

    #[tokio::test]
    async fn stalled_upload_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            // Swallow the request and never answer
            while sock.read(&mut buf).await.map(|n| n > 0).unwrap_or(false) {}
        });

        let client = PinningClient::new(Some("k".into()), Some("s".into()))
            .with_endpoint(format!("http://{addr}/pinning/pinFileToIPFS"))
            .with_timeout(300);
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            client.upload(&png(4)),
        )
        .await
        .expect("upload should give up on its own");
        assert!(!result.success);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn upload_image_toasts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = ChannelNotifier::new(tx);
        let client = PinningClient::new(None, None);

        let bad = ImageFile::new("x.txt", "text/plain", vec![1]);
        assert_eq!(upload_image(&client, &bad, &notifier).await, None);
        assert_eq!(rx.try_recv().unwrap().title, "Invalid file type");

        let url = upload_image(&client, &png(4), &notifier).await;
        assert!(url.unwrap().ends_with(MOCK_HASH));
        assert_eq!(rx.try_recv().unwrap().title, "Image uploaded successfully");
    }
}
