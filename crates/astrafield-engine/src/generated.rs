use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// File name used when the current image is saved.
pub const DOWNLOAD_FILE_NAME: &str = "astrafield-cover.png";

const FALLBACK_MIME: &str = "image/png";

/// Handle to the most recently generated image. Bytes are kept exactly as
/// received.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    id: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
    sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewInfo {
    pub format: String,
    pub width: u32,
    pub height: u32,
}

impl GeneratedImage {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        let sha256 = hex::encode(Sha256::digest(&bytes));
        Self {
            id: format!("blob:astrafield/{}", Uuid::new_v4()),
            content_type,
            bytes,
            sha256,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn short_digest(&self) -> &str {
        &self.sha256[..12]
    }

    /// Sniffs the encoded image for format and dimensions.
    pub fn preview(&self) -> Result<PreviewInfo> {
        let format = image::guess_format(&self.bytes).context("unrecognized image data")?;
        let decoded = image::load_from_memory_with_format(&self.bytes, format)
            .context("failed to decode generated image")?;
        Ok(PreviewInfo {
            format: format!("{format:?}").to_ascii_lowercase(),
            width: decoded.width(),
            height: decoded.height(),
        })
    }

    pub fn data_url(&self) -> String {
        let mime = self
            .content_type
            .as_deref()
            .map(|value| value.split(';').next().unwrap_or(value).trim())
            .filter(|value| value.starts_with("image/"))
            .unwrap_or(FALLBACK_MIME);
        format!("data:{mime};base64,{}", BASE64.encode(&self.bytes))
    }

    /// Writes the bytes to `dir/astrafield-cover.png`, replacing any
    /// previous download.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(DOWNLOAD_FILE_NAME);
        fs::write(&path, &self.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Writes a standalone HTML preview page with the image inlined.
    pub fn write_preview_html(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, preview_html(&self.data_url()))
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

fn preview_html(data_url: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>AstraField preview</title>\n<style>\nbody {{ margin: 0; min-height: 100vh; display: grid; place-items: center; background: #0e0e11; }}\nimg {{ max-width: 100%; max-height: 90vh; border-radius: 8px; }}\n</style>\n</head>\n<body>\n<img src=\"{data_url}\" alt=\"AstraField preview\">\n</body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};

    use super::{GeneratedImage, DOWNLOAD_FILE_NAME};

    fn png_bytes(width: u32, height: u32) -> anyhow::Result<Vec<u8>> {
        let image = RgbImage::from_pixel(width, height, Rgb([18, 202, 191]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    #[test]
    fn new_handle_gets_unique_blob_id_and_digest() {
        let first = GeneratedImage::new(b"abc".to_vec(), None);
        let second = GeneratedImage::new(b"abc".to_vec(), None);
        assert!(first.id().starts_with("blob:astrafield/"));
        assert_ne!(first.id(), second.id());
        assert_eq!(
            first.sha256(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(first.short_digest(), "ba7816bf8f01");
    }

    #[test]
    fn preview_reports_format_and_size() -> anyhow::Result<()> {
        let image = GeneratedImage::new(png_bytes(3, 2)?, Some("image/png".to_string()));
        let info = image.preview()?;
        assert_eq!(info.format, "png");
        assert_eq!((info.width, info.height), (3, 2));
        Ok(())
    }

    #[test]
    fn preview_fails_on_non_image_bytes() {
        let image = GeneratedImage::new(b"not an image".to_vec(), None);
        assert!(image.preview().is_err());
    }

    #[test]
    fn data_url_uses_declared_image_type() {
        let image = GeneratedImage::new(b"hi".to_vec(), Some("image/webp; q=1".to_string()));
        assert_eq!(image.data_url(), "data:image/webp;base64,aGk=");
        let unknown = GeneratedImage::new(b"hi".to_vec(), Some("text/plain".to_string()));
        assert_eq!(unknown.data_url(), "data:image/png;base64,aGk=");
    }

    #[test]
    fn save_to_reproduces_exact_bytes() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let bytes: Vec<u8> = (0..=255).collect();
        let image = GeneratedImage::new(bytes.clone(), Some("image/png".to_string()));
        let path = image.save_to(&temp.path().join("downloads"))?;
        assert_eq!(path.file_name().and_then(|name| name.to_str()), Some(DOWNLOAD_FILE_NAME));
        assert_eq!(std::fs::read(path)?, bytes);
        Ok(())
    }

    #[test]
    fn preview_html_inlines_data_url() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("preview.html");
        let image = GeneratedImage::new(b"hi".to_vec(), Some("image/png".to_string()));
        image.write_preview_html(&path)?;
        let html = std::fs::read_to_string(path)?;
        assert!(html.contains("src=\"data:image/png;base64,aGk=\""));
        Ok(())
    }
}
