//! Frame capture for [`Godot`].

use std::path::Path;

use playgodot_protocol::Variant;
use playgodot_protocol::methods::SCREENSHOT;
use playgodot_runtime::{Error, Result};
use serde_json::json;

use super::Godot;

/// First eight bytes of every PNG file.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

impl Godot {
	/// Captures the current frame as PNG bytes.
	///
	/// The buffer is empty when the target cannot render in its current mode.
	/// With `path`, the bytes are also written there.
	///
	/// # Errors
	///
	/// Returns `Error::ScreenshotWrite` if the file cannot be written.
	pub async fn screenshot(&self, path: Option<&Path>) -> Result<Vec<u8>> {
		let value = self.request(SCREENSHOT, json!({})).await?;
		let png = match value {
			Variant::Bytes(data) => data,
			Variant::Nil => Vec::new(),
			other => {
				return Err(Error::ProtocolError(format!(
					"screenshot: expected image bytes, got {}",
					other.type_name()
				)));
			}
		};

		if !png.is_empty() && !png.starts_with(&PNG_SIGNATURE) {
			tracing::warn!(len = png.len(), "screenshot does not start with a PNG signature");
		}

		if let Some(path) = path {
			tokio::fs::write(path, &png)
				.await
				.map_err(|source| Error::ScreenshotWrite {
					path: path.to_path_buf(),
					source,
				})?;
			tracing::debug!(path = %path.display(), bytes = png.len(), "screenshot saved");
		}

		Ok(png)
	}
}
