//! Pause and time-scale control for [`Godot`].

use playgodot_protocol::methods::{GET_TIME_SCALE, IS_PAUSED, SET_PAUSED, SET_TIME_SCALE};
use playgodot_protocol::Variant;
use playgodot_runtime::{Error, Result};
use serde_json::json;

use super::Godot;

impl Godot {
	/// Pauses the target's scene tree. Pausing twice is harmless.
	pub async fn pause(&self) -> Result<()> {
		self.set_paused(true).await
	}

	pub async fn unpause(&self) -> Result<()> {
		self.set_paused(false).await
	}

	pub async fn is_paused(&self) -> Result<bool> {
		let value = self.request(IS_PAUSED, json!({})).await?;
		value
			.as_bool()
			.ok_or_else(|| unexpected(IS_PAUSED, "bool", &value))
	}

	async fn set_paused(&self, paused: bool) -> Result<()> {
		self.request(SET_PAUSED, json!({ "paused": paused })).await?;
		Ok(())
	}

	/// Sets the engine time scale (`0.5` slow motion, `2.0` fast forward).
	///
	/// # Errors
	///
	/// Returns `Error::InvalidTimeScale` for zero, negative or non-finite
	/// factors, without contacting the target.
	pub async fn set_time_scale(&self, factor: f64) -> Result<()> {
		if !factor.is_finite() || factor <= 0.0 {
			return Err(Error::InvalidTimeScale(factor));
		}
		self.request(SET_TIME_SCALE, json!({ "scale": factor })).await?;
		Ok(())
	}

	pub async fn get_time_scale(&self) -> Result<f64> {
		let value = self.request(GET_TIME_SCALE, json!({})).await?;
		value
			.as_float()
			.ok_or_else(|| unexpected(GET_TIME_SCALE, "float", &value))
	}
}

fn unexpected(method: &str, expected: &str, value: &Variant) -> Error {
	Error::ProtocolError(format!("{method}: expected {expected}, got {value}"))
}
