//! playgodot: drive automation-enabled Godot builds from Rust
//!
//! This crate provides the public API for automating a running game: it
//! launches the engine, speaks its automation protocol, and exposes typed
//! commands for inspecting and mutating the scene tree, injecting input,
//! controlling time and scenes, capturing frames, and waiting for conditions.
//!
//! # Examples
//!
//! ## Playing a move
//!
//! ```ignore
//! use std::time::Duration;
//!
//! use playgodot::{Godot, LaunchOptions, Variant};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = LaunchOptions::builder()
//!         .binary("/opt/godot-automation")
//!         .ready_node("/root/Game")
//!         .build();
//!
//!     Godot::scoped("example-project", options, |game| async move {
//!         game.click("/root/Game/VBoxContainer/GameBoard/GridContainer/Cell4").await?;
//!         let board: Vec<String> = game.call_as("/root/Game", "get_board_state", &[]).await?;
//!         assert_eq!(board[4], "X");
//!
//!         game.wait_for_condition(
//!             || async { Ok(game.call_as::<String>("/root/Game", "get_current_player", &[]).await? == "O") },
//!             Duration::from_secs(2),
//!         )
//!         .await?;
//!         Ok::<_, playgodot::Error>(())
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Layers
//!
//! - [`playgodot_protocol`]: wire types ([`Variant`], [`NodeInfo`], ...)
//! - [`playgodot_runtime`]: process, transport, correlation, lifecycle
//! - this crate: [`Godot`] sessions, [`NodeRef`] handles, the [`Waiter`]

mod node;
mod options;
mod session;
mod waiter;

pub use node::NodeRef;
pub use options::{
	DEFAULT_CALL_TIMEOUT, DEFAULT_GRACE_PERIOD, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, LaunchOptions,
	LaunchOptionsBuilder, TransportMode,
};
pub use playgodot_protocol::{
	FromVariant, MouseButton, NodeInfo, SceneDescriptor, Variant, VariantError, Vector2, key_code,
};
pub use playgodot_runtime::{
	CallContext, Error, Event, EventStream, PipeTransport, Result, SessionState, TransportParts,
};
pub use session::{ClickTarget, Godot, PNG_SIGNATURE};
pub use waiter::{Check, Waiter};

/// Lower-level building blocks.
pub use playgodot_protocol as protocol;
pub use playgodot_runtime as runtime;
