//! Operation and event names used on the wire.

pub const HANDSHAKE: &str = "handshake";
pub const GET_NODE: &str = "get_node";
pub const GET_PROPERTY: &str = "get_property";
pub const SET_PROPERTY: &str = "set_property";
pub const CALL_METHOD: &str = "call_method";
pub const QUERY_NODES: &str = "query_nodes";
pub const CLICK: &str = "click";
pub const PRESS_KEY: &str = "press_key";
pub const SCREENSHOT: &str = "screenshot";
pub const GET_CURRENT_SCENE: &str = "get_current_scene";
pub const RELOAD_SCENE: &str = "reload_scene";
pub const SET_PAUSED: &str = "set_paused";
pub const IS_PAUSED: &str = "is_paused";
pub const SET_TIME_SCALE: &str = "set_time_scale";
pub const GET_TIME_SCALE: &str = "get_time_scale";
pub const QUIT: &str = "quit";

/// Unsolicited event categories.
pub mod events {
	pub const SCENE_CHANGED: &str = "scene_changed";
	pub const SCENE_READY: &str = "scene_ready";
	pub const LOG: &str = "log";
}

/// Error kinds reported by the target in error replies.
pub mod error_kinds {
	pub const NODE_NOT_FOUND: &str = "NodeNotFound";
	pub const PROPERTY_NOT_FOUND: &str = "PropertyNotFound";
	pub const METHOD_ERROR: &str = "MethodError";
	pub const UNKNOWN_KEY: &str = "UnknownKey";
	pub const NO_ACTIVE_SCENE: &str = "NoActiveScene";
	pub const RELOAD_FAILED: &str = "ReloadFailed";
	pub const INVALID_ARGUMENT: &str = "InvalidArgument";
}
