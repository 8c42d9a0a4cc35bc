//! Wire types for the PlayGodot automation protocol.
//!
//! This crate contains the serde-serializable types exchanged with an
//! automation-enabled engine build. They represent the "protocol layer": the
//! shapes of data as they appear on the wire.
//!
//! Types in this crate are pure data. Request correlation, transports and the
//! typed command surface are built on top of them in `playgodot-runtime` and
//! `playgodot`.

pub mod handshake;
pub mod key;
pub mod methods;
pub mod types;
pub mod variant;

pub use handshake::{Hello, HelloAck, PROTOCOL_VERSION};
pub use key::key_code;
pub use types::*;
pub use variant::{FromVariant, Variant, VariantError};
