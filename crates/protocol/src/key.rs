//! Key names accepted by `press_key` and their engine key codes.
//!
//! Codes follow the engine's `Key` enum: printable keys use their uppercase
//! ASCII value, special keys live above `SPECIAL` (`1 << 22`).

const SPECIAL: u32 = 1 << 22;

/// Named (non-printable) keys, lowercase.
const NAMED_KEYS: &[(&str, u32)] = &[
	("escape", SPECIAL + 0x01),
	("esc", SPECIAL + 0x01),
	("tab", SPECIAL + 0x02),
	("backtab", SPECIAL + 0x03),
	("backspace", SPECIAL + 0x04),
	("enter", SPECIAL + 0x05),
	("return", SPECIAL + 0x05),
	("kp_enter", SPECIAL + 0x06),
	("insert", SPECIAL + 0x07),
	("delete", SPECIAL + 0x08),
	("del", SPECIAL + 0x08),
	("pause", SPECIAL + 0x09),
	("print", SPECIAL + 0x0A),
	("home", SPECIAL + 0x0D),
	("end", SPECIAL + 0x0E),
	("left", SPECIAL + 0x0F),
	("up", SPECIAL + 0x10),
	("right", SPECIAL + 0x11),
	("down", SPECIAL + 0x12),
	("pageup", SPECIAL + 0x13),
	("pagedown", SPECIAL + 0x14),
	("shift", SPECIAL + 0x15),
	("ctrl", SPECIAL + 0x16),
	("control", SPECIAL + 0x16),
	("meta", SPECIAL + 0x17),
	("alt", SPECIAL + 0x18),
	("capslock", SPECIAL + 0x19),
	("numlock", SPECIAL + 0x1A),
	("scrolllock", SPECIAL + 0x1B),
	("f1", SPECIAL + 0x1C),
	("f2", SPECIAL + 0x1D),
	("f3", SPECIAL + 0x1E),
	("f4", SPECIAL + 0x1F),
	("f5", SPECIAL + 0x20),
	("f6", SPECIAL + 0x21),
	("f7", SPECIAL + 0x22),
	("f8", SPECIAL + 0x23),
	("f9", SPECIAL + 0x24),
	("f10", SPECIAL + 0x25),
	("f11", SPECIAL + 0x26),
	("f12", SPECIAL + 0x27),
	("space", 0x20),
	("minus", 0x2D),
	("period", 0x2E),
	("comma", 0x2C),
	("slash", 0x2F),
	("semicolon", 0x3B),
	("equal", 0x3D),
];

/// Resolves a key name to its key code.
///
/// Single letters and digits map to their printable code; everything else is
/// looked up case-insensitively in the named-key table.
pub fn key_code(name: &str) -> Option<u32> {
	let mut chars = name.chars();
	if let (Some(c), None) = (chars.next(), chars.next()) {
		if c.is_ascii_alphanumeric() {
			return Some(c.to_ascii_uppercase() as u32);
		}
		if c == ' ' {
			return Some(0x20);
		}
	}

	let lower = name.to_ascii_lowercase();
	NAMED_KEYS
		.iter()
		.find(|(key, _)| *key == lower)
		.map(|(_, code)| *code)
}
