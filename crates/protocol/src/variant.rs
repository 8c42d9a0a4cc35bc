//! Tagged value type for arguments and results crossing the wire.
//!
//! Target-side values are loosely typed. [`Variant`] gives them a closed shape
//! so callers can validate and convert at the boundary instead of passing raw
//! JSON around.
//!
//! # JSON encoding
//!
//! | Variant | JSON |
//! |---|---|
//! | `Nil` | `null` |
//! | `Bool` | `true` / `false` |
//! | `Int` | integer number |
//! | `Float` | number with fraction (`2.0`) |
//! | `String` | string |
//! | `Array` | array |
//! | `Dictionary` | object, keys sorted |
//! | `Bytes` | `{"$bytes": "<base64>"}` |

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Object key marking a base64-encoded byte buffer.
///
/// The key is reserved: an object whose only entry is `"$bytes"` with a
/// string value always decodes as [`Variant::Bytes`], and a reply fails to
/// decode if that string is not valid base64. Such a dictionary cannot be
/// represented; add a second key to keep it a dictionary.
pub const BYTES_KEY: &str = "$bytes";

/// A dynamically typed value exchanged with the target.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
	/// Absence of a value.
	#[default]
	Nil,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	/// Ordered sequence.
	Array(Vec<Variant>),
	/// Key-ordered mapping.
	Dictionary(BTreeMap<String, Variant>),
	/// Raw binary payload (image data and the like).
	Bytes(Vec<u8>),
}

impl Variant {
	/// Wraps a byte buffer.
	pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
		Self::Bytes(data.into())
	}

	/// Short name of the contained type, used in conversion errors.
	pub fn type_name(&self) -> &'static str {
		match self {
			Self::Nil => "nil",
			Self::Bool(_) => "bool",
			Self::Int(_) => "int",
			Self::Float(_) => "float",
			Self::String(_) => "string",
			Self::Array(_) => "array",
			Self::Dictionary(_) => "dictionary",
			Self::Bytes(_) => "bytes",
		}
	}

	pub fn is_nil(&self) -> bool {
		matches!(self, Self::Nil)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(i) => Some(*i),
			_ => None,
		}
	}

	/// Returns the value as a float, widening integers.
	pub fn as_float(&self) -> Option<f64> {
		match self {
			Self::Float(f) => Some(*f),
			Self::Int(i) => Some(*i as f64),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<&[Variant]> {
		match self {
			Self::Array(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_dictionary(&self) -> Option<&BTreeMap<String, Variant>> {
		match self {
			Self::Dictionary(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_bytes(&self) -> Option<&[u8]> {
		match self {
			Self::Bytes(data) => Some(data),
			_ => None,
		}
	}

	/// Looks up `key` when this is a dictionary.
	pub fn get(&self, key: &str) -> Option<&Variant> {
		self.as_dictionary().and_then(|map| map.get(key))
	}

	/// Converts into a concrete Rust type.
	pub fn into_typed<T: FromVariant>(self) -> Result<T, VariantError> {
		T::from_variant(self)
	}
}

/// Conversion failure from [`Variant`] into a concrete type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected}, found {found}")]
pub struct VariantError {
	pub expected: &'static str,
	pub found: &'static str,
}

impl VariantError {
	fn new(expected: &'static str, found: &Variant) -> Self {
		Self {
			expected,
			found: found.type_name(),
		}
	}
}

/// Types that can be extracted from a [`Variant`].
pub trait FromVariant: Sized {
	fn from_variant(value: Variant) -> Result<Self, VariantError>;
}

impl FromVariant for Variant {
	fn from_variant(value: Variant) -> Result<Self, VariantError> {
		Ok(value)
	}
}

impl FromVariant for () {
	fn from_variant(_value: Variant) -> Result<Self, VariantError> {
		Ok(())
	}
}

impl FromVariant for bool {
	fn from_variant(value: Variant) -> Result<Self, VariantError> {
		value.as_bool().ok_or_else(|| VariantError::new("bool", &value))
	}
}

impl FromVariant for i64 {
	fn from_variant(value: Variant) -> Result<Self, VariantError> {
		value.as_int().ok_or_else(|| VariantError::new("int", &value))
	}
}

impl FromVariant for f64 {
	fn from_variant(value: Variant) -> Result<Self, VariantError> {
		value.as_float().ok_or_else(|| VariantError::new("float", &value))
	}
}

impl FromVariant for String {
	fn from_variant(value: Variant) -> Result<Self, VariantError> {
		match value {
			Variant::String(s) => Ok(s),
			other => Err(VariantError::new("string", &other)),
		}
	}
}

impl<T: FromVariant> FromVariant for Vec<T> {
	fn from_variant(value: Variant) -> Result<Self, VariantError> {
		match value {
			Variant::Array(items) => items.into_iter().map(T::from_variant).collect(),
			other => Err(VariantError::new("array", &other)),
		}
	}
}

impl<T: FromVariant> FromVariant for Option<T> {
	fn from_variant(value: Variant) -> Result<Self, VariantError> {
		match value {
			Variant::Nil => Ok(None),
			other => T::from_variant(other).map(Some),
		}
	}
}

impl FromVariant for BTreeMap<String, Variant> {
	fn from_variant(value: Variant) -> Result<Self, VariantError> {
		match value {
			Variant::Dictionary(map) => Ok(map),
			other => Err(VariantError::new("dictionary", &other)),
		}
	}
}

impl From<bool> for Variant {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i32> for Variant {
	fn from(value: i32) -> Self {
		Self::Int(value.into())
	}
}

impl From<i64> for Variant {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<u32> for Variant {
	fn from(value: u32) -> Self {
		Self::Int(value.into())
	}
}

impl From<f32> for Variant {
	fn from(value: f32) -> Self {
		Self::Float(value.into())
	}
}

impl From<f64> for Variant {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<&str> for Variant {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}

impl From<String> for Variant {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl From<Vec<Variant>> for Variant {
	fn from(value: Vec<Variant>) -> Self {
		Self::Array(value)
	}
}

impl From<BTreeMap<String, Variant>> for Variant {
	fn from(value: BTreeMap<String, Variant>) -> Self {
		Self::Dictionary(value)
	}
}

impl<T: Into<Variant>> From<Option<T>> for Variant {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Nil, Into::into)
	}
}

impl FromIterator<Variant> for Variant {
	fn from_iter<I: IntoIterator<Item = Variant>>(iter: I) -> Self {
		Self::Array(iter.into_iter().collect())
	}
}

impl fmt::Display for Variant {
	/// Compact rendering for logs and error messages. Byte buffers are
	/// summarized by length rather than dumped.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Nil => write!(f, "null"),
			Self::Bool(b) => write!(f, "{b}"),
			Self::Int(i) => write!(f, "{i}"),
			Self::Float(x) => write!(f, "{x:?}"),
			Self::String(s) => write!(f, "{s:?}"),
			Self::Array(items) => {
				write!(f, "[")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{item}")?;
				}
				write!(f, "]")
			}
			Self::Dictionary(map) => {
				write!(f, "{{")?;
				for (i, (key, value)) in map.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{key:?}: {value}")?;
				}
				write!(f, "}}")
			}
			Self::Bytes(data) => write!(f, "<{} bytes>", data.len()),
		}
	}
}

impl Serialize for Variant {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Self::Nil => serializer.serialize_unit(),
			Self::Bool(b) => serializer.serialize_bool(*b),
			Self::Int(i) => serializer.serialize_i64(*i),
			Self::Float(x) => serializer.serialize_f64(*x),
			Self::String(s) => serializer.serialize_str(s),
			Self::Array(items) => {
				let mut seq = serializer.serialize_seq(Some(items.len()))?;
				for item in items {
					seq.serialize_element(item)?;
				}
				seq.end()
			}
			Self::Dictionary(entries) => {
				let mut map = serializer.serialize_map(Some(entries.len()))?;
				for (key, value) in entries {
					map.serialize_entry(key, value)?;
				}
				map.end()
			}
			Self::Bytes(data) => {
				let mut map = serializer.serialize_map(Some(1))?;
				map.serialize_entry(BYTES_KEY, &BASE64_STANDARD.encode(data))?;
				map.end()
			}
		}
	}
}

impl<'de> Deserialize<'de> for Variant {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_any(VariantVisitor)
	}
}

struct VariantVisitor;

impl<'de> Visitor<'de> for VariantVisitor {
	type Value = Variant;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("a JSON-encoded variant")
	}

	fn visit_unit<E: de::Error>(self) -> Result<Variant, E> {
		Ok(Variant::Nil)
	}

	fn visit_none<E: de::Error>(self) -> Result<Variant, E> {
		Ok(Variant::Nil)
	}

	fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Variant, D::Error> {
		Variant::deserialize(deserializer)
	}

	fn visit_bool<E: de::Error>(self, v: bool) -> Result<Variant, E> {
		Ok(Variant::Bool(v))
	}

	fn visit_i64<E: de::Error>(self, v: i64) -> Result<Variant, E> {
		Ok(Variant::Int(v))
	}

	fn visit_u64<E: de::Error>(self, v: u64) -> Result<Variant, E> {
		Ok(i64::try_from(v).map_or(Variant::Float(v as f64), Variant::Int))
	}

	fn visit_f64<E: de::Error>(self, v: f64) -> Result<Variant, E> {
		Ok(Variant::Float(v))
	}

	fn visit_str<E: de::Error>(self, v: &str) -> Result<Variant, E> {
		Ok(Variant::String(v.to_string()))
	}

	fn visit_string<E: de::Error>(self, v: String) -> Result<Variant, E> {
		Ok(Variant::String(v))
	}

	fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Variant, A::Error> {
		let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
		while let Some(item) = seq.next_element()? {
			items.push(item);
		}
		Ok(Variant::Array(items))
	}

	fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Variant, A::Error> {
		let mut entries = BTreeMap::new();
		while let Some((key, value)) = access.next_entry::<String, Variant>()? {
			entries.insert(key, value);
		}

		if entries.len() == 1 {
			if let Some(Variant::String(encoded)) = entries.get(BYTES_KEY) {
				let data = BASE64_STANDARD
					.decode(encoded)
					.map_err(|e| de::Error::custom(format!("invalid {BYTES_KEY} payload: {e}")))?;
				return Ok(Variant::Bytes(data));
			}
		}

		Ok(Variant::Dictionary(entries))
	}
}
