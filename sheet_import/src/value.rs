//! Conversion of raw cell text into typed values.

use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};

/// A declared column type, as written in the type header row.
///
/// Tags are matched case-insensitively. Unknown tags are kept as [`TypeTag::Other`]
/// and behave like text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int,
    Float,
    Bool,
    String,
    Other(String),
}

/// A typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Bool(bool),
    Str(String),
}

/// A non-empty cell could not be parsed as its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    /// The declared type.
    pub tag: TypeTag,
    /// The offending cell text.
    pub raw: String,
}

utils::define_simple_error!(
    @main
    ConversionError:
    e => "cannot convert {:?} to `{}`", e.raw, e.tag
);

impl TypeTag {
    /// Parses a type tag. This never fails; unknown tags become [`TypeTag::Other`].
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case("int") {
            Self::Int
        } else if tag.eq_ignore_ascii_case("float") {
            Self::Float
        } else if tag.eq_ignore_ascii_case("bool") {
            Self::Bool
        } else if tag.eq_ignore_ascii_case("string") {
            Self::String
        } else {
            Self::Other(tag.to_owned())
        }
    }

    /// Gets the tag as written in a header row.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Other(tag) => tag,
        }
    }

    /// Gets the Rust type used for members of this type in generated sources.
    #[must_use]
    pub fn rust_type(&self) -> &'static str {
        match self {
            Self::Int => "i32",
            Self::Float => "f32",
            Self::Bool => "bool",
            Self::String | Self::Other(_) => "String",
        }
    }

    /// The inverse of [`TypeTag::rust_type`]. Unknown tags map to [`TypeTag::String`].
    #[must_use]
    pub fn from_rust_type(ty: &str) -> Option<Self> {
        match ty {
            "i32" => Some(Self::Int),
            "f32" => Some(Self::Float),
            "bool" => Some(Self::Bool),
            "String" => Some(Self::String),
            _ => None,
        }
    }

    /// Gets the value a member of this type holds before anything is assigned.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self {
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Bool => Value::Bool(false),
            Self::String | Self::Other(_) => Value::Str(String::new()),
        }
    }

    /// Whether a value of this tag may be stored in a member of type `member`.
    #[must_use]
    pub fn fits(&self, member: &TypeTag) -> bool {
        self.rust_type() == member.rust_type()
    }

    /// Converts raw cell text into a value of this type.
    ///
    /// Empty input yields the type's default value.
    pub fn coerce(&self, raw: &str) -> Result<Value, ConversionError> {
        let fail = || ConversionError { tag: self.clone(), raw: raw.to_owned() };

        let value = match self {
            Self::Int => {
                let raw = raw.trim();
                if raw.is_empty() {
                    Value::Int(0)
                } else {
                    Value::Int(raw.parse().map_err(|_| fail())?)
                }
            },
            Self::Float => {
                let raw = raw.trim();
                if raw.is_empty() {
                    Value::Float(0.0)
                } else {
                    Value::Float(raw.parse().map_err(|_| fail())?)
                }
            },
            Self::Bool => {
                let raw = raw.trim();
                if raw.is_empty() || raw.eq_ignore_ascii_case("false") {
                    Value::Bool(false)
                } else if raw.eq_ignore_ascii_case("true") {
                    Value::Bool(true)
                } else {
                    return Err(fail());
                }
            },
            Self::String | Self::Other(_) => Value::Str(raw.to_owned()),
        };

        Ok(value)
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Gets the tag matching this value's type.
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Int(_) => TypeTag::Int,
            Self::Float(_) => TypeTag::Float,
            Self::Bool(_) => TypeTag::Bool,
            Self::Str(_) => TypeTag::String,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => Display::fmt(v, f),
            Self::Float(v) => Display::fmt(v, f),
            Self::Bool(v) => Display::fmt(v, f),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(v) => serializer.serialize_i32(*v),
            Self::Float(v) => serializer.serialize_f32(*v),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Str(v) => serializer.serialize_str(v),
        }
    }
}

/// Converts `raw` according to the type tag `tag`.
///
/// Shorthand for [`TypeTag::parse`] followed by [`TypeTag::coerce`].
pub fn coerce(tag: &str, raw: &str) -> Result<Value, ConversionError> {
    TypeTag::parse(tag).coerce(raw)
}
