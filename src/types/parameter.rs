use std::fmt;
use std::str::FromStr;

use crate::error::{MyRsError, Result};
use crate::types::Value;

/// The declared type of a bound value, written as a single character code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// `i`
    Integer,
    /// `s`
    String,
    /// `d`
    Double,
    /// `b`
    Binary,
}

impl ParamType {
    pub fn from_code(code: char) -> Result<Self> {
        match code {
            'i' => Ok(ParamType::Integer),
            's' => Ok(ParamType::String),
            'd' => Ok(ParamType::Double),
            'b' => Ok(ParamType::Binary),
            other => Err(MyRsError::InvalidParameterType(other.to_string())),
        }
    }

    pub fn code(self) -> char {
        match self {
            ParamType::Integer => 'i',
            ParamType::String => 's',
            ParamType::Double => 'd',
            ParamType::Binary => 'b',
        }
    }

    /// Convert a value to this type the way a native bind does.
    /// Unparseable numbers become zero; NULL stays NULL.
    pub fn coerce(self, value: &Value) -> Value {
        match (self, value) {
            (_, Value::Null) => Value::Null,
            (ParamType::Integer, v) => Value::Int(v.to_i64().unwrap_or(0)),
            (ParamType::Double, v) => Value::Double(v.to_f64().unwrap_or(0.0)),
            (ParamType::String, Value::Bytes(b)) => Value::Bytes(b.clone()),
            (ParamType::String, v) => Value::Text(v.to_string()),
            (ParamType::Binary, Value::Bytes(b)) => Value::Bytes(b.clone()),
            (ParamType::Binary, v) => Value::Bytes(v.to_string().into_bytes()),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for ParamType {
    type Err = MyRsError;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(code), None) => Self::from_code(code),
            _ => Err(MyRsError::InvalidParameterType(s.to_string())),
        }
    }
}

/// A typed value to bind into a prepared statement.
///
/// Parameters are positional: their order must match the `?` placeholders
/// in the query text.
///
/// # Example
/// ```
/// use myrs::{Parameter, ParamType};
///
/// let id = Parameter::new('i', 42).unwrap();
/// assert_eq!(id.param_type(), ParamType::Integer);
/// assert!(Parameter::new('x', 42).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    param_type: ParamType,
    value: Value,
}

impl Parameter {
    /// Creates a parameter from a type code (`i`, `s`, `d` or `b`).
    pub fn new(code: char, value: impl Into<Value>) -> Result<Self> {
        Ok(Self::typed(ParamType::from_code(code)?, value))
    }

    pub fn typed(param_type: ParamType, value: impl Into<Value>) -> Self {
        Self {
            param_type,
            value: value.into(),
        }
    }

    pub fn integer(value: impl Into<Value>) -> Self {
        Self::typed(ParamType::Integer, value)
    }

    pub fn string(value: impl Into<Value>) -> Self {
        Self::typed(ParamType::String, value)
    }

    pub fn double(value: impl Into<Value>) -> Self {
        Self::typed(ParamType::Double, value)
    }

    pub fn binary(value: impl Into<Value>) -> Self {
        Self::typed(ParamType::Binary, value)
    }

    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    pub fn type_code(&self) -> char {
        self.param_type.code()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Short single-line rendering of the value for error messages.
    pub(crate) fn clipped_value(&self) -> String {
        clip(&self.value.to_string())
    }
}

const CLIP_CHARS: usize = 100;

fn clip(raw: &str) -> String {
    let collapsed = raw.replace("\r\n", " ").replace(['\n', '\r'], " ");
    collapsed
        .chars()
        .take(CLIP_CHARS)
        .collect::<String>()
        .trim()
        .to_string()
}
