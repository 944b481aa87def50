//! Text-to-value conversion and completion.
//!
//! A [`ConverterRegistry`] holds converters in registration order. The first converter whose
//! [`Converter::supports`] accepts a `(type, option context)` pair owns both conversion and
//! completion for that pair; later converters for the same pair are never consulted.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::parser::MethodTarget;

mod path;
mod primitive;

pub use path::{CurrentDirectory, PathConverter, WorkingDirectory};
pub use primitive::{
    BooleanConverter, ChoiceConverter, DoubleConverter, FloatConverter, IntegerConverter,
    ShortConverter, StringConverter,
};

/// The argument types a command option can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Boolean,
    Integer,
    Short,
    Float,
    Double,
    Path,
    /// One keyword out of a list carried in the option context.
    Choice,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Short => "short",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Path => "path",
            ValueType::Choice => "choice",
        };
        f.write_str(name)
    }
}

/// A converted argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Boolean(bool),
    Integer(i64),
    Short(i16),
    Float(f32),
    Double(f64),
    Path(PathBuf),
    Choice(String),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Short(_) => ValueType::Short,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::Path(_) => ValueType::Path,
            Value::Choice(_) => ValueType::Choice,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Choice(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::Choice(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Short(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Double(x) => write!(f, "{}", x),
            Value::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// One completion candidate: what gets inserted, and what gets shown.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Completion {
    value: String,
    formatted_value: String,
}

impl Completion {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            formatted_value: value.clone(),
            value,
        }
    }

    pub fn with_formatted(value: impl Into<String>, formatted_value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            formatted_value: formatted_value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn formatted_value(&self) -> &str {
        &self.formatted_value
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("'{value}' is not a valid {value_type}: {reason}")]
    Invalid {
        value: String,
        value_type: ValueType,
        reason: String,
    },
    #[error("no converter available for {0} values")]
    Unsupported(ValueType),
    #[error("home directory could not be determined")]
    HomeDirNotFound,
    #[error("working directory unavailable: {0}")]
    WorkingDirectory(#[from] std::io::Error),
}

impl ConversionError {
    pub(crate) fn invalid(value: &str, value_type: ValueType, reason: impl fmt::Display) -> Self {
        ConversionError::Invalid {
            value: value.to_string(),
            value_type,
            reason: reason.to_string(),
        }
    }
}

/// Converts between the text a user types and typed [`Value`]s.
///
/// `option_context` is a converter-specific qualifier attached to a command option, for example
/// the keyword list of a [`ChoiceConverter`]. It is never absent; an option without one passes `""`.
pub trait Converter: Send + Sync {
    fn supports(&self, value_type: ValueType, option_context: &str) -> bool;

    fn convert_from_text(
        &self,
        text: &str,
        value_type: ValueType,
        option_context: &str,
    ) -> Result<Value, ConversionError>;

    /// Appends candidates for `existing` to `completions`.
    ///
    /// Returns `true` if every added candidate is a complete value, `false` if the user is
    /// expected to keep typing or completing.
    fn populate_completions(
        &self,
        completions: &mut Vec<Completion>,
        value_type: ValueType,
        existing: &str,
        option_context: &str,
        target: Option<&MethodTarget>,
    ) -> bool;
}

/// Ordered converter collection. Immutable once built.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: Vec<Box<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock converters, with paths resolved against `working_directory`.
    pub fn with_defaults(working_directory: Box<dyn WorkingDirectory>) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(StringConverter));
        registry.register(Box::new(BooleanConverter));
        registry.register(Box::new(IntegerConverter));
        registry.register(Box::new(ShortConverter));
        registry.register(Box::new(FloatConverter));
        registry.register(Box::new(DoubleConverter));
        registry.register(Box::new(ChoiceConverter));
        registry.register(Box::new(PathConverter::new(working_directory)));
        registry
    }

    pub fn register(&mut self, converter: Box<dyn Converter>) {
        self.converters.push(converter);
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn find(&self, value_type: ValueType, option_context: &str) -> Option<&dyn Converter> {
        self.converters
            .iter()
            .find(|c| c.supports(value_type, option_context))
            .map(|c| c.as_ref())
    }

    pub fn convert(
        &self,
        text: &str,
        value_type: ValueType,
        option_context: &str,
    ) -> Result<Value, ConversionError> {
        self.find(value_type, option_context)
            .ok_or(ConversionError::Unsupported(value_type))?
            .convert_from_text(text, value_type, option_context)
    }

    /// Completion through the selected converter only. No converter means no candidates.
    pub fn complete(
        &self,
        completions: &mut Vec<Completion>,
        value_type: ValueType,
        existing: &str,
        option_context: &str,
        target: Option<&MethodTarget>,
    ) -> bool {
        match self.find(value_type, option_context) {
            Some(converter) => converter.populate_completions(
                completions,
                value_type,
                existing,
                option_context,
                target,
            ),
            None => false,
        }
    }
}
