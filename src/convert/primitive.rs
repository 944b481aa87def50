use std::str::FromStr;

use super::{Completion, ConversionError, Converter, Value, ValueType};
use crate::parser::MethodTarget;

#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl Converter for StringConverter {
    fn supports(&self, value_type: ValueType, _option_context: &str) -> bool {
        value_type == ValueType::String
    }

    fn convert_from_text(
        &self,
        text: &str,
        _value_type: ValueType,
        _option_context: &str,
    ) -> Result<Value, ConversionError> {
        Ok(Value::String(text.to_string()))
    }

    fn populate_completions(
        &self,
        _completions: &mut Vec<Completion>,
        _value_type: ValueType,
        _existing: &str,
        _option_context: &str,
        _target: Option<&MethodTarget>,
    ) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl Converter for BooleanConverter {
    fn supports(&self, value_type: ValueType, _option_context: &str) -> bool {
        value_type == ValueType::Boolean
    }

    fn convert_from_text(
        &self,
        text: &str,
        value_type: ValueType,
        _option_context: &str,
    ) -> Result<Value, ConversionError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Value::Boolean(true)),
            "false" | "no" | "0" => Ok(Value::Boolean(false)),
            _ => Err(ConversionError::invalid(
                text,
                value_type,
                "expected true, false, yes, no, 1 or 0",
            )),
        }
    }

    fn populate_completions(
        &self,
        completions: &mut Vec<Completion>,
        _value_type: ValueType,
        existing: &str,
        _option_context: &str,
        _target: Option<&MethodTarget>,
    ) -> bool {
        let existing = existing.to_ascii_lowercase();
        completions.extend(
            ["true", "false"]
                .into_iter()
                .filter(|candidate| candidate.starts_with(&existing))
                .map(Completion::new),
        );
        true
    }
}

fn parse_number<N>(text: &str, value_type: ValueType) -> Result<N, ConversionError>
where
    N: FromStr,
    N::Err: std::fmt::Display,
{
    text.trim()
        .parse::<N>()
        .map_err(|e| ConversionError::invalid(text, value_type, e))
}

/// Declares a converter for a numeric type: no completions, incomplete.
macro_rules! numeric_converter {
    ($name:ident, $value_type:ident, $number:ty) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Converter for $name {
            fn supports(&self, value_type: ValueType, _option_context: &str) -> bool {
                value_type == ValueType::$value_type
            }

            fn convert_from_text(
                &self,
                text: &str,
                value_type: ValueType,
                _option_context: &str,
            ) -> Result<Value, ConversionError> {
                parse_number::<$number>(text, value_type).map(Value::$value_type)
            }

            fn populate_completions(
                &self,
                _completions: &mut Vec<Completion>,
                _value_type: ValueType,
                _existing: &str,
                _option_context: &str,
                _target: Option<&MethodTarget>,
            ) -> bool {
                false
            }
        }
    };
}

numeric_converter!(IntegerConverter, Integer, i64);
numeric_converter!(ShortConverter, Short, i16);
numeric_converter!(FloatConverter, Float, f32);
numeric_converter!(DoubleConverter, Double, f64);

/// Restricts input to the comma-separated keywords in the option context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChoiceConverter;

impl ChoiceConverter {
    fn choices(option_context: &str) -> impl Iterator<Item = &str> {
        option_context
            .split(',')
            .map(str::trim)
            .filter(|choice| !choice.is_empty())
    }
}

impl Converter for ChoiceConverter {
    fn supports(&self, value_type: ValueType, _option_context: &str) -> bool {
        value_type == ValueType::Choice
    }

    fn convert_from_text(
        &self,
        text: &str,
        value_type: ValueType,
        option_context: &str,
    ) -> Result<Value, ConversionError> {
        let wanted = text.trim();
        Self::choices(option_context)
            .find(|choice| choice.eq_ignore_ascii_case(wanted))
            .map(|choice| Value::Choice(choice.to_string()))
            .ok_or_else(|| {
                ConversionError::invalid(
                    text,
                    value_type,
                    format!("expected one of: {}", option_context),
                )
            })
    }

    fn populate_completions(
        &self,
        completions: &mut Vec<Completion>,
        _value_type: ValueType,
        existing: &str,
        option_context: &str,
        _target: Option<&MethodTarget>,
    ) -> bool {
        let prefix = existing.to_lowercase();
        completions.extend(
            Self::choices(option_context)
                .filter(|choice| choice.to_lowercase().starts_with(&prefix))
                .map(Completion::new),
        );
        true
    }
}
