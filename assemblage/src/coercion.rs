//! Conversion of textual and factory-produced values into declared slot
//! types.
//!
//! Coercion applies three rules in order: identity when the types already
//! match, a user-declared conversion between the source and target types, and
//! finally a registered textual parser for the target type. The standard
//! scalar parsers (integers, floats, `bool`, `char`, `String`, [Uuid],
//! [Uri](crate::model::Uri)) are pre-registered; hosts add their own with
//! [CoercionRegistry::register_parser] and
//! [CoercionRegistry::register_conversion]. A coercion failure is a
//! recoverable per-slot error.

use crate::error::ErrorPtr;
use crate::instance::{convert_error, instance_of, InstancePtr, InstanceTypeError};
use crate::model::Uri;
use fxhash::FxHashMap;
use std::any::{Any, TypeId};
use std::error::Error;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// A failed value coercion; recorded against the owning slot, never fatal for
/// the pass.
#[derive(Error, Clone, Debug)]
pub enum CoercionError {
    #[error("no parser is registered for target type '{type_name}'")]
    NoParser { type_name: String },
    #[error("cannot parse '{value}' as '{type_name}': {source}")]
    ParseFailure {
        value: String,
        type_name: String,
        source: ErrorPtr,
    },
    #[error("no conversion reaches target type '{type_name}'")]
    NoConversion { type_name: String },
    #[error("conversion to '{type_name}' failed: {source}")]
    ConversionFailure { type_name: String, source: ErrorPtr },
}

type ParseFn = Arc<dyn Fn(&str) -> Result<InstancePtr, ErrorPtr> + Send + Sync>;
type ConvertFn = Arc<dyn Fn(&InstancePtr) -> Result<InstancePtr, ErrorPtr> + Send + Sync>;

/// Registry of textual parsers and user-declared conversions.
#[derive(Clone)]
pub struct CoercionRegistry {
    parsers: FxHashMap<TypeId, ParseFn>,
    conversions: FxHashMap<(TypeId, TypeId), ConvertFn>,
}

impl CoercionRegistry {
    /// An empty registry without even the standard parsers.
    pub fn empty() -> Self {
        Self {
            parsers: FxHashMap::default(),
            conversions: FxHashMap::default(),
        }
    }

    /// Registers the textual parser for `T` via its [FromStr]
    /// implementation, replacing any previous parser for `T`.
    pub fn register_parser<T>(&mut self)
    where
        T: FromStr + Send + Sync + 'static,
        T::Err: Error + Send + Sync + 'static,
    {
        self.parsers.insert(
            TypeId::of::<T>(),
            Arc::new(|value| {
                value
                    .parse::<T>()
                    .map(instance_of)
                    .map_err(convert_error)
            }),
        );
    }

    /// Declares a conversion from `S` to `T`, replacing any previous
    /// conversion between the pair.
    pub fn register_conversion<S, T>(
        &mut self,
        convert: impl Fn(&S) -> Result<T, ErrorPtr> + Send + Sync + 'static,
    ) where
        S: Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        self.conversions.insert(
            (TypeId::of::<S>(), TypeId::of::<T>()),
            Arc::new(move |value| {
                let source = value.downcast_ref::<S>().ok_or_else(|| {
                    convert_error(InstanceTypeError {
                        expected: std::any::type_name::<S>(),
                    })
                })?;

                convert(source).map(instance_of)
            }),
        );
    }

    /// Coerces a textual value into the target type: identity for string
    /// targets, then a declared `String`-source conversion, then the
    /// registered parser.
    pub fn coerce_str(
        &self,
        value: &str,
        target: TypeId,
        target_name: &str,
    ) -> Result<InstancePtr, CoercionError> {
        if target == TypeId::of::<String>() {
            return Ok(instance_of(value.to_string()));
        }

        if let Some(convert) = self.conversions.get(&(TypeId::of::<String>(), target)) {
            let source = instance_of(value.to_string());
            return convert(&source).map_err(|source| CoercionError::ConversionFailure {
                type_name: target_name.to_string(),
                source,
            });
        }

        let parse = self
            .parsers
            .get(&target)
            .ok_or_else(|| CoercionError::NoParser {
                type_name: target_name.to_string(),
            })?;

        parse(value).map_err(|source| CoercionError::ParseFailure {
            value: value.to_string(),
            type_name: target_name.to_string(),
            source,
        })
    }

    /// Coerces an already constructed value into the target type: identity,
    /// then a declared conversion, then — for string values — the textual
    /// parser path.
    pub fn coerce_value(
        &self,
        value: &InstancePtr,
        target: TypeId,
        target_name: &str,
    ) -> Result<InstancePtr, CoercionError> {
        let source_type = (**value).type_id();
        if source_type == target {
            return Ok(value.clone());
        }

        if let Some(convert) = self.conversions.get(&(source_type, target)) {
            return convert(value).map_err(|source| CoercionError::ConversionFailure {
                type_name: target_name.to_string(),
                source,
            });
        }

        if let Some(text) = value.downcast_ref::<String>() {
            return self.coerce_str(text, target, target_name);
        }

        Err(CoercionError::NoConversion {
            type_name: target_name.to_string(),
        })
    }
}

impl Default for CoercionRegistry {
    /// A registry with the standard scalar parsers pre-registered.
    fn default() -> Self {
        let mut registry = Self::empty();

        registry.register_parser::<i8>();
        registry.register_parser::<i16>();
        registry.register_parser::<i32>();
        registry.register_parser::<i64>();
        registry.register_parser::<i128>();
        registry.register_parser::<isize>();
        registry.register_parser::<u8>();
        registry.register_parser::<u16>();
        registry.register_parser::<u32>();
        registry.register_parser::<u64>();
        registry.register_parser::<u128>();
        registry.register_parser::<usize>();
        registry.register_parser::<f32>();
        registry.register_parser::<f64>();
        registry.register_parser::<bool>();
        registry.register_parser::<char>();
        registry.register_parser::<Uuid>();
        registry.register_parser::<Uri>();

        registry
    }
}

#[cfg(test)]
mod tests {
    use crate::coercion::{CoercionError, CoercionRegistry};
    use crate::instance::{downcast_instance, instance_of};
    use std::any::TypeId;

    #[test]
    fn should_parse_standard_scalars() {
        let registry = CoercionRegistry::default();

        let value = registry
            .coerce_str("54", TypeId::of::<i64>(), "i64")
            .unwrap();
        assert_eq!(*downcast_instance::<i64>(&value).unwrap(), 54);

        let value = registry
            .coerce_str("true", TypeId::of::<bool>(), "bool")
            .unwrap();
        assert!(*downcast_instance::<bool>(&value).unwrap());
    }

    #[test]
    fn should_pass_strings_through_unparsed() {
        let registry = CoercionRegistry::empty();

        let value = registry
            .coerce_str("plain", TypeId::of::<String>(), "String")
            .unwrap();
        assert_eq!(*downcast_instance::<String>(&value).unwrap(), "plain");
    }

    #[test]
    fn should_report_parse_failures() {
        let registry = CoercionRegistry::default();

        assert!(matches!(
            registry
                .coerce_str("not-a-number", TypeId::of::<i32>(), "i32")
                .unwrap_err(),
            CoercionError::ParseFailure { .. }
        ));
        assert!(matches!(
            registry
                .coerce_str("anything", TypeId::of::<Vec<u8>>(), "Vec<u8>")
                .unwrap_err(),
            CoercionError::NoParser { .. }
        ));
    }

    #[test]
    fn should_prefer_user_conversions() {
        struct Celsius(f64);
        struct Fahrenheit(f64);

        let mut registry = CoercionRegistry::default();
        registry.register_conversion::<Celsius, Fahrenheit>(|celsius| {
            Ok(Fahrenheit(celsius.0 * 9.0 / 5.0 + 32.0))
        });

        let value = instance_of(Celsius(100.0));
        let converted = registry
            .coerce_value(&value, TypeId::of::<Fahrenheit>(), "Fahrenheit")
            .unwrap();
        assert_eq!(
            downcast_instance::<Fahrenheit>(&converted).unwrap().0,
            212.0
        );
    }

    #[test]
    fn should_coerce_string_values_through_parsers() {
        let registry = CoercionRegistry::default();

        let value = instance_of("54".to_string());
        let coerced = registry
            .coerce_value(&value, TypeId::of::<i64>(), "i64")
            .unwrap();
        assert_eq!(*downcast_instance::<i64>(&coerced).unwrap(), 54);

        let identity = registry
            .coerce_value(&value, TypeId::of::<String>(), "String")
            .unwrap();
        assert_eq!(*downcast_instance::<String>(&identity).unwrap(), "54");

        let opaque = instance_of(vec![0u8]);
        assert!(matches!(
            registry
                .coerce_value(&opaque, TypeId::of::<i64>(), "i64")
                .unwrap_err(),
            CoercionError::NoConversion { .. }
        ));
    }
}
