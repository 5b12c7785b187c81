//! Structural summaries of host component types.
//!
//! The engine never inspects host types itself: the host registers a
//! [ComponentDescriptor] for every type a blueprint may instantiate,
//! carrying constructor closures, property setters and an optional
//! properties-set notification. Descriptors are produced through
//! [ComponentDescriptorBuilder], which rejects contract violations (no
//! constructor, duplicate feature or constructor names, empty factory
//! schemes) at registration time.

use crate::error::{DescriptorError, ErrorPtr};
use crate::factory::{FactoryPtr, ObjectFactory};
use crate::instance::{convert_error, BoxedInstance, InstancePtr, InstanceTypeError};
use derivative::Derivative;
use fxhash::FxHashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Invokes a host constructor with resolved feature values in formal order.
/// Unfilled optional features arrive as `None`.
pub type ConstructorFn =
    Arc<dyn Fn(&[Option<InstancePtr>]) -> Result<BoxedInstance, ErrorPtr> + Send + Sync>;

/// Applies one property value to a not-yet-shared instance.
pub type SetterFn =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync), InstancePtr) -> Result<(), ErrorPtr> + Send + Sync>;

/// The one-shot notification invoked after all properties have been applied.
pub type NotifyFn =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync)) -> Result<(), ErrorPtr> + Send + Sync>;

/// Casts a constructed factory part into the engine's factory handle. Written
/// by hosts as `factory_cast::<ConcreteFactory>`.
pub type FactoryCast = fn(InstancePtr) -> Option<FactoryPtr>;

/// Ready-made [FactoryCast] for a concrete host factory type.
pub fn factory_cast<F: ObjectFactory + Send + Sync + 'static>(
    instance: InstancePtr,
) -> Option<FactoryPtr> {
    instance.downcast::<F>().ok().map(|f| f as FactoryPtr)
}

/// The role a component plays in the assembled graph.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub enum ComponentRole {
    Ordinary,
    /// The component produces objects on demand for URIs under `scheme`.
    Factory {
        scheme: String,
        #[derivative(Debug = "ignore")]
        cast: FactoryCast,
    },
}

/// One formal constructor parameter: dependency-typed and positionally
/// ordered.
#[derive(Clone, Debug)]
pub struct FeatureDescriptor {
    pub name: String,
    pub declared_type: TypeId,
    pub type_name: String,
    pub required: bool,
}

impl FeatureDescriptor {
    pub fn required<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>().to_string(),
            required: true,
        }
    }

    pub fn optional<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required::<T>(name)
        }
    }

    /// A feature the engine passes through without a type check; the host
    /// constructor discriminates the value itself.
    pub fn dynamic(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            declared_type: dynamic_type_id(),
            type_name: "dynamic".to_string(),
            required,
        }
    }
}

/// Marker [TypeId] for dynamically typed slots; values assigned to such slots
/// skip assignability checks.
pub(crate) fn dynamic_type_id() -> TypeId {
    TypeId::of::<InstancePtr>()
}

/// One constructor of a component: an ordered feature list plus the invoking
/// closure.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ConstructorDescriptor {
    pub features: Vec<FeatureDescriptor>,
    #[derivative(Debug = "ignore")]
    pub invoke: ConstructorFn,
}

impl ConstructorDescriptor {
    pub fn new(
        features: Vec<FeatureDescriptor>,
        invoke: impl Fn(&[Option<InstancePtr>]) -> Result<BoxedInstance, ErrorPtr>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            features,
            invoke: Arc::new(invoke),
        }
    }
}

/// One settable property of a component.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct PropertyDescriptor {
    pub declared_type: TypeId,
    pub type_name: String,
    pub required: bool,
    #[derivative(Debug = "ignore")]
    pub setter: SetterFn,
}

impl PropertyDescriptor {
    /// A property with a raw setter closure.
    pub fn new<V: 'static>(required: bool, setter: SetterFn) -> Self {
        Self {
            declared_type: TypeId::of::<V>(),
            type_name: std::any::type_name::<V>().to_string(),
            required,
            setter,
        }
    }

    /// A scalar property applied with an infallible host setter.
    pub fn scalar<C, V>(required: bool, setter: impl Fn(&mut C, V) + Send + Sync + 'static) -> Self
    where
        C: Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        Self::fallible::<C, V>(required, move |component, value| {
            setter(component, value);
            Ok(())
        })
    }

    /// A scalar property applied with a setter that may raise.
    pub fn fallible<C, V>(
        required: bool,
        setter: impl Fn(&mut C, V) -> Result<(), ErrorPtr> + Send + Sync + 'static,
    ) -> Self
    where
        C: Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        Self::new::<V>(
            required,
            Arc::new(move |target, value| {
                let target = target.downcast_mut::<C>().ok_or_else(|| {
                    convert_error(InstanceTypeError {
                        expected: std::any::type_name::<C>(),
                    })
                })?;
                let value = value.downcast::<V>().map_err(|_| {
                    convert_error(InstanceTypeError {
                        expected: std::any::type_name::<V>(),
                    })
                })?;

                setter(target, (*value).clone())
            }),
        )
    }
}

/// Builds a [NotifyFn] for a concrete host type.
pub fn properties_set<C: Send + Sync + 'static>(
    notify: impl Fn(&mut C) -> Result<(), ErrorPtr> + Send + Sync + 'static,
) -> NotifyFn {
    Arc::new(move |target| {
        let target = target.downcast_mut::<C>().ok_or_else(|| {
            convert_error(InstanceTypeError {
                expected: std::any::type_name::<C>(),
            })
        })?;

        notify(target)
    })
}

/// The engine's structural summary of one host component type.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct ComponentDescriptor {
    pub type_name: String,
    pub role: ComponentRole,
    pub default_constructor: Option<ConstructorDescriptor>,
    pub named_constructors: FxHashMap<String, ConstructorDescriptor>,
    pub properties: FxHashMap<String, PropertyDescriptor>,
    #[derivative(Debug = "ignore")]
    pub on_properties_set: Option<NotifyFn>,
}

impl ComponentDescriptor {
    pub fn builder(type_name: impl Into<String>) -> ComponentDescriptorBuilder {
        ComponentDescriptorBuilder::new(type_name)
    }

    /// The factory scheme, for factory-role components.
    pub fn scheme(&self) -> Option<&str> {
        match &self.role {
            ComponentRole::Ordinary => None,
            ComponentRole::Factory { scheme, .. } => Some(scheme),
        }
    }

    /// Whether constructed instances receive the properties-set notification.
    pub fn notifies_properties_set(&self) -> bool {
        self.on_properties_set.is_some()
    }
}

/// Builder for [ComponentDescriptor], enforcing the descriptor invariants at
/// build time.
pub struct ComponentDescriptorBuilder {
    type_name: String,
    role: ComponentRole,
    default_constructor: Option<ConstructorDescriptor>,
    extra_default_constructor: bool,
    named_constructors: FxHashMap<String, ConstructorDescriptor>,
    duplicate_constructor: Option<String>,
    properties: FxHashMap<String, PropertyDescriptor>,
    duplicate_property: Option<String>,
    on_properties_set: Option<NotifyFn>,
}

impl ComponentDescriptorBuilder {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            role: ComponentRole::Ordinary,
            default_constructor: None,
            extra_default_constructor: false,
            named_constructors: FxHashMap::default(),
            duplicate_constructor: None,
            properties: FxHashMap::default(),
            duplicate_property: None,
            on_properties_set: None,
        }
    }

    pub fn with_default_constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        if self.default_constructor.is_some() {
            self.extra_default_constructor = true;
        }

        self.default_constructor = Some(constructor);
        self
    }

    pub fn with_named_constructor(
        mut self,
        name: impl Into<String>,
        constructor: ConstructorDescriptor,
    ) -> Self {
        let name = name.into();
        if self.named_constructors.contains_key(&name) {
            self.duplicate_constructor = Some(name.clone());
        }

        self.named_constructors.insert(name, constructor);
        self
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        property: PropertyDescriptor,
    ) -> Self {
        let name = name.into();
        if self.properties.contains_key(&name) {
            self.duplicate_property = Some(name.clone());
        }

        self.properties.insert(name, property);
        self
    }

    pub fn with_factory_scheme(mut self, scheme: impl Into<String>, cast: FactoryCast) -> Self {
        self.role = ComponentRole::Factory {
            scheme: scheme.into(),
            cast,
        };
        self
    }

    pub fn with_properties_set(mut self, notify: NotifyFn) -> Self {
        self.on_properties_set = Some(notify);
        self
    }

    pub fn build(self) -> Result<ComponentDescriptor, DescriptorError> {
        if self.default_constructor.is_none() && self.named_constructors.is_empty() {
            return Err(DescriptorError::NoConstructor {
                type_name: self.type_name,
            });
        }

        if self.extra_default_constructor {
            return Err(DescriptorError::MultipleDefaultConstructors {
                type_name: self.type_name,
            });
        }

        if let Some(constructor) = self.duplicate_constructor {
            return Err(DescriptorError::DuplicateNamedConstructor {
                type_name: self.type_name,
                constructor,
            });
        }

        if let Some(property) = self.duplicate_property {
            return Err(DescriptorError::DuplicateProperty {
                type_name: self.type_name,
                property,
            });
        }

        if let ComponentRole::Factory { scheme, .. } = &self.role {
            if scheme.is_empty() {
                return Err(DescriptorError::EmptyFactoryScheme {
                    type_name: self.type_name,
                });
            }
        }

        let constructors = self
            .default_constructor
            .iter()
            .map(|constructor| (None, constructor))
            .chain(
                self.named_constructors
                    .iter()
                    .map(|(name, constructor)| (Some(name.as_str()), constructor)),
            );

        for (name, constructor) in constructors {
            let mut seen = fxhash::FxHashSet::default();
            for feature in &constructor.features {
                if !seen.insert(feature.name.as_str()) {
                    return Err(DescriptorError::DuplicateFeature {
                        type_name: self.type_name,
                        constructor: name.unwrap_or("<default>").to_string(),
                        feature: feature.name.clone(),
                    });
                }
            }
        }

        Ok(ComponentDescriptor {
            type_name: self.type_name,
            role: self.role,
            default_constructor: self.default_constructor,
            named_constructors: self.named_constructors,
            properties: self.properties,
            on_properties_set: self.on_properties_set,
        })
    }
}
