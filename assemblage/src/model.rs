//! The in-memory blueprint model.
//!
//! A [Blueprint] is a declarative description of part instances and their
//! relationships, typically produced by a
//! [BlueprintReader](crate::document::BlueprintReader). Parts, references and
//! property values are tagged variants, so consumers match exhaustively
//! instead of probing types at runtime. The model is plain data: deep-copying
//! it is a single [Clone] and mutating it never touches constructed objects.

use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Canonical 128-bit part identifier, rendered as lowercase hyphenated
/// hexadecimal.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct PartId(Uuid);

impl PartId {
    /// Creates a fresh random identifier. The resolver uses this to synthesise
    /// temporary identifiers for parts declared without one.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for PartId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<PartId> for Uuid {
    fn from(value: PartId) -> Self {
        value.0
    }
}

impl Display for PartId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

#[derive(Error, Clone, Eq, PartialEq, Debug)]
#[error("invalid part identifier: {0}")]
pub struct InvalidPartId(String);

impl FromStr for PartId {
    type Err = InvalidPartId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::try_parse(s)
            .map(Self)
            .map_err(|_| InvalidPartId(s.to_string()))
    }
}

/// A URI with a validated scheme. The engine only interprets the scheme (it
/// selects the producing factory); the remainder is opaque and handed to the
/// factory verbatim.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct Uri {
    raw: String,
    scheme_end: usize,
}

impl Uri {
    pub fn scheme(&self) -> &str {
        &self.raw[..self.scheme_end]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Error, Clone, Eq, PartialEq, Debug)]
#[error("invalid URI: {0}")]
pub struct InvalidUri(String);

impl FromStr for Uri {
    type Err = InvalidUri;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // RFC 3986: scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
        let scheme_end = s.find(':').ok_or_else(|| InvalidUri(s.to_string()))?;
        let scheme = &s[..scheme_end];

        let valid = scheme
            .chars()
            .next()
            .map(|first| first.is_ascii_alphabetic())
            .unwrap_or(false)
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            && s.len() > scheme_end + 1;

        if valid {
            Ok(Self {
                raw: s.to_string(),
                scheme_end,
            })
        } else {
            Err(InvalidUri(s.to_string()))
        }
    }
}

/// A possibly parameterised type reference: a fully qualified name plus a map
/// of named type parameters, themselves type references.
///
/// A reference whose parameter values are [slots](TypeRef::slot) describes a
/// generic shell; only [concrete](TypeRef::is_concrete) references can be
/// resolved by a registry.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct TypeRef {
    pub name: String,
    pub parameters: BTreeMap<String, TypeRef>,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// An unbound parameter slot, used when declaring generic shells.
    pub fn slot() -> Self {
        Self::named("")
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: TypeRef) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// True when no unbound parameter slot remains anywhere in the reference.
    pub fn is_concrete(&self) -> bool {
        !self.name.is_empty() && self.parameters.values().all(TypeRef::is_concrete)
    }

    /// Canonical rendering used as the registry key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl Display for TypeRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            f.write_str("_")?;
        } else {
            f.write_str(&self.name)?;
        }

        if !self.parameters.is_empty() {
            write!(
                f,
                "<{}>",
                self.parameters
                    .iter()
                    .map(|(name, value)| format!("{name} = {value}"))
                    .join(", ")
            )?;
        }

        Ok(())
    }
}

/// The runtime type of a part: a direct type reference or a blueprint-level
/// alias expanded by the resolver.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum RuntimeType {
    Type(TypeRef),
    Alias(String),
}

/// Opaque string metadata attached to parts.
pub type Metadata = BTreeMap<String, String>;

/// A dependency reference from one part to a peer or a value.
#[derive(Clone, Debug)]
pub enum Reference {
    /// The part with the given identifier.
    ById(PartId),
    /// The part with the given symbolic name; rewritten to [Reference::ById]
    /// by the resolver.
    ByName(String),
    /// An object produced on demand by the factory owning the URI's scheme.
    ByUri(Uri),
    /// A part declared in place; hoisted into a graph node of its own.
    Inline(Box<Part>),
    /// A textual constant, coerced to the declared slot type.
    Constant(String),
}

/// A post-construction property value: a textual scalar or a URI whose
/// factory product is coerced into the property type.
#[derive(Clone, Debug)]
pub enum PropertyValue {
    Value(String),
    ValueUri(Uri),
}

/// A declared instance, external placeholder, explicit hole or collection.
#[derive(Clone, Debug)]
pub enum Part {
    Concrete(ConcretePart),
    External(ExternalPart),
    Undefined(UndefinedPart),
    Collection(CollectionPart),
}

impl Part {
    /// The declared identifier, if any.
    pub fn id(&self) -> Option<PartId> {
        match self {
            Part::Concrete(part) => part.id,
            Part::External(part) => match &part.key {
                PartKey::Id(id) => Some(*id),
                PartKey::Name(_) => None,
            },
            Part::Undefined(part) => part.id,
            Part::Collection(part) => part.id,
        }
    }

    /// The declared symbolic name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Part::Concrete(part) => part.name.as_deref(),
            Part::External(part) => match &part.key {
                PartKey::Id(_) => None,
                PartKey::Name(name) => Some(name),
            },
            Part::Undefined(part) => part.name.as_deref(),
            Part::Collection(part) => part.name.as_deref(),
        }
    }
}

/// A part constructed by the engine from a registered descriptor.
#[derive(Clone, Debug)]
pub struct ConcretePart {
    pub id: Option<PartId>,
    pub name: Option<String>,
    pub runtime_type: RuntimeType,
    /// Named-constructor selector; the default constructor is used when
    /// absent.
    pub constructor: Option<String>,
    pub features: BTreeMap<String, Reference>,
    pub properties: BTreeMap<String, PropertyValue>,
    /// Overrides the descriptor's factory scheme for this part.
    pub scheme: Option<String>,
    pub metadata: Metadata,
}

impl ConcretePart {
    pub fn new(runtime_type: RuntimeType) -> Self {
        Self {
            id: None,
            name: None,
            runtime_type,
            constructor: None,
            features: BTreeMap::new(),
            properties: BTreeMap::new(),
            scheme: None,
            metadata: Metadata::new(),
        }
    }

    pub fn of_type(type_ref: TypeRef) -> Self {
        Self::new(RuntimeType::Type(type_ref))
    }

    pub fn with_id(mut self, id: PartId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_constructor(mut self, constructor: impl Into<String>) -> Self {
        self.constructor = Some(constructor.into());
        self
    }

    pub fn with_feature(mut self, name: impl Into<String>, reference: Reference) -> Self {
        self.features.insert(name.into(), reference);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Identifier-or-name key of an external part; never both.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum PartKey {
    Id(PartId),
    Name(String),
}

impl Display for PartKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PartKey::Id(id) => write!(f, "{id}"),
            PartKey::Name(name) => f.write_str(name),
        }
    }
}

/// A part satisfied at assembly time by a caller-supplied object.
#[derive(Clone, Debug)]
pub struct ExternalPart {
    pub key: PartKey,
    pub scheme: Option<String>,
    pub metadata: Metadata,
}

impl ExternalPart {
    pub fn new(key: PartKey) -> Self {
        Self {
            key,
            scheme: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }
}

/// An explicit placeholder. Parts depending on an undefined part are
/// transitively disabled without errors.
#[derive(Clone, Default, Debug)]
pub struct UndefinedPart {
    pub id: Option<PartId>,
    pub name: Option<String>,
    pub metadata: Metadata,
}

impl UndefinedPart {
    pub fn with_id(mut self, id: PartId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// An ordered sequence or string-keyed map of references, materialised into a
/// concrete container instance.
#[derive(Clone, Debug)]
pub struct CollectionPart {
    pub id: Option<PartId>,
    pub name: Option<String>,
    pub runtime_type: RuntimeType,
    pub kind: CollectionKind,
    pub metadata: Metadata,
}

impl CollectionPart {
    pub fn list(runtime_type: RuntimeType, elements: Vec<Reference>) -> Self {
        Self {
            id: None,
            name: None,
            runtime_type,
            kind: CollectionKind::List(elements),
            metadata: Metadata::new(),
        }
    }

    pub fn dictionary(runtime_type: RuntimeType, entries: Vec<(String, Reference)>) -> Self {
        Self {
            id: None,
            name: None,
            runtime_type,
            kind: CollectionKind::Dictionary(entries),
            metadata: Metadata::new(),
        }
    }

    pub fn with_id(mut self, id: PartId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Element layout of a collection part. Declaration order is preserved and
/// observable (elements are delivered to the container in this order).
#[derive(Clone, Debug)]
pub enum CollectionKind {
    List(Vec<Reference>),
    Dictionary(Vec<(String, Reference)>),
}

/// One blueprint document: a namespace label, type aliases and top-level
/// parts.
#[derive(Clone, Debug)]
pub struct Blueprint {
    pub namespace: String,
    pub aliases: BTreeMap<String, TypeRef>,
    pub parts: Vec<Part>,
}

impl Blueprint {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            aliases: BTreeMap::new(),
            parts: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>, target: TypeRef) -> Self {
        self.aliases.insert(alias.into(), target);
        self
    }

    pub fn with_part(mut self, part: impl Into<Part>) -> Self {
        self.parts.push(part.into());
        self
    }
}

impl From<ConcretePart> for Part {
    fn from(value: ConcretePart) -> Self {
        Part::Concrete(value)
    }
}

impl From<ExternalPart> for Part {
    fn from(value: ExternalPart) -> Self {
        Part::External(value)
    }
}

impl From<UndefinedPart> for Part {
    fn from(value: UndefinedPart) -> Self {
        Part::Undefined(value)
    }
}

impl From<CollectionPart> for Part {
    fn from(value: CollectionPart) -> Self {
        Part::Collection(value)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{PartId, TypeRef, Uri};
    use std::str::FromStr;

    #[test]
    fn should_parse_and_render_part_ids() {
        let id = PartId::from_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");

        assert!(PartId::from_str("not-an-id").is_err());
    }

    #[test]
    fn should_validate_uri_schemes() {
        let uri = Uri::from_str("test://decimal").unwrap();
        assert_eq!(uri.scheme(), "test");
        assert_eq!(uri.as_str(), "test://decimal");

        assert!(Uri::from_str("no-scheme").is_err());
        assert!(Uri::from_str("1bad://scheme").is_err());
        assert!(Uri::from_str("empty:").is_err());
    }

    #[test]
    fn should_render_canonical_type_keys() {
        let plain = TypeRef::named("widgets::Button");
        assert_eq!(plain.key(), "widgets::Button");

        let parameterised = TypeRef::named("widgets::List")
            .with_parameter("item", TypeRef::named("widgets::Button"))
            .with_parameter("allocator", TypeRef::named("alloc::Global"));
        assert_eq!(
            parameterised.key(),
            "widgets::List<allocator = alloc::Global, item = widgets::Button>"
        );

        assert!(parameterised.is_concrete());
        assert!(!TypeRef::named("widgets::List")
            .with_parameter("item", TypeRef::slot())
            .is_concrete());
    }
}
