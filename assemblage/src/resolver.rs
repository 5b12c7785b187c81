//! Static resolution of the blueprint union.
//!
//! The resolver turns loaded [Blueprint]s into a [ResolvedSet]: a single
//! arena of parts addressed by identifier, with every symbolic reference
//! rewritten to an identifier reference, every URI reference annotated with
//! its producing factory, every alias expanded and every external declaration
//! bound to a caller-supplied object. Violations are accumulated into one
//! error list; a defective part is marked unassemblable and resolution moves
//! on, so a single pass reports every defect in the union.
//!
//! Parts reachable backwards from an undefined part are marked
//! [incomplete](PartStatus::Incomplete). Incomplete parts are skipped
//! silently during assembly; this is a feature, not an error.

use crate::descriptor::ComponentDescriptor;
use crate::document::ExternalObject;
use crate::error::{EngineError, ResolutionError};
use crate::graph::DependencyGraph;
use crate::model::{
    Blueprint, CollectionKind, CollectionPart, ConcretePart, ExternalPart, Metadata, Part, PartId,
    PartKey, PropertyValue, Reference, RuntimeType, TypeRef, UndefinedPart, Uri,
};
use crate::registry::TypeRegistry;
use fxhash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Assembly-relevant classification of a part.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PartStatus {
    /// Declared with everything needed to construct it.
    Defined,
    /// Satisfied by a caller-supplied object.
    External,
    /// An explicit placeholder; never constructed.
    Undefined,
    /// Transitively disabled by an undefined dependency; skipped silently.
    Incomplete,
}

/// A dependency reference with all symbolic forms rewritten away.
#[derive(Clone, Debug)]
pub enum ResolvedReference {
    /// The part with this identifier; constructed before the referrer.
    Part(PartId),
    /// Produced on demand by the factory part with identifier `factory`.
    Factory { uri: Uri, factory: PartId },
    /// A textual constant, coerced at assembly time.
    Constant(String),
}

/// A property value with URI references annotated by their factory.
#[derive(Clone, Debug)]
pub enum ResolvedValue {
    Scalar(String),
    Factory { uri: Uri, factory: PartId },
}

/// A concrete part ready for assembly.
#[derive(Clone, Debug)]
pub struct ResolvedConcrete {
    pub id: PartId,
    pub name: Option<String>,
    /// `None` when resolution already failed the part; such parts are never
    /// queued.
    pub descriptor: Option<Arc<ComponentDescriptor>>,
    pub constructor: Option<String>,
    pub features: BTreeMap<String, ResolvedReference>,
    pub properties: BTreeMap<String, ResolvedValue>,
    /// Effective factory scheme: the part-level override or the descriptor's.
    pub scheme: Option<String>,
    pub metadata: Metadata,
}

/// An external part bound to a supplied object.
#[derive(Clone, Debug)]
pub struct ResolvedExternal {
    pub id: PartId,
    pub key: PartKey,
    pub scheme: Option<String>,
    pub metadata: Metadata,
    /// Index into the supplied externals; `None` when unmatched.
    pub supplied: Option<usize>,
}

/// An undefined placeholder part.
#[derive(Clone, Debug)]
pub struct ResolvedUndefined {
    pub id: PartId,
    pub name: Option<String>,
}

/// A collection part with rewritten element references.
#[derive(Clone, Debug)]
pub struct ResolvedCollection {
    pub id: PartId,
    pub name: Option<String>,
    /// Alias-expanded runtime type of the concrete container.
    pub runtime_type: Option<TypeRef>,
    pub kind: ResolvedCollectionKind,
    pub metadata: Metadata,
}

#[derive(Clone, Debug)]
pub enum ResolvedCollectionKind {
    List(Vec<ResolvedReference>),
    Dictionary(Vec<(String, ResolvedReference)>),
}

/// One part in the resolved arena.
#[derive(Clone, Debug)]
pub enum ResolvedPart {
    Concrete(ResolvedConcrete),
    External(ResolvedExternal),
    Undefined(ResolvedUndefined),
    Collection(ResolvedCollection),
}

impl ResolvedPart {
    pub fn id(&self) -> PartId {
        match self {
            ResolvedPart::Concrete(part) => part.id,
            ResolvedPart::External(part) => part.id,
            ResolvedPart::Undefined(part) => part.id,
            ResolvedPart::Collection(part) => part.id,
        }
    }

    /// Identifiers this part depends on; its dependencies must be
    /// constructed first.
    pub fn dependencies(&self) -> Vec<PartId> {
        fn of_reference(reference: &ResolvedReference) -> Option<PartId> {
            match reference {
                ResolvedReference::Part(id) => Some(*id),
                ResolvedReference::Factory { factory, .. } => Some(*factory),
                ResolvedReference::Constant(_) => None,
            }
        }

        match self {
            ResolvedPart::Concrete(part) => part
                .features
                .values()
                .filter_map(of_reference)
                .chain(part.properties.values().filter_map(|value| match value {
                    ResolvedValue::Factory { factory, .. } => Some(*factory),
                    ResolvedValue::Scalar(_) => None,
                }))
                .collect(),
            ResolvedPart::Collection(part) => match &part.kind {
                ResolvedCollectionKind::List(elements) => {
                    elements.iter().filter_map(of_reference).collect()
                }
                ResolvedCollectionKind::Dictionary(entries) => entries
                    .iter()
                    .filter_map(|(_, reference)| of_reference(reference))
                    .collect(),
            },
            ResolvedPart::External(_) | ResolvedPart::Undefined(_) => Vec::new(),
        }
    }
}

/// The resolved blueprint union: one arena of parts plus the name, scheme and
/// status tables derived from it.
#[derive(Clone, Default, Debug)]
pub struct ResolvedSet {
    parts: Vec<ResolvedPart>,
    by_id: FxHashMap<PartId, usize>,
    names: FxHashMap<String, PartId>,
    schemes: FxHashMap<String, PartId>,
    statuses: FxHashMap<PartId, PartStatus>,
    unassemblable: FxHashSet<PartId>,
    temporary_ids: FxHashSet<PartId>,
}

impl ResolvedSet {
    pub fn part(&self, id: PartId) -> Option<&ResolvedPart> {
        self.by_id.get(&id).map(|index| &self.parts[*index])
    }

    pub fn parts(&self) -> impl Iterator<Item = &ResolvedPart> {
        self.parts.iter()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn status(&self, id: PartId) -> Option<PartStatus> {
        self.statuses.get(&id).copied()
    }

    /// True when resolution recorded an error against this part.
    pub fn is_unassemblable(&self, id: PartId) -> bool {
        self.unassemblable.contains(&id)
    }

    /// True when the identifier was synthesised rather than declared.
    pub fn is_temporary(&self, id: PartId) -> bool {
        self.temporary_ids.contains(&id)
    }

    pub fn id_of_name(&self, name: &str) -> Option<PartId> {
        self.names.get(name).copied()
    }

    pub fn factory_for_scheme(&self, scheme: &str) -> Option<PartId> {
        self.schemes.get(scheme).copied()
    }

    fn push(&mut self, part: ResolvedPart, status: PartStatus) {
        let id = part.id();
        self.by_id.insert(id, self.parts.len());
        self.statuses.insert(id, status);
        self.parts.push(part);
    }

    fn mark_unassemblable(&mut self, id: PartId) {
        self.unassemblable.insert(id);
    }

    fn mark_incomplete(&mut self, id: PartId) {
        self.statuses.insert(id, PartStatus::Incomplete);
    }
}

/// Rewrites and validates blueprints against a type registry and the supplied
/// externals.
pub struct Resolver<'a> {
    registry: &'a dyn TypeRegistry,
    externals: &'a [ExternalObject],
}

enum RawReference {
    Id(PartId),
    Name(String),
    Uri(Uri),
    Constant(String),
}

enum RawValue {
    Scalar(String),
    Uri(Uri),
}

enum Pending {
    Concrete {
        id: PartId,
        name: Option<String>,
        descriptor: Option<Arc<ComponentDescriptor>>,
        constructor: Option<String>,
        features: BTreeMap<String, RawReference>,
        properties: BTreeMap<String, RawValue>,
        scheme: Option<String>,
        metadata: Metadata,
    },
    External {
        id: PartId,
        key: PartKey,
        scheme: Option<String>,
        metadata: Metadata,
    },
    Undefined {
        id: PartId,
        name: Option<String>,
    },
    Collection {
        id: PartId,
        name: Option<String>,
        runtime_type: Option<TypeRef>,
        kind: RawCollectionKind,
        metadata: Metadata,
    },
}

enum RawCollectionKind {
    List(Vec<RawReference>),
    Dictionary(Vec<(String, RawReference)>),
}

impl Pending {
    fn id(&self) -> PartId {
        match self {
            Pending::Concrete { id, .. }
            | Pending::External { id, .. }
            | Pending::Undefined { id, .. }
            | Pending::Collection { id, .. } => *id,
        }
    }
}

struct Flattened {
    pending: Vec<Pending>,
    seen_ids: FxHashSet<PartId>,
    names: FxHashMap<String, PartId>,
    temporary_ids: FxHashSet<PartId>,
    errors: Vec<EngineError>,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a dyn TypeRegistry, externals: &'a [ExternalObject]) -> Self {
        Self {
            registry,
            externals,
        }
    }

    /// Resolves the blueprint union. Errors are accumulated, never
    /// short-circuited; defective parts are marked unassemblable in the
    /// returned set.
    pub fn resolve(&self, blueprints: &[Blueprint]) -> (ResolvedSet, Vec<EngineError>) {
        let mut flattened = Flattened {
            pending: Vec::new(),
            seen_ids: FxHashSet::default(),
            names: FxHashMap::default(),
            temporary_ids: FxHashSet::default(),
            errors: Vec::new(),
        };

        for blueprint in blueprints {
            debug!(
                namespace = %blueprint.namespace,
                parts = blueprint.parts.len(),
                "Resolving blueprint."
            );

            for part in &blueprint.parts {
                self.flatten_part(&mut flattened, &blueprint.aliases, part);
            }
        }

        self.adopt_supplied_externals(&mut flattened);

        let mut set = ResolvedSet {
            names: flattened.names.clone(),
            temporary_ids: flattened.temporary_ids.clone(),
            ..ResolvedSet::default()
        };
        let mut errors = std::mem::take(&mut flattened.errors);
        let mut unassemblable = FxHashSet::default();

        self.build_scheme_table(&flattened.pending, &mut set, &mut errors);

        for pending in &flattened.pending {
            let part = self.finish_part(pending, &flattened, &set, &mut errors, &mut unassemblable);
            let status = match &part {
                ResolvedPart::Concrete(_) | ResolvedPart::Collection(_) => PartStatus::Defined,
                ResolvedPart::External(_) => PartStatus::External,
                ResolvedPart::Undefined(_) => PartStatus::Undefined,
            };

            set.push(part, status);
        }

        for id in unassemblable {
            set.mark_unassemblable(id);
        }

        self.disable_transitively(&mut set);

        (set, errors)
    }

    fn flatten_part(
        &self,
        flattened: &mut Flattened,
        aliases: &BTreeMap<String, TypeRef>,
        part: &Part,
    ) -> PartId {
        let declared_id = part.id();
        let id = declared_id.unwrap_or_else(PartId::random);

        if !flattened.seen_ids.insert(id) {
            warn!(part = %id, "Duplicate part identifier; dropping the later occurrence.");
            flattened
                .errors
                .push(ResolutionError::DuplicateId { id }.into());
            return id;
        }

        if declared_id.is_none() {
            flattened.temporary_ids.insert(id);
        }

        if let Some(name) = part.name() {
            if flattened.names.contains_key(name) {
                warn!(part = %id, name, "Duplicate part name; dropping the later binding.");
                flattened.errors.push(
                    ResolutionError::DuplicateName {
                        name: name.to_string(),
                    }
                    .into(),
                );
            } else {
                flattened.names.insert(name.to_string(), id);
            }
        }

        let pending = match part {
            Part::Concrete(concrete) => self.flatten_concrete(flattened, aliases, id, concrete),
            Part::External(external) => Self::flatten_external(id, external),
            Part::Undefined(undefined) => Self::flatten_undefined(id, undefined),
            Part::Collection(collection) => {
                self.flatten_collection(flattened, aliases, id, collection)
            }
        };

        flattened.pending.push(pending);
        id
    }

    fn flatten_concrete(
        &self,
        flattened: &mut Flattened,
        aliases: &BTreeMap<String, TypeRef>,
        id: PartId,
        part: &ConcretePart,
    ) -> Pending {
        let type_ref = self.expand_runtime_type(flattened, aliases, id, &part.runtime_type);
        let descriptor = type_ref
            .as_ref()
            .and_then(|type_ref| self.describe_type(flattened, id, type_ref));

        let features = part
            .features
            .iter()
            .map(|(name, reference)| {
                (
                    name.clone(),
                    self.flatten_reference(flattened, aliases, reference),
                )
            })
            .collect();

        let properties = part
            .properties
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    PropertyValue::Value(text) => RawValue::Scalar(text.clone()),
                    PropertyValue::ValueUri(uri) => RawValue::Uri(uri.clone()),
                };

                (name.clone(), value)
            })
            .collect();

        let scheme = part.scheme.clone().or_else(|| {
            descriptor
                .as_ref()
                .and_then(|descriptor| descriptor.scheme().map(str::to_string))
        });

        Pending::Concrete {
            id,
            name: part.name.clone(),
            descriptor,
            constructor: part.constructor.clone(),
            features,
            properties,
            scheme,
            metadata: part.metadata.clone(),
        }
    }

    fn flatten_external(id: PartId, part: &ExternalPart) -> Pending {
        Pending::External {
            id,
            key: part.key.clone(),
            scheme: part.scheme.clone(),
            metadata: part.metadata.clone(),
        }
    }

    fn flatten_undefined(id: PartId, part: &UndefinedPart) -> Pending {
        Pending::Undefined {
            id,
            name: part.name.clone(),
        }
    }

    fn flatten_collection(
        &self,
        flattened: &mut Flattened,
        aliases: &BTreeMap<String, TypeRef>,
        id: PartId,
        part: &CollectionPart,
    ) -> Pending {
        let runtime_type = self.expand_runtime_type(flattened, aliases, id, &part.runtime_type);

        if let Some(type_ref) = &runtime_type {
            if self.registry.collection_binding(type_ref).is_none() {
                flattened.errors.push(
                    ResolutionError::InvalidCollectionType {
                        part: id,
                        type_name: type_ref.key(),
                    }
                    .into(),
                );
            }
        }

        let kind = match &part.kind {
            CollectionKind::List(elements) => RawCollectionKind::List(
                elements
                    .iter()
                    .map(|element| self.flatten_reference(flattened, aliases, element))
                    .collect(),
            ),
            CollectionKind::Dictionary(entries) => RawCollectionKind::Dictionary(
                entries
                    .iter()
                    .map(|(key, element)| {
                        (
                            key.clone(),
                            self.flatten_reference(flattened, aliases, element),
                        )
                    })
                    .collect(),
            ),
        };

        Pending::Collection {
            id,
            name: part.name.clone(),
            runtime_type,
            kind,
            metadata: part.metadata.clone(),
        }
    }

    fn flatten_reference(
        &self,
        flattened: &mut Flattened,
        aliases: &BTreeMap<String, TypeRef>,
        reference: &Reference,
    ) -> RawReference {
        match reference {
            Reference::ById(id) => RawReference::Id(*id),
            Reference::ByName(name) => RawReference::Name(name.clone()),
            Reference::ByUri(uri) => RawReference::Uri(uri.clone()),
            Reference::Constant(text) => RawReference::Constant(text.clone()),
            Reference::Inline(part) => {
                // Hoisted into a node of its own; the reference degenerates
                // to an identifier reference onto it.
                RawReference::Id(self.flatten_part(flattened, aliases, part))
            }
        }
    }

    fn expand_runtime_type(
        &self,
        flattened: &mut Flattened,
        aliases: &BTreeMap<String, TypeRef>,
        id: PartId,
        runtime_type: &RuntimeType,
    ) -> Option<TypeRef> {
        match runtime_type {
            RuntimeType::Type(type_ref) => Some(type_ref.clone()),
            RuntimeType::Alias(alias) => match aliases.get(alias) {
                Some(type_ref) => Some(type_ref.clone()),
                None => {
                    flattened.errors.push(
                        ResolutionError::UnknownAlias {
                            part: id,
                            alias: alias.clone(),
                        }
                        .into(),
                    );
                    None
                }
            },
        }
    }

    fn describe_type(
        &self,
        flattened: &mut Flattened,
        id: PartId,
        type_ref: &TypeRef,
    ) -> Option<Arc<ComponentDescriptor>> {
        let Some(handle) = self.registry.resolve(type_ref) else {
            flattened.errors.push(
                ResolutionError::UnresolvedType {
                    part: id,
                    type_name: type_ref.key(),
                }
                .into(),
            );
            return None;
        };

        match self.registry.describe(handle) {
            Ok(descriptor) => Some(descriptor),
            Err(error) => {
                flattened.errors.push(
                    ResolutionError::DescriptorRejected {
                        part: id,
                        type_name: type_ref.key(),
                        source: error,
                    }
                    .into(),
                );
                None
            }
        }
    }

    fn build_scheme_table(
        &self,
        pending: &[Pending],
        set: &mut ResolvedSet,
        errors: &mut Vec<EngineError>,
    ) {
        for part in pending {
            let (id, scheme) = match part {
                Pending::Concrete {
                    id,
                    scheme: Some(scheme),
                    ..
                } => (*id, scheme),
                Pending::External {
                    id,
                    key,
                    scheme,
                    ..
                } => {
                    let scheme = scheme.as_ref().or_else(|| {
                        self.find_supplied(key)
                            .and_then(|index| self.externals[index].scheme.as_ref())
                    });
                    match scheme {
                        Some(scheme) => (*id, scheme),
                        None => continue,
                    }
                }
                _ => continue,
            };

            match set.schemes.get(scheme) {
                Some(previous) => {
                    errors.push(
                        ResolutionError::DuplicateScheme {
                            scheme: scheme.clone(),
                            factory: id,
                            previous: *previous,
                        }
                        .into(),
                    );
                }
                None => {
                    set.schemes.insert(scheme.clone(), id);
                }
            }
        }
    }

    fn finish_part(
        &self,
        pending: &Pending,
        flattened: &Flattened,
        set: &ResolvedSet,
        errors: &mut Vec<EngineError>,
        unassemblable: &mut FxHashSet<PartId>,
    ) -> ResolvedPart {
        match pending {
            Pending::Concrete {
                id,
                name,
                descriptor,
                constructor,
                features,
                properties,
                scheme,
                metadata,
            } => {
                if descriptor.is_none() {
                    unassemblable.insert(*id);
                }

                let features = features
                    .iter()
                    .filter_map(|(feature, reference)| {
                        self.finish_reference(*id, reference, flattened, set, errors, unassemblable)
                            .map(|reference| (feature.clone(), reference))
                    })
                    .collect();

                let properties = properties
                    .iter()
                    .filter_map(|(property, value)| match value {
                        RawValue::Scalar(text) => {
                            Some((property.clone(), ResolvedValue::Scalar(text.clone())))
                        }
                        RawValue::Uri(uri) => self
                            .lookup_factory(*id, uri, set, errors, unassemblable)
                            .map(|factory| {
                                (
                                    property.clone(),
                                    ResolvedValue::Factory {
                                        uri: uri.clone(),
                                        factory,
                                    },
                                )
                            }),
                    })
                    .collect();

                ResolvedPart::Concrete(ResolvedConcrete {
                    id: *id,
                    name: name.clone(),
                    descriptor: descriptor.clone(),
                    constructor: constructor.clone(),
                    features,
                    properties,
                    scheme: scheme.clone(),
                    metadata: metadata.clone(),
                })
            }
            Pending::External {
                id,
                key,
                scheme,
                metadata,
            } => {
                let supplied = self.find_supplied(key);
                if supplied.is_none() {
                    errors.push(
                        ResolutionError::MissingExternal {
                            key: key.to_string(),
                        }
                        .into(),
                    );
                    unassemblable.insert(*id);
                }

                let scheme = scheme.clone().or_else(|| {
                    supplied.and_then(|index| self.externals[index].scheme.clone())
                });

                ResolvedPart::External(ResolvedExternal {
                    id: *id,
                    key: key.clone(),
                    scheme,
                    metadata: metadata.clone(),
                    supplied,
                })
            }
            Pending::Undefined { id, name } => ResolvedPart::Undefined(ResolvedUndefined {
                id: *id,
                name: name.clone(),
            }),
            Pending::Collection {
                id,
                name,
                runtime_type,
                kind,
                metadata,
            } => {
                if runtime_type.is_none()
                    || runtime_type
                        .as_ref()
                        .map(|type_ref| self.registry.collection_binding(type_ref).is_none())
                        .unwrap_or(false)
                {
                    unassemblable.insert(*id);
                }

                let kind = match kind {
                    RawCollectionKind::List(elements) => ResolvedCollectionKind::List(
                        elements
                            .iter()
                            .filter_map(|element| {
                                self.finish_reference(
                                    *id,
                                    element,
                                    flattened,
                                    set,
                                    errors,
                                    unassemblable,
                                )
                            })
                            .collect(),
                    ),
                    RawCollectionKind::Dictionary(entries) => ResolvedCollectionKind::Dictionary(
                        entries
                            .iter()
                            .filter_map(|(key, element)| {
                                self.finish_reference(
                                    *id,
                                    element,
                                    flattened,
                                    set,
                                    errors,
                                    unassemblable,
                                )
                                .map(|element| (key.clone(), element))
                            })
                            .collect(),
                    ),
                };

                ResolvedPart::Collection(ResolvedCollection {
                    id: *id,
                    name: name.clone(),
                    runtime_type: runtime_type.clone(),
                    kind,
                    metadata: metadata.clone(),
                })
            }
        }
    }

    fn finish_reference(
        &self,
        part: PartId,
        reference: &RawReference,
        flattened: &Flattened,
        set: &ResolvedSet,
        errors: &mut Vec<EngineError>,
        unassemblable: &mut FxHashSet<PartId>,
    ) -> Option<ResolvedReference> {
        match reference {
            RawReference::Id(id) => {
                if flattened.seen_ids.contains(id) {
                    Some(ResolvedReference::Part(*id))
                } else {
                    errors.push(ResolutionError::UnresolvedId { part, id: *id }.into());
                    unassemblable.insert(part);
                    None
                }
            }
            RawReference::Name(name) => match flattened.names.get(name) {
                Some(id) => Some(ResolvedReference::Part(*id)),
                None => {
                    errors.push(
                        ResolutionError::UnresolvedName {
                            part,
                            name: name.clone(),
                        }
                        .into(),
                    );
                    unassemblable.insert(part);
                    None
                }
            },
            RawReference::Uri(uri) => self
                .lookup_factory(part, uri, set, errors, unassemblable)
                .map(|factory| ResolvedReference::Factory {
                    uri: uri.clone(),
                    factory,
                }),
            RawReference::Constant(text) => Some(ResolvedReference::Constant(text.clone())),
        }
    }

    fn lookup_factory(
        &self,
        part: PartId,
        uri: &Uri,
        set: &ResolvedSet,
        errors: &mut Vec<EngineError>,
        unassemblable: &mut FxHashSet<PartId>,
    ) -> Option<PartId> {
        match set.schemes.get(uri.scheme()) {
            Some(factory) => Some(*factory),
            None => {
                errors.push(
                    ResolutionError::UnknownScheme {
                        part,
                        scheme: uri.scheme().to_string(),
                    }
                    .into(),
                );
                unassemblable.insert(part);
                None
            }
        }
    }

    fn find_supplied(&self, key: &PartKey) -> Option<usize> {
        self.externals.iter().position(|object| object.matches(key))
    }

    /// A `by-id`/`by-name` reference may target a supplied external object
    /// that no blueprint declares. Such objects are adopted as external nodes
    /// of their own, so they participate in ordering and indexing like
    /// declared externals.
    fn adopt_supplied_externals(&self, flattened: &mut Flattened) {
        let mut referenced_ids = Vec::new();
        let mut referenced_names = Vec::new();

        let mut collect = |reference: &RawReference| match reference {
            RawReference::Id(id) if !flattened.seen_ids.contains(id) => {
                referenced_ids.push(*id);
            }
            RawReference::Name(name) if !flattened.names.contains_key(name) => {
                referenced_names.push(name.clone());
            }
            _ => {}
        };

        for pending in &flattened.pending {
            match pending {
                Pending::Concrete { features, .. } => {
                    features.values().for_each(&mut collect);
                }
                Pending::Collection { kind, .. } => match kind {
                    RawCollectionKind::List(elements) => elements.iter().for_each(&mut collect),
                    RawCollectionKind::Dictionary(entries) => {
                        entries.iter().for_each(|(_, element)| collect(element))
                    }
                },
                Pending::External { .. } | Pending::Undefined { .. } => {}
            }
        }

        for id in referenced_ids {
            if self.find_supplied(&PartKey::Id(id)).is_some() && flattened.seen_ids.insert(id) {
                debug!(part = %id, "Adopting undeclared supplied external object.");
                flattened.pending.push(Pending::External {
                    id,
                    key: PartKey::Id(id),
                    scheme: None,
                    metadata: Metadata::new(),
                });
            }
        }

        for name in referenced_names {
            if self.find_supplied(&PartKey::Name(name.clone())).is_some() {
                let id = PartId::random();
                flattened.seen_ids.insert(id);
                flattened.temporary_ids.insert(id);
                flattened.names.insert(name.clone(), id);

                debug!(part = %id, name, "Adopting undeclared supplied external object.");
                flattened.pending.push(Pending::External {
                    id,
                    key: PartKey::Name(name),
                    scheme: None,
                    metadata: Metadata::new(),
                });
            }
        }
    }

    fn disable_transitively(&self, set: &mut ResolvedSet) {
        let undefined: Vec<PartId> = set
            .parts()
            .filter(|part| matches!(part, ResolvedPart::Undefined(_)))
            .map(ResolvedPart::id)
            .collect();

        if undefined.is_empty() {
            return;
        }

        let graph = DependencyGraph::build(set);
        let disabled = graph.dependents_closure(undefined.iter().copied());

        for id in disabled {
            if !undefined.contains(&id) {
                debug!(part = %id, "Disabling part with an undefined dependency.");
                set.mark_incomplete(id);
            }
        }
    }
}
