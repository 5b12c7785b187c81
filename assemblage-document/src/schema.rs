//! Serde shape of the JSON blueprint document grammar.
//!
//! The element kinds mirror the engine's document schema: a `blueprint-list`
//! root with one or more `blueprint`s; parts tagged as `part`,
//! `external-part`, `undefined-part`, `part-list` or `part-dictionary`;
//! reference nodes tagged as `id-ref`, `name-ref`, `uri-ref`, `constant` or
//! an inline part. Cross-field rules (exactly one of `value`/`uri`, exactly
//! one of `runtime-type`/`runtime-type-alias`) are enforced during
//! conversion, not by serde.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub(crate) struct RootDoc {
    #[serde(rename = "blueprint-list")]
    pub blueprint_list: Vec<BlueprintDoc>,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub(crate) struct BlueprintDoc {
    pub namespace: String,
    #[serde(
        rename = "type-aliases",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub type_aliases: BTreeMap<String, TypeRefDoc>,
    pub parts: Vec<PartDoc>,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub(crate) struct TypeRefDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, TypeRefDoc>,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum PartDoc {
    Part(ConcretePartDoc),
    ExternalPart(ExternalPartDoc),
    UndefinedPart(UndefinedPartDoc),
    PartList(PartListDoc),
    PartDictionary(PartDictionaryDoc),
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub(crate) struct ConcretePartDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "runtime-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub runtime_type: Option<TypeRefDoc>,
    #[serde(
        rename = "runtime-type-alias",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub runtime_type_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor: Option<ConstructorDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<FeatureDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub(crate) struct ConstructorDoc {
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub(crate) struct FeatureDoc {
    pub key: String,
    #[serde(flatten)]
    pub reference: ReferenceDoc,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub(crate) struct PropertyDoc {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum ReferenceDoc {
    IdRef(Uuid),
    NameRef(String),
    UriRef(String),
    Constant(String),
    Part(Box<ConcretePartDoc>),
    PartList(Box<PartListDoc>),
    PartDictionary(Box<PartDictionaryDoc>),
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub(crate) struct ExternalPartDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub(crate) struct UndefinedPartDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub(crate) struct PartListDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "runtime-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub runtime_type: Option<TypeRefDoc>,
    #[serde(
        rename = "runtime-type-alias",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub runtime_type_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<ReferenceDoc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub(crate) struct PartDictionaryDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "runtime-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub runtime_type: Option<TypeRefDoc>,
    #[serde(
        rename = "runtime-type-alias",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub runtime_type_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<DictionaryEntryDoc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub(crate) struct DictionaryEntryDoc {
    pub key: String,
    #[serde(flatten)]
    pub reference: ReferenceDoc,
}
