//! Entity kinds and their fixed identity parameters
//!
//! Every kind maps to one static [`KindDescriptor`]: code prefix, pad width,
//! counter tag, parent kind and creation-time version. Counter tags and
//! initial versions are deliberately not uniform across kinds; they match
//! the values already stored in existing databases.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::Version;

/// Context id used for kinds that have no parent record
pub const GLOBAL_SCOPE: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Organization,
    Project,
    Actor,
    Author,
    Expert,
    Interview,
    Source,
    Educcion,
    Ilacion,
    Specification,
    NonFunctionalRequirement,
    Risk,
    Role,
}

/// Static identity parameters for one entity kind
#[derive(Debug, Clone, Copy)]
pub struct KindDescriptor {
    /// URL collection segment and stored `records.kind` value
    pub slug: &'static str,
    pub prefix: &'static str,
    pub width: usize,
    /// `scoped_counters.entity_kind` value
    pub counter_tag: &'static str,
    /// `None` for globally scoped kinds
    pub parent: Option<EntityKind>,
    pub initial_version: Version,
}

const fn descriptor(
    slug: &'static str,
    prefix: &'static str,
    width: usize,
    counter_tag: &'static str,
    parent: Option<EntityKind>,
    initial_version: Version,
) -> KindDescriptor {
    KindDescriptor {
        slug,
        prefix,
        width,
        counter_tag,
        parent,
        initial_version,
    }
}

const V0001: Version = Version::new(0, 1);
const V0100: Version = Version::new(1, 0);

static ORGANIZATION: KindDescriptor = descriptor("organizations", "ORG", 3, "organization", None, V0100);
static PROJECT: KindDescriptor = descriptor("projects", "PROJ", 3, "project", Some(EntityKind::Organization), V0100);
static ACTOR: KindDescriptor = descriptor("actors", "ACT", 4, "actor", Some(EntityKind::Project), V0001);
static AUTHOR: KindDescriptor = descriptor("authors", "AUT", 4, "author", None, V0001);
static EXPERT: KindDescriptor = descriptor("experts", "EXP", 3, "EXPERT", Some(EntityKind::Project), V0001);
static INTERVIEW: KindDescriptor = descriptor("interviews", "ENT", 3, "INTERVIEW", Some(EntityKind::Project), V0001);
static SOURCE: KindDescriptor = descriptor("sources", "FUE", 3, "SOURCE", Some(EntityKind::Project), V0001);
static EDUCCION: KindDescriptor = descriptor("educciones", "EDU", 3, "EDUCCION", Some(EntityKind::Project), V0001);
static ILACION: KindDescriptor = descriptor("ilaciones", "ILA", 3, "ILACION", Some(EntityKind::Educcion), V0001);
static SPECIFICATION: KindDescriptor = descriptor("specifications", "ESP", 3, "SPECIFICATION", Some(EntityKind::Ilacion), V0001);
static NFR: KindDescriptor = descriptor("nfrs", "RNF", 4, "NFR", Some(EntityKind::Project), V0001);
static RISK: KindDescriptor = descriptor("risks", "RISK", 4, "RISK", Some(EntityKind::Project), V0001);
static ROLE: KindDescriptor = descriptor("roles", "ROL", 3, "role", None, V0100);

impl EntityKind {
    pub const ALL: [EntityKind; 13] = [
        EntityKind::Organization,
        EntityKind::Project,
        EntityKind::Actor,
        EntityKind::Author,
        EntityKind::Expert,
        EntityKind::Interview,
        EntityKind::Source,
        EntityKind::Educcion,
        EntityKind::Ilacion,
        EntityKind::Specification,
        EntityKind::NonFunctionalRequirement,
        EntityKind::Risk,
        EntityKind::Role,
    ];

    pub fn descriptor(self) -> &'static KindDescriptor {
        match self {
            EntityKind::Organization => &ORGANIZATION,
            EntityKind::Project => &PROJECT,
            EntityKind::Actor => &ACTOR,
            EntityKind::Author => &AUTHOR,
            EntityKind::Expert => &EXPERT,
            EntityKind::Interview => &INTERVIEW,
            EntityKind::Source => &SOURCE,
            EntityKind::Educcion => &EDUCCION,
            EntityKind::Ilacion => &ILACION,
            EntityKind::Specification => &SPECIFICATION,
            EntityKind::NonFunctionalRequirement => &NFR,
            EntityKind::Risk => &RISK,
            EntityKind::Role => &ROLE,
        }
    }

    pub fn slug(self) -> &'static str {
        self.descriptor().slug
    }

    pub fn parent(self) -> Option<EntityKind> {
        self.descriptor().parent
    }

    pub fn is_global(self) -> bool {
        self.parent().is_none()
    }

    /// Look up a kind by its URL collection segment (or stored `kind` value)
    pub fn from_slug(slug: &str) -> Option<EntityKind> {
        Self::ALL.iter().copied().find(|k| k.slug() == slug)
    }

    /// Kinds whose records live directly under this kind
    pub fn children(self) -> impl Iterator<Item = EntityKind> {
        Self::ALL.into_iter().filter(move |k| k.parent() == Some(self))
    }

    /// `PREFIX-`, the leading part shared by every code of this kind
    pub fn code_lead(self) -> String {
        format!("{}-", self.descriptor().prefix)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}
