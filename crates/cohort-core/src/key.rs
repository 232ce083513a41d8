//! Attribute key conventions.
//!
//! Typed keys for the namespaces of a visit store. Dotted strings are only
//! produced (`Display`) and consumed (`FromStr`) at the import/export
//! boundary; everything inside the engine addresses the store through these
//! types.
//!
//! ```text
//! file.info.forms.<layer>.<field>           raw submitted values
//! file.info.resolved.<field>                post-missingness values
//! file.info.derived.<field>                 this visit's derived output
//! subject.info.derived.<field>              cross-sectional subject output
//! subject.info.working.<scope>.<field>      longitudinal bookkeeping
//! _prev_record.info.<section>.<field>       previous visit mirror
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

pub const INFO: &str = "info";

/// Default raw form layer.
pub const DEFAULT_LAYER: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    File,
    Subject,
    PrevRecord,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::File => "file",
            Entity::Subject => "subject",
            Entity::PrevRecord => "_prev_record",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Entity::File),
            "subject" => Some(Entity::Subject),
            "_prev_record" => Some(Entity::PrevRecord),
            _ => None,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkingScope {
    /// Single last-known value per field.
    CrossSectional,
    /// Date-tagged series per field.
    Longitudinal,
}

impl WorkingScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkingScope::CrossSectional => "cross-sectional",
            WorkingScope::Longitudinal => "longitudinal",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "cross-sectional" => Some(WorkingScope::CrossSectional),
            "longitudinal" => Some(WorkingScope::Longitudinal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Forms { layer: String },
    Resolved,
    Derived,
    Working(WorkingScope),
}

impl Section {
    pub fn forms(layer: impl Into<String>) -> Self {
        Section::Forms {
            layer: layer.into(),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Forms { layer } => write!(f, "forms.{layer}"),
            Section::Resolved => f.write_str("resolved"),
            Section::Derived => f.write_str("derived"),
            Section::Working(scope) => write!(f, "working.{}", scope.as_str()),
        }
    }
}

/// The fixed part of a key: entity plus section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopePrefix {
    pub entity: Entity,
    pub section: Section,
}

impl ScopePrefix {
    pub fn new(entity: Entity, section: Section) -> Self {
        Self { entity, section }
    }

    pub fn forms(layer: impl Into<String>) -> Self {
        Self::new(Entity::File, Section::forms(layer))
    }

    pub fn resolved() -> Self {
        Self::new(Entity::File, Section::Resolved)
    }

    pub fn derived() -> Self {
        Self::new(Entity::File, Section::Derived)
    }

    pub fn subject_derived() -> Self {
        Self::new(Entity::Subject, Section::Derived)
    }

    pub fn working(scope: WorkingScope) -> Self {
        Self::new(Entity::Subject, Section::Working(scope))
    }

    /// The same section as seen through the previous-visit mirror.
    pub fn previous(&self) -> Self {
        Self::new(Entity::PrevRecord, self.section.clone())
    }

    pub fn key(&self, field: impl Into<String>) -> AttributeKey {
        AttributeKey {
            prefix: self.clone(),
            field: field.into(),
        }
    }
}

impl fmt::Display for ScopePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{INFO}.{}", self.entity, self.section)
    }
}

/// A fully qualified attribute address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeKey {
    pub prefix: ScopePrefix,
    pub field: String,
}

impl AttributeKey {
    pub fn path(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.prefix, self.field)
    }
}

impl FromStr for AttributeKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidField(format!("not an attribute key: '{s}'"));
        let parts: Vec<&str> = s.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        let entity = parts.first().and_then(|p| Entity::parse(p)).ok_or_else(invalid)?;
        if parts.get(1) != Some(&INFO) {
            return Err(invalid());
        }

        let (section, rest) = match parts.get(2).copied() {
            Some("forms") => {
                let layer = parts.get(3).ok_or_else(invalid)?;
                (Section::forms(*layer), &parts[4..])
            }
            Some("resolved") => (Section::Resolved, &parts[3..]),
            Some("derived") => (Section::Derived, &parts[3..]),
            Some("working") => {
                let scope = parts
                    .get(3)
                    .and_then(|p| WorkingScope::parse(p))
                    .ok_or_else(invalid)?;
                (Section::Working(scope), &parts[4..])
            }
            _ => return Err(invalid()),
        };

        if rest.is_empty() {
            return Err(invalid());
        }

        Ok(AttributeKey {
            prefix: ScopePrefix::new(entity, section),
            field: rest.join("."),
        })
    }
}
