//! Configuration document model.
//!
//! A configuration is a YAML document listing named matcher definitions and
//! an optional target list. The serde model here is purely declarative; the
//! graph builder resolves names, compiles predicates and validates the
//! result.
//!
//! ```yaml
//! matchers:
//!   - name: M_login
//!     match:
//!       categories: [42]
//!       fields:
//!         - { position: 0, op: eq, value: "login" }
//!   - name: M_big
//!     match:
//!       categories: [42]
//!       fields:
//!         - { position: 1, op: gt, value: 5 }
//!   - name: M_target
//!     all_of: [M_login, M_big]
//! targets: [M_target]
//! ```
//!
//! Each matcher body is exactly one of `match`, `all_of`, `any_of` or `not`.
//! An omitted or empty `targets` list makes every matcher a target.

use std::fmt;

use serde::Deserialize;

use crate::error::BuildError;

/// Parsed configuration document, prior to graph building.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    pub matchers: Vec<MatcherDef>,
    #[serde(default)]
    pub targets: Vec<String>,
}

impl ConfigDocument {
    /// Parses a YAML configuration message.
    pub fn parse(bytes: &[u8]) -> Result<Self, BuildError> {
        serde_yaml::from_slice(bytes).map_err(|err| BuildError::Parse(err.to_string()))
    }
}

/// One named matcher definition.
///
/// Deserialization enforces that an entry carries exactly one body key;
/// an entry with none, or with several, is rejected with an error naming
/// the matcher.
#[derive(Debug, Clone)]
pub struct MatcherDef {
    pub name: String,
    pub body: MatcherBody,
}

/// Raw YAML shape of a matcher entry. The body keys arrive as siblings of
/// `name`, so each is optional here; [`MatcherDef`] narrows them to one.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMatcherDef {
    name: String,
    #[serde(rename = "match")]
    simple: Option<SimpleDef>,
    all_of: Option<Vec<String>>,
    any_of: Option<Vec<String>>,
    not: Option<String>,
}

impl<'de> Deserialize<'de> for MatcherDef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let RawMatcherDef {
            name,
            simple,
            all_of,
            any_of,
            not,
        } = RawMatcherDef::deserialize(deserializer)?;

        let body = match (simple, all_of, any_of, not) {
            (Some(simple), None, None, None) => MatcherBody::Match(simple),
            (None, Some(references), None, None) => MatcherBody::AllOf(references),
            (None, None, Some(references), None) => MatcherBody::AnyOf(references),
            (None, None, None, Some(reference)) => MatcherBody::Not(reference),
            _ => {
                return Err(serde::de::Error::custom(format!(
                    "matcher '{name}' must declare exactly one of 'match', 'all_of', 'any_of', 'not'"
                )))
            }
        };

        Ok(MatcherDef { name, body })
    }
}

/// The body of a matcher definition, selected by the key present on the
/// entry.
#[derive(Debug, Clone)]
pub enum MatcherBody {
    /// Field predicate over a single event.
    Match(SimpleDef),
    /// True iff every referenced matcher is true.
    AllOf(Vec<String>),
    /// True iff at least one referenced matcher is true.
    AnyOf(Vec<String>),
    /// Inverts the referenced matcher.
    Not(String),
}

/// Simple matcher body: category gate plus conjoined field predicates.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimpleDef {
    pub categories: Vec<u32>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// One field predicate definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub position: usize,
    pub op: FieldOpKind,
    pub value: ScalarValue,
}

/// Predicate operator names accepted in configuration documents.
///
/// `eq`/`neq` apply to every scalar type; the orderings `lt`/`gt`/`le`/`ge`
/// apply to integers and floats; `contains`, `starts_with`, `ends_with` and
/// `regex` apply to strings only. The builder rejects mismatched
/// combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOpKind {
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
}

impl FieldOpKind {
    /// Configuration spelling of the operator, for diagnostics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldOpKind::Eq => "eq",
            FieldOpKind::Neq => "neq",
            FieldOpKind::Lt => "lt",
            FieldOpKind::Gt => "gt",
            FieldOpKind::Le => "le",
            FieldOpKind::Ge => "ge",
            FieldOpKind::Contains => "contains",
            FieldOpKind::StartsWith => "starts_with",
            FieldOpKind::EndsWith => "ends_with",
            FieldOpKind::Regex => "regex",
        }
    }
}

/// A predicate operand as written in the document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(v) => write!(f, "bool {v}"),
            ScalarValue::Int(v) => write!(f, "int {v}"),
            ScalarValue::Float(v) => write!(f, "float {v}"),
            ScalarValue::Str(v) => write!(f, "string '{v}'"),
        }
    }
}
