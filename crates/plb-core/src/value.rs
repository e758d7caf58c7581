//! Property values as reported by the device and as declared in a manifest

use crate::schema::PropertyKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Token asking for the device's built-in value
pub const DEFAULT_TOKEN: &str = "default";

/// Three-valued boolean
///
/// `Unknown` means the device did not report the property at all (typically
/// because the platform does not support it). It is never the same thing as
/// an explicit `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum TriState {
    #[default]
    Unknown,
    True,
    False,
}

impl TriState {
    /// Device token for this state, `None` when unknown
    pub fn token(self) -> Option<&'static str> {
        match self {
            Self::Unknown => None,
            Self::True => Some("true"),
            Self::False => Some("false"),
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Parse a `"true"` / `"false"` token
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            _ => None,
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Unknown, Self::from)
    }
}

impl From<TriState> for Option<bool> {
    fn from(value: TriState) -> Self {
        match value {
            TriState::Unknown => None,
            TriState::True => Some(true),
            TriState::False => Some(false),
        }
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token().unwrap_or("unknown"))
    }
}

/// A concrete property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Tri-state boolean (`null` serializes as unknown)
    Flag(TriState),
    Int(i64),
    Text(String),
    /// Ordered list of tuples, compared as a set
    Tuples(Vec<Vec<String>>),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn flag(value: bool) -> Self {
        Self::Flag(value.into())
    }

    pub fn tuples<I, T, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Tuples(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    /// Scalar token used for comparison and for device payloads
    ///
    /// Returns `None` for unknown flags and for tuple lists.
    pub fn token(&self) -> Option<String> {
        match self {
            Self::Flag(state) => state.token().map(str::to_string),
            Self::Int(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
            Self::Tuples(_) => None,
        }
    }

    /// Semantic equality
    ///
    /// Scalars compare by token so `16` matches `"16"`; tuple lists compare
    /// as sets of tuples, ignoring order and repeats.
    pub fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Tuples(a), Self::Tuples(b)) => {
                a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
            }
            (Self::Tuples(_), _) | (_, Self::Tuples(_)) => false,
            (Self::Flag(a), Self::Flag(b)) => a == b,
            _ => self.token() == other.token(),
        }
    }

    /// The literal `default` token: the string itself, or a tuple list
    /// whose first entry starts with it
    pub fn is_default_token(&self) -> bool {
        match self {
            Self::Text(s) => s == DEFAULT_TOKEN,
            Self::Tuples(rows) => rows
                .first()
                .and_then(|row| row.first())
                .is_some_and(|s| s == DEFAULT_TOKEN),
            _ => false,
        }
    }

    /// Tri-state view of this value
    pub fn as_tristate(&self) -> TriState {
        match self {
            Self::Flag(state) => *state,
            Self::Text(s) => TriState::parse(s).unwrap_or_default(),
            _ => TriState::Unknown,
        }
    }

    /// Reshape a value to the kind its property declares
    ///
    /// Flag tokens become flags, and a bare string given for a tuple list
    /// becomes a one-element tuple.
    pub fn coerce_to(self, kind: PropertyKind) -> Self {
        match (kind, self) {
            (PropertyKind::Flag, Self::Text(s)) => match TriState::parse(&s) {
                Some(state) => Self::Flag(state),
                None => Self::Text(s),
            },
            (PropertyKind::TupleList, Self::Text(s)) => Self::Tuples(vec![vec![s]]),
            (_, value) => value,
        }
    }

    /// Form sent inside multi-field device calls: booleans become their
    /// string tokens, everything else is unchanged
    pub fn to_device_form(&self) -> Self {
        match self {
            Self::Flag(state) if state.is_known() => {
                Self::Text(state.token().unwrap_or_default().to_string())
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(state) => write!(f, "{state}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Tuples(rows) => {
                let rows: Vec<String> = rows.iter().map(|row| row.join(" ")).collect();
                write!(f, "[{}]", rows.join(", "))
            }
        }
    }
}

/// Current value helper: `None` reads as "not reported"
pub fn display_current(value: Option<&Value>) -> String {
    value.map_or_else(|| "(unset)".to_string(), ToString::to_string)
}
