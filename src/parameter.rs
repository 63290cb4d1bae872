//! Description of the parameters of a prepared call and the ways to address them.

mod name_map;

use std::fmt;

use crate::handles::SqlType;

pub use self::name_map::ParameterNameMap;

/// Direction in which data flows through a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterMode {
    /// The engine could not determine the direction. Permits both setting and reading.
    #[default]
    Unknown,
    In,
    InOut,
    Out,
}

impl ParameterMode {
    /// `true` if the parameter may be set before execution.
    pub fn accepts_input(self) -> bool {
        matches!(
            self,
            ParameterMode::In | ParameterMode::InOut | ParameterMode::Unknown
        )
    }

    /// `true` if the parameter may be read after execution.
    pub fn provides_output(self) -> bool {
        matches!(
            self,
            ParameterMode::Out | ParameterMode::InOut | ParameterMode::Unknown
        )
    }
}

impl fmt::Display for ParameterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ParameterMode::Unknown => "UNKNOWN",
            ParameterMode::In => "IN",
            ParameterMode::InOut => "INOUT",
            ParameterMode::Out => "OUT",
        };
        f.write_str(text)
    }
}

/// Declaration of a single parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescription {
    /// Name of the parameter, e.g. `@p0`. `None` if the engine reports none.
    pub label: Option<String>,
    pub mode: ParameterMode,
    pub sql_type: SqlType,
}

/// Declared parameters of a prepared call, in ordinal order.
///
/// ```
/// use engine_driver::{ParameterMetadata, ParameterMode, handles::SqlType};
///
/// let metadata = ParameterMetadata::new()
///     .parameter("@name", ParameterMode::In, SqlType::Varchar)
///     .parameter("@count", ParameterMode::Out, SqlType::Integer);
///
/// assert_eq!(2, metadata.len());
/// assert_eq!(Some(ParameterMode::Out), metadata.mode(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMetadata {
    parameters: Vec<ParameterDescription>,
}

impl ParameterMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named parameter.
    pub fn parameter(mut self, label: &str, mode: ParameterMode, sql_type: SqlType) -> Self {
        self.parameters.push(ParameterDescription {
            label: Some(label.to_owned()),
            mode,
            sql_type,
        });
        self
    }

    /// Appends a parameter without a name. It can only be addressed by its ordinal.
    pub fn unnamed_parameter(mut self, mode: ParameterMode, sql_type: SqlType) -> Self {
        self.parameters.push(ParameterDescription {
            label: None,
            mode,
            sql_type,
        });
        self
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Declaration of the parameter with the one based `ordinal`.
    pub fn description(&self, ordinal: u16) -> Option<&ParameterDescription> {
        usize::from(ordinal)
            .checked_sub(1)
            .and_then(|index| self.parameters.get(index))
    }

    pub fn mode(&self, ordinal: u16) -> Option<ParameterMode> {
        self.description(ordinal).map(|desc| desc.mode)
    }

    pub fn sql_type(&self, ordinal: u16) -> Option<SqlType> {
        self.description(ordinal).map(|desc| desc.sql_type)
    }

    /// Labels in ordinal order.
    pub fn labels(&self) -> impl Iterator<Item = Option<&str>> {
        self.parameters.iter().map(|desc| desc.label.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDescription> {
        self.parameters.iter()
    }
}

/// Addresses a parameter either by its one based ordinal or by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterRef<'a> {
    Ordinal(u16),
    Name(&'a str),
}

impl fmt::Display for ParameterRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterRef::Ordinal(ordinal) => write!(f, "{ordinal}"),
            ParameterRef::Name(name) => f.write_str(name),
        }
    }
}

impl From<u16> for ParameterRef<'_> {
    fn from(ordinal: u16) -> Self {
        ParameterRef::Ordinal(ordinal)
    }
}

impl<'a> From<&'a str> for ParameterRef<'a> {
    fn from(name: &'a str) -> Self {
        ParameterRef::Name(name)
    }
}
