//! Identifiers, mask parameters, and per-field metadata.

use std::fmt;

use indexmap::IndexMap;

use crate::value::Unit;

/// Name of a field in the source catalogue (e.g. `"xyz_g"`).
pub type FieldName = String;

/// Classification shared by all fields that use the same selector
/// (e.g. `"particle_g"`, `"group"`, `"header"`).
pub type KeyType = String;

/// A scalar parameter used in identifiers and mask arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum Param {
    /// An integer component (group number, snapshot index, ...).
    Int(i64),
    /// A dimensionless floating-point component.
    Float(f64),
    /// A text component (simulation name, physics flavour, ...).
    Text(String),
    /// A continuous parameter carrying a unit (e.g. an aperture radius).
    Quantity {
        /// Numerical value.
        value: f64,
        /// Unit of `value`.
        unit: Unit,
    },
}

impl Param {
    /// Build a [`Param::Quantity`].
    pub fn quantity(value: f64, unit: impl Into<Unit>) -> Self {
        Self::Quantity {
            value,
            unit: unit.into(),
        }
    }

    /// The integer value, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The numerical value of an `Int`, `Float`, or `Quantity`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Quantity { value, .. } => Some(*value),
            Self::Text(_) => None,
        }
    }

    /// The text, if this is a `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The unit of a `Quantity`; other variants are dimensionless.
    pub fn unit(&self) -> Unit {
        match self {
            Self::Quantity { unit, .. } => unit.clone(),
            _ => Unit::dimensionless(),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Quantity { value, unit } if unit.is_dimensionless() => write!(f, "{value}"),
            Self::Quantity { value, unit } => write!(f, "{value}{unit}"),
        }
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// An ordered set of named components identifying an object or snapshot.
///
/// Component order is preserved, so two identifiers built in the same
/// order render and hash identically.
///
/// # Examples
///
/// ```
/// use simobj_core::Identifier;
///
/// let obj = Identifier::new().with("fof", 1).with("sub", 0);
/// assert_eq!(obj.int("fof"), Some(1));
/// assert_eq!(obj.to_string(), "fof=1,sub=0");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Identifier {
    parts: IndexMap<String, Param>,
}

impl Identifier {
    /// Create an empty identifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a component, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.parts.insert(name.into(), value.into());
        self
    }

    /// Look up a component by name.
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.parts.get(name)
    }

    /// Look up an integer component by name.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Param::as_int)
    }

    /// Iterate components in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.parts.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` if there are no components.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

/// Extra arguments forwarded to every mask function.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaskArgs {
    /// Positional arguments, in order.
    pub positional: Vec<Param>,
    /// Keyword arguments, in insertion order.
    pub keyword: IndexMap<String, Param>,
}

impl MaskArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyword argument, builder style.
    pub fn with_kwarg(mut self, name: impl Into<String>, value: impl Into<Param>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Add a positional argument, builder style.
    pub fn with_arg(mut self, value: impl Into<Param>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Look up a keyword argument.
    pub fn kwarg(&self, name: &str) -> Option<&Param> {
        self.keyword.get(name)
    }
}

/// Classification a field source reports for one of its fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldMeta {
    /// Selector-sharing classification.
    pub keytype: KeyType,
    /// Which backing file family the field is read from.
    pub filetype: String,
}

impl FieldMeta {
    /// Build metadata from a keytype and filetype.
    pub fn new(keytype: impl Into<String>, filetype: impl Into<String>) -> Self {
        Self {
            keytype: keytype.into(),
            filetype: filetype.into(),
        }
    }
}

/// Coordinate class of a vector field, used to route translations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CoordClass {
    /// Positions; translated by positional recentering.
    Position,
    /// Velocities; translated by velocity recentering.
    Velocity,
}

impl CoordClass {
    /// Stable one-byte tag used by the cache codec.
    pub fn tag(self) -> u8 {
        match self {
            Self::Position => 0,
            Self::Velocity => 1,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Position),
            1 => Some(Self::Velocity),
            _ => None,
        }
    }
}

impl fmt::Display for CoordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position => write!(f, "position"),
            Self::Velocity => write!(f, "velocity"),
        }
    }
}
