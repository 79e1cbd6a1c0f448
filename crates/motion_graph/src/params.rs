use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    Float(f32),
    Vector(Vec3),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Vector(_) => ParamKind::Vector,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Float,
    Vector,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Float => f.write_str("float"),
            ParamKind::Vector => f.write_str("vector"),
        }
    }
}

pub type ParameterTable = BTreeMap<String, ParamValue>;

/// A tunable as authored: either a literal or the name of a shared graph parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamRef<T> {
    Literal(T),
    Bound { param: String },
}

impl<T> ParamRef<T> {
    pub fn bound(name: impl Into<String>) -> Self {
        ParamRef::Bound { param: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

impl FloatRange {
    pub const UNBOUNDED: FloatRange = FloatRange {
        min: f32::MIN,
        max: f32::MAX,
    };

    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorRange {
    pub max_length: f32,
}

pub trait ParamType: Copy + PartialEq + fmt::Debug {
    type Range: Copy + fmt::Debug;
    const KIND: ParamKind;

    fn from_value(value: &ParamValue) -> Option<Self>;
    fn is_finite(self) -> bool;
    fn clamp_to(self, range: Self::Range) -> Self;
}

impl ParamType for f32 {
    type Range = FloatRange;
    const KIND: ParamKind = ParamKind::Float;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Float(value) => Some(*value),
            ParamValue::Vector(_) => None,
        }
    }

    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }

    fn clamp_to(self, range: FloatRange) -> Self {
        self.clamp(range.min, range.max)
    }
}

impl ParamType for Vec3 {
    type Range = VectorRange;
    const KIND: ParamKind = ParamKind::Vector;

    fn from_value(value: &ParamValue) -> Option<Self> {
        match value {
            ParamValue::Vector(value) => Some(*value),
            ParamValue::Float(_) => None,
        }
    }

    fn is_finite(self) -> bool {
        Vec3::is_finite(self)
    }

    fn clamp_to(self, range: VectorRange) -> Self {
        self.clamp_length(range.max_length)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    Literal,
    Shared(String),
}

/// A reference after binding. The value is resolved and range-clamped once, so reads never
/// fail or allocate.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam<T> {
    value: T,
    source: ParamSource,
}

impl<T: ParamType> BoundParam<T> {
    #[inline]
    pub fn get(&self) -> T {
        self.value
    }

    pub fn source(&self) -> &ParamSource {
        &self.source
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("binding failed for '{state}' field '{field}': {kind}")]
pub struct BindingError {
    pub state: String,
    pub field: String,
    pub kind: BindingErrorKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingErrorKind {
    #[error("unknown shared parameter '{name}'")]
    UnknownParameter { name: String },
    #[error("shared parameter '{name}' is a {found}, expected a {expected}")]
    TypeMismatch {
        name: String,
        expected: ParamKind,
        found: ParamKind,
    },
    #[error("value is not finite")]
    NonFinite,
}

/// Resolves references for one owner (a state, or a transition's source state).
pub struct Binder<'a> {
    parameters: &'a ParameterTable,
    owner: &'a str,
}

impl<'a> Binder<'a> {
    pub fn new(parameters: &'a ParameterTable, owner: &'a str) -> Self {
        Self { parameters, owner }
    }

    pub fn bind<T: ParamType>(
        &self,
        field: &str,
        reference: &ParamRef<T>,
        range: T::Range,
    ) -> Result<BoundParam<T>, BindingError> {
        let (raw, source) = match reference {
            ParamRef::Literal(value) => (*value, ParamSource::Literal),
            ParamRef::Bound { param } => {
                let shared = self
                    .parameters
                    .get(param)
                    .ok_or_else(|| self.error(field, BindingErrorKind::UnknownParameter {
                        name: param.clone(),
                    }))?;
                let value = T::from_value(shared).ok_or_else(|| {
                    self.error(
                        field,
                        BindingErrorKind::TypeMismatch {
                            name: param.clone(),
                            expected: T::KIND,
                            found: shared.kind(),
                        },
                    )
                })?;
                (value, ParamSource::Shared(param.clone()))
            }
        };

        if !raw.is_finite() {
            return Err(self.error(field, BindingErrorKind::NonFinite));
        }

        let value = raw.clamp_to(range);
        if value != raw {
            warn!(
                owner = self.owner,
                field,
                authored = ?raw,
                clamped = ?value,
                range = ?range,
                "motion_param_clamped"
            );
        }

        Ok(BoundParam { value, source })
    }

    fn error(&self, field: &str, kind: BindingErrorKind) -> BindingError {
        BindingError {
            state: self.owner.to_string(),
            field: field.to_string(),
            kind,
        }
    }
}
