//! Values that can live in the constant pool.
//!
//! Equality and hashing are strict: two constants are equal only if they have
//! the same variant *and* the same bit pattern. `Bool(true)` and `Int(1)`,
//! `Float(0.0)` and `Float(-0.0)` are distinct pool entries, while a NaN is
//! equal to itself. This is the dedup key used by the pool builder.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::mem;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Constant value.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConstValue {
    /// The "no value" marker.
    None,
    /// The ellipsis singleton.
    Ellipsis,
    /// Boolean literal.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// Complex number.
    Complex {
        /// Real part.
        re: f64,
        /// Imaginary part.
        im: f64,
    },
    /// Text constant.
    Str(String),
    /// Raw byte string.
    Bytes(Vec<u8>),
    /// Tuple of constants.
    Tuple(Vec<ConstValue>),
    /// Frozen set of constants (order as written).
    FrozenSet(Vec<ConstValue>),
}

impl ConstValue {
    /// Type name used in diagnostics.
    pub const fn type_name(&self) -> &'static str {
        match self {
            ConstValue::None => "none",
            ConstValue::Ellipsis => "ellipsis",
            ConstValue::Bool(_) => "bool",
            ConstValue::Int(_) => "int",
            ConstValue::Float(_) => "float",
            ConstValue::Complex { .. } => "complex",
            ConstValue::Str(_) => "str",
            ConstValue::Bytes(_) => "bytes",
            ConstValue::Tuple(_) => "tuple",
            ConstValue::FrozenSet(_) => "frozenset",
        }
    }

    /// Text payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// True for the "no value" marker.
    pub const fn is_none(&self) -> bool { matches!(self, ConstValue::None) }
}

impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstValue::None, ConstValue::None) | (ConstValue::Ellipsis, ConstValue::Ellipsis) => true,
            (ConstValue::Bool(a), ConstValue::Bool(b)) => a == b,
            (ConstValue::Int(a), ConstValue::Int(b)) => a == b,
            (ConstValue::Float(a), ConstValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ConstValue::Complex { re: ar, im: ai }, ConstValue::Complex { re: br, im: bi }) => {
                ar.to_bits() == br.to_bits() && ai.to_bits() == bi.to_bits()
            }
            (ConstValue::Str(a), ConstValue::Str(b)) => a == b,
            (ConstValue::Bytes(a), ConstValue::Bytes(b)) => a == b,
            (ConstValue::Tuple(a), ConstValue::Tuple(b))
            | (ConstValue::FrozenSet(a), ConstValue::FrozenSet(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ConstValue {}

impl Hash for ConstValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            ConstValue::None | ConstValue::Ellipsis => {}
            ConstValue::Bool(b) => b.hash(state),
            ConstValue::Int(v) => v.hash(state),
            ConstValue::Float(v) => v.to_bits().hash(state),
            ConstValue::Complex { re, im } => {
                re.to_bits().hash(state);
                im.to_bits().hash(state);
            }
            ConstValue::Str(s) => s.hash(state),
            ConstValue::Bytes(bytes) => bytes.hash(state),
            ConstValue::Tuple(items) | ConstValue::FrozenSet(items) => items.hash(state),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[ConstValue]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::None => f.write_str("None"),
            ConstValue::Ellipsis => f.write_str("..."),
            ConstValue::Bool(true) => f.write_str("True"),
            ConstValue::Bool(false) => f.write_str("False"),
            ConstValue::Int(i) => write!(f, "{i}"),
            ConstValue::Float(x) => write!(f, "{x:?}"),
            ConstValue::Complex { re, im } => write!(f, "({re:?}{im:+?}j)"),
            ConstValue::Str(s) => {
                if s.chars().count() <= 64 {
                    write!(f, "{s:?}")
                } else {
                    let head: String = s.chars().take(64).collect();
                    write!(f, "{head:?}…")
                }
            }
            ConstValue::Bytes(bytes) => write!(f, "bytes[{}]", bytes.len()),
            ConstValue::Tuple(items) => {
                f.write_str("(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            ConstValue::FrozenSet(items) => {
                f.write_str("frozenset({")?;
                write_items(f, items)?;
                f.write_str("})")
            }
        }
    }
}

/* Conversions */
impl From<()> for ConstValue { fn from((): ()) -> Self { ConstValue::None } }
impl From<bool> for ConstValue { fn from(v: bool) -> Self { ConstValue::Bool(v) } }
impl From<i64> for ConstValue { fn from(v: i64) -> Self { ConstValue::Int(v) } }
impl From<i32> for ConstValue { fn from(v: i32) -> Self { ConstValue::Int(i64::from(v)) } }
impl From<f64> for ConstValue { fn from(v: f64) -> Self { ConstValue::Float(v) } }
impl From<String> for ConstValue { fn from(v: String) -> Self { ConstValue::Str(v) } }
impl From<&str> for ConstValue { fn from(v: &str) -> Self { ConstValue::Str(v.to_owned()) } }
impl From<Vec<u8>> for ConstValue { fn from(v: Vec<u8>) -> Self { ConstValue::Bytes(v) } }
