//! Metadata of a code unit and the raw form exchanged with the host.

use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::value::ConstValue;

bitflags! {
    /// Flags bitmask of a code unit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct CodeFlags: u32 {
        /// Locals live in fast slots.
        const OPTIMIZED          = 0x0001;
        /// A fresh locals dict is created per call.
        const NEWLOCALS          = 0x0002;
        /// Takes `*args`.
        const VARARGS            = 0x0004;
        /// Takes `**kwargs`.
        const VARKEYWORDS        = 0x0008;
        /// Nested function.
        const NESTED             = 0x0010;
        /// Generator function.
        const GENERATOR          = 0x0020;
        /// No free or cell variables.
        const NOFREE             = 0x0040;
        /// Native coroutine.
        const COROUTINE          = 0x0080;
        /// Generator usable as a coroutine.
        const ITERABLE_COROUTINE = 0x0100;
    }
}

/// Metadata carried unchanged through every conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CodeMeta {
    /// Unit name.
    pub name: String,
    /// Source filename.
    pub filename: String,
    /// Positional argument count.
    pub argcount: u32,
    /// Keyword-only argument count.
    pub kwonly_argcount: u32,
    /// Flags bitmask.
    pub flags: CodeFlags,
    /// Declared stack size (opaque, never recomputed).
    pub stacksize: u32,
    /// First source line of the unit.
    pub first_lineno: u32,
    /// Free variable names.
    pub freevars: Vec<String>,
    /// Cell variable names.
    pub cellvars: Vec<String>,
}

impl Default for CodeMeta {
    fn default() -> Self {
        Self {
            name: "<module>".into(),
            filename: "<string>".into(),
            argcount: 0,
            kwonly_argcount: 0,
            flags: CodeFlags::empty(),
            stacksize: 0,
            first_lineno: 1,
            freevars: Vec::new(),
            cellvars: Vec::new(),
        }
    }
}

impl CodeMeta {
    /// Number of leading local-variable slots that hold arguments.
    pub fn arg_slot_count(&self) -> usize {
        let mut nargs = self.argcount as usize + self.kwonly_argcount as usize;
        if self.flags.contains(CodeFlags::VARARGS) {
            nargs += 1;
        }
        if self.flags.contains(CodeFlags::VARKEYWORDS) {
            nargs += 1;
        }
        nargs
    }
}

/// Documentation attached to a unit; occupies constant slot 0 when present.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Docstring {
    /// Text documentation.
    Text(String),
    /// Explicit "no value" marker in slot 0.
    NoneValue,
}

impl Docstring {
    /// Derives the docstring from the first constant of a pool.
    pub fn from_consts(consts: &[ConstValue]) -> Option<Self> {
        match consts.first()? {
            ConstValue::Str(s) => Some(Docstring::Text(s.clone())),
            ConstValue::None => Some(Docstring::NoneValue),
            _ => None,
        }
    }

    /// Constant registered for this docstring.
    pub fn to_const(&self) -> ConstValue {
        match self {
            Docstring::Text(s) => ConstValue::Str(s.clone()),
            Docstring::NoneValue => ConstValue::None,
        }
    }
}

/// Loadable form of a unit, as handed to / received from the host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawCode {
    /// Metadata.
    pub meta: CodeMeta,
    /// Instruction stream.
    pub code: Vec<u8>,
    /// Constant pool.
    pub consts: Vec<ConstValue>,
    /// Global / attribute name pool.
    pub names: Vec<String>,
    /// Local-variable pool (arguments first).
    pub varnames: Vec<String>,
    /// Compressed line table.
    pub lnotab: Vec<u8>,
}

impl RawCode {
    /// Number of local slots.
    pub fn nlocals(&self) -> usize { self.varnames.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn arg_slots_count_star_args() {
        let meta = CodeMeta {
            argcount: 2,
            kwonly_argcount: 1,
            flags: CodeFlags::VARARGS | CodeFlags::VARKEYWORDS,
            ..CodeMeta::default()
        };
        assert_eq!(meta.arg_slot_count(), 5);
    }

    #[test]
    fn docstring_from_slot_zero() {
        assert_eq!(
            Docstring::from_consts(&["doc".into(), ConstValue::Int(1)]),
            Some(Docstring::Text("doc".into()))
        );
        assert_eq!(Docstring::from_consts(&[ConstValue::None]), Some(Docstring::NoneValue));
        assert_eq!(Docstring::from_consts(&[ConstValue::Int(1)]), None);
        assert_eq!(Docstring::from_consts(&[]), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn raw_code_json_roundtrip() {
        let raw = RawCode {
            meta: CodeMeta { flags: CodeFlags::OPTIMIZED, ..CodeMeta::default() },
            code: vec![100, 0, 0, 83],
            consts: vec![ConstValue::None],
            ..RawCode::default()
        };
        let json = serde_json::to_string(&raw).unwrap();
        let back: RawCode = serde_json::from_str(&json).unwrap();
        assert_eq!(raw, back);
    }
}
