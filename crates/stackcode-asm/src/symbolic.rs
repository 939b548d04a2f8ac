//! Symbolic model: labels, operands, instructions and the labeled sequence.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use stackcode_core::{CodeMeta, ConstValue, Docstring, OpKind, Opcode, ARG_MAX};

use crate::{AsmError, AsmResult, ConcreteInstr};

static NEXT_LABEL: AtomicU64 = AtomicU64::new(1);

/// Opaque position marker, compared by identity.
///
/// Every call to [`Label::new`] yields a label distinct from all others in
/// the process; copies of a label are the same label.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u64);

impl Label {
    /// Fresh label.
    pub fn new() -> Self {
        Self(NEXT_LABEL.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for Label {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label#{}", self.0)
    }
}

/// Operand of a symbolic instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// No argument.
    None,
    /// Raw integer (counts, free-variable slots, comparison operators…).
    Int(u32),
    /// Constant value, pooled on assembly.
    Const(ConstValue),
    /// Local variable, pooled on assembly.
    Local(String),
    /// Global / attribute name, pooled on assembly.
    Name(String),
    /// Jump target.
    Label(Label),
}

impl Operand {
    /// Operand class, for diagnostics.
    pub const fn describe(&self) -> &'static str {
        match self {
            Operand::None => "no",
            Operand::Int(_) => "integer",
            Operand::Const(_) => "constant",
            Operand::Local(_) => "local variable",
            Operand::Name(_) => "name",
            Operand::Label(_) => "label",
        }
    }
}

impl From<Label> for Operand { fn from(l: Label) -> Self { Operand::Label(l) } }
impl From<ConstValue> for Operand { fn from(v: ConstValue) -> Self { Operand::Const(v) } }
impl From<u32> for Operand { fn from(v: u32) -> Self { Operand::Int(v) } }

fn check_operand(opcode: Opcode, operand: &Operand) -> AsmResult<()> {
    let name = opcode.name();
    match (opcode.kind(), operand) {
        (OpKind::NoArg, Operand::None)
        | (OpKind::Const, Operand::Const(_))
        | (OpKind::Local, Operand::Local(_))
        | (OpKind::Name, Operand::Name(_))
        | (OpKind::JumpRel | OpKind::JumpAbs, Operand::Label(_)) => Ok(()),
        (OpKind::NoArg, _) => Err(AsmError::UnexpectedArgument { name }),
        (_, Operand::None) => Err(AsmError::MissingArgument { name }),
        (OpKind::Raw | OpKind::Free | OpKind::Compare, Operand::Int(v)) => {
            if *v > ARG_MAX {
                Err(AsmError::ArgumentOutOfRange { name, arg: i64::from(*v) })
            } else {
                Ok(())
            }
        }
        (kind, other) => Err(AsmError::OperandMismatch {
            name,
            expected: kind.describe(),
            found: other.describe(),
        }),
    }
}

/// Symbolic instruction. The operand always matches the opcode's class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    opcode: Opcode,
    operand: Operand,
    lineno: Option<u32>,
}

impl Instr {
    /// Builds an instruction from an operation name.
    pub fn new(name: &str, operand: Operand) -> AsmResult<Self> {
        Self::from_opcode(Opcode::parse(name)?, operand)
    }

    /// Builds an instruction from an opcode.
    pub fn from_opcode(opcode: Opcode, operand: Operand) -> AsmResult<Self> {
        check_operand(opcode, &operand)?;
        Ok(Self { opcode, operand, lineno: None })
    }

    /// Sets the source line (builder style).
    #[must_use]
    pub fn at_line(mut self, lineno: u32) -> Self {
        self.lineno = Some(lineno);
        self
    }

    /// Opcode.
    pub const fn opcode(&self) -> Opcode { self.opcode }

    /// Operation name.
    pub fn name(&self) -> &'static str { self.opcode.name() }

    /// Operand.
    pub const fn operand(&self) -> &Operand { &self.operand }

    /// Source line; `None` inherits the running line.
    pub const fn lineno(&self) -> Option<u32> { self.lineno }

    /// Replaces the source line.
    pub fn set_lineno(&mut self, lineno: Option<u32>) { self.lineno = lineno; }

    /// Replaces opcode and operand together.
    pub fn set(&mut self, opcode: Opcode, operand: Operand) -> AsmResult<()> {
        check_operand(opcode, &operand)?;
        self.opcode = opcode;
        self.operand = operand;
        Ok(())
    }

    /// Jump label, if this is a jump.
    pub const fn jump_label(&self) -> Option<Label> {
        match self.operand {
            Operand::Label(label) => Some(label),
            _ => None,
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Operand::None => write!(f, "{}", self.opcode),
            Operand::Int(v) => write!(f, "{} {v}", self.opcode),
            Operand::Const(v) => write!(f, "{} {v}", self.opcode),
            Operand::Local(n) | Operand::Name(n) => write!(f, "{} {n}", self.opcode),
            Operand::Label(l) => write!(f, "{} {l:?}", self.opcode),
        }
    }
}

/// Element of a symbolic sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// Position marker.
    Label(Label),
    /// Changes the running line without emitting code.
    SetLineno(u32),
    /// Symbolic instruction.
    Instr(Instr),
    /// Already-concrete instruction, emitted unchanged.
    Concrete(ConcreteInstr),
}

impl From<Label> for Item { fn from(l: Label) -> Self { Item::Label(l) } }
impl From<Instr> for Item { fn from(i: Instr) -> Self { Item::Instr(i) } }
impl From<ConcreteInstr> for Item { fn from(c: ConcreteInstr) -> Self { Item::Concrete(c) } }

/// Symbolic, labeled instruction sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bytecode {
    /// Metadata (passed through).
    pub meta: CodeMeta,
    /// Docstring; registered as constant 0 on assembly.
    pub docstring: Option<Docstring>,
    /// Argument names; seed the local-variable pool in order.
    pub argnames: Vec<String>,
    /// Items in program order.
    pub items: Vec<Item>,
}

impl Bytecode {
    /// Empty sequence for the given metadata.
    pub fn new(meta: CodeMeta) -> Self {
        Self { meta, ..Self::default() }
    }

    /// Appends an item.
    pub fn push(&mut self, item: impl Into<Item>) {
        self.items.push(item.into());
    }

    /// Appends an instruction built from a name and operand.
    pub fn emit(&mut self, name: &str, operand: Operand) -> AsmResult<()> {
        self.items.push(Item::Instr(Instr::new(name, operand)?));
        Ok(())
    }

    /// Symbolic instructions, skipping labels and line markers.
    pub fn instrs(&self) -> impl Iterator<Item = &Instr> + '_ {
        self.items.iter().filter_map(|item| match item {
            Item::Instr(instr) => Some(instr),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn labels_are_identities() {
        let a = Label::new();
        let b = Label::new();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn operand_class_is_checked() {
        assert!(Instr::new("LOAD_CONST", Operand::Const(ConstValue::Int(1))).is_ok());
        assert!(Instr::new("JUMP_ABSOLUTE", Operand::Label(Label::new())).is_ok());
        assert_eq!(
            Instr::new("LOAD_CONST", Operand::Name("x".into())),
            Err(AsmError::OperandMismatch { name: "LOAD_CONST", expected: "constant", found: "name" })
        );
        assert_eq!(
            Instr::new("JUMP_FORWARD", Operand::Int(3)),
            Err(AsmError::OperandMismatch { name: "JUMP_FORWARD", expected: "label", found: "integer" })
        );
        assert_eq!(
            Instr::new("POP_TOP", Operand::Int(3)),
            Err(AsmError::UnexpectedArgument { name: "POP_TOP" })
        );
        assert_eq!(
            Instr::new("LOAD_FAST", Operand::None),
            Err(AsmError::MissingArgument { name: "LOAD_FAST" })
        );
        assert_eq!(
            Instr::new("BUILD_TUPLE", Operand::Int(ARG_MAX + 1)),
            Err(AsmError::ArgumentOutOfRange { name: "BUILD_TUPLE", arg: i64::from(ARG_MAX) + 1 })
        );
    }

    #[test]
    fn set_keeps_invariant() {
        let mut instr = Instr::new("LOAD_CONST", Operand::Const(ConstValue::None)).unwrap();
        let nop = Opcode::from_name("NOP").unwrap();
        assert!(instr.set(nop, Operand::Const(ConstValue::None)).is_err());
        assert_eq!(instr.name(), "LOAD_CONST");
        instr.set(nop, Operand::None).unwrap();
        assert_eq!(instr.to_string(), "NOP");
    }
}
