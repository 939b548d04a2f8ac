//! Opcode table of the stack VM.
//!
//! Opcodes below [`HAVE_ARGUMENT`] are encoded as a single byte; the others
//! carry a 16-bit little-endian argument. [`EXTENDED_ARG`] is the prefix that
//! supplies the high 16 bits of arguments that do not fit.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// First opcode that carries an argument.
pub const HAVE_ARGUMENT: u8 = 90;

/// Extension prefix opcode.
pub const EXTENDED_ARG: u8 = 144;

/// Largest argument accepted by an instruction (`2³¹ − 1`).
pub const ARG_MAX: u32 = 2_147_483_647;

/// Operand class of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OpKind {
    /// No argument.
    NoArg,
    /// Plain integer argument.
    Raw,
    /// Index into the constant pool.
    Const,
    /// Index into the name pool (globals, attributes, imports).
    Name,
    /// Index into the local-variable pool.
    Local,
    /// Index into cell + free variables (kept raw).
    Free,
    /// Comparison operator index (kept raw).
    Compare,
    /// Target = own offset + own size + argument.
    JumpRel,
    /// Target = argument.
    JumpAbs,
}

impl OpKind {
    /// Short label used in diagnostics.
    pub const fn describe(self) -> &'static str {
        match self {
            OpKind::NoArg => "no",
            OpKind::Raw | OpKind::Free | OpKind::Compare => "integer",
            OpKind::Const => "constant",
            OpKind::Name => "name",
            OpKind::Local => "local variable",
            OpKind::JumpRel | OpKind::JumpAbs => "label",
        }
    }
}

struct OpInfo {
    code: u8,
    name: &'static str,
    kind: OpKind,
}

const fn op(code: u8, name: &'static str, kind: OpKind) -> OpInfo {
    OpInfo { code, name, kind }
}

use OpKind::{Compare, Const, Free, JumpAbs, JumpRel, Local, Name, NoArg, Raw};

const OPCODES: &[OpInfo] = &[
    op(1, "POP_TOP", NoArg),
    op(2, "ROT_TWO", NoArg),
    op(3, "ROT_THREE", NoArg),
    op(4, "DUP_TOP", NoArg),
    op(5, "DUP_TOP_TWO", NoArg),
    op(9, "NOP", NoArg),
    op(10, "UNARY_POSITIVE", NoArg),
    op(11, "UNARY_NEGATIVE", NoArg),
    op(12, "UNARY_NOT", NoArg),
    op(15, "UNARY_INVERT", NoArg),
    op(16, "BINARY_MATRIX_MULTIPLY", NoArg),
    op(17, "INPLACE_MATRIX_MULTIPLY", NoArg),
    op(19, "BINARY_POWER", NoArg),
    op(20, "BINARY_MULTIPLY", NoArg),
    op(22, "BINARY_MODULO", NoArg),
    op(23, "BINARY_ADD", NoArg),
    op(24, "BINARY_SUBTRACT", NoArg),
    op(25, "BINARY_SUBSCR", NoArg),
    op(26, "BINARY_FLOOR_DIVIDE", NoArg),
    op(27, "BINARY_TRUE_DIVIDE", NoArg),
    op(28, "INPLACE_FLOOR_DIVIDE", NoArg),
    op(29, "INPLACE_TRUE_DIVIDE", NoArg),
    op(50, "GET_AITER", NoArg),
    op(51, "GET_ANEXT", NoArg),
    op(52, "BEFORE_ASYNC_WITH", NoArg),
    op(55, "INPLACE_ADD", NoArg),
    op(56, "INPLACE_SUBTRACT", NoArg),
    op(57, "INPLACE_MULTIPLY", NoArg),
    op(59, "INPLACE_MODULO", NoArg),
    op(60, "STORE_SUBSCR", NoArg),
    op(61, "DELETE_SUBSCR", NoArg),
    op(62, "BINARY_LSHIFT", NoArg),
    op(63, "BINARY_RSHIFT", NoArg),
    op(64, "BINARY_AND", NoArg),
    op(65, "BINARY_XOR", NoArg),
    op(66, "BINARY_OR", NoArg),
    op(67, "INPLACE_POWER", NoArg),
    op(68, "GET_ITER", NoArg),
    op(69, "GET_YIELD_FROM_ITER", NoArg),
    op(70, "PRINT_EXPR", NoArg),
    op(71, "LOAD_BUILD_CLASS", NoArg),
    op(72, "YIELD_FROM", NoArg),
    op(73, "GET_AWAITABLE", NoArg),
    op(75, "INPLACE_LSHIFT", NoArg),
    op(76, "INPLACE_RSHIFT", NoArg),
    op(77, "INPLACE_AND", NoArg),
    op(78, "INPLACE_XOR", NoArg),
    op(79, "INPLACE_OR", NoArg),
    op(80, "BREAK_LOOP", NoArg),
    op(81, "WITH_CLEANUP_START", NoArg),
    op(82, "WITH_CLEANUP_FINISH", NoArg),
    op(83, "RETURN_VALUE", NoArg),
    op(84, "IMPORT_STAR", NoArg),
    op(86, "YIELD_VALUE", NoArg),
    op(87, "POP_BLOCK", NoArg),
    op(88, "END_FINALLY", NoArg),
    op(89, "POP_EXCEPT", NoArg),
    // HAVE_ARGUMENT
    op(90, "STORE_NAME", Name),
    op(91, "DELETE_NAME", Name),
    op(92, "UNPACK_SEQUENCE", Raw),
    op(93, "FOR_ITER", JumpRel),
    op(94, "UNPACK_EX", Raw),
    op(95, "STORE_ATTR", Name),
    op(96, "DELETE_ATTR", Name),
    op(97, "STORE_GLOBAL", Name),
    op(98, "DELETE_GLOBAL", Name),
    op(100, "LOAD_CONST", Const),
    op(101, "LOAD_NAME", Name),
    op(102, "BUILD_TUPLE", Raw),
    op(103, "BUILD_LIST", Raw),
    op(104, "BUILD_SET", Raw),
    op(105, "BUILD_MAP", Raw),
    op(106, "LOAD_ATTR", Name),
    op(107, "COMPARE_OP", Compare),
    op(108, "IMPORT_NAME", Name),
    op(109, "IMPORT_FROM", Name),
    op(110, "JUMP_FORWARD", JumpRel),
    op(111, "JUMP_IF_FALSE_OR_POP", JumpAbs),
    op(112, "JUMP_IF_TRUE_OR_POP", JumpAbs),
    op(113, "JUMP_ABSOLUTE", JumpAbs),
    op(114, "POP_JUMP_IF_FALSE", JumpAbs),
    op(115, "POP_JUMP_IF_TRUE", JumpAbs),
    op(116, "LOAD_GLOBAL", Name),
    op(119, "CONTINUE_LOOP", JumpAbs),
    op(120, "SETUP_LOOP", JumpRel),
    op(121, "SETUP_EXCEPT", JumpRel),
    op(122, "SETUP_FINALLY", JumpRel),
    op(124, "LOAD_FAST", Local),
    op(125, "STORE_FAST", Local),
    op(126, "DELETE_FAST", Local),
    op(130, "RAISE_VARARGS", Raw),
    op(131, "CALL_FUNCTION", Raw),
    op(132, "MAKE_FUNCTION", Raw),
    op(133, "BUILD_SLICE", Raw),
    op(134, "MAKE_CLOSURE", Raw),
    op(135, "LOAD_CLOSURE", Free),
    op(136, "LOAD_DEREF", Free),
    op(137, "STORE_DEREF", Free),
    op(138, "DELETE_DEREF", Free),
    op(140, "CALL_FUNCTION_VAR", Raw),
    op(141, "CALL_FUNCTION_KW", Raw),
    op(142, "CALL_FUNCTION_VAR_KW", Raw),
    op(143, "SETUP_WITH", JumpRel),
    op(EXTENDED_ARG, "EXTENDED_ARG", Raw),
    op(145, "LIST_APPEND", Raw),
    op(146, "SET_ADD", Raw),
    op(147, "MAP_ADD", Raw),
    op(148, "LOAD_CLASSDEREF", Free),
    op(149, "BUILD_LIST_UNPACK", Raw),
    op(150, "BUILD_MAP_UNPACK", Raw),
    op(151, "BUILD_MAP_UNPACK_WITH_CALL", Raw),
    op(152, "BUILD_TUPLE_UNPACK", Raw),
    op(153, "BUILD_SET_UNPACK", Raw),
    op(154, "SETUP_ASYNC_WITH", JumpRel),
];

const NO_ENTRY: u8 = u8::MAX;

// byte -> index into OPCODES
static BY_CODE: [u8; 256] = {
    let mut table = [NO_ENTRY; 256];
    let mut i = 0;
    while i < OPCODES.len() {
        table[OPCODES[i].code as usize] = i as u8;
        i += 1;
    }
    table
};

/// A known opcode of the VM.
///
/// Only values present in the table can be constructed, so `name()` and
/// `kind()` never fail.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct Opcode(u8);

impl Opcode {
    /// The extension prefix.
    pub const EXTENDED_ARG: Opcode = Opcode(EXTENDED_ARG);

    /// Looks up a byte in the table.
    pub fn from_u8(byte: u8) -> Option<Self> {
        (BY_CODE[byte as usize] != NO_ENTRY).then_some(Opcode(byte))
    }

    /// Looks up an operation name (`"LOAD_CONST"`, …).
    pub fn from_name(name: &str) -> Option<Self> {
        OPCODES.iter().find(|info| info.name == name).map(|info| Opcode(info.code))
    }

    /// Same as [`Opcode::from_name`] but reports unknown names.
    pub fn parse(name: &str) -> CoreResult<Self> {
        Self::from_name(name).ok_or_else(|| CoreError::UnknownName(name.to_owned()))
    }

    fn info(self) -> &'static OpInfo {
        &OPCODES[BY_CODE[self.0 as usize] as usize]
    }

    /// Numeric opcode.
    pub const fn code(self) -> u8 { self.0 }

    /// Operation name.
    pub fn name(self) -> &'static str { self.info().name }

    /// Operand class.
    pub fn kind(self) -> OpKind { self.info().kind }

    /// True if the opcode carries an argument.
    pub const fn has_arg(self) -> bool { self.0 >= HAVE_ARGUMENT }

    /// True for relative and absolute jumps.
    pub fn is_jump(self) -> bool { matches!(self.kind(), OpKind::JumpRel | OpKind::JumpAbs) }

    /// True for the extension prefix.
    pub const fn is_extended_arg(self) -> bool { self.0 == EXTENDED_ARG }

    /// Iterates over every known opcode, by increasing byte value.
    pub fn all() -> impl Iterator<Item = Opcode> {
        OPCODES.iter().map(|info| Opcode(info.code))
    }
}

impl TryFrom<u8> for Opcode {
    type Error = CoreError;

    fn try_from(byte: u8) -> CoreResult<Self> {
        Self::from_u8(byte).ok_or(CoreError::UnknownOpcode { byte, at: 0 })
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 { op.0 }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn table_is_sorted_and_unique() {
        let codes: Vec<u8> = Opcode::all().map(Opcode::code).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn argument_split_matches_have_argument() {
        for op in Opcode::all() {
            assert_eq!(op.has_arg(), op.kind() != OpKind::NoArg, "{op:?}");
        }
    }

    #[test]
    fn lookups() {
        let load = Opcode::from_name("LOAD_CONST").unwrap();
        assert_eq!(load.code(), 100);
        assert_eq!(load.kind(), OpKind::Const);
        assert_eq!(Opcode::from_u8(110).map(Opcode::name), Some("JUMP_FORWARD"));
        assert!(Opcode::from_u8(0).is_none());
        assert!(Opcode::from_u8(144).unwrap().is_extended_arg());
        assert_eq!(Opcode::parse("NOPE"), Err(CoreError::UnknownName("NOPE".into())));
    }
}
