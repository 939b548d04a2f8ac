//! Concrete instructions (operand codec) and the concrete container.
//!
//! Encoding of one instruction:
//!
//! ```text
//! no argument        : [op]
//! argument <= 0xFFFF : [op][lo16 LE]
//! argument >  0xFFFF : [EXTENDED_ARG][hi16 LE][op][lo16 LE]
//! ```
//!
//! A small argument may still be held at 6 bytes (see
//! [`ConcreteInstr::widen`]); the prefix then carries zero high bits.

use core::fmt;

use smallvec::SmallVec;
use stackcode_core::{
    ByteReader, ByteWriter, CodeMeta, ConstValue, CoreError, Docstring, OpKind, Opcode, RawCode,
    ARG_MAX, EXTENDED_ARG,
};

use crate::{lnotab, AsmError, AsmResult};

/// Bytes of one encoded instruction (at most 6).
pub type Encoded = SmallVec<[u8; 6]>;

/// Concrete instruction: numeric opcode, optional argument, line number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConcreteInstr {
    opcode: Opcode,
    arg: Option<u32>,
    lineno: Option<u32>,
    /// Encoded with a prefix whatever the argument.
    wide: bool,
}

fn check_arg(opcode: Opcode, arg: Option<u32>) -> AsmResult<()> {
    match (opcode.has_arg(), arg) {
        (true, None) => Err(AsmError::MissingArgument { name: opcode.name() }),
        (false, Some(_)) => Err(AsmError::UnexpectedArgument { name: opcode.name() }),
        (true, Some(arg)) if arg > ARG_MAX => {
            Err(AsmError::ArgumentOutOfRange { name: opcode.name(), arg: i64::from(arg) })
        }
        _ => Ok(()),
    }
}

impl ConcreteInstr {
    /// Builds an instruction, rejecting missing, superfluous or out-of-range arguments.
    pub fn new(opcode: Opcode, arg: Option<u32>, lineno: Option<u32>) -> AsmResult<Self> {
        check_arg(opcode, arg)?;
        Ok(Self { opcode, arg, lineno, wide: false })
    }

    /// Same as [`ConcreteInstr::new`], looking the opcode up by name.
    pub fn with_name(name: &str, arg: Option<u32>, lineno: Option<u32>) -> AsmResult<Self> {
        Self::new(Opcode::parse(name)?, arg, lineno)
    }

    /// Builds an instruction from a wide signed argument (jump resolution, folding).
    pub(crate) fn from_wide(opcode: Opcode, arg: i64, lineno: Option<u32>) -> AsmResult<Self> {
        let arg = u32::try_from(arg)
            .ok()
            .filter(|a| *a <= ARG_MAX)
            .ok_or(AsmError::ArgumentOutOfRange { name: opcode.name(), arg })?;
        Self::new(opcode, Some(arg), lineno)
    }

    /// Opcode.
    pub const fn opcode(&self) -> Opcode { self.opcode }

    /// Operation name.
    pub fn name(&self) -> &'static str { self.opcode.name() }

    /// Argument, if the opcode takes one.
    pub const fn arg(&self) -> Option<u32> { self.arg }

    /// Source line, if set.
    pub const fn lineno(&self) -> Option<u32> { self.lineno }

    /// Replaces the argument (validated like [`ConcreteInstr::new`]).
    pub fn set_arg(&mut self, arg: Option<u32>) -> AsmResult<()> {
        check_arg(self.opcode, arg)?;
        self.arg = arg;
        Ok(())
    }

    /// Replaces the source line.
    pub fn set_lineno(&mut self, lineno: Option<u32>) { self.lineno = lineno; }

    /// Keeps the 6-byte form even when the argument fits in 16 bits.
    ///
    /// The width survives [`ConcreteInstr::set_arg`]. No effect on an
    /// instruction without argument.
    #[must_use]
    pub fn widen(mut self) -> Self {
        self.wide = self.arg.is_some();
        self
    }

    /// Encoded size in bytes: 1, 3 or 6.
    pub const fn size(&self) -> u32 {
        match self.arg {
            None => 1,
            Some(_) if self.extended_arg() => 6,
            Some(_) => 3,
        }
    }

    /// True if encoding emits an extension prefix.
    pub const fn extended_arg(&self) -> bool {
        match self.arg {
            Some(arg) => self.wide || arg > 0xFFFF,
            None => false,
        }
    }

    /// Byte offset this instruction jumps to when placed at `offset`.
    pub fn jump_target(&self, offset: u32) -> Option<u32> {
        let arg = self.arg?;
        match self.opcode.kind() {
            OpKind::JumpRel => Some(offset.saturating_add(self.size()).saturating_add(arg)),
            OpKind::JumpAbs => Some(arg),
            _ => None,
        }
    }

    /// Appends the encoding to `w`.
    pub fn encode_into(&self, w: &mut ByteWriter) {
        match self.arg {
            None => w.write_u8(self.opcode.code()),
            Some(arg) => {
                if self.extended_arg() {
                    w.write_u8(EXTENDED_ARG);
                    w.write_u16_le((arg >> 16) as u16);
                }
                w.write_u8(self.opcode.code());
                w.write_u16_le((arg & 0xFFFF) as u16);
            }
        }
    }

    /// Encoding as a small inline buffer.
    pub fn encode(&self) -> Encoded {
        let mut w = ByteWriter::with_capacity(6);
        self.encode_into(&mut w);
        Encoded::from_slice(w.as_slice())
    }

    /// Decodes the instruction starting at `offset`.
    ///
    /// Reads one opcode byte plus a 16-bit argument when the opcode takes one.
    /// An extension prefix is returned as-is; folding is the disassembler's job.
    pub fn decode(code: &[u8], offset: usize, lineno: Option<u32>) -> AsmResult<Self> {
        let mut r = ByteReader::at(code, offset);
        let byte = r.read_u8()?;
        let opcode = Opcode::from_u8(byte).ok_or(CoreError::UnknownOpcode { byte, at: offset })?;
        let arg = if opcode.has_arg() { Some(u32::from(r.read_u16_le()?)) } else { None };
        Self::new(opcode, arg, lineno)
    }
}

impl fmt::Display for ConcreteInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arg {
            Some(arg) => write!(f, "{} {arg}", self.opcode),
            None => write!(f, "{}", self.opcode),
        }
    }
}

/* ─────────────────────────── Conteneur concret ─────────────────────────── */

/// Concrete sequence with its pools and metadata.
///
/// Self-contained: no reference back to the conversion that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConcreteBytecode {
    /// Metadata (passed through).
    pub meta: CodeMeta,
    /// Docstring, if the unit declares one.
    pub docstring: Option<Docstring>,
    /// Constant pool.
    pub consts: Vec<ConstValue>,
    /// Name pool.
    pub names: Vec<String>,
    /// Local-variable pool.
    pub varnames: Vec<String>,
    /// Instructions.
    pub instrs: Vec<ConcreteInstr>,
}

impl ConcreteBytecode {
    /// Empty container for the given metadata.
    pub fn new(meta: CodeMeta) -> Self {
        Self { meta, ..Self::default() }
    }

    /// Total encoded size of the instruction stream.
    pub fn code_size(&self) -> u32 {
        self.instrs.iter().map(ConcreteInstr::size).sum()
    }

    /// Byte offset of every instruction.
    pub fn offsets(&self) -> impl Iterator<Item = (u32, &ConcreteInstr)> + '_ {
        self.instrs.iter().scan(0u32, |offset, instr| {
            let at = *offset;
            *offset += instr.size();
            Some((at, instr))
        })
    }

    /// Encodes the instruction stream.
    ///
    /// Returns the bytes and one `(offset, line)` pair per instruction; an
    /// instruction without a line inherits the previous one, or the unit's
    /// first line.
    pub fn assemble_code(&self) -> (Vec<u8>, Vec<(u32, u32)>) {
        let mut w = ByteWriter::with_capacity(self.code_size() as usize);
        let mut linenos = Vec::with_capacity(self.instrs.len());
        let mut lineno = self.meta.first_lineno;
        for (offset, instr) in self.offsets() {
            instr.encode_into(&mut w);
            if let Some(line) = instr.lineno() {
                lineno = line;
            }
            linenos.push((offset, lineno));
        }
        (w.into_vec(), linenos)
    }

    /// Builds the loadable form: code bytes, pools, compressed line table.
    pub fn to_raw(&self) -> RawCode {
        let (code, linenos) = self.assemble_code();
        let lnotab = lnotab::encode(self.meta.first_lineno, &linenos);
        RawCode {
            meta: self.meta.clone(),
            code,
            consts: self.consts.clone(),
            names: self.names.clone(),
            varnames: self.varnames.clone(),
            lnotab,
        }
    }
}
