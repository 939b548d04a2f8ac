//! Error type shared by every conversion of the crate.

/* ─────────────────────────── Erreurs ─────────────────────────── */

use stackcode_core::{CoreError, ARG_MAX};
use thiserror::Error;

/// Errors raised by construction, assembly, disassembly and reconstruction.
///
/// `index` is the position of the offending item in the sequence being
/// converted, `offset` a byte offset in the instruction stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    /// Byte-level failure (truncated stream, unknown opcode, unknown name).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The opcode takes an argument but none was given.
    #[error("operation {name} requires an argument")]
    MissingArgument {
        /// Operation name.
        name: &'static str,
    },

    /// The opcode takes no argument but one was given.
    #[error("operation {name} has no argument")]
    UnexpectedArgument {
        /// Operation name.
        name: &'static str,
    },

    /// Argument outside `0..=ARG_MAX`.
    #[error("operation {name}: argument {arg} out of range 0..={ARG_MAX}")]
    ArgumentOutOfRange {
        /// Operation name.
        name: &'static str,
        /// Rejected value.
        arg: i64,
    },

    /// Symbolic operand of the wrong kind for the opcode.
    #[error("operation {name} expects a {expected} operand, got {found}")]
    OperandMismatch {
        /// Operation name.
        name: &'static str,
        /// Operand class required by the opcode.
        expected: &'static str,
        /// Operand class supplied.
        found: &'static str,
    },

    /// Extension prefix directly followed by another one.
    #[error("extension opcode followed by extension opcode at offset {offset}")]
    ExtendedArgChain {
        /// Offset of the second prefix.
        offset: usize,
    },

    /// Extension prefix as the last instruction.
    #[error("extension opcode at end of code (offset {offset})")]
    ExtendedArgAtEnd {
        /// Offset of the dangling prefix.
        offset: usize,
    },

    /// Extension prefix followed by an opcode without argument.
    #[error("extension opcode at offset {offset} followed by {name}, which has no argument")]
    ExtendedArgWithoutTarget {
        /// Offset of the prefix.
        offset: usize,
        /// Operation following the prefix.
        name: &'static str,
    },

    /// Unfolded extension prefix found where a folded stream is required.
    #[error("unfolded extension opcode at instruction #{index}")]
    UnfoldedExtendedArg {
        /// Instruction index.
        index: usize,
    },

    /// A jump whose label has no position in the sequence.
    #[error("instruction #{index} ({name}) jumps to a label that is not in the sequence")]
    UnresolvedLabel {
        /// Item index of the jump.
        index: usize,
        /// Operation name.
        name: &'static str,
    },

    /// The same label placed at two different offsets.
    #[error("label at item #{index} already placed at offset {first}, found again at offset {second}")]
    ConflictingLabel {
        /// Item index of the second placement.
        index: usize,
        /// First recorded offset.
        first: u32,
        /// Offset of the second placement.
        second: u32,
    },

    /// Relative jump resolving to a negative argument.
    #[error("instruction #{index} ({name}) at offset {offset}: relative jump resolves to negative argument {arg}")]
    NegativeJump {
        /// Item index of the jump.
        index: usize,
        /// Operation name.
        name: &'static str,
        /// Offset of the jump.
        offset: u32,
        /// Computed argument.
        arg: i64,
    },

    /// Jump resolution kept growing instructions past the iteration cap.
    #[error("jump resolution did not converge after {passes} passes")]
    NoConvergence {
        /// Passes performed.
        passes: usize,
    },

    /// Concrete jump whose target is not an instruction boundary.
    #[error("instruction #{index} ({name}) at offset {offset} targets offset {target}, which is not an instruction boundary")]
    DanglingJumpTarget {
        /// Instruction index.
        index: usize,
        /// Operation name.
        name: &'static str,
        /// Offset of the jump.
        offset: u32,
        /// Computed target.
        target: u32,
    },

    /// Pool index past the end of its pool.
    #[error("instruction #{index} ({name}): index {arg} out of range for {pool} pool of size {len}")]
    PoolIndex {
        /// Instruction index.
        index: usize,
        /// Operation name.
        name: &'static str,
        /// Pool name.
        pool: &'static str,
        /// Index carried by the instruction.
        arg: u32,
        /// Pool length.
        len: usize,
    },
}

/// Résultat de l'assembleur.
pub type AsmResult<T> = core::result::Result<T, AsmError>;
