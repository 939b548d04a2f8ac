//! stackcode-asm — assembleur / désassembleur
//!
//! Conversion bidirectionnelle entre :
//! - une séquence **symbolique** étiquetée ([`Bytecode`] : labels, marqueurs
//!   de ligne, instructions à opérande typé)
//! - une séquence **concrète** ([`ConcreteBytecode`] : arguments numériques,
//!   pools de constantes / noms / variables locales)
//! - la forme **brute** chargeable ([`RawCode`](stackcode_core::RawCode) :
//!   octets + pools + table de lignes compressée)
//!
//! ```text
//! RawCode ──disassemble──▶ ConcreteBytecode ──to_bytecode──▶ Bytecode
//! RawCode ◀──to_raw─────── ConcreteBytecode ◀──to_concrete── Bytecode
//! ```
//!
//! Features :
//! - `serde` : (dé)sérialisation des options

#![deny(missing_docs)]

/* ─────────────────────────── Imports ─────────────────────────── */

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Modules ─────────────────────────── */

mod asm;
mod concrete;
mod error;
mod reconstruct;
mod symbolic;

/// Désassemblage et listing texte.
pub mod disasm;
/// Table de lignes compressée.
pub mod lnotab;
/// Pools dédupliqués.
pub mod pool;

pub use concrete::{ConcreteBytecode, ConcreteInstr, Encoded};
pub use disasm::{disassemble, listing};
pub use error::{AsmError, AsmResult};
pub use pool::{PoolBuilder, Pools};
pub use symbolic::{Bytecode, Instr, Item, Label, Operand};

/* ─────────────────────────── Options ─────────────────────────── */

/// Options of symbolic → concrete assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AssembleOptions {
    /// Cap on jump-resolution passes (`0` counts as `1`).
    pub max_passes: usize,
}

impl Default for AssembleOptions {
    fn default() -> Self { Self { max_passes: 16 } }
}

/// Options of raw → concrete disassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DisassembleOptions {
    /// Merge each extension prefix into the instruction it precedes.
    pub fold_extended_arg: bool,
}

impl Default for DisassembleOptions {
    fn default() -> Self { Self { fold_extended_arg: true } }
}

/* ─────────────────────────── Prélude ─────────────────────────── */

/// Prélude : types et options les plus utilisés.
pub mod prelude {
    /// Réexports pour une importation rapide.
    pub use super::{
        AsmError, AsmResult, AssembleOptions, Bytecode, ConcreteBytecode, ConcreteInstr,
        DisassembleOptions, Instr, Item, Label, Operand,
    };
    pub use stackcode_core::prelude::*;
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        assert_eq!(AssembleOptions::default().max_passes, 16);
        assert!(DisassembleOptions::default().fold_extended_arg);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn options_from_json() {
        let opts: AssembleOptions = serde_json::from_str(r#"{"max_passes": 4}"#).unwrap();
        assert_eq!(opts.max_passes, 4);
        let opts: DisassembleOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, DisassembleOptions::default());
    }
}
