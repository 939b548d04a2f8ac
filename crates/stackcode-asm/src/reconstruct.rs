//! Reconstruction: concrete sequence → symbolic, labeled sequence.

use std::collections::{BTreeMap, HashSet};

use stackcode_core::{Docstring, OpKind, RawCode};
use tracing::debug;

use crate::{
    AsmError, AsmResult, Bytecode, ConcreteBytecode, ConcreteInstr, DisassembleOptions, Instr,
    Item, Label, Operand,
};

fn pool_entry<T: Clone>(
    pool: &[T],
    kind: &'static str,
    index: usize,
    instr: &ConcreteInstr,
    arg: u32,
) -> AsmResult<T> {
    pool.get(arg as usize).cloned().ok_or(AsmError::PoolIndex {
        index,
        name: instr.name(),
        pool: kind,
        arg,
        len: pool.len(),
    })
}

impl ConcreteBytecode {
    /// Recovers the symbolic form.
    ///
    /// Every offset targeted by a jump gets one fresh label, placed before the
    /// instruction at that offset (or after the last one for a jump to the end
    /// of the code). Pool indices become the values they designate. Extension
    /// prefixes must have been folded.
    pub fn to_bytecode(&self) -> AsmResult<Bytecode> {
        // Boundaries and targets.
        let mut boundaries = HashSet::with_capacity(self.instrs.len() + 1);
        let mut jumps = Vec::new();
        let mut end = 0u32;
        for (index, (offset, instr)) in self.offsets().enumerate() {
            if instr.opcode().is_extended_arg() {
                return Err(AsmError::UnfoldedExtendedArg { index });
            }
            boundaries.insert(offset);
            if let Some(target) = instr.jump_target(offset) {
                jumps.push((index, offset, target));
            }
            end = offset + instr.size();
        }
        boundaries.insert(end);

        let mut labels: BTreeMap<u32, Label> = BTreeMap::new();
        for &(index, offset, target) in &jumps {
            if !boundaries.contains(&target) {
                return Err(AsmError::DanglingJumpTarget {
                    index,
                    name: self.instrs[index].name(),
                    offset,
                    target,
                });
            }
            labels.entry(target).or_default();
        }

        let mut items = Vec::with_capacity(self.instrs.len() + labels.len());
        for (index, (offset, instr)) in self.offsets().enumerate() {
            if let Some(label) = labels.get(&offset) {
                items.push(Item::Label(*label));
            }
            let operand = match (instr.opcode().kind(), instr.arg()) {
                (OpKind::NoArg, _) | (_, None) => Operand::None,
                (OpKind::Const, Some(arg)) => {
                    Operand::Const(pool_entry(&self.consts, "constant", index, instr, arg)?)
                }
                (OpKind::Name, Some(arg)) => {
                    Operand::Name(pool_entry(&self.names, "name", index, instr, arg)?)
                }
                (OpKind::Local, Some(arg)) => {
                    Operand::Local(pool_entry(&self.varnames, "local variable", index, instr, arg)?)
                }
                (OpKind::JumpRel | OpKind::JumpAbs, Some(_)) => {
                    let target = instr.jump_target(offset).unwrap_or(end);
                    match labels.get(&target) {
                        Some(label) => Operand::Label(*label),
                        None => {
                            return Err(AsmError::DanglingJumpTarget { index, name: instr.name(), offset, target });
                        }
                    }
                }
                (OpKind::Raw | OpKind::Free | OpKind::Compare, Some(arg)) => Operand::Int(arg),
            };
            let mut symbolic = Instr::from_opcode(instr.opcode(), operand)?;
            symbolic.set_lineno(instr.lineno());
            items.push(Item::Instr(symbolic));
        }
        if let Some(label) = labels.get(&end) {
            items.push(Item::Label(*label));
        }

        let nargs = self.meta.arg_slot_count().min(self.varnames.len());
        debug!(name = %self.meta.name, items = items.len(), labels = labels.len(), "reconstructed");
        Ok(Bytecode {
            meta: self.meta.clone(),
            docstring: Docstring::from_consts(&self.consts).or_else(|| self.docstring.clone()),
            argnames: self.varnames[..nargs].to_vec(),
            items,
        })
    }
}

impl Bytecode {
    /// Disassembles and reconstructs the loadable form in one step.
    pub fn from_raw(raw: &RawCode, opts: &DisassembleOptions) -> AsmResult<Self> {
        ConcreteBytecode::from_raw(raw, opts)?.to_bytecode()
    }
}
