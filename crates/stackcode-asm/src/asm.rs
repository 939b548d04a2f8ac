//! Assembly: symbolic sequence → concrete sequence.
//!
//! Two steps:
//! 1. lowering — operands are pooled (see [`crate::pool`]), running lines
//!    are resolved, jumps are kept with their label;
//! 2. jump resolution — a fixpoint over the layout. Every jump starts at
//!    3 bytes; a jump whose resolved argument exceeds `0xFFFF` is flagged
//!    and laid out at 6 bytes on the next pass. Flags are never removed, so
//!    sizes only grow and the loop terminates; the pass count is still
//!    capped by [`AssembleOptions::max_passes`].

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use stackcode_core::{OpKind, Opcode, RawCode};
use tracing::{debug, trace};

use crate::pool::PoolBuilder;
use crate::{
    AsmError, AsmResult, AssembleOptions, Bytecode, ConcreteBytecode, ConcreteInstr, Item, Label,
    Operand,
};

/// Item after lowering.
#[derive(Debug)]
enum Slot {
    Label { label: Label, index: usize },
    Fixed(ConcreteInstr),
    Jump { opcode: Opcode, label: Label, lineno: u32, index: usize },
}

/// Where a jump sits in one layout pass.
#[derive(Debug, Clone, Copy)]
struct Placed {
    slot: usize,
    offset: u32,
    size: u32,
}

fn lower(bytecode: &Bytecode, pools: &mut PoolBuilder) -> AsmResult<Vec<Slot>> {
    let mut lineno = bytecode.meta.first_lineno;
    let mut slots = Vec::with_capacity(bytecode.items.len());
    for (index, item) in bytecode.items.iter().enumerate() {
        match item {
            Item::Label(label) => slots.push(Slot::Label { label: *label, index }),
            Item::SetLineno(line) => lineno = *line,
            Item::Concrete(instr) => slots.push(Slot::Fixed(instr.clone())),
            Item::Instr(instr) => {
                if let Some(line) = instr.lineno() {
                    lineno = line;
                }
                if let Operand::Label(label) = instr.operand() {
                    slots.push(Slot::Jump { opcode: instr.opcode(), label: *label, lineno, index });
                } else {
                    let arg = pools.lower(instr.operand());
                    slots.push(Slot::Fixed(ConcreteInstr::new(instr.opcode(), arg, Some(lineno))?));
                }
            }
        }
    }
    Ok(slots)
}

/// Pass A: offsets of labels and jumps under the current size flags.
fn layout(slots: &[Slot], extended: &HashSet<usize>) -> AsmResult<(HashMap<Label, u32>, Vec<Placed>)> {
    let mut targets = HashMap::new();
    let mut jumps = Vec::new();
    let mut offset = 0u32;
    for (slot, item) in slots.iter().enumerate() {
        match item {
            Slot::Label { label, index } => match targets.entry(*label) {
                Entry::Vacant(e) => {
                    e.insert(offset);
                }
                Entry::Occupied(e) if *e.get() != offset => {
                    return Err(AsmError::ConflictingLabel { index: *index, first: *e.get(), second: offset });
                }
                Entry::Occupied(_) => {}
            },
            Slot::Fixed(instr) => offset += instr.size(),
            Slot::Jump { .. } => {
                let size = if extended.contains(&slot) { 6 } else { 3 };
                jumps.push(Placed { slot, offset, size });
                offset += size;
            }
        }
    }
    Ok((targets, jumps))
}

/// Resolves every jump of `slots` and returns the final concrete instructions.
fn resolve(slots: &[Slot], opts: &AssembleOptions) -> AsmResult<Vec<ConcreteInstr>> {
    let max_passes = opts.max_passes.max(1);
    let mut extended: HashSet<usize> = HashSet::new();

    for pass in 1..=max_passes {
        let (targets, jumps) = layout(slots, &extended)?;

        // Pass B: true arguments under this layout.
        let mut args: HashMap<usize, i64> = HashMap::with_capacity(jumps.len());
        let mut grew = false;
        for placed in &jumps {
            let Slot::Jump { opcode, label, index, .. } = &slots[placed.slot] else {
                continue;
            };
            let target = *targets
                .get(label)
                .ok_or(AsmError::UnresolvedLabel { index: *index, name: opcode.name() })?;
            let arg = match opcode.kind() {
                OpKind::JumpRel => i64::from(target) - i64::from(placed.offset + placed.size),
                _ => i64::from(target),
            };
            if arg < 0 {
                return Err(AsmError::NegativeJump {
                    index: *index,
                    name: opcode.name(),
                    offset: placed.offset,
                    arg,
                });
            }
            if arg > 0xFFFF && extended.insert(placed.slot) {
                trace!(pass, index, name = opcode.name(), arg, "jump needs an extension prefix");
                grew = true;
            }
            args.insert(placed.slot, arg);
        }

        if grew {
            continue;
        }

        let mut instrs = Vec::with_capacity(slots.len());
        for (slot, item) in slots.iter().enumerate() {
            match item {
                Slot::Label { .. } => {}
                Slot::Fixed(instr) => instrs.push(instr.clone()),
                Slot::Jump { opcode, lineno, index, label } => {
                    let arg = args
                        .get(&slot)
                        .copied()
                        .ok_or(AsmError::UnresolvedLabel { index: *index, name: opcode.name() })?;
                    let instr = ConcreteInstr::from_wide(*opcode, arg, Some(*lineno))?;
                    debug_assert_eq!(
                        instr.size(),
                        if extended.contains(&slot) { 6 } else { 3 },
                        "jump to {label:?} changed size after convergence"
                    );
                    instrs.push(instr);
                }
            }
        }
        debug!(passes = pass, jumps = jumps.len(), extended = extended.len(), "jumps resolved");
        return Ok(instrs);
    }

    Err(AsmError::NoConvergence { passes: max_passes })
}

impl Bytecode {
    /// Converts to the concrete form: pools built, jumps resolved.
    pub fn to_concrete(&self, opts: &AssembleOptions) -> AsmResult<ConcreteBytecode> {
        let mut pools = PoolBuilder::new(self.docstring.as_ref(), &self.argnames);
        let slots = lower(self, &mut pools)?;
        let instrs = resolve(&slots, opts)?;

        let (nconsts, nnames, nlocals) = pools.sizes();
        debug!(
            name = %self.meta.name,
            instrs = instrs.len(),
            consts = nconsts,
            names = nnames,
            varnames = nlocals,
            "assembled"
        );

        let pools = pools.finish();
        Ok(ConcreteBytecode {
            meta: self.meta.clone(),
            docstring: self.docstring.clone(),
            consts: pools.consts,
            names: pools.names,
            varnames: pools.varnames,
            instrs,
        })
    }

    /// Converts all the way to the loadable form.
    pub fn to_raw(&self, opts: &AssembleOptions) -> AsmResult<RawCode> {
        Ok(self.to_concrete(opts)?.to_raw())
    }
}
