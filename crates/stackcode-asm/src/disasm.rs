//! Disassembly: raw bytes → concrete sequence, plus a textual listing.

use core::fmt::Write;
use std::collections::HashMap;

use stackcode_core::{Docstring, OpKind, RawCode};
use tracing::{debug, trace};

use crate::{lnotab, AsmError, AsmResult, ConcreteBytecode, ConcreteInstr, DisassembleOptions};

/// Decodes an instruction stream.
///
/// `line_starts` maps offsets to the line that starts there; each
/// instruction gets the running line, starting at `first_lineno`. With
/// [`DisassembleOptions::fold_extended_arg`], each extension prefix is
/// merged into the instruction it precedes; a prefix with zero high bits
/// yields a [widened](ConcreteInstr::widen) instruction so offsets are kept.
pub fn disassemble(
    code: &[u8],
    line_starts: &[(u32, u32)],
    first_lineno: u32,
    opts: &DisassembleOptions,
) -> AsmResult<Vec<ConcreteInstr>> {
    let starts: HashMap<u32, u32> = line_starts.iter().copied().collect();
    let mut instrs = Vec::new();
    let mut offsets = Vec::new();
    let mut lineno = first_lineno;
    let mut offset = 0usize;
    while offset < code.len() {
        let at = u32::try_from(offset).unwrap_or(u32::MAX);
        if let Some(line) = starts.get(&at) {
            lineno = *line;
        }
        let instr = ConcreteInstr::decode(code, offset, Some(lineno))?;
        offset += instr.size() as usize;
        offsets.push(at as usize);
        instrs.push(instr);
    }

    if !opts.fold_extended_arg {
        return Ok(instrs);
    }
    fold(instrs, &offsets)
}

fn fold(instrs: Vec<ConcreteInstr>, offsets: &[usize]) -> AsmResult<Vec<ConcreteInstr>> {
    let mut out = Vec::with_capacity(instrs.len());
    let mut pending: Option<(u32, usize)> = None;

    for (instr, &offset) in instrs.into_iter().zip(offsets) {
        if instr.opcode().is_extended_arg() {
            if pending.is_some() {
                return Err(AsmError::ExtendedArgChain { offset });
            }
            pending = Some((instr.arg().unwrap_or(0), offset));
            continue;
        }

        match pending.take() {
            None => out.push(instr),
            Some((high, prefix)) => {
                let Some(low) = instr.arg() else {
                    return Err(AsmError::ExtendedArgWithoutTarget { offset: prefix, name: instr.name() });
                };
                let arg = (i64::from(high) << 16) | i64::from(low);
                trace!(offset = prefix, name = instr.name(), arg, "extension prefix folded");
                let folded = ConcreteInstr::from_wide(instr.opcode(), arg, instr.lineno())?;
                out.push(if high == 0 { folded.widen() } else { folded });
            }
        }
    }

    match pending {
        Some((_, offset)) => Err(AsmError::ExtendedArgAtEnd { offset }),
        None => Ok(out),
    }
}

impl ConcreteBytecode {
    /// Disassembles the loadable form. Pools and metadata are copied as-is;
    /// the docstring is taken from constant 0 when it is text or none.
    pub fn from_raw(raw: &RawCode, opts: &DisassembleOptions) -> AsmResult<Self> {
        let starts = lnotab::line_starts(&raw.lnotab, raw.meta.first_lineno);
        let instrs = disassemble(&raw.code, &starts, raw.meta.first_lineno, opts)?;
        debug!(name = %raw.meta.name, bytes = raw.code.len(), instrs = instrs.len(), "disassembled");
        Ok(Self {
            meta: raw.meta.clone(),
            docstring: Docstring::from_consts(&raw.consts),
            consts: raw.consts.clone(),
            names: raw.names.clone(),
            varnames: raw.varnames.clone(),
            instrs,
        })
    }
}

/* ───────────────────────────── Listing ───────────────────────────── */

/// Multi-line, human readable listing with pools and resolved operands.
pub fn listing(bc: &ConcreteBytecode, title: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "== {title} == (name={}, first_lineno={}, consts={}, names={}, varnames={}, instrs={})",
        bc.meta.name,
        bc.meta.first_lineno,
        bc.consts.len(),
        bc.names.len(),
        bc.varnames.len(),
        bc.instrs.len()
    );

    if !bc.consts.is_empty() {
        let _ = writeln!(out, ";; constants");
        for (idx, value) in bc.consts.iter().enumerate() {
            let _ = writeln!(out, "const[{idx:04}] = {value}");
        }
    }
    if !bc.names.is_empty() {
        let _ = writeln!(out, ";; names: {:?}", bc.names);
    }
    if !bc.varnames.is_empty() {
        let _ = writeln!(out, ";; varnames: {:?}", bc.varnames);
    }

    let _ = writeln!(out, ";; code");
    let mut line = bc.meta.first_lineno;
    for (offset, instr) in bc.offsets() {
        if let Some(l) = instr.lineno() {
            line = l;
        }
        match preview(bc, offset, instr) {
            Some(p) => {
                let _ = writeln!(out, "{offset:04} | {line:4} | {instr} ;; {p}");
            }
            None => {
                let _ = writeln!(out, "{offset:04} | {line:4} | {instr}");
            }
        }
    }
    out
}

fn preview(bc: &ConcreteBytecode, offset: u32, instr: &ConcreteInstr) -> Option<String> {
    let ix = instr.arg()? as usize;
    match instr.opcode().kind() {
        OpKind::Const => bc.consts.get(ix).map(ToString::to_string),
        OpKind::Name => bc.names.get(ix).cloned(),
        OpKind::Local => bc.varnames.get(ix).cloned(),
        OpKind::JumpRel | OpKind::JumpAbs => instr.jump_target(offset).map(|t| format!("-> {t}")),
        _ => None,
    }
}
