//! Pool builder: deduplicating constant, name and local-variable pools.
//!
//! Indices are assigned in first-occurrence order and never change for the
//! life of one conversion. Constants are keyed by strict equality (see
//! [`ConstValue`]), names and locals by exact string match.

use indexmap::IndexSet;
use stackcode_core::{ConstValue, Docstring};

use crate::Operand;

/// Pools finished by a conversion, in index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pools {
    /// Constant pool.
    pub consts: Vec<ConstValue>,
    /// Name pool.
    pub names: Vec<String>,
    /// Local-variable pool.
    pub varnames: Vec<String>,
}

/// In-progress pools, owned by a single conversion.
#[derive(Debug, Default)]
pub struct PoolBuilder {
    consts: IndexSet<ConstValue>,
    names: IndexSet<String>,
    varnames: IndexSet<String>,
}

fn slot(index: usize) -> u32 {
    // out-of-range indices are rejected later by argument validation
    u32::try_from(index).unwrap_or(u32::MAX)
}

fn intern(set: &mut IndexSet<String>, name: &str) -> u32 {
    match set.get_index_of(name) {
        Some(index) => slot(index),
        None => slot(set.insert_full(name.to_owned()).0),
    }
}

impl PoolBuilder {
    /// Seeds the pools: the docstring takes constant slot 0, argument names
    /// take the first local slots in declaration order.
    pub fn new(docstring: Option<&Docstring>, argnames: &[String]) -> Self {
        let mut pools = Self::default();
        if let Some(doc) = docstring {
            pools.add_const(&doc.to_const());
        }
        for name in argnames {
            pools.add_local(name);
        }
        pools
    }

    /// Index of a constant, registering it on first sight.
    pub fn add_const(&mut self, value: &ConstValue) -> u32 {
        match self.consts.get_index_of(value) {
            Some(index) => slot(index),
            None => slot(self.consts.insert_full(value.clone()).0),
        }
    }

    /// Index of a global / attribute name.
    pub fn add_name(&mut self, name: &str) -> u32 { intern(&mut self.names, name) }

    /// Index of a local variable.
    pub fn add_local(&mut self, name: &str) -> u32 { intern(&mut self.varnames, name) }

    /// Numeric argument for a non-jump operand; `None` when the instruction
    /// carries no argument. Labels are left to the jump resolver.
    pub fn lower(&mut self, operand: &Operand) -> Option<u32> {
        match operand {
            Operand::None | Operand::Label(_) => None,
            Operand::Int(v) => Some(*v),
            Operand::Const(v) => Some(self.add_const(v)),
            Operand::Local(name) => Some(self.add_local(name)),
            Operand::Name(name) => Some(self.add_name(name)),
        }
    }

    /// Pool sizes `(consts, names, varnames)`.
    pub fn sizes(&self) -> (usize, usize, usize) {
        (self.consts.len(), self.names.len(), self.varnames.len())
    }

    /// Ends the conversion and hands the pools out in index order.
    pub fn finish(self) -> Pools {
        Pools {
            consts: self.consts.into_iter().collect(),
            names: self.names.into_iter().collect(),
            varnames: self.varnames.into_iter().collect(),
        }
    }
}
