use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::Serialize;

use fr_rs::decoder::{ControlFlow, DecodedRecord};
use fr_rs::{FlowKind, Symbols};

use crate::correlate::annotate;
use crate::model::Range;

const BANNER: &str = "; ********************************************************************************";
const SEPARATOR: &str = "; --------------------------------------------------------------------------------";

/// Decoded instructions collected during the main pass, before any analysis.
#[derive(Debug, Default)]
pub struct InstructionTable {
    instructions: BTreeMap<u32, DecodedRecord>,
}

impl InstructionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: DecodedRecord) {
        self.instructions.insert(record.address, record);
    }

    /// Run the single reconstruction pass. `entries` are caller-declared entry points
    /// (vector table targets) with the name to use when no symbol covers them.
    pub fn reconstruct(self, symbols: &Symbols, entries: &BTreeMap<u32, String>) -> CodeStructure {
        let instructions = self.instructions;
        let mut labels = BTreeSet::new();
        let mut entry_points = BTreeSet::new();
        let mut returns = BTreeSet::new();

        labels.extend(symbols.keys().copied());
        for rec in instructions.values() {
            match rec.control_flow {
                Some(ControlFlow { kind: FlowKind::Branch, target: Some(t), .. }) => {
                    labels.insert(t);
                }
                Some(ControlFlow { kind: FlowKind::Call, target: Some(t), .. }) => {
                    labels.insert(t);
                    entry_points.insert(t);
                }
                Some(ControlFlow { kind: FlowKind::Return, .. }) => {
                    returns.insert(rec.address);
                }
                _ => {}
            }
        }
        entry_points.extend(entries.keys().copied());
        labels.extend(entry_points.iter().copied());

        let mut names = BTreeMap::new();
        for &addr in &labels {
            let name = match (symbols.get(&addr), entries.get(&addr)) {
                (Some(s), _) => s.clone(),
                (None, Some(e)) => e.clone(),
                (None, None) if entry_points.contains(&addr) => format!("function_{addr:08X}"),
                (None, None) => format!("label_{addr:08X}"),
            };
            names.insert(addr, name);
        }

        let entry_list: Vec<u32> = entry_points.iter().copied().collect();
        let mut functions = BTreeMap::new();
        for (n, &entry) in entry_list.iter().enumerate() {
            let limit = entry_list.get(n + 1).copied().unwrap_or(u32::MAX);
            let end = extent(&instructions, entry, limit);
            functions.insert(entry, Function { entry, end, name: names[&entry].clone() });
        }

        CodeStructure { instructions, labels, names, functions, returns }
    }
}

/// End (exclusive) of the function starting at `entry`: straight-line flow from the
/// entry, continuing past a return or an unconditional branch only when an earlier
/// branch in the function targets a later address. Stops at `limit` (the next entry) or
/// at a gap in the table. An entry outside the table has an empty extent.
fn extent(instructions: &BTreeMap<u32, DecodedRecord>, entry: u32, limit: u32) -> u32 {
    let mut end = entry;
    let mut reach = entry;
    let mut after_delay_slot = false;
    for (&addr, rec) in instructions.range(entry..limit) {
        if addr != end {
            break;
        }
        end = rec.end();
        if after_delay_slot {
            break;
        }
        if let Some(cf) = rec.control_flow {
            if let (FlowKind::Branch, Some(t)) = (cf.kind, cf.target) {
                if t > addr && t < limit {
                    reach = reach.max(t);
                }
            }
            // returns, BRA and JMP; calls come back
            if cf.unconditional && reach <= addr {
                if cf.delayed {
                    after_delay_slot = true;
                } else {
                    break;
                }
            }
        }
    }
    end
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub entry: u32,
    /// Exclusive end of the function's extent.
    pub end: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub instructions: usize,
    pub labels: usize,
    pub functions: usize,
    pub returns: usize,
}

/// Result of the reconstruction pass. Read-only.
#[derive(Debug)]
pub struct CodeStructure {
    instructions: BTreeMap<u32, DecodedRecord>,
    labels: BTreeSet<u32>,
    names: BTreeMap<u32, String>,
    functions: BTreeMap<u32, Function>,
    returns: BTreeSet<u32>,
}

impl CodeStructure {
    pub fn instructions(&self) -> &BTreeMap<u32, DecodedRecord> {
        &self.instructions
    }

    pub fn labels(&self) -> &BTreeSet<u32> {
        &self.labels
    }

    pub fn functions(&self) -> &BTreeMap<u32, Function> {
        &self.functions
    }

    pub fn returns(&self) -> &BTreeSet<u32> {
        &self.returns
    }

    pub fn summary(&self) -> Summary {
        Summary {
            instructions: self.instructions.len(),
            labels: self.labels.len(),
            functions: self.functions.len(),
            returns: self.returns.len(),
        }
    }

    /// Annotated listing of the instructions inside `range`.
    pub fn render(&self, range: &Range, correction: u32) -> String {
        let mut out = String::new();
        let mut separator_after = None;
        for (&addr, rec) in self.instructions.range(range.start..range.end) {
            if let Some(f) = self.functions.get(&addr) {
                let _ = writeln!(out, "\n{BANNER}\n; {}  ({:08X}-{:08X})", f.name, f.entry, f.end);
            } else if self.labels.contains(&addr) {
                let _ = writeln!(out, "{}:", self.names[&addr]);
            }
            let _ = writeln!(out, "{}{}", annotate(addr, correction), rec.rendered);
            if self.returns.contains(&addr) {
                let delayed = rec.control_flow.is_some_and(|cf| cf.delayed);
                separator_after = Some(if delayed { rec.end() } else { addr });
            }
            if separator_after == Some(addr) {
                let _ = writeln!(out, "{SEPARATOR}");
                separator_after = None;
            }
        }
        out
    }
}
