//! Scoped symbol table.
//!
//! Symbols live in one ordered vector. Lookup scans from the most recent
//! entry backwards, so an inner declaration shadows an outer one with the
//! same name. Each block opens a frame on entry and closes it on exit,
//! which drops every entry the block declared.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Constant,
    Variable,
    Procedure,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
            SymbolKind::Procedure => "procedure",
        };
        f.write_str(name)
    }
}

/// A declared name.
///
/// `address` is the frame offset of a variable or the entry instruction
/// of a procedure. `size` is 1 for variables, 0 for constants and the
/// reserved frame size for procedures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    pub kind: SymbolKind,
    pub name: String,
    pub value: Option<i64>,
    pub level: usize,
    pub address: usize,
    pub size: usize,
}

impl SymbolRecord {
    pub fn constant(name: impl Into<String>, value: i64, level: usize) -> Self {
        SymbolRecord {
            kind: SymbolKind::Constant,
            name: name.into(),
            value: Some(value),
            level,
            address: 0,
            size: 0,
        }
    }

    pub fn variable(name: impl Into<String>, level: usize, address: usize) -> Self {
        SymbolRecord {
            kind: SymbolKind::Variable,
            name: name.into(),
            value: None,
            level,
            address,
            size: 1,
        }
    }

    /// A procedure whose entry address is not known yet.
    pub fn procedure(name: impl Into<String>, level: usize) -> Self {
        SymbolRecord {
            kind: SymbolKind::Procedure,
            name: name.into(),
            value: None,
            level,
            address: 0,
            size: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("duplicate symbol '{name}'")]
    Duplicate { name: String },
    #[error("undefined symbol '{name}'")]
    Undefined { name: String },
    #[error("'{name}' is a {found}, expected a {expected}")]
    WrongKind {
        name: String,
        expected: SymbolKind,
        found: SymbolKind,
    },
}

/// Restore point returned by [`SymbolTable::open_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct FrameMark {
    len: usize,
    enclosing_start: usize,
}

#[derive(Debug, Clone)]
struct Slot {
    order: usize,
    record: SymbolRecord,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: Vec<Slot>,
    /// Index of the first entry of the innermost open frame.
    frame_start: usize,
    /// Entries dropped by closed frames, kept for reporting only.
    retired: Vec<Slot>,
    declared: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the closest visible declaration of `name`.
    ///
    /// When `expected` is given, the closest match must have that kind;
    /// an outer declaration of the right kind is not considered.
    pub fn lookup(
        &self,
        name: &str,
        expected: Option<SymbolKind>,
    ) -> Result<&SymbolRecord, SymbolError> {
        let record = self
            .entries
            .iter()
            .rev()
            .map(|slot| &slot.record)
            .find(|record| record.name == name)
            .ok_or_else(|| SymbolError::Undefined {
                name: name.to_string(),
            })?;
        match expected {
            Some(kind) if kind != record.kind => Err(SymbolError::WrongKind {
                name: name.to_string(),
                expected: kind,
                found: record.kind,
            }),
            _ => Ok(record),
        }
    }

    /// Append `record` to the innermost open frame and return its index.
    pub fn declare(&mut self, record: SymbolRecord) -> Result<usize, SymbolError> {
        if self.entries[self.frame_start..]
            .iter()
            .any(|slot| slot.record.name == record.name)
        {
            return Err(SymbolError::Duplicate { name: record.name });
        }
        let order = self.declared;
        self.declared += 1;
        self.entries.push(Slot { order, record });
        Ok(self.entries.len() - 1)
    }

    pub fn open_frame(&mut self) -> FrameMark {
        let mark = FrameMark {
            len: self.entries.len(),
            enclosing_start: self.frame_start,
        };
        self.frame_start = self.entries.len();
        mark
    }

    /// Drop every entry declared since `mark`.
    ///
    /// If `keep` names an entry inside the closing frame, that entry is
    /// re-appended to the enclosing frame instead of being dropped.
    pub fn close_frame(&mut self, mark: FrameMark, keep: Option<usize>) {
        let kept = keep
            .filter(|&index| index >= mark.len && index < self.entries.len())
            .map(|index| self.entries.remove(index));
        self.retired.extend(self.entries.drain(mark.len..));
        self.entries.extend(kept);
        self.frame_start = mark.enclosing_start;
    }

    /// Set the entry address of the procedure at `index`.
    pub fn set_address(&mut self, index: usize, address: usize) {
        if let Some(slot) = self.entries.get_mut(index) {
            slot.record.address = address;
        }
    }

    pub fn set_size(&mut self, index: usize, size: usize) {
        if let Some(slot) = self.entries.get_mut(index) {
            slot.record.size = size;
        }
    }

    /// Number of currently visible entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every record ever declared, visible or not, in declaration order.
    pub fn into_declarations(self) -> Vec<SymbolRecord> {
        let mut all: Vec<Slot> = self.retired.into_iter().chain(self.entries).collect();
        all.sort_by_key(|slot| slot.order);
        all.into_iter().map(|slot| slot.record).collect()
    }
}
