//! Symbol table.
use super::{emit::Segment, CompileError};

use smol_str::SmolStr;
use std::collections::BTreeMap;

/// Declared storage category of a symbol.
///
/// The kind determines both the backing segment and which index
/// counter the symbol draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SymbolKind {
    Static,
    Field,
    Argument,
    Local,
}

impl SymbolKind {
    /// Storage segment backing this kind of symbol.
    #[rustfmt::skip]
    pub fn segment(&self) -> Segment {
        match self {
            SymbolKind::Static   => Segment::Static,
            SymbolKind::Field    => Segment::This,
            SymbolKind::Argument => Segment::Argument,
            SymbolKind::Local    => Segment::Local,
        }
    }

    #[inline]
    fn counter_slot(&self) -> usize {
        *self as usize
    }

    #[inline]
    fn is_class_scope(&self) -> bool {
        matches!(self, SymbolKind::Static | SymbolKind::Field)
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: SmolStr,
    /// Declared type, verbatim from source.
    pub ty: SmolStr,
    pub kind: SymbolKind,
    /// Dense, zero-based position within the symbol's kind.
    pub index: u16,
}

/// Tracks declared names across two nested scopes.
///
/// The class scope (STATIC, FIELD) lives for the whole source unit;
/// the subroutine scope (ARGUMENT, LOCAL) is discarded and recreated
/// at the start of every subroutine declaration.
#[derive(Debug, Default)]
pub struct SymbolTable {
    class_scope: BTreeMap<SmolStr, Symbol>,
    sub_scope: BTreeMap<SmolStr, Symbol>,
    counts: [u16; 4],
}

impl SymbolTable {
    /// Discard the previous subroutine scope and install an empty one.
    ///
    /// Class scope is untouched.
    pub fn start_subroutine(&mut self) {
        self.sub_scope.clear();
        self.counts[SymbolKind::Argument.counter_slot()] = 0;
        self.counts[SymbolKind::Local.counter_slot()] = 0;
    }

    /// Insert a new symbol with the next dense index for its kind.
    pub fn define(
        &mut self,
        name: &str,
        ty: &str,
        kind: SymbolKind,
    ) -> Result<Symbol, CompileError> {
        if self.scope(kind).contains_key(name) {
            return Err(CompileError::DuplicateSymbol(SmolStr::from(name)));
        }

        let slot = kind.counter_slot();
        let index = self.counts[slot];
        self.counts[slot] += 1;

        let symbol = Symbol {
            name: SmolStr::from(name),
            ty: SmolStr::from(ty),
            kind,
            index,
        };
        self.scope_mut(kind)
            .insert(symbol.name.clone(), symbol.clone());
        Ok(symbol)
    }

    /// Look up a name, subroutine scope first.
    ///
    /// Absence is not an error: an unresolved name denotes a class or
    /// subroutine reference, resolved structurally by the engine.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.sub_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    /// Current number of symbols of the given kind in its owning scope.
    pub fn count(&self, kind: SymbolKind) -> u16 {
        self.counts[kind.counter_slot()]
    }

    fn scope(&self, kind: SymbolKind) -> &BTreeMap<SmolStr, Symbol> {
        if kind.is_class_scope() {
            &self.class_scope
        } else {
            &self.sub_scope
        }
    }

    fn scope_mut(&mut self, kind: SymbolKind) -> &mut BTreeMap<SmolStr, Symbol> {
        if kind.is_class_scope() {
            &mut self.class_scope
        } else {
            &mut self.sub_scope
        }
    }
}
