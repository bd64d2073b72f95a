use bitflags::bitflags;

use crate::attribute::Attribute;
use crate::context::Context;
use crate::flags::Flags;
use crate::intern::Name;
use crate::scope::WriteableScope;
use crate::source::Span;
use crate::types::{Const, TypeId};

/// Index of a symbol in the per-context [`Symbols`] arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SymId(u32);

impl SymId {
    /// The root owner sentinel; owns packages and modules that have no
    /// enclosing declaration.
    pub const NONE: SymId = SymId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymKind {
    Pck,
    Mdl,
    Typ,
    Var,
    Mth,
    Err,
}

bitflags! {
    /// Symbol-kind selector used by lookups and expected-kind checks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KindSet: u8 {
        const PCK = 1 << 0;
        const MDL = 1 << 1;
        const TYP = 1 << 2;
        const VAR = 1 << 3;
        const MTH = 1 << 4;
        const ERR = 1 << 5;
    }
}

impl KindSet {
    /// Kinds that denote a value.
    pub const VAL: KindSet = KindSet::VAR;

    pub fn of(kind: SymKind) -> KindSet {
        match kind {
            SymKind::Pck => KindSet::PCK,
            SymKind::Mdl => KindSet::MDL,
            SymKind::Typ => KindSet::TYP,
            SymKind::Var => KindSet::VAR,
            SymKind::Mth => KindSet::MTH,
            SymKind::Err => KindSet::ERR,
        }
    }
}

/// A failed symbol completion. Carried as a value; whether to surface it
/// as a diagnostic or re-raise is the caller's decision.
#[derive(Debug, Clone)]
pub struct CompletionFailure {
    pub sym: SymId,
    pub key: &'static str,
    pub args: Vec<String>,
}

pub type CompleterFn = Box<dyn FnOnce(&mut Context, SymId) -> Result<(), CompletionFailure>>;

/// Call-once-then-sticky completion slot. The thunk is taken out on first
/// use; re-entry while `InProgress` is a completion-cycle error; a failure
/// is recorded and replayed on every later completion attempt.
pub enum Completer {
    None,
    Ready(CompleterFn),
    InProgress,
    Done,
    Failed(CompletionFailure),
}

impl Completer {
    pub fn is_pending(&self) -> bool {
        matches!(self, Completer::Ready(_))
    }
}

/// Per-kind symbol payload.
pub enum SymDetail {
    None,
    Package {
        members: WriteableScope,
    },
    Module,
    Class {
        members: WriteableScope,
        fullname: Name,
    },
    Method {
        params: Vec<SymId>,
        default_value: Option<Attribute>,
    },
    Var {
        constant: Option<Const>,
        pos: Span,
    },
    Err {
        candidates: Vec<SymId>,
    },
}

pub struct Symbol {
    pub kind: SymKind,
    pub name: Name,
    pub owner: SymId,
    pub flags: Flags,
    pub ty: TypeId,
    pub attrs: Vec<Attribute>,
    pub detail: SymDetail,
    pub completer: Completer,
}

impl Symbol {
    pub fn members(&self) -> Option<&WriteableScope> {
        match &self.detail {
            SymDetail::Class { members, .. } | SymDetail::Package { members } => Some(members),
            _ => None,
        }
    }

    pub fn members_mut(&mut self) -> Option<&mut WriteableScope> {
        match &mut self.detail {
            SymDetail::Class { members, .. } | SymDetail::Package { members } => Some(members),
            _ => None,
        }
    }

    pub fn params(&self) -> &[SymId] {
        match &self.detail {
            SymDetail::Method { params, .. } => params,
            _ => &[],
        }
    }

    pub fn constant(&self) -> Option<&Const> {
        match &self.detail {
            SymDetail::Var { constant, .. } => constant.as_ref(),
            _ => None,
        }
    }
}

/// Arena of symbols for one compilation context. Index 0 is the root
/// owner sentinel.
pub struct Symbols {
    arr: Vec<Symbol>,
}

impl Symbols {
    pub fn new() -> Self {
        let mut syms = Symbols { arr: Vec::new() };
        syms.alloc(Symbol {
            kind: SymKind::Err,
            name: Name::EMPTY,
            owner: SymId::NONE,
            flags: Flags::empty(),
            ty: TypeId::NONE,
            attrs: Vec::new(),
            detail: SymDetail::None,
            completer: Completer::None,
        });
        syms
    }

    pub fn alloc(&mut self, sym: Symbol) -> SymId {
        let id = SymId(self.arr.len() as u32);
        self.arr.push(sym);
        id
    }

    /// The id the next allocation will get; used when a symbol must know
    /// its own id at construction time (e.g. a class owning its members
    /// scope).
    pub fn next_id(&self) -> SymId {
        SymId(self.arr.len() as u32)
    }

    pub fn get(&self, id: SymId) -> &Symbol {
        &self.arr[id.index()]
    }

    pub fn get_mut(&mut self, id: SymId) -> &mut Symbol {
        &mut self.arr[id.index()]
    }

    pub fn name(&self, id: SymId) -> Name {
        self.get(id).name
    }

    pub fn kind(&self, id: SymId) -> SymKind {
        self.get(id).kind
    }

    pub fn type_of(&self, id: SymId) -> TypeId {
        self.get(id).ty
    }

    pub fn flags(&self, id: SymId) -> Flags {
        self.get(id).flags
    }

    pub fn is_error(&self, id: SymId) -> bool {
        self.get(id).kind == SymKind::Err
    }

    pub fn len(&self) -> usize {
        self.arr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arr.is_empty()
    }

    /// Marks a completion failure: sticky, and the symbol's kind flips to
    /// `Err` so later lookups see the error symbol.
    pub fn fail_completion(&mut self, id: SymId, failure: CompletionFailure) {
        let sym = self.get_mut(id);
        sym.kind = SymKind::Err;
        sym.ty = TypeId::ERROR;
        sym.completer = Completer::Failed(failure);
    }
}

impl Default for Symbols {
    fn default() -> Self {
        Self::new()
    }
}
