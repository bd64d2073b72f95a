use std::collections::HashSet;
use std::rc::{Rc, Weak};

use crate::context::Context;
use crate::flags::Flags;
use crate::intern::{Name, NameTable};
use crate::symbol::{CompletionFailure, SymId, Symbols};

/// Observer of scope mutations. Listeners are held weakly; a dropped
/// listener is purged on the next notification walk and never fires.
pub trait ScopeListener {
    fn symbol_added(&self, sym: SymId);
    fn symbol_removed(&self, sym: SymId);
}

const INITIAL_CAPACITY: usize = 16;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Slot {
    Free,
    /// A bucket whose chain has been fully removed. Probes continue past
    /// it but remember the first one seen for reuse on insert.
    Tombstone,
    Head(u32),
}

#[derive(Clone, Debug)]
struct Entry {
    sym: SymId,
    name: Name,
    hash: u32,
    /// Which scope in a shared-table chain entered this entry.
    scope_mark: u32,
    /// The entry this one shadows in its bucket (same name, entered
    /// earlier).
    shadowed: Option<u32>,
    bucket: usize,
    dead: bool,
}

#[derive(Default)]
struct Table {
    slots: Vec<Slot>,
    entries: Vec<Entry>,
    nelems: usize,
    remove_count: u32,
    mark_counter: u32,
}

impl Table {
    fn with_capacity(capacity: usize) -> Table {
        Table {
            slots: vec![Slot::Free; capacity],
            entries: Vec::new(),
            nelems: 0,
            remove_count: 0,
            mark_counter: 1,
        }
    }

    /// Open-addressing probe. The step is
    /// `mask - ((h + (h >> 16)) << 1)`: odd because the mask is odd, so
    /// successive probes cycle through every slot. Returns the live entry
    /// whose chain holds `name`, or the slot an insert should use (the
    /// first tombstone seen, else the free slot that ended the probe).
    fn probe(&self, name: Name, hash: u32) -> (Option<u32>, usize) {
        let mask = self.slots.len() - 1;
        let h = hash as u64;
        let step = (mask as u64).wrapping_sub((h.wrapping_add(h >> 16)) << 1);
        let mut index = (h as usize) & mask;
        let mut first_deleted = None;
        for _ in 0..self.slots.len() {
            match self.slots[index] {
                Slot::Free => {
                    return (None, first_deleted.unwrap_or(index));
                }
                Slot::Tombstone => {
                    if first_deleted.is_none() {
                        first_deleted = Some(index);
                    }
                }
                Slot::Head(e) => {
                    if self.entries[e as usize].name == name {
                        return (Some(e), index);
                    }
                }
            }
            index = (index as u64).wrapping_add(step) as usize & mask;
        }
        (None, first_deleted.expect("scope table has no free slot"))
    }

    fn grow(&mut self) {
        let new_len = self.slots.len() * 2;
        self.slots = vec![Slot::Free; new_len];
        // Relink every live entry in global insertion order so shadow
        // chains rebuild with the newest entry on top.
        for i in 0..self.entries.len() {
            if self.entries[i].dead {
                continue;
            }
            let (name, hash) = (self.entries[i].name, self.entries[i].hash);
            let (found, slot) = self.probe(name, hash);
            self.entries[i].shadowed = found;
            self.entries[i].bucket = slot;
            self.slots[slot] = Slot::Head(i as u32);
        }
    }
}

/// The primitive hash scope: open addressing with double hashing, bucket
/// shadow chains for hidden bindings, and a per-scope insertion-order
/// list. `dup` hands the table to a child without allocation; `leave`
/// unwinds the child's entries and hands it back.
pub struct WriteableScope {
    pub owner: SymId,
    table: Table,
    /// This scope's entries, in insertion order (indices into the table's
    /// entry storage).
    order: Vec<u32>,
    shared: u32,
    mark: u32,
    shares_parent_table: bool,
    parent: Option<Box<WriteableScope>>,
    listeners: Vec<Weak<dyn ScopeListener>>,
}

impl WriteableScope {
    pub fn new(owner: SymId) -> Self {
        WriteableScope {
            owner,
            table: Table::with_capacity(INITIAL_CAPACITY),
            order: Vec::new(),
            shared: 0,
            mark: 0,
            shares_parent_table: false,
            parent: None,
            listeners: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.table.slots.len()
    }

    pub fn nelems(&self) -> usize {
        self.table.nelems
    }

    pub fn remove_count(&self) -> u32 {
        self.table.remove_count
    }

    pub fn add_listener(&mut self, listener: Weak<dyn ScopeListener>) {
        self.listeners.push(listener);
    }

    fn notify(&mut self, sym: SymId, removed: bool) {
        // Copy-before-iterate: upgrading first also purges dead handles.
        let live: Vec<Rc<dyn ScopeListener>> =
            self.listeners.iter().filter_map(Weak::upgrade).collect();
        self.listeners.retain(|l| l.strong_count() > 0);
        for listener in live {
            if removed {
                listener.symbol_removed(sym);
            } else {
                listener.symbol_added(sym);
            }
        }
    }

    /// Enters `sym`, shadowing any same-named entry already visible.
    pub fn enter(&mut self, syms: &Symbols, names: &NameTable, sym: SymId) {
        let name = syms.name(sym);
        let hash = names.hash(name);
        self.enter_named(sym, name, hash);
    }

    /// Entry point for callers that already hold the name and its hash
    /// (e.g. while the symbol arena is mutably borrowed).
    pub fn enter_named(&mut self, sym: SymId, name: Name, hash: u32) {
        assert_eq!(self.shared, 0, "enter on a scope shared by a child");
        if (self.table.nelems + 1) * 3 >= self.table.slots.len() * 2 {
            self.table.grow();
        }
        let (found, slot) = self.table.probe(name, hash);
        let index = self.table.entries.len() as u32;
        self.table.entries.push(Entry {
            sym,
            name,
            hash,
            scope_mark: self.mark,
            shadowed: found,
            bucket: slot,
            dead: false,
        });
        self.table.slots[slot] = Slot::Head(index);
        self.table.nelems += 1;
        self.order.push(index);
        self.notify(sym, false);
    }

    /// Removes `sym` wherever it sits in its bucket's shadow chain.
    pub fn remove(&mut self, syms: &Symbols, names: &NameTable, sym: SymId) {
        let name = syms.name(sym);
        let hash = names.hash(name);
        self.remove_named(sym, name, hash);
    }

    pub fn remove_named(&mut self, sym: SymId, name: Name, hash: u32) {
        assert_eq!(self.shared, 0, "remove on a scope shared by a child");
        let (found, slot) = self.table.probe(name, hash);
        let Some(head) = found else { return };

        let mut prev: Option<u32> = None;
        let mut cur = Some(head);
        while let Some(e) = cur {
            if self.table.entries[e as usize].sym == sym {
                let shadowed = self.table.entries[e as usize].shadowed;
                match prev {
                    None => {
                        self.table.slots[slot] = match shadowed {
                            Some(s) => Slot::Head(s),
                            None => Slot::Tombstone,
                        };
                    }
                    Some(p) => {
                        self.table.entries[p as usize].shadowed = shadowed;
                    }
                }
                self.table.entries[e as usize].dead = true;
                self.table.nelems -= 1;
                self.table.remove_count += 1;
                self.order.retain(|&i| i != e);
                self.notify(sym, true);
                return;
            }
            prev = Some(e);
            cur = self.table.entries[e as usize].shadowed;
        }
    }

    /// The newest visible binding of `name`.
    pub fn find_first(&self, names: &NameTable, name: Name) -> Option<SymId> {
        self.find_first_matching(names, name, |_| true)
    }

    /// The newest visible binding of `name` accepted by `pred`; walking
    /// the shadow chain makes hidden bindings reachable.
    pub fn find_first_matching(
        &self,
        names: &NameTable,
        name: Name,
        pred: impl Fn(SymId) -> bool,
    ) -> Option<SymId> {
        let hash = names.hash(name);
        let (found, _) = self.table.probe(name, hash);
        let mut cur = found;
        while let Some(e) = cur {
            let entry = &self.table.entries[e as usize];
            if !entry.dead && pred(entry.sym) {
                return Some(entry.sym);
            }
            cur = entry.shadowed;
        }
        None
    }

    /// All visible bindings of `name`, newest first.
    pub fn find_all(&self, names: &NameTable, name: Name) -> Vec<SymId> {
        let hash = names.hash(name);
        let (found, _) = self.table.probe(name, hash);
        let mut out = Vec::new();
        let mut cur = found;
        while let Some(e) = cur {
            let entry = &self.table.entries[e as usize];
            if !entry.dead {
                out.push(entry.sym);
            }
            cur = entry.shadowed;
        }
        out
    }

    pub fn includes(&self, sym: SymId) -> bool {
        self.symbols().contains(&sym)
    }

    fn collect_into(&self, table: &Table, out: &mut Vec<SymId>) {
        if self.shares_parent_table {
            if let Some(parent) = &self.parent {
                parent.collect_into(table, out);
            }
        }
        for &e in &self.order {
            let entry = &table.entries[e as usize];
            if !entry.dead {
                out.push(entry.sym);
            }
        }
    }

    /// Enumerates visible symbols in insertion order, outermost scope
    /// first.
    pub fn symbols(&self) -> Vec<SymId> {
        let mut out = Vec::new();
        self.collect_into(&self.table, &mut out);
        out
    }

    /// Opens a nested scope sharing this scope's table: the stack-like
    /// discipline of method and block scopes, with no table allocation.
    pub fn dup(mut self) -> WriteableScope {
        self.shared += 1;
        let mut table = std::mem::take(&mut self.table);
        table.mark_counter += 1;
        let mark = table.mark_counter;
        WriteableScope {
            owner: self.owner,
            table,
            order: Vec::new(),
            shared: 0,
            mark,
            shares_parent_table: true,
            parent: Some(Box::new(self)),
            listeners: Vec::new(),
        }
    }

    /// Opens a nested scope with a fresh table. When this scope's table is
    /// shared along a `dup` chain, only entries belonging to the ancestry
    /// chain are copied, so the clone sees exactly "its own" bindings.
    pub fn dup_unshared(self) -> WriteableScope {
        let mut ancestry = HashSet::new();
        let mut cur = Some(&self);
        while let Some(scope) = cur {
            ancestry.insert(scope.mark);
            cur = if scope.shares_parent_table {
                scope.parent.as_deref()
            } else {
                None
            };
        }

        let mut table = Table::with_capacity(INITIAL_CAPACITY);
        table.mark_counter = self.table.mark_counter + 1;
        let mark = table.mark_counter;
        let mut order = Vec::new();
        for entry in &self.table.entries {
            if entry.dead || !ancestry.contains(&entry.scope_mark) {
                continue;
            }
            if (table.nelems + 1) * 3 >= table.slots.len() * 2 {
                table.grow();
            }
            let (found, slot) = table.probe(entry.name, entry.hash);
            let index = table.entries.len() as u32;
            table.entries.push(Entry {
                sym: entry.sym,
                name: entry.name,
                hash: entry.hash,
                scope_mark: mark,
                shadowed: found,
                bucket: slot,
                dead: false,
            });
            table.slots[slot] = Slot::Head(index);
            table.nelems += 1;
            order.push(index);
        }

        WriteableScope {
            owner: self.owner,
            table,
            order,
            shared: 0,
            mark,
            shares_parent_table: false,
            parent: Some(Box::new(self)),
            listeners: Vec::new(),
        }
    }

    /// Closes a scope opened by [`WriteableScope::dup`] or
    /// [`WriteableScope::dup_unshared`]: this scope's entries are unwound
    /// from the shared table, newest first, restoring each bucket to the
    /// entry it shadowed; the parent gets its table back.
    pub fn leave(mut self) -> WriteableScope {
        assert_eq!(self.shared, 0, "leave on a scope shared by a child");
        let mut parent = self.parent.take().expect("leave without dup");
        if !self.shares_parent_table {
            return *parent;
        }
        for &e in self.order.iter().rev() {
            let entry = &self.table.entries[e as usize];
            if entry.dead {
                continue;
            }
            let (bucket, shadowed) = (entry.bucket, entry.shadowed);
            debug_assert_eq!(self.table.slots[bucket], Slot::Head(e));
            self.table.slots[bucket] = match shadowed {
                Some(s) => Slot::Head(s),
                None => Slot::Tombstone,
            };
            self.table.entries[e as usize].dead = true;
            self.table.nelems -= 1;
        }
        parent.shared -= 1;
        parent.table = self.table;
        *parent
    }
}

/// Predicate a named or star import applies to candidate members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFilter {
    /// Accessible types, for `import p.*`.
    AllMembers,
    /// Accessible static members, for `import static T.*`.
    StaticMembers,
    /// The single accessible member named by a named import.
    Named(Name),
    /// Accessible static members of one name, for `import static T.m`.
    StaticNamed(Name),
}

impl ImportFilter {
    pub fn accepts(&self, syms: &Symbols, sym: SymId) -> bool {
        let flags = syms.flags(sym);
        if !flags.contains(Flags::PUBLIC) {
            return false;
        }
        match self {
            ImportFilter::AllMembers => true,
            ImportFilter::StaticMembers => flags.contains(Flags::STATIC),
            ImportFilter::Named(name) => syms.name(sym) == *name,
            ImportFilter::StaticNamed(name) => {
                flags.contains(Flags::STATIC) && syms.name(sym) == *name
            }
        }
    }
}

/// Wraps an origin type symbol with an import filter. Enumeration visits
/// the origin's members, then its superclass chain and interfaces, each
/// class once even under diamond inheritance; completion failures during
/// the walk go to the reporter, not up the iterator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterImportScope {
    pub origin: SymId,
    pub filter: ImportFilter,
    pub static_import: bool,
}

impl FilterImportScope {
    pub fn symbols(
        &self,
        ctx: &mut Context,
        reporter: &mut dyn FnMut(CompletionFailure),
    ) -> Vec<SymId> {
        let mut processed = HashSet::new();
        let mut out = Vec::new();
        self.visit(ctx, self.origin, &mut processed, &mut out, reporter);
        out
    }

    fn visit(
        &self,
        ctx: &mut Context,
        sym: SymId,
        processed: &mut HashSet<SymId>,
        out: &mut Vec<SymId>,
        reporter: &mut dyn FnMut(CompletionFailure),
    ) {
        if !processed.insert(sym) {
            return;
        }
        if let Err(failure) = ctx.complete(sym) {
            reporter(failure);
            return;
        }
        if let Some(members) = ctx.syms.get(sym).members() {
            for member in members.symbols() {
                if self.filter.accepts(&ctx.syms, member) {
                    out.push(member);
                }
            }
        }
        if self.static_import || matches!(self.filter, ImportFilter::AllMembers) {
            let (supertype, interfaces) = ctx.direct_supertypes(sym);
            if let Some(sup) = supertype {
                self.visit(ctx, sup, processed, out, reporter);
            }
            for iface in interfaces {
                self.visit(ctx, iface, processed, out, reporter);
            }
        }
    }

    pub fn find_first(
        &self,
        ctx: &mut Context,
        name: Name,
        reporter: &mut dyn FnMut(CompletionFailure),
    ) -> Option<SymId> {
        self.symbols(ctx, reporter)
            .into_iter()
            .find(|&s| ctx.syms.name(s) == name)
    }
}

/// A scope holding exactly one symbol, as created by a named import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleEntryScope {
    pub sym: SymId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSub {
    Single(SingleEntryScope),
    Filter(FilterImportScope),
}

/// An ordered sequence of sub-scopes, searched front to back.
#[derive(Debug, Default)]
pub struct CompoundScope {
    subs: Vec<ImportSub>,
}

impl CompoundScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, sub: ImportSub) {
        self.subs.push(sub);
    }

    pub fn prepend(&mut self, sub: ImportSub) {
        self.subs.insert(0, sub);
    }

    pub fn subs(&self) -> &[ImportSub] {
        &self.subs
    }

    pub fn symbols(
        &self,
        ctx: &mut Context,
        reporter: &mut dyn FnMut(CompletionFailure),
    ) -> Vec<SymId> {
        let mut out = Vec::new();
        for sub in &self.subs {
            match sub {
                ImportSub::Single(s) => out.push(s.sym),
                ImportSub::Filter(f) => out.extend(f.symbols(ctx, reporter)),
            }
        }
        out
    }

    pub fn find_first(
        &self,
        ctx: &mut Context,
        name: Name,
        reporter: &mut dyn FnMut(CompletionFailure),
    ) -> Option<SymId> {
        for sub in &self.subs {
            match sub {
                ImportSub::Single(s) => {
                    if ctx.syms.name(s.sym) == name {
                        return Some(s.sym);
                    }
                }
                ImportSub::Filter(f) => {
                    if let Some(found) = f.find_first(ctx, name, reporter) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }
}

/// Threads the single-type and single-static-member imports of one
/// compilation unit.
#[derive(Debug, Default)]
pub struct NamedImportScope {
    scope: CompoundScope,
}

impl NamedImportScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn import_type(&mut self, sym: SymId) {
        self.scope.append(ImportSub::Single(SingleEntryScope { sym }));
    }

    pub fn import_static_named(&mut self, origin: SymId, name: Name) {
        self.scope.append(ImportSub::Filter(FilterImportScope {
            origin,
            filter: ImportFilter::StaticNamed(name),
            static_import: true,
        }));
    }

    pub fn symbols(
        &self,
        ctx: &mut Context,
        reporter: &mut dyn FnMut(CompletionFailure),
    ) -> Vec<SymId> {
        self.scope.symbols(ctx, reporter)
    }

    pub fn find_first(
        &self,
        ctx: &mut Context,
        name: Name,
        reporter: &mut dyn FnMut(CompletionFailure),
    ) -> Option<SymId> {
        self.scope.find_first(ctx, name, reporter)
    }
}

/// Holds the wildcard imports of one compilation unit. Re-adding an
/// identical `(origin, filter, static)` triple is refused.
#[derive(Debug, Default)]
pub struct StarImportScope {
    scope: CompoundScope,
}

impl StarImportScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, import: FilterImportScope) -> bool {
        let duplicate = self.scope.subs().iter().any(|sub| match sub {
            ImportSub::Filter(f) => *f == import,
            ImportSub::Single(_) => false,
        });
        if duplicate {
            return false;
        }
        self.scope.append(ImportSub::Filter(import));
        true
    }

    pub fn symbols(
        &self,
        ctx: &mut Context,
        reporter: &mut dyn FnMut(CompletionFailure),
    ) -> Vec<SymId> {
        self.scope.symbols(ctx, reporter)
    }

    pub fn find_first(
        &self,
        ctx: &mut Context,
        name: Name,
        reporter: &mut dyn FnMut(CompletionFailure),
    ) -> Option<SymId> {
        self.scope.find_first(ctx, name, reporter)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::flags::Flags;
    use crate::source::Span;
    use crate::symbol::{Completer, SymDetail, SymKind, Symbol};
    use crate::types::TypeId;

    fn setup() -> (Symbols, NameTable) {
        (Symbols::new(), NameTable::new())
    }

    fn var(syms: &mut Symbols, names: &mut NameTable, n: &str) -> SymId {
        let name = names.intern(n);
        syms.alloc(Symbol {
            kind: SymKind::Var,
            name,
            owner: SymId::NONE,
            flags: Flags::empty(),
            ty: TypeId::NONE,
            attrs: Vec::new(),
            detail: SymDetail::Var {
                constant: None,
                pos: Span::none(),
            },
            completer: Completer::None,
        })
    }

    #[test]
    fn enumeration_preserves_insertion_order() {
        let (mut syms, mut names) = setup();
        let mut scope = WriteableScope::new(SymId::NONE);
        let a = var(&mut syms, &mut names, "a");
        let b = var(&mut syms, &mut names, "b");
        let c = var(&mut syms, &mut names, "c");
        for s in [a, b, c] {
            scope.enter(&syms, &names, s);
        }
        assert_eq!(scope.symbols(), vec![a, b, c]);
    }

    #[test]
    fn same_name_shadows_but_keeps_both_reachable() {
        let (mut syms, mut names) = setup();
        let mut scope = WriteableScope::new(SymId::NONE);
        let x1 = var(&mut syms, &mut names, "x");
        let x2 = var(&mut syms, &mut names, "x");
        let n = names.lookup("x").unwrap();
        scope.enter(&syms, &names, x1);
        assert_eq!(scope.find_first(&names, n), Some(x1));
        scope.enter(&syms, &names, x2);
        assert_eq!(scope.find_first(&names, n), Some(x2));
        assert_eq!(
            scope.find_first_matching(&names, n, |s| s != x2),
            Some(x1)
        );
        assert_eq!(scope.find_all(&names, n), vec![x2, x1]);
    }

    #[test]
    fn dup_and_leave_round_trip() {
        let (mut syms, mut names) = setup();
        let mut scope = WriteableScope::new(SymId::NONE);
        let a = var(&mut syms, &mut names, "a");
        let b = var(&mut syms, &mut names, "b");
        scope.enter(&syms, &names, a);

        let mut inner = scope.dup();
        inner.enter(&syms, &names, b);
        assert_eq!(inner.symbols(), vec![a, b]);
        let n_b = names.lookup("b").unwrap();
        assert_eq!(inner.find_first(&names, n_b), Some(b));

        let scope = inner.leave();
        assert_eq!(scope.symbols(), vec![a]);
        assert_eq!(scope.find_first(&names, n_b), None);
    }

    #[test]
    fn leave_restores_shadowed_bindings() {
        let (mut syms, mut names) = setup();
        let mut scope = WriteableScope::new(SymId::NONE);
        let x1 = var(&mut syms, &mut names, "x");
        let x2 = var(&mut syms, &mut names, "x");
        let n = names.lookup("x").unwrap();
        scope.enter(&syms, &names, x1);

        let mut inner = scope.dup();
        inner.enter(&syms, &names, x2);
        assert_eq!(inner.find_first(&names, n), Some(x2));
        let scope = inner.leave();
        assert_eq!(scope.find_first(&names, n), Some(x1));
    }

    #[test]
    fn rehash_at_eleventh_insert_doubles_table() {
        let (mut syms, mut names) = setup();
        let mut scope = WriteableScope::new(SymId::NONE);
        assert_eq!(scope.capacity(), 16);
        let mut entered = Vec::new();
        for i in 0..10 {
            let s = var(&mut syms, &mut names, &format!("n{}", i));
            scope.enter(&syms, &names, s);
            entered.push(s);
        }
        assert_eq!(scope.capacity(), 16);
        let s = var(&mut syms, &mut names, "n10");
        scope.enter(&syms, &names, s);
        entered.push(s);
        assert_eq!(scope.capacity(), 32);
        assert_eq!(scope.symbols(), entered);
        for (i, s) in entered.iter().enumerate() {
            let n = names.lookup(&format!("n{}", i)).unwrap();
            assert_eq!(scope.find_first(&names, n), Some(*s));
        }
    }

    #[test]
    fn remove_splices_order_and_bumps_remove_count() {
        let (mut syms, mut names) = setup();
        let mut scope = WriteableScope::new(SymId::NONE);
        let a = var(&mut syms, &mut names, "a");
        let b = var(&mut syms, &mut names, "b");
        let c = var(&mut syms, &mut names, "c");
        for s in [a, b, c] {
            scope.enter(&syms, &names, s);
        }
        assert_eq!(scope.remove_count(), 0);
        scope.remove(&syms, &names, b);
        assert_eq!(scope.symbols(), vec![a, c]);
        assert_eq!(scope.remove_count(), 1);
        let n_b = names.lookup("b").unwrap();
        assert_eq!(scope.find_first(&names, n_b), None);
    }

    #[test]
    fn removing_shadowing_entry_uncovers_shadowed() {
        let (mut syms, mut names) = setup();
        let mut scope = WriteableScope::new(SymId::NONE);
        let x1 = var(&mut syms, &mut names, "x");
        let x2 = var(&mut syms, &mut names, "x");
        let n = names.lookup("x").unwrap();
        scope.enter(&syms, &names, x1);
        scope.enter(&syms, &names, x2);
        scope.remove(&syms, &names, x2);
        assert_eq!(scope.find_first(&names, n), Some(x1));
        assert_eq!(scope.symbols(), vec![x1]);
    }

    struct Recorder {
        added: RefCell<Vec<SymId>>,
        removed: RefCell<Vec<SymId>>,
    }

    impl Recorder {
        fn new() -> Rc<Recorder> {
            Rc::new(Recorder {
                added: RefCell::new(Vec::new()),
                removed: RefCell::new(Vec::new()),
            })
        }
    }

    impl ScopeListener for Recorder {
        fn symbol_added(&self, sym: SymId) {
            self.added.borrow_mut().push(sym);
        }

        fn symbol_removed(&self, sym: SymId) {
            self.removed.borrow_mut().push(sym);
        }
    }

    #[test]
    fn listeners_fire_once_per_mutation() {
        let (mut syms, mut names) = setup();
        let mut scope = WriteableScope::new(SymId::NONE);
        let rec = Recorder::new();
        let rec_dyn: Rc<dyn ScopeListener> = rec.clone();
        let weak: Weak<dyn ScopeListener> = Rc::downgrade(&rec_dyn);
        scope.add_listener(weak);

        let a = var(&mut syms, &mut names, "a");
        scope.enter(&syms, &names, a);
        scope.remove(&syms, &names, a);
        assert_eq!(*rec.added.borrow(), vec![a]);
        assert_eq!(*rec.removed.borrow(), vec![a]);
    }

    #[test]
    fn dead_listeners_never_fire() {
        let (mut syms, mut names) = setup();
        let mut scope = WriteableScope::new(SymId::NONE);
        let rec = Recorder::new();
        let rec_dyn: Rc<dyn ScopeListener> = rec.clone();
        let weak: Weak<dyn ScopeListener> = Rc::downgrade(&rec_dyn);
        scope.add_listener(weak);
        drop(rec);
        drop(rec_dyn);

        let a = var(&mut syms, &mut names, "a");
        // Must not panic or deliver to the dropped listener.
        scope.enter(&syms, &names, a);
        assert_eq!(scope.symbols(), vec![a]);
    }

    #[test]
    fn dup_unshared_filters_to_ancestry_chain() {
        let (mut syms, mut names) = setup();
        let mut scope = WriteableScope::new(SymId::NONE);
        let a = var(&mut syms, &mut names, "a");
        scope.enter(&syms, &names, a);

        let mut inner = scope.dup();
        let b = var(&mut syms, &mut names, "b");
        inner.enter(&syms, &names, b);

        // The unshared clone of the inner scope sees both its own entry
        // and the ancestor's, in a table of its own.
        let clone = inner.dup_unshared();
        assert_eq!(clone.symbols(), vec![a, b]);
        let n_a = names.lookup("a").unwrap();
        assert_eq!(clone.find_first(&names, n_a), Some(a));

        let inner = clone.leave();
        assert_eq!(inner.symbols(), vec![a, b]);
        let scope = inner.leave();
        assert_eq!(scope.symbols(), vec![a]);
    }
}
