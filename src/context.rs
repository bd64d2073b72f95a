use crate::diag::Log;
use crate::flags::Flags;
use crate::intern::NameTable;
use crate::lint::Lint;
use crate::options::{Options, SourceVersion};
use crate::scope::WriteableScope;
use crate::source::{SourceId, Sources};
use crate::symbol::{
    Completer, CompletionFailure, SymDetail, SymId, SymKind, Symbol, Symbols,
};
use crate::types::{ClassType, PrimTag, Type, TypeId, Types};

/// The predefined symbol table: singleton primitive and sentinel types
/// live in [`Types`] at fixed ids; this holds the predefined symbols and
/// the class types built around them.
pub struct Symtab {
    pub unnamed_package: SymId,
    pub unnamed_module: SymId,
    pub java_lang: SymId,
    pub object_sym: SymId,
    pub object_type: TypeId,
    pub string_sym: SymId,
    pub string_type: TypeId,
    pub suppress_warnings_sym: SymId,
    pub suppress_warnings_type: TypeId,
    boxes: Vec<(PrimTag, SymId, TypeId)>,
}

impl Symtab {
    pub fn boxed_type(&self, tag: PrimTag) -> TypeId {
        self.boxes
            .iter()
            .find(|(t, _, _)| *t == tag)
            .map(|(_, _, ty)| *ty)
            .expect("box class missing")
    }

    pub fn unboxed_tag(&self, sym: SymId) -> Option<PrimTag> {
        self.boxes
            .iter()
            .find(|(_, s, _)| *s == sym)
            .map(|(t, _, _)| *t)
    }
}

/// One compilation context: name table, type and symbol arenas, option
/// map, diagnostic log, and the predefined symbol table. Contexts are
/// threaded explicitly; there are no process globals, so a parallel
/// compilation just constructs a fresh context.
pub struct Context {
    pub names: NameTable,
    pub types: Types,
    pub syms: Symbols,
    pub sources: Sources,
    pub options: Options,
    pub log: Log,
    pub lint: Lint,
    pub source_version: SourceVersion,
    pub symtab: Symtab,
    current_source: Option<SourceId>,
}

impl Context {
    pub fn new(options: Options) -> Self {
        let names = NameTable::new();
        let types = Types::new();
        let syms = Symbols::new();
        let log = Log::from_options(&options);
        let lint = Lint::from_options(&options);
        let source_version = options.source_version();

        let mut ctx = Context {
            names,
            types,
            syms,
            sources: Sources::new(),
            options,
            log,
            lint,
            source_version,
            symtab: Symtab {
                unnamed_package: SymId::NONE,
                unnamed_module: SymId::NONE,
                java_lang: SymId::NONE,
                object_sym: SymId::NONE,
                object_type: TypeId::NONE,
                string_sym: SymId::NONE,
                string_type: TypeId::NONE,
                suppress_warnings_sym: SymId::NONE,
                suppress_warnings_type: TypeId::NONE,
                boxes: Vec::new(),
            },
            current_source: None,
        };
        ctx.init_symtab();
        ctx
    }

    fn init_symtab(&mut self) {
        let unnamed_package = self.define_package("");
        let unnamed_module = {
            let name = self.names.intern("");
            self.syms.alloc(Symbol {
                kind: SymKind::Mdl,
                name,
                owner: SymId::NONE,
                flags: Flags::empty(),
                ty: TypeId::NONE,
                attrs: Vec::new(),
                detail: SymDetail::Module,
                completer: Completer::None,
            })
        };
        let java_lang = self.define_package("java.lang");

        let (object_sym, object_type) = self.define_class("Object", java_lang);
        // Object terminates the superclass walk.
        self.set_supertype(object_sym, TypeId::NONE);

        let (string_sym, string_type) = self.define_class("String", java_lang);
        self.set_supertype(string_sym, object_type);

        let (sw_sym, sw_type) = self.define_class("SuppressWarnings", java_lang);
        self.set_supertype(sw_sym, object_type);
        self.syms.get_mut(sw_sym).flags |= Flags::INTERFACE | Flags::ANNOTATION;

        let mut boxes = Vec::new();
        for (tag, name) in [
            (PrimTag::Byte, "Byte"),
            (PrimTag::Char, "Character"),
            (PrimTag::Short, "Short"),
            (PrimTag::Int, "Integer"),
            (PrimTag::Long, "Long"),
            (PrimTag::Float, "Float"),
            (PrimTag::Double, "Double"),
            (PrimTag::Boolean, "Boolean"),
        ] {
            let (sym, ty) = self.define_class(name, java_lang);
            self.set_supertype(sym, object_type);
            boxes.push((tag, sym, ty));
        }

        self.symtab = Symtab {
            unnamed_package,
            unnamed_module,
            java_lang,
            object_sym,
            object_type,
            string_sym,
            string_type,
            suppress_warnings_sym: sw_sym,
            suppress_warnings_type: sw_type,
            boxes,
        };
    }

    /// Creates a package symbol with an empty members scope.
    pub fn define_package(&mut self, name: &str) -> SymId {
        let name = self.names.intern(name);
        let id = self.syms.next_id();
        self.syms.alloc(Symbol {
            kind: SymKind::Pck,
            name,
            owner: SymId::NONE,
            flags: Flags::empty(),
            ty: TypeId::NONE,
            attrs: Vec::new(),
            detail: SymDetail::Package {
                members: WriteableScope::new(id),
            },
            completer: Completer::None,
        })
    }

    /// Creates a class symbol with an empty members scope and its declared
    /// class type. The supertype stays unresolved until completion fills
    /// it in.
    pub fn define_class(&mut self, name: &str, owner: SymId) -> (SymId, TypeId) {
        let simple = self.names.intern(name);
        let fullname = {
            let owner_name = self.names.resolve(self.syms.name(owner)).to_string();
            if owner_name.is_empty() {
                simple
            } else {
                let full = format!("{}.{}", owner_name, name);
                self.names.intern(&full)
            }
        };
        let id = self.syms.next_id();
        self.syms.alloc(Symbol {
            kind: SymKind::Typ,
            name: simple,
            owner,
            flags: Flags::PUBLIC,
            ty: TypeId::NONE,
            attrs: Vec::new(),
            detail: SymDetail::Class {
                members: WriteableScope::new(id),
                fullname,
            },
            completer: Completer::None,
        });
        let ty = self.types.alloc(Type::Class(ClassType {
            outer: TypeId::NONE,
            typarams: Vec::new(),
            sym: id,
            supertype: None,
            interfaces: None,
        }));
        self.syms.get_mut(id).ty = ty;
        self.enter_member(owner, id);
        (id, ty)
    }

    /// Fills the declared supertype of `sym`'s class type, as a completer
    /// would. `TypeId::NONE` means "completed, no supertype".
    pub fn set_supertype(&mut self, sym: SymId, supertype: TypeId) {
        let ty = self.syms.type_of(sym);
        if let Type::Class(c) = self.types.get_mut(ty) {
            c.supertype = Some(supertype);
            if c.interfaces.is_none() {
                c.interfaces = Some(Vec::new());
            }
        }
    }

    pub fn set_interfaces(&mut self, sym: SymId, interfaces: Vec<TypeId>) {
        let ty = self.syms.type_of(sym);
        if let Type::Class(c) = self.types.get_mut(ty) {
            c.interfaces = Some(interfaces);
        }
    }

    /// Enters `member` into `owner`'s members scope.
    pub fn enter_member(&mut self, owner: SymId, member: SymId) {
        let name = self.syms.name(member);
        let hash = self.names.hash(name);
        if let Some(scope) = self.syms.get_mut(owner).members_mut() {
            scope.enter_named(member, name, hash);
        }
    }

    /// Runs `sym`'s completer if it has not run yet. The first failure is
    /// sticky: it flips the symbol to an error symbol, is reported once,
    /// and is replayed to every later caller.
    pub fn complete(&mut self, sym: SymId) -> Result<(), CompletionFailure> {
        let state = std::mem::replace(
            &mut self.syms.get_mut(sym).completer,
            Completer::InProgress,
        );
        match state {
            Completer::None | Completer::Done => {
                self.syms.get_mut(sym).completer = Completer::Done;
                Ok(())
            }
            Completer::Failed(failure) => {
                self.syms.get_mut(sym).completer = Completer::Failed(failure.clone());
                Err(failure)
            }
            Completer::InProgress => {
                let failure = CompletionFailure {
                    sym,
                    key: "compiler.err.cyclic.inheritance",
                    args: vec![self.symbol_name(sym)],
                };
                self.syms.fail_completion(sym, failure.clone());
                self.log.error(
                    self.current_source,
                    crate::source::Span::none(),
                    failure.key,
                    failure.args.clone(),
                );
                Err(failure)
            }
            Completer::Ready(run) => match run(self, sym) {
                Ok(()) => {
                    self.syms.get_mut(sym).completer = Completer::Done;
                    Ok(())
                }
                Err(failure) => {
                    // A nested cycle error has already reported and marked
                    // the symbol; keep the first failure sticky.
                    let already_failed =
                        matches!(self.syms.get(sym).completer, Completer::Failed(_));
                    if !already_failed {
                        self.syms.fail_completion(sym, failure.clone());
                        self.log.error(
                            self.current_source,
                            crate::source::Span::none(),
                            failure.key,
                            failure.args.clone(),
                        );
                    }
                    Err(failure)
                }
            },
        }
    }

    pub fn symbol_name(&self, sym: SymId) -> String {
        self.names.resolve(self.syms.name(sym)).to_string()
    }

    pub fn class_sym_of(&self, ty: TypeId) -> Option<SymId> {
        match self.types.get(ty) {
            Type::Class(c) => Some(c.sym),
            _ => None,
        }
    }

    /// The direct superclass and interfaces of a class symbol, as symbols.
    /// Completes `sym` first; the caller handles completion failures.
    pub fn direct_supertypes(&mut self, sym: SymId) -> (Option<SymId>, Vec<SymId>) {
        let _ = self.complete(sym);
        let ty = self.syms.type_of(sym);
        match self.types.get(ty) {
            Type::Class(c) => {
                let sup = c
                    .supertype
                    .filter(|s| *s != TypeId::NONE)
                    .and_then(|s| self.class_sym_of(s));
                let ifaces = c
                    .interfaces
                    .clone()
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|i| self.class_sym_of(*i))
                    .collect();
                (sup, ifaces)
            }
            _ => (None, Vec::new()),
        }
    }

    /// Swaps the current source around `f`, restoring the previous one on
    /// the way out (scoped acquisition).
    pub fn with_source<R>(&mut self, id: SourceId, f: impl FnOnce(&mut Self) -> R) -> R {
        let prev = self.current_source.replace(id);
        let result = f(self);
        self.current_source = prev;
        result
    }

    pub fn current_source(&self) -> Option<SourceId> {
        self.current_source
    }

    pub fn error_at(&mut self, span: crate::source::Span, key: &'static str, args: Vec<String>) {
        self.log.error(self.current_source, span, key, args);
    }
}
