//! Fixture builders shared by unit and integration tests: small
//! hand-assembled class hierarchies, methods, and functional interfaces
//! over a fresh [`Context`].

use crate::context::Context;
use crate::flags::Flags;
use crate::options::Options;
use crate::symbol::{Completer, SymDetail, SymId, SymKind, Symbol};
use crate::types::{MethodType, Type, TypeId, TypeVarType};

pub fn fixture() -> Context {
    Context::new(Options::new())
}

/// A fresh type variable named `name` with the given upper bound.
pub fn new_tvar(ctx: &mut Context, name: &str, upper: TypeId) -> TypeId {
    let n = ctx.names.intern(name);
    let sym = ctx.syms.alloc(Symbol {
        kind: SymKind::Typ,
        name: n,
        owner: SymId::NONE,
        flags: Flags::empty(),
        ty: TypeId::NONE,
        attrs: Vec::new(),
        detail: SymDetail::None,
        completer: Completer::None,
    });
    let ty = ctx.types.alloc(Type::TypeVar(TypeVarType {
        sym,
        upper,
        lower: TypeId::BOT,
        wildcard: None,
    }));
    ctx.syms.get_mut(sym).ty = ty;
    ty
}

/// Defines a method member of `owner` with a plain method type.
pub fn define_method(
    ctx: &mut Context,
    owner: SymId,
    name: &str,
    params: Vec<TypeId>,
    res: TypeId,
    flags: Flags,
) -> SymId {
    let mty = ctx.types.alloc(Type::Method(MethodType {
        params,
        res,
        thrown: Vec::new(),
    }));
    define_method_with_type(ctx, owner, name, mty, flags)
}

/// Defines a generic method member of `owner`, quantified over `tvars`.
pub fn define_generic_method(
    ctx: &mut Context,
    owner: SymId,
    name: &str,
    tvars: Vec<TypeId>,
    params: Vec<TypeId>,
    res: TypeId,
    flags: Flags,
) -> SymId {
    let mty = ctx.types.alloc(Type::Method(MethodType {
        params,
        res,
        thrown: Vec::new(),
    }));
    let forall = ctx.types.alloc(Type::ForAll { tvars, qtype: mty });
    define_method_with_type(ctx, owner, name, forall, flags)
}

pub fn define_method_with_type(
    ctx: &mut Context,
    owner: SymId,
    name: &str,
    mty: TypeId,
    flags: Flags,
) -> SymId {
    let n = ctx.names.intern(name);
    let sym = ctx.syms.alloc(Symbol {
        kind: SymKind::Mth,
        name: n,
        owner,
        flags,
        ty: mty,
        attrs: Vec::new(),
        detail: SymDetail::Method {
            params: Vec::new(),
            default_value: None,
        },
        completer: Completer::None,
    });
    ctx.enter_member(owner, sym);
    sym
}

/// Defines a functional interface with a single abstract method named
/// `mname`, returning both the interface symbol and its class type.
pub fn define_functional_interface(
    ctx: &mut Context,
    name: &str,
    mname: &str,
    params: Vec<TypeId>,
    res: TypeId,
) -> (SymId, TypeId) {
    let object = ctx.symtab.object_type;
    let (sym, ty) = ctx.define_class(name, ctx.symtab.unnamed_package);
    ctx.set_supertype(sym, object);
    ctx.syms.get_mut(sym).flags |= Flags::INTERFACE;
    define_method(
        ctx,
        sym,
        mname,
        params,
        res,
        Flags::PUBLIC | Flags::ABSTRACT,
    );
    (sym, ty)
}

/// Defines a plain class extending `Object` with the given members
/// already present (a completed class, as Enter would leave it).
pub fn define_simple_class(ctx: &mut Context, name: &str) -> (SymId, TypeId) {
    let object = ctx.symtab.object_type;
    let (sym, ty) = ctx.define_class(name, ctx.symtab.unnamed_package);
    ctx.set_supertype(sym, object);
    (sym, ty)
}
