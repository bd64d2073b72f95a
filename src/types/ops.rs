use crate::context::Context;
use crate::flags::Flags;
use crate::symbol::{SymDetail, SymId, SymKind};
use crate::types::{BoundKind, ClassType, MethodType, PrimTag, Type, TypeId, TypeVarType};

/// Rewrites occurrences of the type variables `from` to the corresponding
/// `to` types inside `t`. Rebuilds a term only when a subterm changed;
/// otherwise the input id comes back, which keeps substitution cheap and
/// preserves metadata sharing.
pub fn subst(ctx: &mut Context, t: TypeId, from: &[TypeId], to: &[TypeId]) -> TypeId {
    debug_assert_eq!(from.len(), to.len());
    if from.is_empty() {
        return t;
    }
    match ctx.types.get(t).clone() {
        Type::TypeVar(_) => {
            for (i, f) in from.iter().enumerate() {
                if ctx.types.same_type(t, *f) {
                    return to[i];
                }
            }
            t
        }
        Type::Class(c) => {
            let outer = if c.outer == TypeId::NONE {
                c.outer
            } else {
                subst(ctx, c.outer, from, to)
            };
            let typarams: Vec<TypeId> = c
                .typarams
                .iter()
                .map(|a| subst(ctx, *a, from, to))
                .collect();
            if outer == c.outer && typarams == c.typarams {
                t
            } else {
                ctx.types.alloc(Type::Class(ClassType {
                    outer,
                    typarams,
                    sym: c.sym,
                    supertype: None,
                    interfaces: None,
                }))
            }
        }
        Type::Array { elem, varargs } => {
            let new_elem = subst(ctx, elem, from, to);
            if new_elem == elem {
                t
            } else {
                ctx.types.alloc(Type::Array {
                    elem: new_elem,
                    varargs,
                })
            }
        }
        Type::Method(m) => {
            let params: Vec<TypeId> = m.params.iter().map(|p| subst(ctx, *p, from, to)).collect();
            let res = subst(ctx, m.res, from, to);
            let thrown: Vec<TypeId> = m.thrown.iter().map(|x| subst(ctx, *x, from, to)).collect();
            if params == m.params && res == m.res && thrown == m.thrown {
                t
            } else {
                ctx.types.alloc(Type::Method(MethodType { params, res, thrown }))
            }
        }
        Type::Wildcard { inner, kind, bound } => {
            let new_inner = subst(ctx, inner, from, to);
            if new_inner == inner {
                t
            } else {
                ctx.types.alloc(Type::Wildcard {
                    inner: new_inner,
                    kind,
                    bound,
                })
            }
        }
        Type::ForAll { tvars, qtype } => {
            // Variables quantified here shadow the substitution.
            let (from2, to2): (Vec<TypeId>, Vec<TypeId>) = from
                .iter()
                .zip(to)
                .filter(|(f, _)| !tvars.iter().any(|tv| ctx.types.same_type(*tv, **f)))
                .map(|(f, t)| (*f, *t))
                .unzip();
            let new_q = subst(ctx, qtype, &from2, &to2);
            if new_q == qtype {
                t
            } else {
                ctx.types.alloc(Type::ForAll {
                    tvars,
                    qtype: new_q,
                })
            }
        }
        Type::Intersection { components } => {
            let new: Vec<TypeId> = components.iter().map(|c| subst(ctx, *c, from, to)).collect();
            if new == components {
                t
            } else {
                ctx.types.alloc(Type::Intersection { components: new })
            }
        }
        _ => t,
    }
}

/// Type erasure: classes lose their type arguments, arrays erase their
/// element, methods erase parameters and result, type variables erase to
/// their upper bound. Idempotent.
pub fn erasure(ctx: &mut Context, t: TypeId) -> TypeId {
    match ctx.types.get(t).clone() {
        Type::Class(c) => {
            let outer = if c.outer == TypeId::NONE {
                c.outer
            } else {
                erasure(ctx, c.outer)
            };
            if c.typarams.is_empty() && outer == c.outer {
                t
            } else {
                // The erased use is the symbol's declared type when that
                // is itself unparameterized, keeping erasure idempotent.
                let decl = ctx.syms.type_of(c.sym);
                match ctx.types.get(decl) {
                    Type::Class(d) if d.typarams.is_empty() && d.outer == TypeId::NONE => decl,
                    _ => ctx.types.alloc(Type::Class(ClassType {
                        outer,
                        typarams: Vec::new(),
                        sym: c.sym,
                        supertype: None,
                        interfaces: None,
                    })),
                }
            }
        }
        Type::Array { elem, varargs } => {
            let new_elem = erasure(ctx, elem);
            if new_elem == elem {
                t
            } else {
                ctx.types.alloc(Type::Array {
                    elem: new_elem,
                    varargs,
                })
            }
        }
        Type::Method(m) => {
            let params: Vec<TypeId> = m.params.iter().map(|p| erasure(ctx, *p)).collect();
            let res = erasure(ctx, m.res);
            let thrown: Vec<TypeId> = m.thrown.iter().map(|x| erasure(ctx, *x)).collect();
            if params == m.params && res == m.res && thrown == m.thrown {
                t
            } else {
                ctx.types.alloc(Type::Method(MethodType { params, res, thrown }))
            }
        }
        Type::TypeVar(tv) => erasure(ctx, tv.upper),
        Type::Wildcard { inner, kind, .. } => match kind {
            BoundKind::Extends => erasure(ctx, inner),
            _ => ctx.symtab.object_type,
        },
        Type::ForAll { qtype, .. } => erasure(ctx, qtype),
        Type::Intersection { components } => components
            .first()
            .map(|c| erasure(ctx, *c))
            .unwrap_or(ctx.symtab.object_type),
        Type::UndetVar(uv) => match uv.inst {
            Some(inst) => erasure(ctx, inst),
            None => erasure(ctx, uv.qtype),
        },
        _ => t,
    }
}

/// The instantiated supertype of a class use, memoized on the type term.
pub fn supertype_of(ctx: &mut Context, t: TypeId) -> Option<TypeId> {
    let c = match ctx.types.get(t) {
        Type::Class(c) => c.clone(),
        Type::TypeVar(tv) => return Some(tv.upper),
        _ => return None,
    };
    if let Some(sup) = c.supertype {
        return (sup != TypeId::NONE).then_some(sup);
    }
    let _ = ctx.complete(c.sym);
    let decl = ctx.syms.type_of(c.sym);
    let (decl_sup, formals) = match ctx.types.get(decl) {
        Type::Class(d) => (d.supertype, d.typarams.clone()),
        _ => (None, Vec::new()),
    };
    let instantiated = match decl_sup {
        None => return None,
        Some(s) if s == TypeId::NONE => None,
        Some(s) => Some(subst(ctx, s, &formals, &c.typarams)),
    };
    if let Type::Class(c) = ctx.types.get_mut(t) {
        c.supertype = Some(instantiated.unwrap_or(TypeId::NONE));
    }
    instantiated
}

/// The instantiated interfaces of a class use.
pub fn interfaces_of(ctx: &mut Context, t: TypeId) -> Vec<TypeId> {
    let c = match ctx.types.get(t) {
        Type::Class(c) => c.clone(),
        _ => return Vec::new(),
    };
    if let Some(ifaces) = c.interfaces {
        return ifaces;
    }
    let _ = ctx.complete(c.sym);
    let decl = ctx.syms.type_of(c.sym);
    let (decl_ifaces, formals) = match ctx.types.get(decl) {
        Type::Class(d) => (d.interfaces.clone().unwrap_or_default(), d.typarams.clone()),
        _ => (Vec::new(), Vec::new()),
    };
    let instantiated: Vec<TypeId> = decl_ifaces
        .iter()
        .map(|i| subst(ctx, *i, &formals, &c.typarams))
        .collect();
    if let Type::Class(c) = ctx.types.get_mut(t) {
        c.interfaces = Some(instantiated.clone());
    }
    instantiated
}

/// The instantiation of `t` at the class symbol `target`, found by
/// walking the (substituted) superclass chain and interfaces.
pub fn as_super(ctx: &mut Context, t: TypeId, target: SymId) -> Option<TypeId> {
    match ctx.types.get(t) {
        Type::Class(c) => {
            if c.sym == target {
                return Some(t);
            }
            if let Some(sup) = supertype_of(ctx, t) {
                if let Some(found) = as_super(ctx, sup, target) {
                    return Some(found);
                }
            }
            for iface in interfaces_of(ctx, t) {
                if let Some(found) = as_super(ctx, iface, target) {
                    return Some(found);
                }
            }
            None
        }
        Type::TypeVar(tv) => {
            let upper = tv.upper;
            as_super(ctx, upper, target)
        }
        Type::Array { .. } if target == ctx.symtab.object_sym => Some(ctx.symtab.object_type),
        Type::Intersection { components } => {
            let components = components.clone();
            components
                .into_iter()
                .find_map(|c| as_super(ctx, c, target))
        }
        _ => None,
    }
}

fn widens_to(from: PrimTag, to: PrimTag) -> bool {
    use PrimTag::*;
    if from == to {
        return true;
    }
    match from {
        Byte => matches!(to, Short | Int | Long | Float | Double),
        Short => matches!(to, Int | Long | Float | Double),
        Char => matches!(to, Int | Long | Float | Double),
        Int => matches!(to, Long | Float | Double),
        Long => matches!(to, Float | Double),
        Float => matches!(to, Double),
        Double | Boolean => false,
    }
}

/// Whether the type argument `arg` is contained by the (possibly
/// wildcard) formal argument `formal`.
fn contains_type(ctx: &mut Context, formal: TypeId, arg: TypeId) -> bool {
    match ctx.types.get(formal).clone() {
        Type::Wildcard { inner, kind, .. } => match kind {
            BoundKind::Unbound => true,
            BoundKind::Extends => {
                let arg_upper = wildcard_upper(ctx, arg);
                is_subtype(ctx, arg_upper, inner)
            }
            BoundKind::Super => {
                let arg_lower = wildcard_lower(ctx, arg);
                is_subtype(ctx, inner, arg_lower)
            }
        },
        _ => ctx.types.same_type(formal, arg),
    }
}

/// The upper projection of a type argument: extends bound or the type
/// itself.
pub fn wildcard_upper(ctx: &mut Context, t: TypeId) -> TypeId {
    match ctx.types.get(t) {
        Type::Wildcard { inner, kind, .. } => match kind {
            BoundKind::Extends => *inner,
            _ => ctx.symtab.object_type,
        },
        _ => t,
    }
}

/// The lower projection of a type argument: super bound or bottom for
/// other wildcards.
pub fn wildcard_lower(ctx: &mut Context, t: TypeId) -> TypeId {
    match ctx.types.get(t) {
        Type::Wildcard { inner, kind, .. } => match kind {
            BoundKind::Super => *inner,
            _ => TypeId::BOT,
        },
        _ => t,
    }
}

/// Java subtyping. Error and unknown types are transparent so cascading
/// diagnostics stay suppressed.
pub fn is_subtype(ctx: &mut Context, a: TypeId, b: TypeId) -> bool {
    if a == b || ctx.types.same_type(a, b) {
        return true;
    }
    if ctx.types.is_error(a) || ctx.types.is_error(b) {
        return true;
    }
    match (ctx.types.get(a).clone(), ctx.types.get(b).clone()) {
        (Type::Unknown, _) | (_, Type::Unknown) => true,
        (Type::Bottom, _) => ctx.types.is_reference(b),
        (Type::Primitive { tag: ta, .. }, Type::Primitive { tag: tb, .. }) => widens_to(ta, tb),
        (Type::UndetVar(uv), _) => match uv.inst {
            Some(inst) => is_subtype(ctx, inst, b),
            None => false,
        },
        (_, Type::UndetVar(uv)) => match uv.inst {
            Some(inst) => is_subtype(ctx, a, inst),
            None => false,
        },
        (Type::Union { alternatives, .. }, _) => {
            alternatives.iter().all(|alt| is_subtype(ctx, *alt, b))
        }
        (_, Type::Union { lub, .. }) => is_subtype(ctx, a, lub),
        (Type::Intersection { components }, _) => {
            components.iter().any(|c| is_subtype(ctx, *c, b))
        }
        (_, Type::Intersection { components }) => {
            components.iter().all(|c| is_subtype(ctx, a, *c))
        }
        (Type::Array { elem: ea, .. }, Type::Array { elem: eb, .. }) => {
            if ctx.types.is_primitive(ea) || ctx.types.is_primitive(eb) {
                ctx.types.same_type(ea, eb)
            } else {
                is_subtype(ctx, ea, eb)
            }
        }
        (Type::Array { .. }, Type::Class(cb)) => cb.sym == ctx.symtab.object_sym,
        (Type::TypeVar(tv), _) => is_subtype(ctx, tv.upper, b),
        (_, Type::TypeVar(tv)) => tv.lower != TypeId::BOT && is_subtype(ctx, a, tv.lower),
        (Type::Class(_), Type::Class(cb)) => {
            let Some(instance) = as_super(ctx, a, cb.sym) else {
                return false;
            };
            let args_a = match ctx.types.get(instance) {
                Type::Class(c) => c.typarams.clone(),
                _ => Vec::new(),
            };
            // A raw target accepts any instantiation.
            if cb.typarams.is_empty() {
                return true;
            }
            if args_a.is_empty() {
                return false;
            }
            args_a.len() == cb.typarams.len()
                && args_a
                    .iter()
                    .zip(&cb.typarams)
                    .all(|(sa, fb)| contains_type(ctx, *fb, *sa))
        }
        _ => false,
    }
}

/// Capture conversion: each wildcard argument is replaced by a fresh
/// capture variable whose upper bound is the glb of the declared bound
/// and the extends bound, and whose lower bound is the super bound or
/// bottom. Identity on wildcard-free types, which makes capture stable.
pub fn capture(ctx: &mut Context, t: TypeId) -> TypeId {
    let c = match ctx.types.get(t) {
        Type::Class(c) => c.clone(),
        _ => return t,
    };
    if !c
        .typarams
        .iter()
        .any(|a| matches!(ctx.types.get(*a), Type::Wildcard { .. }))
    {
        return t;
    }
    let decl = ctx.syms.type_of(c.sym);
    let formals = match ctx.types.get(decl) {
        Type::Class(d) => d.typarams.clone(),
        _ => Vec::new(),
    };
    if formals.len() != c.typarams.len() {
        return t;
    }

    // First pass: fresh variables for the wildcard positions, so bound
    // substitution can see the full new argument list.
    let mut fresh = Vec::with_capacity(c.typarams.len());
    for arg in &c.typarams {
        if let Type::Wildcard { .. } = ctx.types.get(*arg) {
            let n = ctx.syms.len();
            let cap_name = ctx.names.intern(&format!("capture#{}", n));
            let cap_sym = ctx.syms.alloc(crate::symbol::Symbol {
                kind: SymKind::Typ,
                name: cap_name,
                owner: c.sym,
                flags: Flags::SYNTHETIC,
                ty: TypeId::NONE,
                attrs: Vec::new(),
                detail: SymDetail::None,
                completer: crate::symbol::Completer::None,
            });
            let cap_ty = ctx.types.alloc(Type::TypeVar(TypeVarType {
                sym: cap_sym,
                upper: ctx.symtab.object_type,
                lower: TypeId::BOT,
                wildcard: Some(*arg),
            }));
            ctx.syms.get_mut(cap_sym).ty = cap_ty;
            fresh.push(cap_ty);
        } else {
            fresh.push(*arg);
        }
    }

    // Second pass: bounds.
    for (i, arg) in c.typarams.iter().enumerate() {
        let (inner, kind) = match ctx.types.get(*arg) {
            Type::Wildcard { inner, kind, .. } => (*inner, *kind),
            _ => continue,
        };
        let declared_upper = match ctx.types.get(formals[i]) {
            Type::TypeVar(tv) => tv.upper,
            _ => ctx.symtab.object_type,
        };
        let declared_upper = subst(ctx, declared_upper, &formals, &fresh);
        let (upper, lower) = match kind {
            BoundKind::Unbound => (declared_upper, TypeId::BOT),
            BoundKind::Extends => (glb(ctx, declared_upper, inner), TypeId::BOT),
            BoundKind::Super => (declared_upper, inner),
        };
        if let Type::TypeVar(tv) = ctx.types.get_mut(fresh[i]) {
            tv.upper = upper;
            tv.lower = lower;
        }
    }

    ctx.types.alloc(Type::Class(ClassType {
        outer: c.outer,
        typarams: fresh,
        sym: c.sym,
        supertype: None,
        interfaces: None,
    }))
}

/// Greatest lower bound; falls back to an intersection of the operands.
pub fn glb(ctx: &mut Context, a: TypeId, b: TypeId) -> TypeId {
    if ctx.types.same_type(a, b) || is_subtype(ctx, a, b) {
        return a;
    }
    if is_subtype(ctx, b, a) {
        return b;
    }
    ctx.types.alloc(Type::Intersection {
        components: vec![a, b],
    })
}

/// Least upper bound, as needed by standalone conditionals and inference:
/// the smaller supertype when one side already contains the other, else
/// the nearest common superclass.
pub fn lub(ctx: &mut Context, a: TypeId, b: TypeId) -> TypeId {
    if ctx.types.is_error(a) {
        return b;
    }
    if ctx.types.is_error(b) {
        return a;
    }
    if ctx.types.same_type(a, b) || is_subtype(ctx, b, a) {
        return a;
    }
    if is_subtype(ctx, a, b) {
        return b;
    }
    if ctx.types.is_primitive(a) || ctx.types.is_primitive(b) {
        // Binary numeric promotion handles primitives before lub.
        return ctx.symtab.object_type;
    }
    let mut walk = supertype_of(ctx, a);
    while let Some(sup) = walk {
        if is_subtype(ctx, b, sup) {
            return sup;
        }
        walk = supertype_of(ctx, sup);
    }
    ctx.symtab.object_type
}

/// The boxed class type of a primitive, or the input unchanged.
pub fn boxed(ctx: &Context, t: TypeId) -> TypeId {
    match ctx.types.get(t) {
        Type::Primitive { tag, .. } => ctx.symtab.boxed_type(*tag),
        _ => t,
    }
}

/// The primitive a box class unboxes to, if any.
pub fn unboxed(ctx: &Context, t: TypeId) -> Option<TypeId> {
    match ctx.types.get(t) {
        Type::Class(c) => ctx
            .symtab
            .unboxed_tag(c.sym)
            .map(|tag| ctx.types.primitive(tag)),
        _ => None,
    }
}

/// Method-invocation conversion: subtyping plus boxing and unboxing.
pub fn is_convertible(ctx: &mut Context, from: TypeId, to: TypeId) -> bool {
    if is_subtype(ctx, from, to) {
        return true;
    }
    if ctx.types.is_primitive(from) && !ctx.types.is_primitive(to) {
        let b = boxed(ctx, from);
        return is_subtype(ctx, b, to);
    }
    if !ctx.types.is_primitive(from) && ctx.types.is_primitive(to) {
        if let Some(p) = unboxed(ctx, from) {
            return is_subtype(ctx, p, to);
        }
    }
    false
}

/// The function descriptor of a functional interface: its single
/// abstract method, instantiated at the interface use.
pub struct Descriptor {
    pub sym: SymId,
    pub ty: TypeId,
}

pub fn descriptor(ctx: &mut Context, target: TypeId) -> Result<Descriptor, &'static str> {
    let c = match ctx.types.get(target) {
        Type::Class(c) => c.clone(),
        _ => return Err("compiler.misc.not.a.functional.intf"),
    };
    let _ = ctx.complete(c.sym);
    if !ctx.syms.flags(c.sym).contains(Flags::INTERFACE) {
        return Err("compiler.misc.not.a.functional.intf");
    }
    let members = match ctx.syms.get(c.sym).members() {
        Some(m) => m.symbols(),
        None => return Err("compiler.misc.not.a.functional.intf"),
    };
    let mut abstracts = members.into_iter().filter(|m| {
        ctx.syms.kind(*m) == SymKind::Mth
            && ctx.syms.flags(*m).contains(Flags::ABSTRACT)
            && !ctx.syms.flags(*m).is_static()
    });
    let Some(sam) = abstracts.next() else {
        return Err("compiler.misc.not.a.functional.intf");
    };
    if abstracts.next().is_some() {
        return Err("compiler.misc.incompatible.abstracts");
    }
    let decl = ctx.syms.type_of(c.sym);
    let formals = match ctx.types.get(decl) {
        Type::Class(d) => d.typarams.clone(),
        _ => Vec::new(),
    };
    let mty = ctx.syms.type_of(sam);
    let instantiated = if formals.is_empty() || c.typarams.is_empty() {
        mty
    } else {
        subst(ctx, mty, &formals, &c.typarams)
    };
    Ok(Descriptor {
        sym: sam,
        ty: instantiated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    fn ctx() -> Context {
        Context::new(Options::new())
    }

    fn tvar(ctx: &mut Context, name: &str, upper: TypeId) -> TypeId {
        let n = ctx.names.intern(name);
        let sym = ctx.syms.alloc(crate::symbol::Symbol {
            kind: SymKind::Typ,
            name: n,
            owner: SymId::NONE,
            flags: Flags::empty(),
            ty: TypeId::NONE,
            attrs: Vec::new(),
            detail: SymDetail::None,
            completer: crate::symbol::Completer::None,
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

    fn generic_list(ctx: &mut Context) -> (SymId, TypeId, TypeId) {
        let object = ctx.symtab.object_type;
        let (sym, _decl) = ctx.define_class("List", ctx.symtab.unnamed_package);
        ctx.syms.get_mut(sym).flags |= Flags::INTERFACE;
        let t = tvar(ctx, "T", object);
        let decl = ctx.types.alloc(Type::Class(ClassType {
            outer: TypeId::NONE,
            typarams: vec![t],
            sym,
            supertype: Some(TypeId::NONE),
            interfaces: Some(vec![]),
        }));
        ctx.syms.get_mut(sym).ty = decl;
        (sym, decl, t)
    }

    fn list_of(ctx: &mut Context, sym: SymId, arg: TypeId) -> TypeId {
        ctx.types.alloc(Type::Class(ClassType {
            outer: TypeId::NONE,
            typarams: vec![arg],
            sym,
            supertype: None,
            interfaces: None,
        }))
    }

    #[test]
    fn subst_is_identity_when_nothing_matches() {
        let mut ctx = ctx();
        let string = ctx.symtab.string_type;
        let arr = ctx.types.array_of(string);
        let object = ctx.symtab.object_type;
        let t = tvar(&mut ctx, "T", object);
        assert_eq!(subst(&mut ctx, arr, &[t], &[TypeId::INT]), arr);
    }

    #[test]
    fn subst_rewrites_nested_occurrences() {
        let mut ctx = ctx();
        let object = ctx.symtab.object_type;
        let t = tvar(&mut ctx, "T", object);
        let arr = ctx.types.array_of(t);
        let string = ctx.symtab.string_type;
        let out = subst(&mut ctx, arr, &[t], &[string]);
        assert_ne!(out, arr);
        match ctx.types.get(out) {
            Type::Array { elem, .. } => assert!(ctx.types.same_type(*elem, string)),
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn erasure_strips_type_arguments_and_is_idempotent() {
        let mut ctx = ctx();
        let (sym, decl, _t) = generic_list(&mut ctx);
        let string = ctx.symtab.string_type;
        let list_string = list_of(&mut ctx, sym, string);
        let erased = erasure(&mut ctx, list_string);
        match ctx.types.get(erased) {
            Type::Class(c) => {
                assert_eq!(c.sym, sym);
                assert!(c.typarams.is_empty());
            }
            other => panic!("expected class, got {:?}", other),
        }
        assert_eq!(erasure(&mut ctx, erased), erased);
        let _ = decl;
    }

    #[test]
    fn primitive_widening_chain() {
        let mut ctx = ctx();
        assert!(is_subtype(&mut ctx, TypeId::INT, TypeId::LONG));
        assert!(is_subtype(&mut ctx, TypeId::CHAR, TypeId::INT));
        assert!(!is_subtype(&mut ctx, TypeId::LONG, TypeId::INT));
        assert!(!is_subtype(&mut ctx, TypeId::BOOLEAN, TypeId::INT));
    }

    #[test]
    fn class_subtyping_walks_superclass_chain() {
        let mut ctx = ctx();
        let object = ctx.symtab.object_type;
        let (b_sym, b_ty) = ctx.define_class("B", ctx.symtab.unnamed_package);
        ctx.set_supertype(b_sym, object);
        let (c_sym, c_ty) = ctx.define_class("C", ctx.symtab.unnamed_package);
        ctx.set_supertype(c_sym, b_ty);
        assert!(is_subtype(&mut ctx, c_ty, b_ty));
        assert!(is_subtype(&mut ctx, c_ty, object));
        assert!(!is_subtype(&mut ctx, b_ty, c_ty));
    }

    #[test]
    fn parameterized_subtyping_uses_containment() {
        let mut ctx = ctx();
        let (sym, _decl, _t) = generic_list(&mut ctx);
        let string = ctx.symtab.string_type;
        let object = ctx.symtab.object_type;
        let list_string = list_of(&mut ctx, sym, string);
        let list_object = list_of(&mut ctx, sym, object);
        let extends_object = ctx.types.alloc(Type::Wildcard {
            inner: object,
            kind: BoundKind::Extends,
            bound: None,
        });
        let list_ext_object = list_of(&mut ctx, sym, extends_object);

        assert!(!is_subtype(&mut ctx, list_string, list_object));
        assert!(is_subtype(&mut ctx, list_string, list_ext_object));
        assert!(is_subtype(&mut ctx, list_string, list_string));
    }

    #[test]
    fn array_covariance_for_references_only() {
        let mut ctx = ctx();
        let string = ctx.symtab.string_type;
        let object = ctx.symtab.object_type;
        let string_arr = ctx.types.array_of(string);
        let object_arr = ctx.types.array_of(object);
        let int_arr = ctx.types.array_of(TypeId::INT);
        let long_arr = ctx.types.array_of(TypeId::LONG);
        assert!(is_subtype(&mut ctx, string_arr, object_arr));
        assert!(!is_subtype(&mut ctx, int_arr, long_arr));
        assert!(is_subtype(&mut ctx, string_arr, object));
    }

    #[test]
    fn capture_replaces_wildcards_with_bounded_variables() {
        let mut ctx = ctx();
        let (sym, _decl, _t) = generic_list(&mut ctx);
        let string = ctx.symtab.string_type;
        let extends_string = ctx.types.alloc(Type::Wildcard {
            inner: string,
            kind: BoundKind::Extends,
            bound: None,
        });
        let list_wild = list_of(&mut ctx, sym, extends_string);
        let captured = capture(&mut ctx, list_wild);
        assert_ne!(captured, list_wild);
        let arg = match ctx.types.get(captured) {
            Type::Class(c) => c.typarams[0],
            other => panic!("expected class, got {:?}", other),
        };
        assert!(ctx.types.is_captured(arg));
        match ctx.types.get(arg) {
            Type::TypeVar(tv) => {
                assert_ne!(tv.lower, TypeId::NONE);
                assert_eq!(tv.lower, TypeId::BOT);
                assert!(tv.wildcard.is_some());
            }
            other => panic!("expected type variable, got {:?}", other),
        }
        let upper = match ctx.types.get(arg) {
            Type::TypeVar(tv) => tv.upper,
            _ => unreachable!(),
        };
        assert!(is_subtype(&mut ctx, upper, string));
    }

    #[test]
    fn capture_is_identity_without_wildcards() {
        let mut ctx = ctx();
        let (sym, _decl, _t) = generic_list(&mut ctx);
        let string = ctx.symtab.string_type;
        let list_string = list_of(&mut ctx, sym, string);
        assert_eq!(capture(&mut ctx, list_string), list_string);
    }

    #[test]
    fn capture_is_stable() {
        let mut ctx = ctx();
        let (sym, _decl, _t) = generic_list(&mut ctx);
        let string = ctx.symtab.string_type;
        let extends_string = ctx.types.alloc(Type::Wildcard {
            inner: string,
            kind: BoundKind::Extends,
            bound: None,
        });
        let list_wild = list_of(&mut ctx, sym, extends_string);
        let once = capture(&mut ctx, list_wild);
        // Capturing the captured type changes nothing further.
        assert_eq!(capture(&mut ctx, once), once);
    }

    #[test]
    fn boxing_and_conversion() {
        let mut ctx = ctx();
        let integer = ctx.symtab.boxed_type(PrimTag::Int);
        assert_eq!(boxed(&ctx, TypeId::INT), integer);
        assert_eq!(unboxed(&ctx, integer), Some(TypeId::INT));
        assert!(is_convertible(&mut ctx, TypeId::INT, integer));
        assert!(is_convertible(&mut ctx, integer, TypeId::INT));
        let object = ctx.symtab.object_type;
        assert!(is_convertible(&mut ctx, TypeId::INT, object));
    }

    #[test]
    fn lub_of_related_classes_is_the_wider_one() {
        let mut ctx = ctx();
        let object = ctx.symtab.object_type;
        let string = ctx.symtab.string_type;
        assert_eq!(lub(&mut ctx, string, object), object);
        assert_eq!(lub(&mut ctx, object, string), object);
        assert_eq!(lub(&mut ctx, string, string), string);
    }

    #[test]
    fn descriptor_finds_single_abstract_method() {
        let mut ctx = ctx();
        let object = ctx.symtab.object_type;
        let (iface, iface_ty) = ctx.define_class("Fn", ctx.symtab.unnamed_package);
        ctx.set_supertype(iface, object);
        ctx.syms.get_mut(iface).flags |= Flags::INTERFACE;
        let string = ctx.symtab.string_type;
        let mty = ctx.types.alloc(Type::Method(MethodType {
            params: vec![TypeId::INT],
            res: string,
            thrown: vec![],
        }));
        let apply = ctx.names.intern("apply");
        let m = ctx.syms.alloc(crate::symbol::Symbol {
            kind: SymKind::Mth,
            name: apply,
            owner: iface,
            flags: Flags::PUBLIC | Flags::ABSTRACT,
            ty: mty,
            attrs: Vec::new(),
            detail: SymDetail::Method {
                params: vec![],
                default_value: None,
            },
            completer: crate::symbol::Completer::None,
        });
        ctx.enter_member(iface, m);
        let d = descriptor(&mut ctx, iface_ty).ok().unwrap();
        assert_eq!(d.sym, m);
        assert!(ctx.types.same_type(d.ty, mty));
    }

    #[test]
    fn descriptor_rejects_non_interfaces() {
        let mut ctx = ctx();
        let string = ctx.symtab.string_type;
        assert!(descriptor(&mut ctx, string).is_err());
    }
}
