use crate::attr::{argument, ArgNode, Attributor, CheckMode, DeferredAttrContext, Env, ResultInfo};
use crate::flags::Flags;
use crate::intern::Name;
use crate::source::Span;
use crate::symbol::{Completer, KindSet, SymDetail, SymId, SymKind, Symbol};
use crate::types::{infer, ops, Type, TypeId};

/// Overload resolution runs in up to three phases: strict invocation,
/// boxing/unboxing, and varargs expansion. A candidate disqualified in
/// one phase may survive a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionPhase {
    Basic,
    Box,
    Varargs,
}

impl ResolutionPhase {
    pub const ALL: &'static [ResolutionPhase] = &[
        ResolutionPhase::Basic,
        ResolutionPhase::Box,
        ResolutionPhase::Varargs,
    ];

    pub fn is_varargs(self) -> bool {
        self == ResolutionPhase::Varargs
    }
}

/// The specific way a lookup failed; becomes an `Err`-kinded symbol
/// carrying the candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveErrorKind {
    NotFound,
    Ambiguous,
    AccessDenied,
    StaticRequired,
    Abstract,
    Inaccessible,
}

impl ResolveErrorKind {
    pub fn key(self) -> &'static str {
        match self {
            ResolveErrorKind::NotFound => "compiler.err.cant.resolve.method",
            ResolveErrorKind::Ambiguous => "compiler.err.ref.ambiguous",
            ResolveErrorKind::AccessDenied => "compiler.err.report.access",
            ResolveErrorKind::StaticRequired => "compiler.err.non-static.cant.be.ref",
            ResolveErrorKind::Abstract => "compiler.err.abstract.cant.be.accessed.directly",
            ResolveErrorKind::Inaccessible => "compiler.err.not.def.access.class.intf.cant.access",
        }
    }
}

/// Creates the error symbol a failed lookup resolves to.
pub fn resolve_error<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    span: Span,
    name: Name,
    kind: ResolveErrorKind,
    candidates: Vec<SymId>,
) -> SymId {
    let arg = att.ctx.names.resolve(name).to_string();
    att.report_error(span, kind.key(), vec![arg]);
    att.ctx.syms.alloc(Symbol {
        kind: SymKind::Err,
        name,
        owner: SymId::NONE,
        flags: Flags::empty(),
        ty: TypeId::ERROR,
        attrs: Vec::new(),
        detail: SymDetail::Err { candidates },
        completer: Completer::None,
    })
}

fn collect_methods<'a, 'c>(att: &mut Attributor<'a, 'c>, site: TypeId, name: Name) -> Vec<SymId> {
    let mut out = Vec::new();
    let mut class = att.ctx.class_sym_of(site);
    while let Some(c) = class {
        let _ = att.ctx.complete(c);
        if let Some(members) = att.ctx.syms.get(c).members() {
            let found = members.find_all(&att.ctx.names, name);
            out.extend(
                found
                    .into_iter()
                    .filter(|m| att.ctx.syms.kind(*m) == SymKind::Mth),
            );
        }
        class = att.ctx.direct_supertypes(c).0;
    }
    out
}

/// The formal parameter list a candidate is probed against in a phase:
/// type variables are replaced by their upper bounds, and the varargs
/// phase expands the trailing array parameter to fit the call's arity.
fn probe_formals<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    m: SymId,
    nargs: usize,
    phase: ResolutionPhase,
) -> Option<Vec<TypeId>> {
    let declared = att.ctx.syms.type_of(m);
    let (tvars, qtype) = match att.ctx.types.get(declared) {
        Type::ForAll { tvars, qtype } => (tvars.clone(), *qtype),
        _ => (Vec::new(), declared),
    };
    let mut params = match att.ctx.types.get(qtype) {
        Type::Method(mt) => mt.params.clone(),
        _ => return None,
    };
    // Constructors of a generic class mention the class's variables too.
    let mut tvars = tvars;
    let owner = att.ctx.syms.get(m).owner;
    if owner != SymId::NONE {
        let owner_decl = att.ctx.syms.type_of(owner);
        if let Type::Class(c) = att.ctx.types.get(owner_decl) {
            tvars.extend(c.typarams.iter().copied());
        }
    }
    if !tvars.is_empty() {
        let uppers: Vec<TypeId> = tvars
            .iter()
            .map(|tv| match att.ctx.types.get(*tv) {
                Type::TypeVar(v) => v.upper,
                _ => att.ctx.symtab.object_type,
            })
            .collect();
        params = params
            .iter()
            .map(|p| ops::subst(att.ctx, *p, &tvars, &uppers))
            .collect();
    }

    let varargs = att.ctx.syms.flags(m).is_varargs();
    if phase.is_varargs() && varargs {
        if params.is_empty() || nargs + 1 < params.len() {
            return None;
        }
        let elem = match att.ctx.types.get(*params.last().unwrap()) {
            Type::Array { elem, .. } => *elem,
            _ => *params.last().unwrap(),
        };
        let mut expanded = params[..params.len() - 1].to_vec();
        while expanded.len() < nargs {
            expanded.push(elem);
        }
        return Some(expanded);
    }
    (params.len() == nargs).then_some(params)
}

fn is_applicable<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    env: &mut Env,
    m: SymId,
    args: &[ArgNode<'a>],
    phase: ResolutionPhase,
) -> bool {
    let Some(formals) = probe_formals(att, m, args.len(), phase) else {
        return false;
    };
    for (arg, formal) in args.iter().zip(&formals) {
        let ri = ResultInfo {
            pkind: KindSet::VAL,
            pt: *formal,
            mode: CheckMode::MethodArg(phase),
        };
        let answer = argument::argument_check(att, env, arg, &ri);
        if att.ctx.types.is_error(answer) {
            return false;
        }
    }
    true
}

/// `m1` is more specific than `m2` when every formal of `m1` would be
/// accepted where the corresponding formal of `m2` is expected.
fn more_specific<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    m1: SymId,
    m2: SymId,
    nargs: usize,
    phase: ResolutionPhase,
) -> bool {
    let (Some(f1), Some(f2)) = (
        probe_formals(att, m1, nargs, phase),
        probe_formals(att, m2, nargs, phase),
    ) else {
        return false;
    };
    f1.iter()
        .zip(&f2)
        .all(|(a, b)| ops::is_subtype(att.ctx, *a, *b))
}

/// Overload resolution: candidates are probed phase by phase in argument
/// order; an error answer disqualifies the candidate for that phase;
/// most-specific picks the winner among the survivors.
pub fn resolve_method<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    env: &mut Env,
    span: Span,
    site: TypeId,
    name: Name,
    args: &[ArgNode<'a>],
    _target: Option<TypeId>,
) -> SymId {
    let candidates = collect_methods(att, site, name);
    if candidates.is_empty() {
        return resolve_error(att, span, name, ResolveErrorKind::NotFound, candidates);
    }
    for &phase in ResolutionPhase::ALL {
        att.deferred_stack.push(DeferredAttrContext::speculative(phase));
        let applicable: Vec<SymId> = candidates
            .iter()
            .copied()
            .filter(|m| is_applicable(att, env, *m, args, phase))
            .collect();
        att.deferred_stack.pop();
        if applicable.is_empty() {
            continue;
        }
        let best = select_most_specific(att, &applicable, args.len(), phase);
        return match best {
            Some(winner) => check_access(att, env, span, name, winner),
            None => resolve_error(att, span, name, ResolveErrorKind::Ambiguous, applicable),
        };
    }
    resolve_error(att, span, name, ResolveErrorKind::NotFound, candidates)
}

fn select_most_specific<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    applicable: &[SymId],
    nargs: usize,
    phase: ResolutionPhase,
) -> Option<SymId> {
    if applicable.len() == 1 {
        return Some(applicable[0]);
    }
    'outer: for &m in applicable {
        for &other in applicable {
            if m != other && !more_specific(att, m, other, nargs, phase) {
                continue 'outer;
            }
        }
        return Some(m);
    }
    None
}

fn check_access<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    env: &mut Env,
    span: Span,
    name: Name,
    m: SymId,
) -> SymId {
    let flags = att.ctx.syms.flags(m);
    let owner = att.ctx.syms.get(m).owner;
    if flags.contains(Flags::PRIVATE) && owner != env.encl_class {
        return resolve_error(att, span, name, ResolveErrorKind::AccessDenied, vec![m]);
    }
    if env.static_context && !flags.is_static() {
        return resolve_error(att, span, name, ResolveErrorKind::StaticRequired, vec![m]);
    }
    m
}

/// The method type the winner is invoked at: generic methods instantiate
/// their inference variables from the argument types and the call's
/// target.
pub fn instantiated_type<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    args: &[ArgNode<'a>],
    env: &mut Env,
    msym: SymId,
    target: Option<TypeId>,
) -> TypeId {
    let declared = att.ctx.syms.type_of(msym);
    let (tvars, qtype) = match att.ctx.types.get(declared) {
        Type::ForAll { tvars, qtype } => (tvars.clone(), *qtype),
        _ => return declared,
    };
    let argtypes: Vec<TypeId> = args
        .iter()
        .map(|node| speculative_arg_type(att, env, node))
        .collect();
    match infer::instantiate_method(att.ctx, &tvars, qtype, &argtypes, target) {
        Ok(inst) => inst,
        Err(e) => {
            att.report_error(Span::none(), e.key, vec![]);
            att.ctx.types.error_of(qtype)
        }
    }
}

/// A standalone type for an argument, as inference input: cached
/// arguments answer with their speculative tree's type, plain ones are
/// speculated once against no target.
fn speculative_arg_type<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    env: &mut Env,
    node: &ArgNode<'a>,
) -> TypeId {
    match node {
        ArgNode::Cached(pos, orig) => match att.arg_cache.get(pos) {
            Some(at) => at.speculative.ty.get().unwrap_or(TypeId::UNKNOWN),
            None => {
                let spec = att.attrib_speculative(env, *orig, &ResultInfo::unknown());
                spec.ty.get().unwrap_or(TypeId::UNKNOWN)
            }
        },
        ArgNode::Plain(t) => {
            let spec = att.attrib_speculative(env, *t, &ResultInfo::unknown());
            spec.ty.get().unwrap_or(TypeId::UNKNOWN)
        }
    }
}

/// Constructor resolution for `new C(...)` and diamond `new C<>(...)`:
/// picks a constructor by probing arguments, then infers the class type
/// arguments from the target and argument types when the diamond form
/// asked for them. Returns the instantiated class type.
pub fn resolve_diamond<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    env: &mut Env,
    span: Span,
    class_ty: TypeId,
    args: &[ArgNode<'a>],
    diamond: bool,
    target: Option<TypeId>,
) -> TypeId {
    let Some(class_sym) = att.ctx.class_sym_of(class_ty) else {
        return att.ctx.types.error_of(class_ty);
    };
    let _ = att.ctx.complete(class_sym);
    let init = att.ctx.names.known.init;
    let ctors = collect_methods(att, att.ctx.syms.type_of(class_sym), init);

    let ctor = if ctors.is_empty() {
        // Implicit default constructor.
        if !args.is_empty() {
            return att
                .ctx
                .types
                .error_of(class_ty);
        }
        None
    } else {
        let mut chosen = None;
        for &phase in ResolutionPhase::ALL {
            att.deferred_stack.push(DeferredAttrContext::speculative(phase));
            let applicable: Vec<SymId> = ctors
                .iter()
                .copied()
                .filter(|c| is_applicable(att, env, *c, args, phase))
                .collect();
            att.deferred_stack.pop();
            if let Some(best) = select_most_specific(att, &applicable, args.len(), phase) {
                chosen = Some(best);
                break;
            }
        }
        match chosen {
            Some(c) => Some(c),
            None => {
                let name = att.ctx.syms.name(class_sym);
                resolve_error(att, span, name, ResolveErrorKind::NotFound, ctors);
                return att.ctx.types.error_of(class_ty);
            }
        }
    };

    if !diamond {
        return class_ty;
    }

    // Diamond inference over the class's type variables.
    let decl = att.ctx.syms.type_of(class_sym);
    let formals = match att.ctx.types.get(decl) {
        Type::Class(c) => c.typarams.clone(),
        _ => Vec::new(),
    };
    if formals.is_empty() {
        return class_ty;
    }
    let mut ic = infer::InferenceContext::new(att.ctx, &formals);
    if let Some(pt) = target {
        if !matches!(att.ctx.types.get(pt), Type::Unknown | Type::Void) {
            ic.constrain(att.ctx, decl, pt, infer::InferenceBound::Eq);
        }
    }
    if let Some(c) = ctor {
        let params = match att.ctx.types.get(att.ctx.syms.type_of(c)) {
            Type::Method(mt) => mt.params.clone(),
            _ => Vec::new(),
        };
        let argtypes: Vec<TypeId> = args
            .iter()
            .map(|node| speculative_arg_type(att, env, node))
            .collect();
        for (formal, actual) in params.iter().zip(&argtypes) {
            ic.constrain(att.ctx, *formal, *actual, infer::InferenceBound::Lower);
        }
    }
    match ic.solve(att.ctx) {
        Ok(()) => {
            let insts = ic.instantiations(att.ctx);
            ops::subst(att.ctx, decl, &formals, &insts)
        }
        Err(e) => {
            att.report_error(span, e.key, vec![]);
            att.ctx.types.error_of(class_ty)
        }
    }
}
