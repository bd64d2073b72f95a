use crate::attr::deferred::LocalCacheContext;
use crate::attr::{Attributor, CheckMode, Env, ResultInfo};
use crate::intern::Name;
use crate::source::SourceId;
use crate::symbol::{KindSet, SymId, SymKind};
use crate::tree::{OverloadKind, PolyKind, Tree, TreeKind};
use crate::types::{infer, ops, Type, TypeId};
use crate::visitor::lambda_returns;

/// Identity of an argument position: source file plus character offset.
/// Two trees at the same position are the same argument being
/// re-attributed under an overload retry.
#[derive(Debug, Clone, Copy)]
pub struct UniquePos {
    pub source: SourceId,
    pub pos: usize,
    source_hash: u32,
}

impl UniquePos {
    pub fn new(source: SourceId, pos: usize, source_hash: u32) -> Self {
        UniquePos {
            source,
            pos,
            source_hash,
        }
    }
}

impl PartialEq for UniquePos {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.pos == other.pos
    }
}

impl Eq for UniquePos {}

impl std::hash::Hash for UniquePos {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        ((self.pos << 16).wrapping_add(self.source_hash as usize)).hash(state);
    }
}

/// The cached argument shapes. Anything else stays a plain deferred
/// argument, speculatively re-attributed per probe and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    Parens,
    Conditional,
    ExplicitLambda,
    ResolvedMethod,
    ResolvedConstructor,
}

/// What a speculative resolution round learned about an inner invocation
/// or diamond constructor, kept for per-target re-instantiation.
#[derive(Debug, Clone)]
pub struct ResolvedInfo {
    pub sym: SymId,
    pub tvars: Vec<TypeId>,
    pub qtype: TypeId,
    pub spec_args: Vec<TypeId>,
}

/// A cached deferred argument: the speculative tree produced by one
/// speculative attribution pass, plus the memoized answer per probed
/// target.
pub struct ArgumentType<'a> {
    pub kind: ArgumentKind,
    pub tree: &'a Tree<'a>,
    pub speculative: &'a Tree<'a>,
    pub resolved: Option<ResolvedInfo>,
    pub results: Vec<(ResultInfo, TypeId)>,
}

impl<'a> ArgumentType<'a> {
    pub fn cached_result(&self, ri: &ResultInfo) -> Option<TypeId> {
        self.results
            .iter()
            .find(|(key, _)| key == ri)
            .map(|(_, ty)| *ty)
    }
}

/// Insertion-ordered map `UniquePos -> ArgumentType`, living for one
/// deferred-attribution round.
#[derive(Default)]
pub struct ArgumentCache<'a> {
    entries: Vec<(UniquePos, ArgumentType<'a>)>,
}

impl<'a> ArgumentCache<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, pos: &UniquePos) -> Option<&ArgumentType<'a>> {
        self.entries.iter().find(|(p, _)| p == pos).map(|(_, a)| a)
    }

    pub fn get_mut(&mut self, pos: &UniquePos) -> Option<&mut ArgumentType<'a>> {
        self.entries
            .iter_mut()
            .find(|(p, _)| p == pos)
            .map(|(_, a)| a)
    }

    pub fn insert(&mut self, pos: UniquePos, at: ArgumentType<'a>) {
        self.entries.push((pos, at));
    }

    pub fn remove(&mut self, pos: &UniquePos) -> Option<ArgumentType<'a>> {
        let index = self.entries.iter().position(|(p, _)| p == pos)?;
        Some(self.entries.remove(index).1)
    }
}

/// An argument as seen by overload resolution: either a cached
/// `ArgumentType` or a plain deferred tree.
#[derive(Clone, Copy)]
pub enum ArgNode<'a> {
    Cached(UniquePos, &'a Tree<'a>),
    Plain(&'a Tree<'a>),
}

impl<'a> ArgNode<'a> {
    pub fn tree(&self) -> &'a Tree<'a> {
        match self {
            ArgNode::Cached(_, t) | ArgNode::Plain(t) => *t,
        }
    }
}

/// Dispatches an argument tree into its cached `ArgumentType` shape, or
/// leaves it as a plain deferred argument. Retried positions reuse the
/// cached entry without rebuilding the speculative tree.
pub fn classify_argument<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    env: &mut Env,
    t: &'a Tree<'a>,
) -> ArgNode<'a> {
    let kind = match &t.kind {
        TreeKind::Parens { .. } => Some(ArgumentKind::Parens),
        TreeKind::Conditional { .. } => Some(ArgumentKind::Conditional),
        TreeKind::Lambda { .. } if t.is_explicit_lambda() => Some(ArgumentKind::ExplicitLambda),
        TreeKind::Apply { typeargs, .. } if typeargs.is_empty() => {
            Some(ArgumentKind::ResolvedMethod)
        }
        TreeKind::NewClass { diamond: true, .. } => Some(ArgumentKind::ResolvedConstructor),
        TreeKind::Reference { expr, name, .. } => {
            let qual = {
                let mut guard = LocalCacheContext::enter(att);
                guard.attrib_receiver(env, expr)
            };
            classify_reference_overload(att, t, qual, *name);
            None
        }
        _ => None,
    };
    let Some(kind) = kind else {
        return ArgNode::Plain(t);
    };

    let pos = att.unique_pos(t);
    if att.arg_cache.get(&pos).is_some() {
        return ArgNode::Cached(pos, t);
    }

    let speculative = match kind {
        ArgumentKind::ExplicitLambda => speculate_lambda(att, env, t),
        _ => att.attrib_speculative(env, t, &ResultInfo::unknown()),
    };
    let resolved = match kind {
        ArgumentKind::ResolvedMethod => extract_resolved_method(att, speculative),
        ArgumentKind::ResolvedConstructor => extract_resolved_constructor(att, speculative),
        _ => None,
    };
    att.arg_cache.insert(
        pos,
        ArgumentType {
            kind,
            tree: t,
            speculative,
            resolved,
            results: Vec::new(),
        },
    );
    ArgNode::Cached(pos, t)
}

/// Speculative pass for an explicit lambda: parameter types come from
/// the source, the body types under no target. Return-compatibility is
/// left to the per-target probe.
fn speculate_lambda<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    env: &mut Env,
    t: &'a Tree<'a>,
) -> &'a Tree<'a> {
    let copied = crate::tree::copy::copy(att.pool, t);
    let TreeKind::Lambda { params, body, .. } = &copied.kind else {
        return copied;
    };
    let params: Vec<&'a Tree<'a>> = params.to_vec();
    let body: &'a Tree<'a> = body;
    att.speculative_depth += 1;
    {
        let mut guard = LocalCacheContext::enter(att);
        crate::attr::in_nested_scope(env, |env| {
            for p in &params {
                let TreeKind::VarDef { name, vartype, .. } = &p.kind else {
                    continue;
                };
                let declared = match vartype {
                    Some(vt) => guard.attrib_type(env, vt),
                    None => TypeId::UNKNOWN,
                };
                p.ty.set(Some(declared));
                let sym = guard.enter_var(env, *name, declared, p.span);
                p.set_symbol(sym);
            }
            guard.attrib_stats(env, body);
            for r in lambda_returns(body) {
                if r.ty.get().is_none() {
                    guard.attrib_expr(env, r, &ResultInfo::unknown());
                }
            }
        });
    }
    att.speculative_depth -= 1;
    copied
}

fn extract_resolved_method<'a>(
    att: &Attributor<'a, '_>,
    spec: &'a Tree<'a>,
) -> Option<ResolvedInfo> {
    let TreeKind::Apply { meth, args, .. } = &spec.kind else {
        return None;
    };
    let sym = meth.symbol()?;
    if att.ctx.syms.kind(sym) != SymKind::Mth {
        return None;
    }
    let declared = att.ctx.syms.type_of(sym);
    let (tvars, qtype) = match att.ctx.types.get(declared) {
        Type::ForAll { tvars, qtype } => (tvars.clone(), *qtype),
        _ => (Vec::new(), declared),
    };
    let spec_args = args
        .iter()
        .map(|a| a.ty.get().unwrap_or(TypeId::UNKNOWN))
        .collect();
    Some(ResolvedInfo {
        sym,
        tvars,
        qtype,
        spec_args,
    })
}

fn extract_resolved_constructor<'a>(
    att: &Attributor<'a, '_>,
    spec: &'a Tree<'a>,
) -> Option<ResolvedInfo> {
    let TreeKind::NewClass { clazz, args, .. } = &spec.kind else {
        return None;
    };
    let class_ty = clazz.ty.get()?;
    let sym = match att.ctx.types.get(class_ty) {
        Type::Class(c) => c.sym,
        _ => return None,
    };
    let decl = att.ctx.syms.type_of(sym);
    let tvars = match att.ctx.types.get(decl) {
        Type::Class(c) => c.typarams.clone(),
        _ => Vec::new(),
    };
    let spec_args = args
        .iter()
        .map(|a| a.ty.get().unwrap_or(TypeId::UNKNOWN))
        .collect();
    Some(ResolvedInfo {
        sym,
        tvars,
        qtype: decl,
        spec_args,
    })
}

/// Overload classification for a method reference: the reference is
/// `Overloaded` when the resolved member set is ambiguous by name, when
/// the member is generic or varargs, or when a raw static selector is
/// involved; else `Unoverloaded`.
pub fn classify_reference_overload<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    t: &'a Tree<'a>,
    qual: TypeId,
    name: Name,
) -> OverloadKind {
    let TreeKind::Reference { overload, .. } = &t.kind else {
        return OverloadKind::Unoverloaded;
    };
    let mut members = Vec::new();
    let mut class = att.ctx.class_sym_of(qual);
    while let Some(c) = class {
        let _ = att.ctx.complete(c);
        if let Some(scope) = att.ctx.syms.get(c).members() {
            let found = scope.find_all(&att.ctx.names, name);
            members.extend(
                found
                    .into_iter()
                    .filter(|m| att.ctx.syms.kind(*m) == SymKind::Mth),
            );
        }
        class = att.ctx.direct_supertypes(c).0;
    }

    let raw_qualifier = match att.ctx.types.get(qual) {
        Type::Class(c) => {
            c.typarams.is_empty() && {
                let decl = att.ctx.syms.type_of(c.sym);
                match att.ctx.types.get(decl) {
                    Type::Class(d) => !d.typarams.is_empty(),
                    _ => false,
                }
            }
        }
        _ => false,
    };

    let kind = if members.is_empty() {
        // A name that resolves to nothing is a resolution error the
        // downstream check re-probes per target.
        OverloadKind::Overloaded
    } else if members.len() > 1 {
        OverloadKind::Overloaded
    } else {
        let m = members[0];
        let generic = matches!(
            att.ctx.types.get(att.ctx.syms.type_of(m)),
            Type::ForAll { .. }
        );
        let varargs = att.ctx.syms.flags(m).is_varargs();
        let raw_static = raw_qualifier && att.ctx.syms.flags(m).is_static();
        if generic || varargs || raw_static {
            OverloadKind::Overloaded
        } else {
            OverloadKind::Unoverloaded
        }
    };
    overload.set(kind);
    kind
}

/// One overload probe (`overloadCheck`): evaluates a deferred argument
/// against a candidate target and memoizes the answer per target.
pub fn argument_check<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    env: &mut Env,
    node: &ArgNode<'a>,
    ri: &ResultInfo,
) -> TypeId {
    match node {
        ArgNode::Plain(t) => {
            let t = *t;
            if ri.pt == TypeId::RECOVERY {
                return att.attrib_expr(env, t, &ResultInfo::unknown());
            }
            let spec = att.attrib_speculative(env, t, ri);
            spec.ty.get().unwrap_or(TypeId::ERROR)
        }
        ArgNode::Cached(pos, orig) => {
            let orig = *orig;
            if ri.pt == TypeId::RECOVERY {
                // Error recovery skips the overload machinery entirely.
                return att.attrib_expr(env, orig, &ResultInfo::unknown());
            }
            if let Some(done) = att.arg_cache.get(pos).and_then(|at| at.cached_result(ri)) {
                return done;
            }
            let (kind, spec, resolved) = match att.arg_cache.get(pos) {
                Some(at) => (at.kind, at.speculative, at.resolved.clone()),
                None => {
                    // Not cached (e.g. a fresh local cache): degrade to a
                    // plain deferred probe.
                    return argument_check(att, env, &ArgNode::Plain(orig), ri);
                }
            };
            let result = match kind {
                ArgumentKind::Parens => {
                    let TreeKind::Parens { expr } = &spec.kind else {
                        unreachable!()
                    };
                    overload_check_tree(att, env, expr, ri)
                }
                ArgumentKind::Conditional => conditional_overload_check(att, env, spec, ri),
                ArgumentKind::ExplicitLambda => lambda_overload_check(att, env, spec, ri),
                ArgumentKind::ResolvedMethod | ArgumentKind::ResolvedConstructor => {
                    resolved_overload_check(att, spec, resolved, ri)
                }
            };
            if let Some(at) = att.arg_cache.get_mut(pos) {
                at.results.push((*ri, result));
            }
            result
        }
    }
}

/// Recursive probe over an already-speculated subtree.
fn overload_check_tree<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    env: &mut Env,
    t: &'a Tree<'a>,
    ri: &ResultInfo,
) -> TypeId {
    match &t.kind {
        TreeKind::Parens { expr } => overload_check_tree(att, env, expr, ri),
        TreeKind::Conditional { .. } => conditional_overload_check(att, env, t, ri),
        TreeKind::Lambda { .. } if t.is_explicit_lambda() => {
            lambda_overload_check(att, env, t, ri)
        }
        _ => {
            let found = t.ty.get().unwrap_or(TypeId::UNKNOWN);
            att.check_type(t.span, found, ri)
        }
    }
}

fn conditional_overload_check<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    env: &mut Env,
    spec: &'a Tree<'a>,
    ri: &ResultInfo,
) -> TypeId {
    let TreeKind::Conditional {
        truepart,
        falsepart,
        poly,
        ..
    } = &spec.kind
    else {
        unreachable!()
    };
    if poly.get() == PolyKind::Standalone {
        let found = spec.ty.get().unwrap_or(TypeId::UNKNOWN);
        return att.check_type(spec.span, found, ri);
    }
    if matches!(att.ctx.types.get(ri.pt), Type::Void) {
        // A poly conditional cannot fill a void target; this is a hard
        // error, not a mere applicability miss.
        let source = Some(att.source);
        att.ctx.log.error(
            source,
            spec.span,
            "compiler.err.conditional.target.cant.be.void",
            vec![],
        );
        return att.ctx.types.error_of(TypeId::VOID);
    }
    let branch_ri = ri.with_mode(CheckMode::Conditional);
    let tt = overload_check_tree(att, env, truepart, &branch_ri);
    let ft = overload_check_tree(att, env, falsepart, &branch_ri);
    if att.ctx.types.is_error(tt) {
        return tt;
    }
    if att.ctx.types.is_error(ft) {
        return ft;
    }
    ri.pt
}

fn lambda_overload_check<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    _env: &mut Env,
    spec: &'a Tree<'a>,
    ri: &ResultInfo,
) -> TypeId {
    let TreeKind::Lambda { params, body, .. } = &spec.kind else {
        unreachable!()
    };
    let desc = match ops::descriptor(att.ctx, ri.pt) {
        Ok(d) => d,
        Err(key) => {
            att.report_error(spec.span, key, vec![]);
            return att.ctx.types.error_of(ri.pt);
        }
    };
    let dty = match att.ctx.types.get(desc.ty) {
        Type::Method(m) => m.clone(),
        _ => return att.ctx.types.error_of(ri.pt),
    };
    if dty.params.len() != params.len() {
        att.report_error(
            spec.span,
            "compiler.err.incompatible.arg.types.in.lambda",
            vec![],
        );
        return att.ctx.types.error_of(ri.pt);
    }
    // Explicit parameter types must match the descriptor exactly.
    for (p, dp) in params.iter().zip(&dty.params) {
        let declared = p.ty.get().unwrap_or(TypeId::UNKNOWN);
        if !att.ctx.types.same_type(declared, *dp) {
            att.report_error(
                spec.span,
                "compiler.err.incompatible.arg.types.in.lambda",
                vec![],
            );
            return att.ctx.types.error_of(ri.pt);
        }
    }
    // Return compatibility under the descriptor's return target; a void
    // descriptor accepts whatever the returned expressions were.
    if !matches!(att.ctx.types.get(dty.res), Type::Void) {
        let ret_ri = ResultInfo {
            pkind: KindSet::VAL,
            pt: dty.res,
            mode: CheckMode::LambdaReturn,
        };
        for r in lambda_returns(body) {
            let rt = r.ty.get().unwrap_or(TypeId::UNKNOWN);
            let checked = att.check_type(r.span, rt, &ret_ri);
            if att.ctx.types.is_error(checked) {
                return att.ctx.types.error_of(ri.pt);
            }
        }
    }
    ri.pt
}

/// Probe for a speculatively resolved inner invocation or diamond
/// constructor: a partially inferred method type re-instantiates against
/// the probed target; anything else answers with its speculative type.
fn resolved_overload_check<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    spec: &'a Tree<'a>,
    resolved: Option<ResolvedInfo>,
    ri: &ResultInfo,
) -> TypeId {
    let Some(info) = resolved else {
        let found = spec.ty.get().unwrap_or(TypeId::UNKNOWN);
        return att.check_type(spec.span, found, ri);
    };
    let partially_inferred = !info.tvars.is_empty() && {
        let res = match att.ctx.types.get(info.qtype) {
            Type::Method(m) => m.res,
            _ => info.qtype,
        };
        infer::mentions_tvars(att.ctx, res, &info.tvars)
    };
    if !partially_inferred {
        let found = spec.ty.get().unwrap_or(TypeId::UNKNOWN);
        return att.check_type(spec.span, found, ri);
    }
    match att.ctx.types.get(info.qtype).clone() {
        Type::Method(_) => {
            match infer::instantiate_method(
                att.ctx,
                &info.tvars,
                info.qtype,
                &info.spec_args,
                Some(ri.pt),
            ) {
                Ok(inst) => {
                    let res = match att.ctx.types.get(inst) {
                        Type::Method(m) => m.res,
                        _ => inst,
                    };
                    att.check_type(spec.span, res, ri)
                }
                Err(e) => {
                    att.report_error(spec.span, e.key, vec![]);
                    att.ctx.types.error_of(ri.pt)
                }
            }
        }
        // Diamond: infer the class type arguments from the target.
        Type::Class(_) => {
            let mut ic = infer::InferenceContext::new(att.ctx, &info.tvars);
            ic.constrain(att.ctx, info.qtype, ri.pt, infer::InferenceBound::Eq);
            match ic.solve(att.ctx) {
                Ok(()) => {
                    let insts = ic.instantiations(att.ctx);
                    let inst_ty = ops::subst(att.ctx, info.qtype, &info.tvars, &insts);
                    att.check_type(spec.span, inst_ty, ri)
                }
                Err(e) => {
                    att.report_error(spec.span, e.key, vec![]);
                    att.ctx.types.error_of(ri.pt)
                }
            }
        }
        _ => {
            let found = spec.ty.get().unwrap_or(TypeId::UNKNOWN);
            att.check_type(spec.span, found, ri)
        }
    }
}

/// Deferred completion (the non-speculative finish): drops the cache
/// entry and runs the basic completer against the final target, writing
/// real types into the original tree.
pub fn finish_argument<'a, 'c>(
    att: &mut Attributor<'a, 'c>,
    env: &mut Env,
    node: &ArgNode<'a>,
    ri: &ResultInfo,
) -> TypeId {
    match node {
        ArgNode::Cached(pos, orig) => {
            att.arg_cache.remove(pos);
            att.attrib_expr(env, *orig, ri)
        }
        ArgNode::Plain(t) => att.attrib_expr(env, *t, ri),
    }
}
