pub mod argument;
pub mod deferred;

use crate::context::Context;
use crate::intern::Name;
use crate::resolve::{self, ResolutionPhase};
use crate::scope::WriteableScope;
use crate::source::{SourceId, Span};
use crate::symbol::{Completer, KindSet, SymDetail, SymId, SymKind, Symbol};
use crate::tree::{LambdaBodyKind, OpKind, PolyKind, Tree, TreeKind, TreePool};
use crate::types::ops;
use crate::types::printer::TypePrinter;
use crate::types::{Const, MethodType, PrimTag, Type, TypeId};
use crate::visitor::lambda_returns;

pub use argument::{ArgNode, ArgumentCache, ArgumentKind, ArgumentType, UniquePos};
pub use deferred::{AttrMode, DeferredAttrContext, LocalCacheContext};

/// How a found type is checked against the expected one. Method-argument
/// probes carry their resolution phase, which decides whether boxing is
/// admissible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckMode {
    Basic,
    MethodArg(ResolutionPhase),
    Conditional,
    LambdaReturn,
}

/// The expected kind and type at one attribution point. Argument types
/// key their memoized probe answers by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultInfo {
    pub pkind: KindSet,
    pub pt: TypeId,
    pub mode: CheckMode,
}

impl ResultInfo {
    pub fn expect_value(pt: TypeId) -> ResultInfo {
        ResultInfo {
            pkind: KindSet::VAL,
            pt,
            mode: CheckMode::Basic,
        }
    }

    pub fn unknown() -> ResultInfo {
        ResultInfo {
            pkind: KindSet::VAL,
            pt: TypeId::UNKNOWN,
            mode: CheckMode::Basic,
        }
    }

    pub fn with_pt(&self, pt: TypeId) -> ResultInfo {
        ResultInfo { pt, ..*self }
    }

    pub fn with_mode(&self, mode: CheckMode) -> ResultInfo {
        ResultInfo { mode, ..*self }
    }
}

/// Attribution environment: the enclosing declarations plus the local
/// scope for block-structured bindings.
pub struct Env {
    pub encl_class: SymId,
    pub encl_method: Option<SymId>,
    pub static_context: bool,
    pub scope: WriteableScope,
}

impl Env {
    pub fn new(encl_class: SymId) -> Env {
        Env {
            encl_class,
            encl_method: None,
            static_context: false,
            scope: WriteableScope::new(encl_class),
        }
    }
}

/// Runs `f` with the env's scope dup'ed; the nested bindings are unwound
/// on the way out.
pub fn in_nested_scope<R>(env: &mut Env, f: impl FnOnce(&mut Env) -> R) -> R {
    let scope = std::mem::replace(&mut env.scope, WriteableScope::new(SymId::NONE));
    env.scope = scope.dup();
    let result = f(env);
    let child = std::mem::replace(&mut env.scope, WriteableScope::new(SymId::NONE));
    env.scope = child.leave();
    result
}

/// Walks trees computing and writing back types. One attributor drives
/// one compilation unit; the argument-type cache and speculative state
/// live here for the unit's lifetime.
pub struct Attributor<'a, 'c> {
    pub ctx: &'c mut Context,
    pub pool: TreePool<'a>,
    pub source: SourceId,
    pub arg_cache: ArgumentCache<'a>,
    pub deferred_stack: Vec<DeferredAttrContext>,
    speculative_depth: u32,
}

impl<'a, 'c> Attributor<'a, 'c> {
    pub fn new(ctx: &'c mut Context, pool: TreePool<'a>, source: SourceId) -> Self {
        Attributor {
            ctx,
            pool,
            source,
            arg_cache: ArgumentCache::new(),
            deferred_stack: Vec::new(),
            speculative_depth: 0,
        }
    }

    pub fn unique_pos(&self, t: &Tree<'a>) -> UniquePos {
        UniquePos::new(
            self.source,
            t.span.start,
            self.ctx.sources.get(self.source).hash,
        )
    }

    pub fn is_speculative(&self) -> bool {
        self.speculative_depth > 0
    }

    /// Reports unless probing speculatively; speculative failures only
    /// disqualify candidates.
    pub fn report_error(&mut self, span: Span, key: &'static str, args: Vec<String>) {
        let probing = matches!(
            self.deferred_stack.last(),
            Some(frame) if frame.mode == AttrMode::Speculative
        );
        if self.speculative_depth == 0 && !probing {
            let source = Some(self.source);
            self.ctx.log.error(source, span, key, args);
        }
    }

    fn print(&self, t: TypeId) -> String {
        TypePrinter::new(self.ctx).print(t)
    }

    /// Speculatively attributes a copy of `t` against `ri`: mutations are
    /// confined to a local cache, diagnostics are swallowed, and the copy
    /// is returned with its types filled in.
    pub fn attrib_speculative(
        &mut self,
        env: &mut Env,
        t: &'a Tree<'a>,
        ri: &ResultInfo,
    ) -> &'a Tree<'a> {
        let copied = crate::tree::copy::copy(self.pool, t);
        self.speculative_depth += 1;
        {
            let mut guard = deferred::LocalCacheContext::enter(self);
            guard.attrib_expr(env, copied, ri);
        }
        self.speculative_depth -= 1;
        copied
    }

    // ── Expression attribution ──────────────────────────────────────

    pub fn attrib_expr(&mut self, env: &mut Env, t: &'a Tree<'a>, ri: &ResultInfo) -> TypeId {
        match &t.kind {
            TreeKind::Literal { value } => {
                let owntype = self.literal_type(value);
                self.check(t, owntype, KindSet::VAL, ri)
            }
            TreeKind::Ident { name, sym } => {
                match self.resolve_ident(env, *name, ri.pkind) {
                    Some(found) => {
                        sym.set(Some(found));
                        let owntype = self.ctx.syms.type_of(found);
                        let ownkind = KindSet::of(self.ctx.syms.kind(found));
                        self.check(t, owntype, ownkind, ri)
                    }
                    None => {
                        let arg = self.ctx.names.resolve(*name).to_string();
                        self.report_error(
                            t.span,
                            "compiler.err.cant.resolve",
                            vec![arg],
                        );
                        let err = self.ctx.types.error_of(TypeId::NONE);
                        t.ty.set(Some(err));
                        err
                    }
                }
            }
            TreeKind::Select {
                selected,
                name,
                sym,
            } => {
                let site = self.attrib_receiver(env, selected);
                match self.find_member(site, *name, ri.pkind) {
                    Some(found) => {
                        sym.set(Some(found));
                        let owntype = self.ctx.syms.type_of(found);
                        let ownkind = KindSet::of(self.ctx.syms.kind(found));
                        self.check(t, owntype, ownkind, ri)
                    }
                    None => {
                        let arg = self.ctx.names.resolve(*name).to_string();
                        self.report_error(t.span, "compiler.err.cant.resolve", vec![arg]);
                        let err = self.ctx.types.error_of(site);
                        t.ty.set(Some(err));
                        err
                    }
                }
            }
            TreeKind::Parens { expr } => {
                let inner = self.attrib_expr(env, expr, ri);
                t.ty.set(Some(inner));
                inner
            }
            TreeKind::Binary { op, lhs, rhs } => {
                let lt = self.attrib_expr(env, lhs, &ResultInfo::unknown());
                let rt = self.attrib_expr(env, rhs, &ResultInfo::unknown());
                let owntype = self.binary_type(*op, lt, rt);
                self.check(t, owntype, KindSet::VAL, ri)
            }
            TreeKind::Unary { op, arg } => {
                let at = self.attrib_expr(env, arg, &ResultInfo::unknown());
                let owntype = match op {
                    OpKind::Not => TypeId::BOOLEAN,
                    _ => at,
                };
                self.check(t, owntype, KindSet::VAL, ri)
            }
            TreeKind::Conditional { .. } => self.attrib_conditional(env, t, ri),
            TreeKind::Lambda { .. } => self.attrib_lambda(env, t, ri),
            TreeKind::Reference { .. } => self.attrib_reference(env, t, ri),
            TreeKind::Apply { .. } => self.attrib_apply(env, t, ri),
            TreeKind::NewClass { .. } => self.attrib_new_class(env, t, ri),
            TreeKind::Erroneous { .. } => {
                let err = self.ctx.types.error_of(TypeId::NONE);
                t.ty.set(Some(err));
                err
            }
            _ => {
                let err = self.ctx.types.error_of(TypeId::NONE);
                t.ty.set(Some(err));
                err
            }
        }
    }

    fn literal_type(&mut self, value: &Const) -> TypeId {
        match value {
            Const::Int(v) => self.ctx.types.alloc(Type::Primitive {
                tag: PrimTag::Int,
                constant: Some(Const::Int(*v)),
            }),
            Const::Long(_) => TypeId::LONG,
            Const::Float(_) => TypeId::FLOAT,
            Const::Double(_) => TypeId::DOUBLE,
            Const::Bool(_) => TypeId::BOOLEAN,
            Const::Char(_) => TypeId::CHAR,
            Const::Short(_) => TypeId::SHORT,
            Const::Byte(_) => TypeId::BYTE,
            Const::String(_) => self.ctx.symtab.string_type,
        }
    }

    fn binary_type(&mut self, op: OpKind, lt: TypeId, rt: TypeId) -> TypeId {
        match op {
            OpKind::Eq | OpKind::Neq | OpKind::Lt | OpKind::Gt | OpKind::Le | OpKind::Ge
            | OpKind::And | OpKind::Or => TypeId::BOOLEAN,
            OpKind::Plus
                if self.ctx.types.same_type(lt, self.ctx.symtab.string_type)
                    || self.ctx.types.same_type(rt, self.ctx.symtab.string_type) =>
            {
                self.ctx.symtab.string_type
            }
            _ => self.numeric_promotion(lt, rt),
        }
    }

    fn numeric_promotion(&mut self, lt: TypeId, rt: TypeId) -> TypeId {
        for wide in [TypeId::DOUBLE, TypeId::FLOAT, TypeId::LONG] {
            if self.ctx.types.same_type(lt, wide) || self.ctx.types.same_type(rt, wide) {
                return wide;
            }
        }
        TypeId::INT
    }

    // ── Conditionals ────────────────────────────────────────────────

    fn attrib_conditional(&mut self, env: &mut Env, t: &'a Tree<'a>, ri: &ResultInfo) -> TypeId {
        let TreeKind::Conditional {
            cond,
            truepart,
            falsepart,
            poly,
        } = &t.kind
        else {
            unreachable!()
        };
        let bool_ri = ResultInfo::expect_value(TypeId::BOOLEAN);
        self.attrib_expr(env, cond, &bool_ri);

        let target_known = !matches!(self.ctx.types.get(ri.pt), Type::Unknown);
        if !target_known {
            // Standalone context: both branches type on their own and the
            // result is their least upper bound.
            let tt = self.attrib_expr(env, truepart, &ResultInfo::unknown());
            let ft = self.attrib_expr(env, falsepart, &ResultInfo::unknown());
            let standalone = self.branches_standalone(truepart, falsepart, tt, ft);
            poly.set(if standalone {
                PolyKind::Standalone
            } else {
                PolyKind::Poly
            });
            let owntype = ops::lub(self.ctx, tt, ft);
            t.ty.set(Some(owntype));
            return owntype;
        }

        poly.set(PolyKind::Poly);
        let branch_ri = ri.with_mode(CheckMode::Conditional);
        self.attrib_expr(env, truepart, &branch_ri);
        self.attrib_expr(env, falsepart, &branch_ri);
        t.ty.set(Some(ri.pt));
        ri.pt
    }

    fn branches_standalone(
        &self,
        truepart: &Tree<'a>,
        falsepart: &Tree<'a>,
        tt: TypeId,
        ft: TypeId,
    ) -> bool {
        if matches!(truepart.poly_kind(), Some(PolyKind::Poly))
            || matches!(falsepart.poly_kind(), Some(PolyKind::Poly))
        {
            return false;
        }
        let types = &self.ctx.types;
        (types.is_primitive(tt) && types.is_primitive(ft)) || types.same_type(tt, ft)
    }

    // ── Lambdas ─────────────────────────────────────────────────────

    fn attrib_lambda(&mut self, env: &mut Env, t: &'a Tree<'a>, ri: &ResultInfo) -> TypeId {
        let TreeKind::Lambda {
            params,
            body,
            body_kind,
            poly,
        } = &t.kind
        else {
            unreachable!()
        };
        poly.set(PolyKind::Poly);
        if matches!(self.ctx.types.get(ri.pt), Type::Unknown) {
            self.report_error(
                t.span,
                "compiler.err.unexpected.lambda",
                vec![],
            );
            let err = self.ctx.types.error_of(TypeId::NONE);
            t.ty.set(Some(err));
            return err;
        }
        let desc = match ops::descriptor(self.ctx, ri.pt) {
            Ok(d) => d,
            Err(key) => {
                let printed = self.print(ri.pt);
                self.report_error(t.span, key, vec![printed]);
                let err = self.ctx.types.error_of(ri.pt);
                t.ty.set(Some(err));
                return err;
            }
        };
        let dty = match self.ctx.types.get(desc.ty) {
            Type::Method(m) => m.clone(),
            _ => MethodType {
                params: vec![],
                res: TypeId::NONE,
                thrown: vec![],
            },
        };
        if dty.params.len() != params.len() {
            self.report_error(
                t.span,
                "compiler.err.incompatible.arg.types.in.lambda",
                vec![],
            );
            let err = self.ctx.types.error_of(ri.pt);
            t.ty.set(Some(err));
            return err;
        }

        let params: Vec<&'a Tree<'a>> = params.to_vec();
        let body: &'a Tree<'a> = body;
        let body_kind = *body_kind;
        let result = in_nested_scope(env, |env| {
            for (i, p) in params.iter().enumerate() {
                let TreeKind::VarDef { name, vartype, .. } = &p.kind else {
                    continue;
                };
                let declared = match vartype {
                    Some(vt) => self.attrib_type(env, vt),
                    None => dty.params[i],
                };
                p.ty.set(Some(declared));
                let vsym = self.enter_var(env, *name, declared, p.span);
                p.set_symbol(vsym);
            }
            let ret_ri = ResultInfo {
                pkind: KindSet::VAL,
                pt: dty.res,
                mode: CheckMode::LambdaReturn,
            };
            match body_kind {
                LambdaBodyKind::Expression => {
                    if matches!(self.ctx.types.get(dty.res), Type::Void) {
                        self.attrib_expr(env, body, &ResultInfo::unknown());
                    } else {
                        self.attrib_expr(env, body, &ret_ri);
                    }
                }
                LambdaBodyKind::Statement => {
                    self.attrib_stats(env, body);
                    if !matches!(self.ctx.types.get(dty.res), Type::Void) {
                        for r in lambda_returns(body) {
                            if r.ty.get().is_none() {
                                self.attrib_expr(env, r, &ret_ri);
                            }
                        }
                    }
                }
            }
            ri.pt
        });
        t.ty.set(Some(result));
        result
    }

    fn attrib_stats(&mut self, env: &mut Env, body: &'a Tree<'a>) {
        match &body.kind {
            TreeKind::Block { stats } => {
                for s in *stats {
                    self.attrib_stat(env, s);
                }
            }
            _ => self.attrib_stat(env, body),
        }
    }

    pub fn attrib_stat(&mut self, env: &mut Env, t: &'a Tree<'a>) {
        match &t.kind {
            TreeKind::VarDef {
                name,
                vartype,
                init,
                ..
            } => {
                let declared = match vartype {
                    Some(vt) => self.attrib_type(env, vt),
                    None => TypeId::NONE,
                };
                if let Some(i) = init {
                    let ri = if declared == TypeId::NONE {
                        ResultInfo::unknown()
                    } else {
                        ResultInfo::expect_value(declared)
                    };
                    self.attrib_expr(env, i, &ri);
                }
                let vty = if declared == TypeId::NONE {
                    init.and_then(|i| i.ty.get()).unwrap_or(TypeId::NONE)
                } else {
                    declared
                };
                t.ty.set(Some(vty));
                let vsym = self.enter_var(env, *name, vty, t.span);
                t.set_symbol(vsym);
            }
            TreeKind::Exec { expr } => {
                self.attrib_expr(env, expr, &ResultInfo::unknown());
            }
            TreeKind::Return { expr } => {
                if let Some(e) = expr {
                    if e.ty.get().is_none() {
                        self.attrib_expr(env, e, &ResultInfo::unknown());
                    }
                }
            }
            TreeKind::If {
                cond,
                then_part,
                else_part,
            } => {
                self.attrib_expr(env, cond, &ResultInfo::expect_value(TypeId::BOOLEAN));
                self.attrib_stat(env, then_part);
                if let Some(e) = else_part {
                    self.attrib_stat(env, e);
                }
            }
            TreeKind::Block { .. } => {
                let block: &'a Tree<'a> = t;
                in_nested_scope(env, |env| self.attrib_stats(env, block));
            }
            _ => {
                self.attrib_expr(env, t, &ResultInfo::unknown());
            }
        }
    }

    fn enter_var(&mut self, env: &mut Env, name: Name, ty: TypeId, span: Span) -> SymId {
        let sym = self.ctx.syms.alloc(Symbol {
            kind: SymKind::Var,
            name,
            owner: env.encl_method.unwrap_or(env.encl_class),
            flags: crate::flags::Flags::empty(),
            ty,
            attrs: Vec::new(),
            detail: SymDetail::Var {
                constant: None,
                pos: span,
            },
            completer: Completer::None,
        });
        let hash = self.ctx.names.hash(name);
        env.scope.enter_named(sym, name, hash);
        sym
    }

    // ── Method references ───────────────────────────────────────────

    fn attrib_reference(&mut self, env: &mut Env, t: &'a Tree<'a>, ri: &ResultInfo) -> TypeId {
        let TreeKind::Reference {
            expr, name, poly, ..
        } = &t.kind
        else {
            unreachable!()
        };
        poly.set(PolyKind::Poly);
        // The qualifier is attributed in a local-cache context so a
        // failed qualifier cannot poison the outer argument cache.
        let qual = {
            let mut guard = deferred::LocalCacheContext::enter(self);
            guard.attrib_receiver(env, expr)
        };
        argument::classify_reference_overload(self, t, qual, *name);

        if matches!(self.ctx.types.get(ri.pt), Type::Unknown) {
            self.report_error(t.span, "compiler.err.unexpected.mref", vec![]);
            let err = self.ctx.types.error_of(TypeId::NONE);
            t.ty.set(Some(err));
            return err;
        }
        match ops::descriptor(self.ctx, ri.pt) {
            Ok(_) => {
                t.ty.set(Some(ri.pt));
                ri.pt
            }
            Err(key) => {
                let printed = self.print(ri.pt);
                self.report_error(t.span, key, vec![printed]);
                let err = self.ctx.types.error_of(ri.pt);
                t.ty.set(Some(err));
                err
            }
        }
    }

    // ── Invocations ─────────────────────────────────────────────────

    fn attrib_apply(&mut self, env: &mut Env, t: &'a Tree<'a>, ri: &ResultInfo) -> TypeId {
        let TreeKind::Apply {
            meth, args, poly, ..
        } = &t.kind
        else {
            unreachable!()
        };
        poly.set(if matches!(self.ctx.types.get(ri.pt), Type::Unknown) {
            PolyKind::Standalone
        } else {
            PolyKind::Poly
        });

        let (site, name) = match &meth.kind {
            TreeKind::Ident { name, .. } => {
                let site = self.ctx.syms.type_of(env.encl_class);
                (site, *name)
            }
            TreeKind::Select { selected, name, .. } => {
                let site = self.attrib_receiver(env, selected);
                (site, *name)
            }
            _ => {
                let err = self.ctx.types.error_of(TypeId::NONE);
                t.ty.set(Some(err));
                return err;
            }
        };
        if self.ctx.types.is_error(site) {
            t.ty.set(Some(site));
            return site;
        }

        let arg_nodes: Vec<ArgNode<'a>> = args
            .iter()
            .map(|a| argument::classify_argument(self, env, a))
            .collect();

        let target = match self.ctx.types.get(ri.pt) {
            Type::Unknown => None,
            _ => Some(ri.pt),
        };
        let resolved = resolve::resolve_method(self, env, t.span, site, name, &arg_nodes, target);
        meth.set_symbol(resolved);
        if self.ctx.syms.is_error(resolved) {
            let err = self.ctx.types.error_of(TypeId::NONE);
            t.ty.set(Some(err));
            return err;
        }

        let mtype = resolve::instantiated_type(self, &arg_nodes, env, resolved, target);
        let restype = match self.ctx.types.get(mtype) {
            Type::Method(m) => m.res,
            _ => mtype,
        };
        let params = match self.ctx.types.get(mtype) {
            Type::Method(m) => m.params.clone(),
            _ => Vec::new(),
        };
        // Deferred completion: each cached argument is finished against
        // its final formal, writing real types into the original trees.
        if !self.is_speculative() {
            for (node, formal) in arg_nodes.iter().zip(params.iter()) {
                let final_ri = ResultInfo::expect_value(*formal);
                argument::finish_argument(self, env, node, &final_ri);
            }
        }
        self.check(t, restype, KindSet::VAL, ri)
    }

    fn attrib_new_class(&mut self, env: &mut Env, t: &'a Tree<'a>, ri: &ResultInfo) -> TypeId {
        let TreeKind::NewClass {
            clazz,
            args,
            diamond,
            poly,
        } = &t.kind
        else {
            unreachable!()
        };
        poly.set(if *diamond && !matches!(self.ctx.types.get(ri.pt), Type::Unknown) {
            PolyKind::Poly
        } else {
            PolyKind::Standalone
        });
        let class_ty = self.attrib_type(env, clazz);
        if self.ctx.types.is_error(class_ty) {
            t.ty.set(Some(class_ty));
            return class_ty;
        }
        let arg_nodes: Vec<ArgNode<'a>> = args
            .iter()
            .map(|a| argument::classify_argument(self, env, a))
            .collect();
        let target = match self.ctx.types.get(ri.pt) {
            Type::Unknown => None,
            _ => Some(ri.pt),
        };
        let owntype = resolve::resolve_diamond(self, env, t.span, class_ty, &arg_nodes, *diamond, target);
        self.check(t, owntype, KindSet::VAL, ri)
    }

    // ── Types and receivers ─────────────────────────────────────────

    /// Attributes a receiver position: a type name denotes its class
    /// type, anything else is an expression.
    pub fn attrib_receiver(&mut self, env: &mut Env, t: &'a Tree<'a>) -> TypeId {
        if let TreeKind::Ident { name, sym } = &t.kind {
            if let Some(found) = self.resolve_ident(env, *name, KindSet::TYP) {
                if self.ctx.syms.kind(found) == SymKind::Typ {
                    sym.set(Some(found));
                    let ty = self.ctx.syms.type_of(found);
                    t.ty.set(Some(ty));
                    return ty;
                }
            }
        }
        self.attrib_expr(env, t, &ResultInfo::unknown())
    }

    /// Attributes a type position.
    pub fn attrib_type(&mut self, env: &mut Env, t: &'a Tree<'a>) -> TypeId {
        match &t.kind {
            TreeKind::Ident { name, sym } => {
                let text = self.ctx.names.resolve(*name).to_string();
                let prim = match text.as_str() {
                    "byte" => Some(TypeId::BYTE),
                    "char" => Some(TypeId::CHAR),
                    "short" => Some(TypeId::SHORT),
                    "int" => Some(TypeId::INT),
                    "long" => Some(TypeId::LONG),
                    "float" => Some(TypeId::FLOAT),
                    "double" => Some(TypeId::DOUBLE),
                    "boolean" => Some(TypeId::BOOLEAN),
                    "void" => Some(TypeId::VOID),
                    _ => None,
                };
                if let Some(p) = prim {
                    t.ty.set(Some(p));
                    return p;
                }
                match self.resolve_ident(env, *name, KindSet::TYP) {
                    Some(found) if self.ctx.syms.kind(found) == SymKind::Typ => {
                        sym.set(Some(found));
                        let ty = self.ctx.syms.type_of(found);
                        t.ty.set(Some(ty));
                        ty
                    }
                    _ => {
                        self.report_error(t.span, "compiler.err.cant.resolve", vec![text]);
                        let err = self.ctx.types.error_of(TypeId::NONE);
                        t.ty.set(Some(err));
                        err
                    }
                }
            }
            TreeKind::TypeApply { clazz, args } => {
                let base = self.attrib_type(env, clazz);
                let targs: Vec<TypeId> = args.iter().map(|a| self.attrib_type(env, a)).collect();
                match self.ctx.types.get(base).clone() {
                    Type::Class(c) => {
                        let ty = self.ctx.types.alloc(Type::Class(crate::types::ClassType {
                            outer: c.outer,
                            typarams: targs,
                            sym: c.sym,
                            supertype: None,
                            interfaces: None,
                        }));
                        t.ty.set(Some(ty));
                        ty
                    }
                    _ => base,
                }
            }
            TreeKind::WildcardTree { kind, inner } => {
                let inner_ty = match inner {
                    Some(i) => self.attrib_type(env, i),
                    None => self.ctx.symtab.object_type,
                };
                let ty = self.ctx.types.alloc(Type::Wildcard {
                    inner: inner_ty,
                    kind: *kind,
                    bound: None,
                });
                t.ty.set(Some(ty));
                ty
            }
            _ => self.attrib_expr(env, t, &ResultInfo::unknown()),
        }
    }

    // ── Name resolution helpers ─────────────────────────────────────

    fn resolve_ident(&mut self, env: &Env, name: Name, pkind: KindSet) -> Option<SymId> {
        if let Some(found) = env.scope.find_first_matching(&self.ctx.names, name, |s| {
            pkind.intersects(KindSet::of(self.ctx.syms.kind(s)))
        }) {
            return Some(found);
        }
        let mut class = Some(env.encl_class);
        while let Some(c) = class {
            if let Some(found) = self.find_member_of(c, name, pkind) {
                return Some(found);
            }
            class = self.ctx.direct_supertypes(c).0;
        }
        let unnamed = self.ctx.symtab.unnamed_package;
        self.find_member_of(unnamed, name, pkind)
            .or_else(|| self.find_member_of(self.ctx.symtab.java_lang, name, pkind))
    }

    fn find_member_of(&mut self, owner: SymId, name: Name, pkind: KindSet) -> Option<SymId> {
        let _ = self.ctx.complete(owner);
        let names = &self.ctx.names;
        let members = self.ctx.syms.get(owner).members()?;
        let found = members.find_all(names, name);
        found
            .into_iter()
            .find(|s| pkind.intersects(KindSet::of(self.ctx.syms.kind(*s))))
    }

    /// Finds a member of `site`'s class, walking up the superclass chain.
    pub fn find_member(&mut self, site: TypeId, name: Name, pkind: KindSet) -> Option<SymId> {
        let mut class = self.ctx.class_sym_of(site);
        while let Some(c) = class {
            if let Some(found) = self.find_member_of(c, name, pkind) {
                return Some(found);
            }
            class = self.ctx.direct_supertypes(c).0;
        }
        None
    }

    // ── Checking ────────────────────────────────────────────────────

    /// The central found-vs-required check: sentinels flow through
    /// untouched, kind mismatches and incompatible types produce an error
    /// type, and the answer is written into the tree.
    pub fn check(
        &mut self,
        t: &Tree<'a>,
        owntype: TypeId,
        ownkind: KindSet,
        ri: &ResultInfo,
    ) -> TypeId {
        if self.ctx.types.is_error(owntype) || self.ctx.types.is_error(ri.pt) {
            t.ty.set(Some(owntype));
            return owntype;
        }
        if !ownkind.intersects(ri.pkind) {
            self.report_error(t.span, "compiler.err.unexpected.type", vec![]);
            let err = self.ctx.types.error_of(owntype);
            t.ty.set(Some(err));
            return err;
        }
        let result = self.check_type(t.span, owntype, ri);
        t.ty.set(Some(result));
        result
    }

    /// Like [`Attributor::check`] but for positions with no tree to write.
    pub fn check_type(&mut self, span: Span, found: TypeId, ri: &ResultInfo) -> TypeId {
        if self.ctx.types.is_error(found) || self.ctx.types.is_error(ri.pt) {
            return found;
        }
        let compatible = match self.ctx.types.get(ri.pt) {
            Type::Unknown | Type::None_ => true,
            Type::Void => matches!(self.ctx.types.get(found), Type::Void),
            _ => match ri.mode {
                CheckMode::MethodArg(ResolutionPhase::Basic) => {
                    ops::is_subtype(self.ctx, found, ri.pt)
                }
                _ => ops::is_convertible(self.ctx, found, ri.pt),
            },
        };
        if compatible {
            found
        } else {
            let found_str = self.print(found);
            let req_str = self.print(ri.pt);
            self.report_error(
                span,
                "compiler.err.prob.found.req",
                vec![found_str, req_str],
            );
            self.ctx.types.error_of(found)
        }
    }
}
