use crate::context::Context;
use crate::types::ops::{self, subst};
use crate::types::{MethodType, Type, TypeId, UndetVar};

/// Inference-variable lifecycle. `Normal -> Throws` is the only allowed
/// transition; a variable born from a capture is `Captured` and stays so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndetVarState {
    Normal,
    Throws,
    Captured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceBound {
    Lower,
    Eq,
    Upper,
}

impl InferenceBound {
    pub fn complement(self) -> InferenceBound {
        match self {
            InferenceBound::Lower => InferenceBound::Upper,
            InferenceBound::Upper => InferenceBound::Lower,
            InferenceBound::Eq => InferenceBound::Eq,
        }
    }
}

/// A recorded bound change. Changes queue on the inference context and
/// are observed after the mutation that produced them has fully applied.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundEvent {
    pub undetvar: TypeId,
    pub kind: InferenceBound,
    pub bound: TypeId,
}

#[derive(Debug, Clone)]
pub struct InferenceError {
    pub undetvar: TypeId,
    pub key: &'static str,
}

/// Inference state for one generic method or diamond instantiation: one
/// `UndetVar` per quantified variable, plus the queued bound events and
/// the pre-8 capture fallback switch.
pub struct InferenceContext {
    pub undetvars: Vec<TypeId>,
    tvars: Vec<TypeId>,
    pub events: Vec<BoundEvent>,
    pub map_captures_to_bounds: bool,
}

impl InferenceContext {
    pub fn new(ctx: &mut Context, tvars: &[TypeId]) -> InferenceContext {
        let map_captures_to_bounds = !ctx
            .source_version
            .allows(crate::options::Feature::GraphInference);
        let mut undetvars = Vec::with_capacity(tvars.len());
        for tv in tvars {
            let state = if ctx.types.is_captured(*tv) {
                UndetVarState::Captured
            } else {
                UndetVarState::Normal
            };
            let uv = ctx.types.alloc(Type::UndetVar(UndetVar {
                qtype: *tv,
                lower: Vec::new(),
                eq: Vec::new(),
                upper: Vec::new(),
                inst: None,
                state,
            }));
            undetvars.push(uv);
        }
        InferenceContext {
            undetvars,
            tvars: tvars.to_vec(),
            events: Vec::new(),
            map_captures_to_bounds,
        }
    }

    pub fn undet_for(&self, ctx: &Context, tvar: TypeId) -> Option<TypeId> {
        self.undetvars
            .iter()
            .zip(&self.tvars)
            .find(|(_, tv)| ctx.types.same_type(**tv, tvar))
            .map(|(uv, _)| *uv)
    }

    fn read(&self, ctx: &Context, uv: TypeId) -> UndetVar {
        match ctx.types.get(uv) {
            Type::UndetVar(u) => u.clone(),
            other => panic!("not an inference variable: {:?}", other),
        }
    }

    /// Adds `bound` to `uv`'s list of `kind` bounds. The incoming bound is
    /// normalized through instantiated inference variables and the pre-8
    /// capture fallback; strict duplicates are dropped; a captured
    /// variable refuses bounds except from a fresh inference variable, in
    /// which case the complement bound propagates to that variable.
    /// Returns whether anything was recorded.
    pub fn add_bound(
        &mut self,
        ctx: &mut Context,
        uv: TypeId,
        kind: InferenceBound,
        bound: TypeId,
    ) -> bool {
        let mut bound = bound;
        // Normalize through the instantiation of other inference vars.
        while let Type::UndetVar(u) = ctx.types.get(bound) {
            match u.inst {
                Some(inst) => bound = inst,
                None => break,
            }
        }
        if self.map_captures_to_bounds {
            bound = map_captures(ctx, bound);
        }

        let state = self.read(ctx, uv).state;
        if state == UndetVarState::Captured {
            // Only a fresh (non-captured) inference variable may interact
            // with a captured one; the constraint flips direction.
            if let Type::UndetVar(other) = ctx.types.get(bound) {
                if other.state != UndetVarState::Captured {
                    let qtype = self.read(ctx, uv).qtype;
                    return self.add_bound(ctx, bound, kind.complement(), qtype);
                }
            }
            return false;
        }

        let current = self.read(ctx, uv);
        let list = match kind {
            InferenceBound::Lower => &current.lower,
            InferenceBound::Eq => &current.eq,
            InferenceBound::Upper => &current.upper,
        };
        if list.iter().any(|b| ctx.types.same_type(*b, bound)) {
            return false;
        }
        if let Type::UndetVar(u) = ctx.types.get_mut(uv) {
            match kind {
                InferenceBound::Lower => u.lower.push(bound),
                InferenceBound::Eq => u.eq.push(bound),
                InferenceBound::Upper => u.upper.push(bound),
            }
        }
        self.events.push(BoundEvent {
            undetvar: uv,
            kind,
            bound,
        });
        true
    }

    /// `Normal -> Throws`; fails on a captured variable (absorbing state).
    pub fn set_throws(&mut self, ctx: &mut Context, uv: TypeId) -> Result<(), ()> {
        match ctx.types.get_mut(uv) {
            Type::UndetVar(u) => {
                if u.state == UndetVarState::Captured {
                    return Err(());
                }
                u.state = UndetVarState::Throws;
                Ok(())
            }
            _ => Err(()),
        }
    }

    /// Rewrites `from -> to` across all bound lists of all variables.
    /// Change notifications are collected during the rewrite and fired
    /// (queued) only after every list has been updated, so observers see
    /// a consistent state.
    pub fn subst_bounds(&mut self, ctx: &mut Context, from: &[TypeId], to: &[TypeId]) {
        let mut pending = Vec::new();
        for &uv in &self.undetvars {
            let current = self.read(ctx, uv);
            for (kind, list) in [
                (InferenceBound::Lower, current.lower.clone()),
                (InferenceBound::Eq, current.eq.clone()),
                (InferenceBound::Upper, current.upper.clone()),
            ] {
                let rewritten: Vec<TypeId> =
                    list.iter().map(|b| subst(ctx, *b, from, to)).collect();
                for (old, new) in list.iter().zip(&rewritten) {
                    if old != new {
                        pending.push(BoundEvent {
                            undetvar: uv,
                            kind,
                            bound: *new,
                        });
                    }
                }
                if let Type::UndetVar(u) = ctx.types.get_mut(uv) {
                    match kind {
                        InferenceBound::Lower => u.lower = rewritten,
                        InferenceBound::Eq => u.eq = rewritten,
                        InferenceBound::Upper => u.upper = rewritten,
                    }
                }
            }
        }
        self.events.extend(pending);
    }

    /// Picks an instantiation for every variable: an equality bound if
    /// present, else the lub of the lower bounds, else the glb of the
    /// upper bounds. On failure the bounds are left exactly as they were
    /// when the failure was detected.
    pub fn solve(&mut self, ctx: &mut Context) -> Result<(), InferenceError> {
        for i in 0..self.undetvars.len() {
            let uv = self.undetvars[i];
            let current = self.read(ctx, uv);
            if current.inst.is_some() {
                continue;
            }
            let inst = if let Some(eq) = current.eq.first() {
                *eq
            } else if !current.lower.is_empty() {
                let mut acc = current.lower[0];
                for b in &current.lower[1..] {
                    acc = ops::lub(ctx, acc, *b);
                }
                acc
            } else if !current.upper.is_empty() {
                let mut acc = current.upper[0];
                for b in &current.upper[1..] {
                    acc = ops::glb(ctx, acc, *b);
                }
                acc
            } else {
                ctx.symtab.object_type
            };
            for upper in &current.upper {
                if !ops::is_subtype(ctx, inst, *upper) {
                    return Err(InferenceError {
                        undetvar: uv,
                        key: "compiler.misc.inferred.do.not.conform.to.upper.bounds",
                    });
                }
            }
            if let Type::UndetVar(u) = ctx.types.get_mut(uv) {
                u.inst = Some(inst);
            }
        }
        Ok(())
    }

    pub fn instantiations(&self, ctx: &Context) -> Vec<TypeId> {
        self.undetvars
            .iter()
            .map(|uv| {
                self.read(ctx, *uv)
                    .inst
                    .unwrap_or(ctx.symtab.object_type)
            })
            .collect()
    }

    /// Structural constraint generation: matches `formal` against
    /// `actual`, turning type-variable positions into bounds.
    pub fn constrain(
        &mut self,
        ctx: &mut Context,
        formal: TypeId,
        actual: TypeId,
        kind: InferenceBound,
    ) {
        if let Some(uv) = self.undet_for(ctx, formal) {
            self.add_bound(ctx, uv, kind, actual);
            return;
        }
        match (ctx.types.get(formal).clone(), ctx.types.get(actual).clone()) {
            (Type::Class(cf), Type::Class(ca)) if cf.sym == ca.sym => {
                for (f, a) in cf.typarams.iter().zip(&ca.typarams) {
                    self.constrain(ctx, *f, *a, InferenceBound::Eq);
                }
            }
            (Type::Array { elem: ef, .. }, Type::Array { elem: ea, .. }) => {
                self.constrain(ctx, ef, ea, InferenceBound::Eq);
            }
            _ => {}
        }
    }
}

/// The pre-8 fallback: a captured variable's lower bound is coerced up
/// when it has one, else its upper bound is coerced down.
pub fn map_captures(ctx: &mut Context, t: TypeId) -> TypeId {
    match ctx.types.get(t).clone() {
        Type::TypeVar(tv) if tv.wildcard.is_some() => {
            if tv.lower != TypeId::BOT {
                tv.lower
            } else {
                tv.upper
            }
        }
        Type::Class(c) => {
            let typarams: Vec<TypeId> = c
                .typarams
                .iter()
                .map(|a| map_captures(ctx, *a))
                .collect();
            if typarams == c.typarams {
                t
            } else {
                ctx.types.alloc(Type::Class(crate::types::ClassType {
                    outer: c.outer,
                    typarams,
                    sym: c.sym,
                    supertype: None,
                    interfaces: None,
                }))
            }
        }
        Type::Array { elem, varargs } => {
            let new_elem = map_captures(ctx, elem);
            if new_elem == elem {
                t
            } else {
                ctx.types.alloc(Type::Array {
                    elem: new_elem,
                    varargs,
                })
            }
        }
        _ => t,
    }
}

/// Whether `t` mentions any of `tvars`; a `ForAll` whose method type does
/// is only partially inferred and must be completed against a target.
pub fn mentions_tvars(ctx: &Context, t: TypeId, tvars: &[TypeId]) -> bool {
    if tvars.iter().any(|tv| ctx.types.same_type(*tv, t)) {
        return true;
    }
    match ctx.types.get(t) {
        Type::Class(c) => c.typarams.iter().any(|a| mentions_tvars(ctx, *a, tvars)),
        Type::Array { elem, .. } => mentions_tvars(ctx, *elem, tvars),
        Type::Method(m) => {
            m.params.iter().any(|p| mentions_tvars(ctx, *p, tvars))
                || mentions_tvars(ctx, m.res, tvars)
        }
        Type::Wildcard { inner, .. } => mentions_tvars(ctx, *inner, tvars),
        _ => false,
    }
}

/// Instantiates a generic method type against actual argument types and
/// an optional expected type, via fresh inference variables with bound
/// propagation.
pub fn instantiate_method(
    ctx: &mut Context,
    tvars: &[TypeId],
    qtype: TypeId,
    args: &[TypeId],
    target: Option<TypeId>,
) -> Result<TypeId, InferenceError> {
    let mut ic = InferenceContext::new(ctx, tvars);
    let mty = match ctx.types.get(qtype) {
        Type::Method(m) => m.clone(),
        _ => {
            return Ok(qtype);
        }
    };
    for (formal, actual) in mty.params.iter().zip(args) {
        ic.constrain(ctx, *formal, *actual, InferenceBound::Lower);
    }
    if let Some(pt) = target {
        if !matches!(ctx.types.get(pt), Type::Unknown | Type::Void) {
            ic.constrain(ctx, mty.res, pt, InferenceBound::Upper);
        }
    }
    ic.solve(ctx)?;
    let insts = ic.instantiations(ctx);
    let params: Vec<TypeId> = mty
        .params
        .iter()
        .map(|p| subst(ctx, *p, tvars, &insts))
        .collect();
    let res = subst(ctx, mty.res, tvars, &insts);
    let thrown: Vec<TypeId> = mty
        .thrown
        .iter()
        .map(|x| subst(ctx, *x, tvars, &insts))
        .collect();
    Ok(ctx.types.alloc(Type::Method(MethodType { params, res, thrown })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;
    use crate::options::Options;
    use crate::symbol::{Completer, SymDetail, SymId, SymKind, Symbol};
    use crate::types::TypeVarType;

    fn ctx() -> Context {
        Context::new(Options::new())
    }

    fn tvar(ctx: &mut Context, name: &str) -> TypeId {
        let upper = ctx.symtab.object_type;
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

    fn captured_tvar(ctx: &mut Context, name: &str) -> TypeId {
        let t = tvar(ctx, name);
        let wild = ctx.types.alloc(Type::Wildcard {
            inner: ctx.symtab.object_type,
            kind: crate::types::BoundKind::Unbound,
            bound: None,
        });
        if let Type::TypeVar(tv) = ctx.types.get_mut(t) {
            tv.wildcard = Some(wild);
        }
        t
    }

    #[test]
    fn adding_the_same_bound_twice_keeps_one() {
        let mut ctx = ctx();
        let t = tvar(&mut ctx, "T");
        let mut ic = InferenceContext::new(&mut ctx, &[t]);
        let uv = ic.undetvars[0];
        let string = ctx.symtab.string_type;
        assert!(ic.add_bound(&mut ctx, uv, InferenceBound::Lower, string));
        assert!(!ic.add_bound(&mut ctx, uv, InferenceBound::Lower, string));
        match ctx.types.get(uv) {
            Type::UndetVar(u) => assert_eq!(u.lower.len(), 1),
            _ => unreachable!(),
        }
        assert_eq!(ic.events.len(), 1);
    }

    #[test]
    fn set_throws_fails_on_captured() {
        let mut ctx = ctx();
        let cap = captured_tvar(&mut ctx, "C");
        let mut ic = InferenceContext::new(&mut ctx, &[cap]);
        let uv = ic.undetvars[0];
        assert!(ic.set_throws(&mut ctx, uv).is_err());
    }

    #[test]
    fn set_throws_transitions_normal() {
        let mut ctx = ctx();
        let t = tvar(&mut ctx, "T");
        let mut ic = InferenceContext::new(&mut ctx, &[t]);
        let uv = ic.undetvars[0];
        ic.set_throws(&mut ctx, uv).unwrap();
        match ctx.types.get(uv) {
            Type::UndetVar(u) => assert_eq!(u.state, UndetVarState::Throws),
            _ => unreachable!(),
        }
    }

    #[test]
    fn captured_variable_refuses_plain_bounds() {
        let mut ctx = ctx();
        let cap = captured_tvar(&mut ctx, "C");
        let mut ic = InferenceContext::new(&mut ctx, &[cap]);
        let uv = ic.undetvars[0];
        let string = ctx.symtab.string_type;
        assert!(!ic.add_bound(&mut ctx, uv, InferenceBound::Upper, string));
        match ctx.types.get(uv) {
            Type::UndetVar(u) => assert!(u.upper.is_empty()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn captured_variable_propagates_complement_to_fresh_variable() {
        let mut ctx = ctx();
        let cap = captured_tvar(&mut ctx, "C");
        let t = tvar(&mut ctx, "T");
        let mut ic = InferenceContext::new(&mut ctx, &[cap, t]);
        let cap_uv = ic.undetvars[0];
        let t_uv = ic.undetvars[1];
        assert!(ic.add_bound(&mut ctx, cap_uv, InferenceBound::Upper, t_uv));
        match ctx.types.get(t_uv) {
            Type::UndetVar(u) => {
                assert_eq!(u.lower.len(), 1);
                assert!(ctx.types.same_type(u.lower[0], cap));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn subst_bounds_fires_events_after_rewrite() {
        let mut ctx = ctx();
        let t = tvar(&mut ctx, "T");
        let s = tvar(&mut ctx, "S");
        let mut ic = InferenceContext::new(&mut ctx, &[t]);
        let uv = ic.undetvars[0];
        let s_arr = ctx.types.array_of(s);
        ic.add_bound(&mut ctx, uv, InferenceBound::Upper, s_arr);
        ic.events.clear();

        let string = ctx.symtab.string_type;
        ic.subst_bounds(&mut ctx, &[s], &[string]);
        assert_eq!(ic.events.len(), 1);
        let event = &ic.events[0];
        assert_eq!(event.kind, InferenceBound::Upper);
        match ctx.types.get(event.bound) {
            Type::Array { elem, .. } => assert!(ctx.types.same_type(*elem, string)),
            _ => panic!("expected rewritten array bound"),
        }
        match ctx.types.get(uv) {
            Type::UndetVar(u) => assert_eq!(u.upper[0], event.bound),
            _ => unreachable!(),
        }
    }

    #[test]
    fn solve_prefers_eq_then_lub_of_lowers() {
        let mut ctx = ctx();
        let t = tvar(&mut ctx, "T");
        let mut ic = InferenceContext::new(&mut ctx, &[t]);
        let uv = ic.undetvars[0];
        let string = ctx.symtab.string_type;
        let object = ctx.symtab.object_type;
        ic.add_bound(&mut ctx, uv, InferenceBound::Lower, string);
        ic.add_bound(&mut ctx, uv, InferenceBound::Lower, object);
        ic.solve(&mut ctx).unwrap();
        let inst = ic.instantiations(&ctx)[0];
        assert!(ctx.types.same_type(inst, object));
    }

    #[test]
    fn solve_reports_upper_bound_conflicts_and_keeps_bounds() {
        let mut ctx = ctx();
        let t = tvar(&mut ctx, "T");
        let mut ic = InferenceContext::new(&mut ctx, &[t]);
        let uv = ic.undetvars[0];
        let string = ctx.symtab.string_type;
        ic.add_bound(&mut ctx, uv, InferenceBound::Lower, TypeId::INT);
        ic.add_bound(&mut ctx, uv, InferenceBound::Upper, string);
        let err = ic.solve(&mut ctx).unwrap_err();
        assert_eq!(err.undetvar, uv);
        match ctx.types.get(uv) {
            Type::UndetVar(u) => {
                // Bounds stay inspectable after the failure.
                assert_eq!(u.lower.len(), 1);
                assert_eq!(u.upper.len(), 1);
                assert!(u.inst.is_none());
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn instantiate_method_from_argument_types() {
        let mut ctx = ctx();
        let t = tvar(&mut ctx, "T");
        let string = ctx.symtab.string_type;
        let qtype = ctx.types.alloc(Type::Method(MethodType {
            params: vec![t],
            res: t,
            thrown: vec![],
        }));
        let inst = instantiate_method(&mut ctx, &[t], qtype, &[string], None).unwrap();
        match ctx.types.get(inst) {
            Type::Method(m) => {
                assert!(ctx.types.same_type(m.res, string));
                assert!(ctx.types.same_type(m.params[0], string));
            }
            _ => panic!("expected method type"),
        }
    }

    #[test]
    fn instantiate_method_from_target_type() {
        let mut ctx = ctx();
        let t = tvar(&mut ctx, "T");
        let string = ctx.symtab.string_type;
        let qtype = ctx.types.alloc(Type::Method(MethodType {
            params: vec![],
            res: t,
            thrown: vec![],
        }));
        let inst = instantiate_method(&mut ctx, &[t], qtype, &[], Some(string)).unwrap();
        match ctx.types.get(inst) {
            Type::Method(m) => assert!(ctx.types.same_type(m.res, string)),
            _ => panic!("expected method type"),
        }
    }

    #[test]
    fn pre8_fallback_maps_captures_in_bounds() {
        let mut options = Options::new();
        options.put("--source", Some("7"));
        let mut ctx = Context::new(options);
        let t = tvar(&mut ctx, "T");
        let cap = captured_tvar(&mut ctx, "C");
        let string = ctx.symtab.string_type;
        if let Type::TypeVar(tv) = ctx.types.get_mut(cap) {
            tv.lower = string;
        }
        let mut ic = InferenceContext::new(&mut ctx, &[t]);
        assert!(ic.map_captures_to_bounds);
        let uv = ic.undetvars[0];
        ic.add_bound(&mut ctx, uv, InferenceBound::Lower, cap);
        match ctx.types.get(uv) {
            Type::UndetVar(u) => {
                // Lower bound of the capture coerced up.
                assert!(ctx.types.same_type(u.lower[0], string));
            }
            _ => unreachable!(),
        }
    }
}
