use std::cell::Cell;

use crate::tree::{Tree, TreeKind, TreePool};

/// Deep-copies a subtree for speculative attribution: positions and
/// symbol back-references carry over, resolved types reset, and side
/// tables (scopes, doc comments) stay with the original unit.
pub fn copy<'a>(pool: TreePool<'a>, t: &'a Tree<'a>) -> &'a Tree<'a> {
    let kind = match &t.kind {
        TreeKind::TopLevel { defs } => TreeKind::TopLevel {
            defs: copy_all(pool, defs),
        },
        TreeKind::Import {
            qualid,
            static_import,
        } => TreeKind::Import {
            qualid: copy(pool, qualid),
            static_import: *static_import,
        },
        TreeKind::ClassDef { name, defs, sym } => TreeKind::ClassDef {
            name: *name,
            defs: copy_all(pool, defs),
            sym: Cell::new(sym.get()),
        },
        TreeKind::MethodDef {
            name,
            restype,
            params,
            body,
            sym,
        } => TreeKind::MethodDef {
            name: *name,
            restype: restype.map(|r| copy(pool, r)),
            params: copy_all(pool, params),
            body: body.map(|b| copy(pool, b)),
            sym: Cell::new(sym.get()),
        },
        TreeKind::VarDef {
            name,
            vartype,
            init,
            sym,
        } => TreeKind::VarDef {
            name: *name,
            vartype: vartype.map(|v| copy(pool, v)),
            init: init.map(|i| copy(pool, i)),
            sym: Cell::new(sym.get()),
        },
        TreeKind::Block { stats } => TreeKind::Block {
            stats: copy_all(pool, stats),
        },
        TreeKind::If {
            cond,
            then_part,
            else_part,
        } => TreeKind::If {
            cond: copy(pool, cond),
            then_part: copy(pool, then_part),
            else_part: else_part.map(|e| copy(pool, e)),
        },
        TreeKind::Return { expr } => TreeKind::Return {
            expr: expr.map(|e| copy(pool, e)),
        },
        TreeKind::Exec { expr } => TreeKind::Exec {
            expr: copy(pool, expr),
        },
        TreeKind::Apply {
            typeargs,
            meth,
            args,
            poly,
        } => TreeKind::Apply {
            typeargs: copy_all(pool, typeargs),
            meth: copy(pool, meth),
            args: copy_all(pool, args),
            poly: Cell::new(poly.get()),
        },
        TreeKind::NewClass {
            clazz,
            args,
            diamond,
            poly,
        } => TreeKind::NewClass {
            clazz: copy(pool, clazz),
            args: copy_all(pool, args),
            diamond: *diamond,
            poly: Cell::new(poly.get()),
        },
        TreeKind::Lambda {
            params,
            body,
            body_kind,
            poly,
        } => TreeKind::Lambda {
            params: copy_all(pool, params),
            body: copy(pool, body),
            body_kind: *body_kind,
            poly: Cell::new(poly.get()),
        },
        TreeKind::Reference {
            mode,
            expr,
            name,
            typeargs,
            poly,
            overload,
        } => TreeKind::Reference {
            mode: *mode,
            expr: copy(pool, expr),
            name: *name,
            typeargs: copy_all(pool, typeargs),
            poly: Cell::new(poly.get()),
            overload: Cell::new(overload.get()),
        },
        TreeKind::Parens { expr } => TreeKind::Parens {
            expr: copy(pool, expr),
        },
        TreeKind::Conditional {
            cond,
            truepart,
            falsepart,
            poly,
        } => TreeKind::Conditional {
            cond: copy(pool, cond),
            truepart: copy(pool, truepart),
            falsepart: copy(pool, falsepart),
            poly: Cell::new(poly.get()),
        },
        TreeKind::Select {
            selected,
            name,
            sym,
        } => TreeKind::Select {
            selected: copy(pool, selected),
            name: *name,
            sym: Cell::new(sym.get()),
        },
        TreeKind::Ident { name, sym } => TreeKind::Ident {
            name: *name,
            sym: Cell::new(sym.get()),
        },
        TreeKind::Literal { value } => TreeKind::Literal {
            value: value.clone(),
        },
        TreeKind::Binary { op, lhs, rhs } => TreeKind::Binary {
            op: *op,
            lhs: copy(pool, lhs),
            rhs: copy(pool, rhs),
        },
        TreeKind::Unary { op, arg } => TreeKind::Unary {
            op: *op,
            arg: copy(pool, arg),
        },
        TreeKind::TypeApply { clazz, args } => TreeKind::TypeApply {
            clazz: copy(pool, clazz),
            args: copy_all(pool, args),
        },
        TreeKind::WildcardTree { kind, inner } => TreeKind::WildcardTree {
            kind: *kind,
            inner: inner.map(|i| copy(pool, i)),
        },
        TreeKind::ModuleDef { name, directives } => TreeKind::ModuleDef {
            name: copy(pool, name),
            directives: copy_all(pool, directives),
        },
        TreeKind::Requires {
            module,
            transitive,
            static_phase,
        } => TreeKind::Requires {
            module: copy(pool, module),
            transitive: *transitive,
            static_phase: *static_phase,
        },
        TreeKind::Exports { package, targets } => TreeKind::Exports {
            package: copy(pool, package),
            targets: targets.map(|t| copy_all(pool, t)),
        },
        TreeKind::Opens { package, targets } => TreeKind::Opens {
            package: copy(pool, package),
            targets: targets.map(|t| copy_all(pool, t)),
        },
        TreeKind::Uses { service } => TreeKind::Uses {
            service: copy(pool, service),
        },
        TreeKind::Provides { service, impls } => TreeKind::Provides {
            service: copy(pool, service),
            impls: copy_all(pool, impls),
        },
        TreeKind::Erroneous { errs } => TreeKind::Erroneous {
            errs: copy_all(pool, errs),
        },
    };
    pool.alloc(t.span, kind)
}

fn copy_all<'a>(pool: TreePool<'a>, trees: &'a [&'a Tree<'a>]) -> &'a [&'a Tree<'a>] {
    let copies: Vec<&'a Tree<'a>> = trees.iter().map(|t| copy(pool, t)).collect();
    pool.slice(copies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::intern::NameTable;
    use crate::source::Span;
    use crate::tree::TreeMaker;
    use crate::types::TypeId;

    #[test]
    fn copy_resets_types_and_keeps_positions() {
        let nodes = Arena::new();
        let refs = Arena::new();
        let pool = TreePool::new(&nodes, &refs);
        let maker = TreeMaker::new(pool);
        let mut names = NameTable::new();
        let x = names.intern("x");

        let id = maker.at(Span::new(3, 4)).ident(x);
        id.ty.set(Some(TypeId::INT));
        let par = maker.at(Span::new(2, 5)).parens(id);

        let copied = copy(pool, par);
        assert_eq!(copied.span, Span::new(2, 5));
        assert!(copied.ty.get().is_none());
        match &copied.kind {
            TreeKind::Parens { expr } => {
                assert_eq!(expr.span, Span::new(3, 4));
                assert!(expr.ty.get().is_none());
            }
            _ => panic!("copy changed the shape"),
        }
        // The original keeps its resolved type.
        assert_eq!(id.ty.get(), Some(TypeId::INT));
    }

    #[test]
    fn copy_preserves_symbol_back_references() {
        let nodes = Arena::new();
        let refs = Arena::new();
        let pool = TreePool::new(&nodes, &refs);
        let maker = TreeMaker::new(pool);
        let mut names = NameTable::new();
        let x = names.intern("x");

        let id = maker.ident(x);
        id.set_symbol(crate::symbol::SymId::NONE);
        let copied = copy(pool, id);
        assert_eq!(copied.symbol(), Some(crate::symbol::SymId::NONE));
    }
}
