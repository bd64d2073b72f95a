use crate::tree::{Tree, TreeKind};

/// Visitor over syntax trees. Every `visit_*` defaults to the catch-all
/// `visit_tree`, whose own default walks the children in source order, so
/// an implementation overrides exactly the shapes it cares about.
pub trait TreeVisitor<'a>: Sized {
    fn visit_tree(&mut self, t: &'a Tree<'a>) {
        walk_tree(self, t);
    }

    fn visit_ident(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_select(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_literal(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_parens(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_conditional(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_apply(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_new_class(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_lambda(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_reference(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_binary(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_unary(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_block(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_return(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_var_def(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_method_def(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_class_def(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_module_directive(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }

    fn visit_erroneous(&mut self, t: &'a Tree<'a>) {
        self.visit_tree(t);
    }
}

/// Dispatches on the node tag.
pub fn dispatch<'a, V: TreeVisitor<'a>>(v: &mut V, t: &'a Tree<'a>) {
    match &t.kind {
        TreeKind::Ident { .. } => v.visit_ident(t),
        TreeKind::Select { .. } => v.visit_select(t),
        TreeKind::Literal { .. } => v.visit_literal(t),
        TreeKind::Parens { .. } => v.visit_parens(t),
        TreeKind::Conditional { .. } => v.visit_conditional(t),
        TreeKind::Apply { .. } => v.visit_apply(t),
        TreeKind::NewClass { .. } => v.visit_new_class(t),
        TreeKind::Lambda { .. } => v.visit_lambda(t),
        TreeKind::Reference { .. } => v.visit_reference(t),
        TreeKind::Binary { .. } => v.visit_binary(t),
        TreeKind::Unary { .. } => v.visit_unary(t),
        TreeKind::Block { .. } => v.visit_block(t),
        TreeKind::Return { .. } => v.visit_return(t),
        TreeKind::VarDef { .. } => v.visit_var_def(t),
        TreeKind::MethodDef { .. } => v.visit_method_def(t),
        TreeKind::ClassDef { .. } => v.visit_class_def(t),
        TreeKind::Requires { .. }
        | TreeKind::Exports { .. }
        | TreeKind::Opens { .. }
        | TreeKind::Uses { .. }
        | TreeKind::Provides { .. } => v.visit_module_directive(t),
        TreeKind::Erroneous { .. } => v.visit_erroneous(t),
        _ => v.visit_tree(t),
    }
}

/// Walks children in source order.
pub fn walk_tree<'a, V: TreeVisitor<'a>>(v: &mut V, t: &'a Tree<'a>) {
    match &t.kind {
        TreeKind::TopLevel { defs } => {
            for d in *defs {
                dispatch(v, d);
            }
        }
        TreeKind::Import { qualid, .. } => dispatch(v, qualid),
        TreeKind::ClassDef { defs, .. } => {
            for d in *defs {
                dispatch(v, d);
            }
        }
        TreeKind::MethodDef {
            restype,
            params,
            body,
            ..
        } => {
            if let Some(r) = restype {
                dispatch(v, r);
            }
            for p in *params {
                dispatch(v, p);
            }
            if let Some(b) = body {
                dispatch(v, b);
            }
        }
        TreeKind::VarDef { vartype, init, .. } => {
            if let Some(vt) = vartype {
                dispatch(v, vt);
            }
            if let Some(i) = init {
                dispatch(v, i);
            }
        }
        TreeKind::Block { stats } => {
            for s in *stats {
                dispatch(v, s);
            }
        }
        TreeKind::If {
            cond,
            then_part,
            else_part,
        } => {
            dispatch(v, cond);
            dispatch(v, then_part);
            if let Some(e) = else_part {
                dispatch(v, e);
            }
        }
        TreeKind::Return { expr } => {
            if let Some(e) = expr {
                dispatch(v, e);
            }
        }
        TreeKind::Exec { expr } => dispatch(v, expr),
        TreeKind::Apply {
            typeargs,
            meth,
            args,
            ..
        } => {
            for ta in *typeargs {
                dispatch(v, ta);
            }
            dispatch(v, meth);
            for a in *args {
                dispatch(v, a);
            }
        }
        TreeKind::NewClass { clazz, args, .. } => {
            dispatch(v, clazz);
            for a in *args {
                dispatch(v, a);
            }
        }
        TreeKind::Lambda { params, body, .. } => {
            for p in *params {
                dispatch(v, p);
            }
            dispatch(v, body);
        }
        TreeKind::Reference { expr, typeargs, .. } => {
            dispatch(v, expr);
            for ta in *typeargs {
                dispatch(v, ta);
            }
        }
        TreeKind::Parens { expr } => dispatch(v, expr),
        TreeKind::Conditional {
            cond,
            truepart,
            falsepart,
            ..
        } => {
            dispatch(v, cond);
            dispatch(v, truepart);
            dispatch(v, falsepart);
        }
        TreeKind::Select { selected, .. } => dispatch(v, selected),
        TreeKind::Ident { .. } | TreeKind::Literal { .. } => {}
        TreeKind::Binary { lhs, rhs, .. } => {
            dispatch(v, lhs);
            dispatch(v, rhs);
        }
        TreeKind::Unary { arg, .. } => dispatch(v, arg),
        TreeKind::TypeApply { clazz, args } => {
            dispatch(v, clazz);
            for a in *args {
                dispatch(v, a);
            }
        }
        TreeKind::WildcardTree { inner, .. } => {
            if let Some(i) = inner {
                dispatch(v, i);
            }
        }
        TreeKind::ModuleDef { name, directives } => {
            dispatch(v, name);
            for d in *directives {
                dispatch(v, d);
            }
        }
        TreeKind::Requires { module, .. } => dispatch(v, module),
        TreeKind::Exports { package, targets } | TreeKind::Opens { package, targets } => {
            dispatch(v, package);
            if let Some(ts) = targets {
                for t in *ts {
                    dispatch(v, t);
                }
            }
        }
        TreeKind::Uses { service } => dispatch(v, service),
        TreeKind::Provides { service, impls } => {
            dispatch(v, service);
            for i in *impls {
                dispatch(v, i);
            }
        }
        TreeKind::Erroneous { errs } => {
            for e in *errs {
                dispatch(v, e);
            }
        }
    }
}

/// Collects the `return` expressions of a lambda body without descending
/// into nested lambdas; an expression body is the single result itself.
pub fn lambda_returns<'a>(body: &'a Tree<'a>) -> Vec<&'a Tree<'a>> {
    struct ReturnCollector<'a> {
        found: Vec<&'a Tree<'a>>,
    }

    impl<'a> TreeVisitor<'a> for ReturnCollector<'a> {
        fn visit_return(&mut self, t: &'a Tree<'a>) {
            if let TreeKind::Return { expr: Some(e) } = &t.kind {
                self.found.push(e);
            }
        }

        fn visit_lambda(&mut self, _t: &'a Tree<'a>) {
            // Nested lambda returns belong to the nested body.
        }
    }

    match &body.kind {
        TreeKind::Block { .. } => {
            let mut collector = ReturnCollector { found: Vec::new() };
            dispatch(&mut collector, body);
            collector.found
        }
        _ => vec![body],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::intern::NameTable;
    use crate::tree::{LambdaBodyKind, Tag, TreeMaker, TreePool};
    use crate::types::Const;

    struct TagCounter {
        idents: usize,
        total: usize,
    }

    impl<'a> TreeVisitor<'a> for TagCounter {
        fn visit_tree(&mut self, t: &'a Tree<'a>) {
            self.total += 1;
            walk_tree(self, t);
        }

        fn visit_ident(&mut self, t: &'a Tree<'a>) {
            self.idents += 1;
            self.visit_tree(t);
        }
    }

    #[test]
    fn default_arms_delegate_to_catch_all() {
        let nodes = Arena::new();
        let refs = Arena::new();
        let pool = TreePool::new(&nodes, &refs);
        let maker = TreeMaker::new(pool);
        let mut names = NameTable::new();
        let x = names.intern("x");
        let y = names.intern("y");

        let cond = maker.conditional(
            maker.literal(Const::Bool(true)),
            maker.ident(x),
            maker.ident(y),
        );
        let mut counter = TagCounter { idents: 0, total: 0 };
        dispatch(&mut counter, cond);
        assert_eq!(counter.idents, 2);
        // Conditional + literal + two idents all reach the catch-all.
        assert_eq!(counter.total, 4);
    }

    #[test]
    fn lambda_returns_of_expression_body() {
        let nodes = Arena::new();
        let refs = Arena::new();
        let pool = TreePool::new(&nodes, &refs);
        let maker = TreeMaker::new(pool);
        let mut names = NameTable::new();
        let x = names.intern("x");
        let body = maker.ident(x);
        let lambda = maker.lambda(pool.slice([]), body, LambdaBodyKind::Expression);
        match &lambda.kind {
            TreeKind::Lambda { body, .. } => {
                let rets = lambda_returns(body);
                assert_eq!(rets.len(), 1);
                assert_eq!(rets[0].tag(), Tag::Ident);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn lambda_returns_of_block_body_skips_nested_lambdas() {
        let nodes = Arena::new();
        let refs = Arena::new();
        let pool = TreePool::new(&nodes, &refs);
        let maker = TreeMaker::new(pool);
        let mut names = NameTable::new();
        let x = names.intern("x");

        let inner_body = maker.ident(x);
        let inner = maker.lambda(pool.slice([]), inner_body, LambdaBodyKind::Expression);
        let outer_ret = maker.ret(Some(inner));
        let spurious = maker.ret(Some(maker.ident(x)));
        let body = maker.block(pool.slice([outer_ret, spurious]));

        let rets = lambda_returns(body);
        assert_eq!(rets.len(), 2);
        assert_eq!(rets[0].tag(), Tag::Lambda);
    }
}
