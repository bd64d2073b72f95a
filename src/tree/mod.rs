pub mod copy;

use std::cell::Cell;

use crate::arena::Arena;
use crate::doctree::DocCommentTable;
use crate::intern::Name;
use crate::source::{EndPosTable, SourceId, Span};
use crate::symbol::SymId;
use crate::types::{Const, TypeId};

/// Closed node tag set; visitor dispatch is by tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    TopLevel,
    Import,
    ClassDef,
    MethodDef,
    VarDef,
    Block,
    If,
    Return,
    Exec,
    Apply,
    NewClass,
    Lambda,
    Reference,
    Parens,
    Conditional,
    Select,
    Ident,
    Literal,
    Binary,
    Unary,
    TypeApply,
    Wildcard,
    ModuleDef,
    Requires,
    Exports,
    Opens,
    Uses,
    Provides,
    Erroneous,
}

/// Poly-expression classification. A poly node's type depends on its
/// target; a standalone node types on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolyKind {
    Standalone,
    Poly,
}

/// Method-reference classification: whether the referenced name resolves
/// to more than one applicable member, which decides downstream whether
/// the reference must be re-probed per target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverloadKind {
    Overloaded,
    Unoverloaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefMode {
    Invoke,
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambdaBodyKind {
    Expression,
    Statement,
}

/// A syntax node. Nodes are arena-allocated and immutable except for the
/// attribution write-back slots (`ty`, symbol back-references, poly
/// marks), which live in cells.
pub struct Tree<'a> {
    pub span: Span,
    pub ty: Cell<Option<TypeId>>,
    pub kind: TreeKind<'a>,
}

pub enum TreeKind<'a> {
    TopLevel {
        defs: &'a [&'a Tree<'a>],
    },
    Import {
        qualid: &'a Tree<'a>,
        static_import: bool,
    },
    ClassDef {
        name: Name,
        defs: &'a [&'a Tree<'a>],
        sym: Cell<Option<SymId>>,
    },
    MethodDef {
        name: Name,
        restype: Option<&'a Tree<'a>>,
        params: &'a [&'a Tree<'a>],
        body: Option<&'a Tree<'a>>,
        sym: Cell<Option<SymId>>,
    },
    VarDef {
        name: Name,
        vartype: Option<&'a Tree<'a>>,
        init: Option<&'a Tree<'a>>,
        sym: Cell<Option<SymId>>,
    },
    Block {
        stats: &'a [&'a Tree<'a>],
    },
    If {
        cond: &'a Tree<'a>,
        then_part: &'a Tree<'a>,
        else_part: Option<&'a Tree<'a>>,
    },
    Return {
        expr: Option<&'a Tree<'a>>,
    },
    Exec {
        expr: &'a Tree<'a>,
    },
    Apply {
        typeargs: &'a [&'a Tree<'a>],
        meth: &'a Tree<'a>,
        args: &'a [&'a Tree<'a>],
        poly: Cell<PolyKind>,
    },
    NewClass {
        clazz: &'a Tree<'a>,
        args: &'a [&'a Tree<'a>],
        diamond: bool,
        poly: Cell<PolyKind>,
    },
    Lambda {
        params: &'a [&'a Tree<'a>],
        body: &'a Tree<'a>,
        body_kind: LambdaBodyKind,
        poly: Cell<PolyKind>,
    },
    Reference {
        mode: RefMode,
        expr: &'a Tree<'a>,
        name: Name,
        typeargs: &'a [&'a Tree<'a>],
        poly: Cell<PolyKind>,
        overload: Cell<OverloadKind>,
    },
    Parens {
        expr: &'a Tree<'a>,
    },
    Conditional {
        cond: &'a Tree<'a>,
        truepart: &'a Tree<'a>,
        falsepart: &'a Tree<'a>,
        poly: Cell<PolyKind>,
    },
    Select {
        selected: &'a Tree<'a>,
        name: Name,
        sym: Cell<Option<SymId>>,
    },
    Ident {
        name: Name,
        sym: Cell<Option<SymId>>,
    },
    Literal {
        value: Const,
    },
    Binary {
        op: OpKind,
        lhs: &'a Tree<'a>,
        rhs: &'a Tree<'a>,
    },
    Unary {
        op: OpKind,
        arg: &'a Tree<'a>,
    },
    TypeApply {
        clazz: &'a Tree<'a>,
        args: &'a [&'a Tree<'a>],
    },
    WildcardTree {
        kind: crate::types::BoundKind,
        inner: Option<&'a Tree<'a>>,
    },
    ModuleDef {
        name: &'a Tree<'a>,
        directives: &'a [&'a Tree<'a>],
    },
    Requires {
        module: &'a Tree<'a>,
        transitive: bool,
        static_phase: bool,
    },
    Exports {
        package: &'a Tree<'a>,
        targets: Option<&'a [&'a Tree<'a>]>,
    },
    Opens {
        package: &'a Tree<'a>,
        targets: Option<&'a [&'a Tree<'a>]>,
    },
    Uses {
        service: &'a Tree<'a>,
    },
    Provides {
        service: &'a Tree<'a>,
        impls: &'a [&'a Tree<'a>],
    },
    Erroneous {
        errs: &'a [&'a Tree<'a>],
    },
}

impl<'a> Tree<'a> {
    pub fn tag(&self) -> Tag {
        match &self.kind {
            TreeKind::TopLevel { .. } => Tag::TopLevel,
            TreeKind::Import { .. } => Tag::Import,
            TreeKind::ClassDef { .. } => Tag::ClassDef,
            TreeKind::MethodDef { .. } => Tag::MethodDef,
            TreeKind::VarDef { .. } => Tag::VarDef,
            TreeKind::Block { .. } => Tag::Block,
            TreeKind::If { .. } => Tag::If,
            TreeKind::Return { .. } => Tag::Return,
            TreeKind::Exec { .. } => Tag::Exec,
            TreeKind::Apply { .. } => Tag::Apply,
            TreeKind::NewClass { .. } => Tag::NewClass,
            TreeKind::Lambda { .. } => Tag::Lambda,
            TreeKind::Reference { .. } => Tag::Reference,
            TreeKind::Parens { .. } => Tag::Parens,
            TreeKind::Conditional { .. } => Tag::Conditional,
            TreeKind::Select { .. } => Tag::Select,
            TreeKind::Ident { .. } => Tag::Ident,
            TreeKind::Literal { .. } => Tag::Literal,
            TreeKind::Binary { .. } => Tag::Binary,
            TreeKind::Unary { .. } => Tag::Unary,
            TreeKind::TypeApply { .. } => Tag::TypeApply,
            TreeKind::WildcardTree { .. } => Tag::Wildcard,
            TreeKind::ModuleDef { .. } => Tag::ModuleDef,
            TreeKind::Requires { .. } => Tag::Requires,
            TreeKind::Exports { .. } => Tag::Exports,
            TreeKind::Opens { .. } => Tag::Opens,
            TreeKind::Uses { .. } => Tag::Uses,
            TreeKind::Provides { .. } => Tag::Provides,
            TreeKind::Erroneous { .. } => Tag::Erroneous,
        }
    }

    /// The poly/standalone mark of a poly-candidate node, if it is one.
    pub fn poly_kind(&self) -> Option<PolyKind> {
        match &self.kind {
            TreeKind::Apply { poly, .. }
            | TreeKind::NewClass { poly, .. }
            | TreeKind::Lambda { poly, .. }
            | TreeKind::Reference { poly, .. }
            | TreeKind::Conditional { poly, .. } => Some(poly.get()),
            _ => None,
        }
    }

    pub fn set_poly_kind(&self, kind: PolyKind) {
        match &self.kind {
            TreeKind::Apply { poly, .. }
            | TreeKind::NewClass { poly, .. }
            | TreeKind::Lambda { poly, .. }
            | TreeKind::Reference { poly, .. }
            | TreeKind::Conditional { poly, .. } => poly.set(kind),
            _ => {}
        }
    }

    pub fn overload_kind(&self) -> Option<OverloadKind> {
        match &self.kind {
            TreeKind::Reference { overload, .. } => Some(overload.get()),
            _ => None,
        }
    }

    /// An explicit lambda declares a type for every parameter (a
    /// zero-parameter lambda is trivially explicit).
    pub fn is_explicit_lambda(&self) -> bool {
        match &self.kind {
            TreeKind::Lambda { params, .. } => params
                .iter()
                .all(|p| matches!(&p.kind, TreeKind::VarDef { vartype: Some(_), .. })),
            _ => false,
        }
    }

    pub fn symbol(&self) -> Option<SymId> {
        match &self.kind {
            TreeKind::Ident { sym, .. }
            | TreeKind::Select { sym, .. }
            | TreeKind::ClassDef { sym, .. }
            | TreeKind::MethodDef { sym, .. }
            | TreeKind::VarDef { sym, .. } => sym.get(),
            _ => None,
        }
    }

    pub fn set_symbol(&self, id: SymId) {
        match &self.kind {
            TreeKind::Ident { sym, .. }
            | TreeKind::Select { sym, .. }
            | TreeKind::ClassDef { sym, .. }
            | TreeKind::MethodDef { sym, .. }
            | TreeKind::VarDef { sym, .. } => sym.set(Some(id)),
            _ => {}
        }
    }
}

/// One parsed file: the tree plus the side tables the copier never
/// duplicates.
pub struct CompilationUnit<'a> {
    pub tree: &'a Tree<'a>,
    pub source: SourceId,
    pub end_positions: EndPosTable,
    pub doc_comments: DocCommentTable,
}

/// The arenas a tree is built in: one for nodes, one for child-reference
/// slices.
#[derive(Clone, Copy)]
pub struct TreePool<'a> {
    pub nodes: &'a Arena<Tree<'a>>,
    pub refs: &'a Arena<&'a Tree<'a>>,
}

impl<'a> TreePool<'a> {
    pub fn new(nodes: &'a Arena<Tree<'a>>, refs: &'a Arena<&'a Tree<'a>>) -> Self {
        TreePool { nodes, refs }
    }

    pub fn alloc(&self, span: Span, kind: TreeKind<'a>) -> &'a Tree<'a> {
        self.nodes.alloc(Tree {
            span,
            ty: Cell::new(None),
            kind,
        })
    }

    pub fn slice<I>(&self, items: I) -> &'a [&'a Tree<'a>]
    where
        I: IntoIterator<Item = &'a Tree<'a>>,
        I::IntoIter: ExactSizeIterator,
    {
        self.refs.alloc_slice(items)
    }
}

/// Node factory with a position cursor, so construction sites read like
/// the grammar.
pub struct TreeMaker<'a> {
    pub pool: TreePool<'a>,
    span: Cell<Span>,
}

impl<'a> TreeMaker<'a> {
    pub fn new(pool: TreePool<'a>) -> Self {
        TreeMaker {
            pool,
            span: Cell::new(Span::none()),
        }
    }

    pub fn at(&self, span: Span) -> &Self {
        self.span.set(span);
        self
    }

    fn make(&self, kind: TreeKind<'a>) -> &'a Tree<'a> {
        self.pool.alloc(self.span.get(), kind)
    }

    pub fn ident(&self, name: Name) -> &'a Tree<'a> {
        self.make(TreeKind::Ident {
            name,
            sym: Cell::new(None),
        })
    }

    pub fn select(&self, selected: &'a Tree<'a>, name: Name) -> &'a Tree<'a> {
        self.make(TreeKind::Select {
            selected,
            name,
            sym: Cell::new(None),
        })
    }

    pub fn literal(&self, value: Const) -> &'a Tree<'a> {
        self.make(TreeKind::Literal { value })
    }

    pub fn parens(&self, expr: &'a Tree<'a>) -> &'a Tree<'a> {
        self.make(TreeKind::Parens { expr })
    }

    pub fn conditional(
        &self,
        cond: &'a Tree<'a>,
        truepart: &'a Tree<'a>,
        falsepart: &'a Tree<'a>,
    ) -> &'a Tree<'a> {
        self.make(TreeKind::Conditional {
            cond,
            truepart,
            falsepart,
            poly: Cell::new(PolyKind::Standalone),
        })
    }

    pub fn apply(&self, meth: &'a Tree<'a>, args: &'a [&'a Tree<'a>]) -> &'a Tree<'a> {
        self.make(TreeKind::Apply {
            typeargs: &[],
            meth,
            args,
            poly: Cell::new(PolyKind::Standalone),
        })
    }

    pub fn apply_with_typeargs(
        &self,
        typeargs: &'a [&'a Tree<'a>],
        meth: &'a Tree<'a>,
        args: &'a [&'a Tree<'a>],
    ) -> &'a Tree<'a> {
        self.make(TreeKind::Apply {
            typeargs,
            meth,
            args,
            poly: Cell::new(PolyKind::Standalone),
        })
    }

    pub fn new_class(
        &self,
        clazz: &'a Tree<'a>,
        args: &'a [&'a Tree<'a>],
        diamond: bool,
    ) -> &'a Tree<'a> {
        self.make(TreeKind::NewClass {
            clazz,
            args,
            diamond,
            poly: Cell::new(PolyKind::Standalone),
        })
    }

    pub fn lambda(
        &self,
        params: &'a [&'a Tree<'a>],
        body: &'a Tree<'a>,
        body_kind: LambdaBodyKind,
    ) -> &'a Tree<'a> {
        self.make(TreeKind::Lambda {
            params,
            body,
            body_kind,
            poly: Cell::new(PolyKind::Poly),
        })
    }

    pub fn reference(&self, mode: RefMode, expr: &'a Tree<'a>, name: Name) -> &'a Tree<'a> {
        self.make(TreeKind::Reference {
            mode,
            expr,
            name,
            typeargs: &[],
            poly: Cell::new(PolyKind::Poly),
            overload: Cell::new(OverloadKind::Unoverloaded),
        })
    }

    pub fn binary(&self, op: OpKind, lhs: &'a Tree<'a>, rhs: &'a Tree<'a>) -> &'a Tree<'a> {
        self.make(TreeKind::Binary { op, lhs, rhs })
    }

    pub fn unary(&self, op: OpKind, arg: &'a Tree<'a>) -> &'a Tree<'a> {
        self.make(TreeKind::Unary { op, arg })
    }

    pub fn block(&self, stats: &'a [&'a Tree<'a>]) -> &'a Tree<'a> {
        self.make(TreeKind::Block { stats })
    }

    pub fn ret(&self, expr: Option<&'a Tree<'a>>) -> &'a Tree<'a> {
        self.make(TreeKind::Return { expr })
    }

    pub fn exec(&self, expr: &'a Tree<'a>) -> &'a Tree<'a> {
        self.make(TreeKind::Exec { expr })
    }

    pub fn if_(
        &self,
        cond: &'a Tree<'a>,
        then_part: &'a Tree<'a>,
        else_part: Option<&'a Tree<'a>>,
    ) -> &'a Tree<'a> {
        self.make(TreeKind::If {
            cond,
            then_part,
            else_part,
        })
    }

    pub fn var_def(
        &self,
        name: Name,
        vartype: Option<&'a Tree<'a>>,
        init: Option<&'a Tree<'a>>,
    ) -> &'a Tree<'a> {
        self.make(TreeKind::VarDef {
            name,
            vartype,
            init,
            sym: Cell::new(None),
        })
    }

    pub fn method_def(
        &self,
        name: Name,
        restype: Option<&'a Tree<'a>>,
        params: &'a [&'a Tree<'a>],
        body: Option<&'a Tree<'a>>,
    ) -> &'a Tree<'a> {
        self.make(TreeKind::MethodDef {
            name,
            restype,
            params,
            body,
            sym: Cell::new(None),
        })
    }

    pub fn class_def(&self, name: Name, defs: &'a [&'a Tree<'a>]) -> &'a Tree<'a> {
        self.make(TreeKind::ClassDef {
            name,
            defs,
            sym: Cell::new(None),
        })
    }

    pub fn import(&self, qualid: &'a Tree<'a>, static_import: bool) -> &'a Tree<'a> {
        self.make(TreeKind::Import {
            qualid,
            static_import,
        })
    }

    pub fn type_apply(&self, clazz: &'a Tree<'a>, args: &'a [&'a Tree<'a>]) -> &'a Tree<'a> {
        self.make(TreeKind::TypeApply { clazz, args })
    }

    pub fn top_level(&self, defs: &'a [&'a Tree<'a>]) -> &'a Tree<'a> {
        self.make(TreeKind::TopLevel { defs })
    }

    pub fn module_def(
        &self,
        name: &'a Tree<'a>,
        directives: &'a [&'a Tree<'a>],
    ) -> &'a Tree<'a> {
        self.make(TreeKind::ModuleDef { name, directives })
    }

    pub fn requires(
        &self,
        module: &'a Tree<'a>,
        transitive: bool,
        static_phase: bool,
    ) -> &'a Tree<'a> {
        self.make(TreeKind::Requires {
            module,
            transitive,
            static_phase,
        })
    }

    pub fn exports(
        &self,
        package: &'a Tree<'a>,
        targets: Option<&'a [&'a Tree<'a>]>,
    ) -> &'a Tree<'a> {
        self.make(TreeKind::Exports { package, targets })
    }

    pub fn opens(
        &self,
        package: &'a Tree<'a>,
        targets: Option<&'a [&'a Tree<'a>]>,
    ) -> &'a Tree<'a> {
        self.make(TreeKind::Opens { package, targets })
    }

    pub fn uses(&self, service: &'a Tree<'a>) -> &'a Tree<'a> {
        self.make(TreeKind::Uses { service })
    }

    pub fn provides(&self, service: &'a Tree<'a>, impls: &'a [&'a Tree<'a>]) -> &'a Tree<'a> {
        self.make(TreeKind::Provides { service, impls })
    }

    pub fn erroneous(&self, errs: &'a [&'a Tree<'a>]) -> &'a Tree<'a> {
        self.make(TreeKind::Erroneous { errs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::NameTable;

    #[test]
    fn tags_match_shapes() {
        let nodes = Arena::new();
        let refs = Arena::new();
        let maker = TreeMaker::new(TreePool::new(&nodes, &refs));
        let mut names = NameTable::new();
        let x = names.intern("x");
        let id = maker.at(Span::new(0, 1)).ident(x);
        assert_eq!(id.tag(), Tag::Ident);
        let par = maker.parens(id);
        assert_eq!(par.tag(), Tag::Parens);
        assert_eq!(par.span, Span::new(0, 1));
    }

    #[test]
    fn poly_marks_default_and_update() {
        let nodes = Arena::new();
        let refs = Arena::new();
        let maker = TreeMaker::new(TreePool::new(&nodes, &refs));
        let mut names = NameTable::new();
        let x = names.intern("x");
        let a = maker.ident(x);
        let b = maker.ident(x);
        let c = maker.ident(x);
        let cond = maker.conditional(a, b, c);
        assert_eq!(cond.poly_kind(), Some(PolyKind::Standalone));
        cond.set_poly_kind(PolyKind::Poly);
        assert_eq!(cond.poly_kind(), Some(PolyKind::Poly));
        assert_eq!(a.poly_kind(), None);
    }

    #[test]
    fn explicit_lambda_requires_all_param_types() {
        let nodes = Arena::new();
        let refs = Arena::new();
        let pool = TreePool::new(&nodes, &refs);
        let maker = TreeMaker::new(pool);
        let mut names = NameTable::new();
        let x = names.intern("x");
        let int_name = names.intern("int");

        let typed = maker.var_def(x, Some(maker.ident(int_name)), None);
        let untyped = maker.var_def(x, None, None);
        let body = maker.ident(x);

        let explicit = maker.lambda(pool.slice([typed]), body, LambdaBodyKind::Expression);
        let implicit = maker.lambda(pool.slice([untyped]), body, LambdaBodyKind::Expression);
        assert!(explicit.is_explicit_lambda());
        assert!(!implicit.is_explicit_lambda());
    }
}
