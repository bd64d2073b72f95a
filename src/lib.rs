//! Semantic core of a Java compiler front-end: trees, symbols, types,
//! scopes, and the speculative argument-attribution machinery behind
//! target-typed overload resolution. Parsing, file I/O, bytecode output,
//! and the driver loop live outside; this crate owns what happens between
//! a parsed tree and a typed one.

pub mod arena;
pub mod attr;
pub mod attribute;
pub mod context;
pub mod diag;
pub mod directive;
pub mod doctree;
pub mod flags;
pub mod intern;
pub mod lint;
pub mod options;
pub mod resolve;
pub mod scope;
pub mod source;
pub mod style;
pub mod symbol;
pub mod tree;
pub mod types;
pub mod visitor;

pub mod testing;

pub use arena::Arena;
pub use attr::{
    ArgNode, ArgumentCache, ArgumentKind, ArgumentType, Attributor, CheckMode, Env,
    LocalCacheContext, ResultInfo, UniquePos,
};
pub use attribute::{Attribute, Compound};
pub use context::{Context, Symtab};
pub use diag::{Diagnostic, Log, Severity};
pub use directive::{Directive, ExportsFlags, OpensFlags, RequiresFlags};
pub use doctree::{DocComment, DocCommentTable, DocTreeKind};
pub use flags::Flags;
pub use intern::{Name, NameTable};
pub use lint::{Lint, LintCategory};
pub use options::{ExitCode, Feature, Options, SourceVersion};
pub use resolve::{ResolutionPhase, ResolveErrorKind};
pub use scope::{
    CompoundScope, FilterImportScope, ImportFilter, NamedImportScope, ScopeListener,
    SingleEntryScope, StarImportScope, WriteableScope,
};
pub use source::{LineMap, Source, SourceId, Sources, Span, NOPOS};
pub use symbol::{CompletionFailure, KindSet, SymId, SymKind, Symbol, Symbols};
pub use tree::{
    CompilationUnit, LambdaBodyKind, OpKind, OverloadKind, PolyKind, RefMode, Tag, Tree,
    TreeKind, TreeMaker, TreePool,
};
pub use types::{
    BoundKind, ClassType, Const, MethodType, PrimTag, Type, TypeId, TypeTag, Types,
};
pub use visitor::{dispatch, walk_tree, TreeVisitor};
