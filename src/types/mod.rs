pub mod infer;
pub mod ops;
pub mod printer;

use crate::attribute::Attribute;
use crate::intern::Name;
use crate::symbol::SymId;

pub use infer::{InferenceBound, InferenceContext, UndetVarState};

/// Index of a type term in the per-context [`Types`] arena. Symbols and
/// types form a cyclic graph, so both sides reference each other by id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TypeId(u32);

impl TypeId {
    pub const NONE: TypeId = TypeId(0);
    pub const VOID: TypeId = TypeId(1);
    pub const BOT: TypeId = TypeId(2);
    pub const UNKNOWN: TypeId = TypeId(3);
    pub const BYTE: TypeId = TypeId(4);
    pub const CHAR: TypeId = TypeId(5);
    pub const SHORT: TypeId = TypeId(6);
    pub const INT: TypeId = TypeId(7);
    pub const LONG: TypeId = TypeId(8);
    pub const FLOAT: TypeId = TypeId(9);
    pub const DOUBLE: TypeId = TypeId(10);
    pub const BOOLEAN: TypeId = TypeId(11);
    pub const ERROR: TypeId = TypeId(12);
    /// Distinguished target installed during error recovery; checked by
    /// identity in the deferred-attribution paths.
    pub const RECOVERY: TypeId = TypeId(13);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Compile-time constant values, as carried by literals, constant
/// variables, and annotation elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Char(char),
    Short(i16),
    Byte(i8),
    String(Name),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimTag {
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
}

impl PrimTag {
    pub const ALL: &'static [PrimTag] = &[
        PrimTag::Byte,
        PrimTag::Char,
        PrimTag::Short,
        PrimTag::Int,
        PrimTag::Long,
        PrimTag::Float,
        PrimTag::Double,
        PrimTag::Boolean,
    ];
}

/// Discriminant used for visitor dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Void,
    Bot,
    None,
    Unknown,
    Error,
    Class,
    Intersection,
    Union,
    Array,
    Method,
    Package,
    Module,
    TypeVar,
    Wildcard,
    Forall,
    Undetvar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundKind {
    Extends,
    Super,
    Unbound,
}

/// A class or interface use. `supertype`/`interfaces` start out unset and
/// are filled when the owning symbol completes; consumers must treat the
/// unset state as unresolved, never as "no supertype".
#[derive(Debug, Clone, PartialEq)]
pub struct ClassType {
    pub outer: TypeId,
    pub typarams: Vec<TypeId>,
    pub sym: SymId,
    pub supertype: Option<TypeId>,
    pub interfaces: Option<Vec<TypeId>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodType {
    pub params: Vec<TypeId>,
    pub res: TypeId,
    pub thrown: Vec<TypeId>,
}

/// A type variable. A set `wildcard` marks a capture variable: its bounds
/// came from capture conversion and its `lower` is always meaningful
/// (bottom when the wildcard had no super bound).
#[derive(Debug, Clone, PartialEq)]
pub struct TypeVarType {
    pub sym: SymId,
    pub upper: TypeId,
    pub lower: TypeId,
    pub wildcard: Option<TypeId>,
}

/// An inference variable standing in for a `ForAll` type variable during
/// instantiation. Bound changes are queued as events on the owning
/// inference context rather than dispatched synchronously.
#[derive(Debug, Clone, PartialEq)]
pub struct UndetVar {
    pub qtype: TypeId,
    pub lower: Vec<TypeId>,
    pub eq: Vec<TypeId>,
    pub upper: Vec<TypeId>,
    pub inst: Option<TypeId>,
    pub state: UndetVarState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Primitive {
        tag: PrimTag,
        constant: Option<Const>,
    },
    Void,
    Bottom,
    None_,
    Unknown,
    Error {
        original: TypeId,
    },
    Class(ClassType),
    /// A class type whose bound list is explicit, e.g. `T extends A & B`.
    Intersection {
        components: Vec<TypeId>,
    },
    /// A multi-catch alternative list together with its least upper bound.
    Union {
        alternatives: Vec<TypeId>,
        lub: TypeId,
    },
    Array {
        elem: TypeId,
        varargs: bool,
    },
    Method(MethodType),
    Package {
        sym: SymId,
    },
    Module {
        sym: SymId,
    },
    TypeVar(TypeVarType),
    Wildcard {
        inner: TypeId,
        kind: BoundKind,
        bound: Option<SymId>,
    },
    ForAll {
        tvars: Vec<TypeId>,
        qtype: TypeId,
    },
    UndetVar(UndetVar),
}

impl Type {
    pub fn tag(&self) -> TypeTag {
        match self {
            Type::Primitive { tag, .. } => match tag {
                PrimTag::Byte => TypeTag::Byte,
                PrimTag::Char => TypeTag::Char,
                PrimTag::Short => TypeTag::Short,
                PrimTag::Int => TypeTag::Int,
                PrimTag::Long => TypeTag::Long,
                PrimTag::Float => TypeTag::Float,
                PrimTag::Double => TypeTag::Double,
                PrimTag::Boolean => TypeTag::Boolean,
            },
            Type::Void => TypeTag::Void,
            Type::Bottom => TypeTag::Bot,
            Type::None_ => TypeTag::None,
            Type::Unknown => TypeTag::Unknown,
            Type::Error { .. } => TypeTag::Error,
            Type::Class(_) => TypeTag::Class,
            Type::Intersection { .. } => TypeTag::Intersection,
            Type::Union { .. } => TypeTag::Union,
            Type::Array { .. } => TypeTag::Array,
            Type::Method(_) => TypeTag::Method,
            Type::Package { .. } => TypeTag::Package,
            Type::Module { .. } => TypeTag::Module,
            Type::TypeVar(_) => TypeTag::TypeVar,
            Type::Wildcard { .. } => TypeTag::Wildcard,
            Type::ForAll { .. } => TypeTag::Forall,
            Type::UndetVar(_) => TypeTag::Undetvar,
        }
    }
}

/// Immutable side metadata. At most one entry per kind lives on a type;
/// attaching metadata allocates a sibling id so the bare term keeps its
/// identity.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeMetadata {
    Annotations(Vec<Attribute>),
    ConstantValue(Const),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMetadataKind {
    Annotations,
    ConstantValue,
}

impl TypeMetadata {
    pub fn kind(&self) -> TypeMetadataKind {
        match self {
            TypeMetadata::Annotations(_) => TypeMetadataKind::Annotations,
            TypeMetadata::ConstantValue(_) => TypeMetadataKind::ConstantValue,
        }
    }
}

struct TypeEntry {
    ty: Type,
    metadata: Vec<TypeMetadata>,
    /// The metadata-free sibling this entry was derived from, if any.
    bare: Option<TypeId>,
}

/// Arena of type terms for one compilation context. The well-known
/// singletons ([`TypeId::INT`], [`TypeId::VOID`], …) are allocated at
/// fixed indices during construction.
pub struct Types {
    entries: Vec<TypeEntry>,
}

impl Types {
    pub fn new() -> Self {
        let mut types = Types { entries: Vec::new() };
        types.alloc(Type::None_);
        types.alloc(Type::Void);
        types.alloc(Type::Bottom);
        types.alloc(Type::Unknown);
        for tag in PrimTag::ALL {
            types.alloc(Type::Primitive {
                tag: *tag,
                constant: None,
            });
        }
        types.alloc(Type::Error {
            original: TypeId::NONE,
        });
        types.alloc(Type::Error {
            original: TypeId::NONE,
        });
        debug_assert_eq!(types.entries.len(), TypeId::RECOVERY.index() + 1);
        types
    }

    pub fn alloc(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.entries.len() as u32);
        self.entries.push(TypeEntry {
            ty,
            metadata: Vec::new(),
            bare: None,
        });
        id
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.entries[id.index()].ty
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.entries[id.index()].ty
    }

    pub fn tag(&self, id: TypeId) -> TypeTag {
        self.get(id).tag()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn primitive(&self, tag: PrimTag) -> TypeId {
        match tag {
            PrimTag::Byte => TypeId::BYTE,
            PrimTag::Char => TypeId::CHAR,
            PrimTag::Short => TypeId::SHORT,
            PrimTag::Int => TypeId::INT,
            PrimTag::Long => TypeId::LONG,
            PrimTag::Float => TypeId::FLOAT,
            PrimTag::Double => TypeId::DOUBLE,
            PrimTag::Boolean => TypeId::BOOLEAN,
        }
    }

    pub fn error_of(&mut self, original: TypeId) -> TypeId {
        self.alloc(Type::Error { original })
    }

    pub fn array_of(&mut self, elem: TypeId) -> TypeId {
        self.alloc(Type::Array {
            elem,
            varargs: false,
        })
    }

    pub fn metadata(&self, id: TypeId) -> &[TypeMetadata] {
        &self.entries[id.index()].metadata
    }

    /// Allocates a sibling of `id` carrying `item`, replacing any entry of
    /// the same kind. The original term is untouched.
    pub fn with_metadata(&mut self, id: TypeId, item: TypeMetadata) -> TypeId {
        let bare = self.entries[id.index()].bare.unwrap_or(id);
        let ty = self.entries[id.index()].ty.clone();
        let mut metadata: Vec<TypeMetadata> = self.entries[id.index()]
            .metadata
            .iter()
            .filter(|m| m.kind() != item.kind())
            .cloned()
            .collect();
        metadata.push(item);
        let new_id = TypeId(self.entries.len() as u32);
        self.entries.push(TypeEntry {
            ty,
            metadata,
            bare: Some(bare),
        });
        new_id
    }

    /// Identity on metadata-free types; otherwise the bare sibling.
    pub fn strip_metadata(&self, id: TypeId) -> TypeId {
        if self.entries[id.index()].metadata.is_empty() {
            id
        } else {
            self.entries[id.index()].bare.unwrap_or(id)
        }
    }

    pub fn is_error(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Error { .. })
    }

    pub fn is_primitive(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Primitive { .. })
    }

    pub fn is_reference(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            Type::Class(_)
                | Type::Array { .. }
                | Type::TypeVar(_)
                | Type::Intersection { .. }
                | Type::Union { .. }
                | Type::Bottom
        )
    }

    pub fn is_captured(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::TypeVar(tv) if tv.wildcard.is_some())
    }

    /// Structural equality. Constants and metadata are transparent;
    /// type variables and classes compare by symbol.
    pub fn same_type(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        let (a, b) = (self.strip_metadata(a), self.strip_metadata(b));
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Type::Primitive { tag: ta, .. }, Type::Primitive { tag: tb, .. }) => ta == tb,
            (Type::Void, Type::Void)
            | (Type::Bottom, Type::Bottom)
            | (Type::None_, Type::None_)
            | (Type::Unknown, Type::Unknown) => true,
            (Type::Class(ca), Type::Class(cb)) => {
                ca.sym == cb.sym
                    && ca.typarams.len() == cb.typarams.len()
                    && ca
                        .typarams
                        .iter()
                        .zip(&cb.typarams)
                        .all(|(x, y)| self.same_type(*x, *y))
                    && self.same_type(ca.outer, cb.outer)
            }
            (
                Type::Array { elem: ea, .. },
                Type::Array { elem: eb, .. },
            ) => self.same_type(*ea, *eb),
            (Type::Method(ma), Type::Method(mb)) => {
                ma.params.len() == mb.params.len()
                    && self.same_type(ma.res, mb.res)
                    && ma
                        .params
                        .iter()
                        .zip(&mb.params)
                        .all(|(x, y)| self.same_type(*x, *y))
            }
            (Type::TypeVar(ta), Type::TypeVar(tb)) => ta.sym == tb.sym,
            (
                Type::Wildcard {
                    inner: ia,
                    kind: ka,
                    ..
                },
                Type::Wildcard {
                    inner: ib,
                    kind: kb,
                    ..
                },
            ) => ka == kb && self.same_type(*ia, *ib),
            (Type::ForAll { tvars: va, qtype: qa }, Type::ForAll { tvars: vb, qtype: qb }) => {
                va == vb && self.same_type(*qa, *qb)
            }
            (Type::Package { sym: sa }, Type::Package { sym: sb }) => sa == sb,
            (Type::Module { sym: sa }, Type::Module { sym: sb }) => sa == sb,
            (Type::Intersection { components: xa }, Type::Intersection { components: xb }) => {
                xa.len() == xb.len()
                    && xa.iter().zip(xb).all(|(x, y)| self.same_type(*x, *y))
            }
            (Type::UndetVar(ua), Type::UndetVar(ub)) => ua.qtype == ub.qtype,
            _ => false,
        }
    }
}

impl Default for Types {
    fn default() -> Self {
        Self::new()
    }
}
