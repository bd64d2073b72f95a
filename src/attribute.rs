use crate::intern::Name;
use crate::symbol::SymId;
use crate::types::{Const, TypeId};

/// Compile-time mirror of an annotation value. Class symbols carry a list
/// of these for their declaration annotations; method symbols additionally
/// carry one as their annotation-member default.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// A constant-valued element, e.g. `@SuppressWarnings("unchecked")`.
    Constant(Const),
    /// A class literal element, e.g. `@Target(String.class)`.
    Class(TypeId),
    /// An enum-constant element.
    Enum { ty: TypeId, name: Name },
    /// An array element; annotation arrays are flat and ordered.
    Array(Vec<Attribute>),
    /// A nested annotation.
    Compound(Compound),
    /// Produced when an annotation element could not be attributed.
    Error,
}

/// One annotation occurrence: the annotation type, its symbol, and the
/// explicit element/value pairs in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    pub ty: TypeId,
    pub sym: SymId,
    pub values: Vec<(Name, Attribute)>,
}

impl Compound {
    pub fn member(&self, name: Name) -> Option<&Attribute> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

impl Attribute {
    pub fn compound(&self) -> Option<&Compound> {
        match self {
            Attribute::Compound(c) => Some(c),
            _ => None,
        }
    }
}

/// Visitor over attribute shapes. Every `visit_*` defaults to the
/// catch-all `visit_attribute`, so implementations override only the
/// shapes they care about.
pub trait AttributeVisitor: Sized {
    fn visit_attribute(&mut self, _attr: &Attribute) {}

    fn visit_constant(&mut self, attr: &Attribute, _value: &Const) {
        self.visit_attribute(attr);
    }

    fn visit_class(&mut self, attr: &Attribute, _ty: TypeId) {
        self.visit_attribute(attr);
    }

    fn visit_enum(&mut self, attr: &Attribute, _ty: TypeId, _name: Name) {
        self.visit_attribute(attr);
    }

    fn visit_array(&mut self, attr: &Attribute, elems: &[Attribute]) {
        for elem in elems {
            dispatch(self, elem);
        }
        self.visit_attribute(attr);
    }

    fn visit_compound(&mut self, attr: &Attribute, compound: &Compound) {
        for (_, value) in &compound.values {
            dispatch(self, value);
        }
        self.visit_attribute(attr);
    }

    fn visit_error(&mut self, attr: &Attribute) {
        self.visit_attribute(attr);
    }
}

pub fn dispatch<V: AttributeVisitor>(v: &mut V, attr: &Attribute) {
    match attr {
        Attribute::Constant(c) => v.visit_constant(attr, c),
        Attribute::Class(ty) => v.visit_class(attr, *ty),
        Attribute::Enum { ty, name } => v.visit_enum(attr, *ty, *name),
        Attribute::Array(elems) => v.visit_array(attr, elems),
        Attribute::Compound(c) => v.visit_compound(attr, c),
        Attribute::Error => v.visit_error(attr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::NameTable;

    struct StringCollector {
        found: Vec<Name>,
    }

    impl AttributeVisitor for StringCollector {
        fn visit_constant(&mut self, _attr: &Attribute, value: &Const) {
            if let Const::String(name) = value {
                self.found.push(*name);
            }
        }
    }

    #[test]
    fn visitor_reaches_strings_nested_in_arrays() {
        let mut names = NameTable::new();
        let raw = names.intern("rawtypes");
        let unchecked = names.intern("unchecked");
        let attr = Attribute::Array(vec![
            Attribute::Constant(Const::String(raw)),
            Attribute::Array(vec![Attribute::Constant(Const::String(unchecked))]),
        ]);
        let mut collector = StringCollector { found: vec![] };
        dispatch(&mut collector, &attr);
        assert_eq!(collector.found, vec![raw, unchecked]);
    }

    #[test]
    fn compound_member_lookup() {
        let mut names = NameTable::new();
        let value = names.known.value;
        let other = names.intern("other");
        let compound = Compound {
            ty: TypeId::NONE,
            sym: SymId::NONE,
            values: vec![(value, Attribute::Constant(Const::Bool(true)))],
        };
        assert!(compound.member(value).is_some());
        assert!(compound.member(other).is_none());
    }
}
