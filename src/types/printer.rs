use crate::context::Context;
use crate::types::{BoundKind, Const, PrimTag, Type, TypeId};

/// Renders types for diagnostic arguments. Output mirrors source syntax:
/// `List<String>`, `int[]`, `? extends Number`, `capture#1 of ?`.
pub struct TypePrinter<'c> {
    ctx: &'c Context,
}

impl<'c> TypePrinter<'c> {
    pub fn new(ctx: &'c Context) -> Self {
        TypePrinter { ctx }
    }

    pub fn print(&self, t: TypeId) -> String {
        match self.ctx.types.get(t) {
            Type::Primitive { tag, .. } => match tag {
                PrimTag::Byte => "byte".into(),
                PrimTag::Char => "char".into(),
                PrimTag::Short => "short".into(),
                PrimTag::Int => "int".into(),
                PrimTag::Long => "long".into(),
                PrimTag::Float => "float".into(),
                PrimTag::Double => "double".into(),
                PrimTag::Boolean => "boolean".into(),
            },
            Type::Void => "void".into(),
            Type::Bottom => "<null>".into(),
            Type::None_ => "<none>".into(),
            Type::Unknown => "<any>".into(),
            Type::Error { .. } => "<error>".into(),
            Type::Class(c) => {
                let name = self.ctx.names.resolve(self.ctx.syms.name(c.sym));
                if c.typarams.is_empty() {
                    name.to_string()
                } else {
                    let args: Vec<String> =
                        c.typarams.iter().map(|a| self.print(*a)).collect();
                    format!("{}<{}>", name, args.join(","))
                }
            }
            Type::Intersection { components } => components
                .iter()
                .map(|c| self.print(*c))
                .collect::<Vec<_>>()
                .join(" & "),
            Type::Union { alternatives, .. } => alternatives
                .iter()
                .map(|a| self.print(*a))
                .collect::<Vec<_>>()
                .join(" | "),
            Type::Array { elem, varargs } => {
                let inner = self.print(*elem);
                if *varargs {
                    format!("{}...", inner)
                } else {
                    format!("{}[]", inner)
                }
            }
            Type::Method(m) => {
                let params: Vec<String> = m.params.iter().map(|p| self.print(*p)).collect();
                format!("({}){}", params.join(","), self.print(m.res))
            }
            Type::Package { sym } | Type::Module { sym } => {
                self.ctx.names.resolve(self.ctx.syms.name(*sym)).to_string()
            }
            Type::TypeVar(tv) => {
                let name = self.ctx.names.resolve(self.ctx.syms.name(tv.sym));
                match tv.wildcard {
                    Some(w) => format!("{} of {}", name, self.print(w)),
                    None => name.to_string(),
                }
            }
            Type::Wildcard { inner, kind, .. } => match kind {
                BoundKind::Unbound => "?".into(),
                BoundKind::Extends => format!("? extends {}", self.print(*inner)),
                BoundKind::Super => format!("? super {}", self.print(*inner)),
            },
            Type::ForAll { tvars, qtype } => {
                let vars: Vec<String> = tvars.iter().map(|v| self.print(*v)).collect();
                format!("<{}>{}", vars.join(","), self.print(*qtype))
            }
            Type::UndetVar(uv) => match uv.inst {
                Some(inst) => self.print(inst),
                None => format!("{}?", self.print(uv.qtype)),
            },
        }
    }

    pub fn print_const(&self, c: &Const) -> String {
        match c {
            Const::Int(v) => v.to_string(),
            Const::Long(v) => format!("{}L", v),
            Const::Float(v) => format!("{}F", v),
            Const::Double(v) => v.to_string(),
            Const::Bool(v) => v.to_string(),
            Const::Char(v) => format!("'{}'", v),
            Const::Short(v) => v.to_string(),
            Const::Byte(v) => v.to_string(),
            Const::String(name) => format!("\"{}\"", self.ctx.names.resolve(*name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    #[test]
    fn prints_primitives_and_arrays() {
        let mut ctx = Context::new(Options::new());
        let arr = ctx.types.array_of(TypeId::INT);
        let arr2 = ctx.types.array_of(arr);
        let printer = TypePrinter::new(&ctx);
        assert_eq!(printer.print(TypeId::INT), "int");
        assert_eq!(printer.print(arr2), "int[][]");
    }

    #[test]
    fn prints_wildcards() {
        let mut ctx = Context::new(Options::new());
        let string = ctx.symtab.string_type;
        let w = ctx.types.alloc(Type::Wildcard {
            inner: string,
            kind: BoundKind::Extends,
            bound: None,
        });
        let printer = TypePrinter::new(&ctx);
        assert_eq!(printer.print(w), "? extends String");
    }

    #[test]
    fn prints_class_names() {
        let ctx = Context::new(Options::new());
        let printer = TypePrinter::new(&ctx);
        assert_eq!(printer.print(ctx.symtab.string_type), "String");
    }
}
