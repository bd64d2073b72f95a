//! Shared fixtures for the integration suites: a context with a small
//! pre-entered class hierarchy, plus tree-building shorthand.

use javelin::testing;
use javelin::{Context, Flags, SourceId, TypeId};

pub use javelin::testing::{
    define_functional_interface, define_generic_method, define_method, define_simple_class,
    new_tvar,
};

/// A context plus one registered source file, ready for an attributor.
pub fn context_with_source(text: &str) -> (Context, SourceId) {
    let mut ctx = testing::fixture();
    let source = ctx.sources.add("Test.java", text);
    (ctx, source)
}

/// A class `C` with a handful of static methods covering the overload
/// shapes the suites exercise:
///
/// ```java
/// class C {
///     static int    f(int x);
///     static String f(String s);
///     static int    g(int x);
///     static int    boxed(Integer x);
///     static <T> T  id(T x);
/// }
/// ```
pub fn overload_fixture(ctx: &mut Context) -> javelin::SymId {
    let string = ctx.symtab.string_type;
    let (c_sym, _) = define_simple_class(ctx, "C");
    let statics = Flags::PUBLIC | Flags::STATIC;
    define_method(ctx, c_sym, "f", vec![TypeId::INT], TypeId::INT, statics);
    define_method(ctx, c_sym, "f", vec![string], string, statics);
    define_method(ctx, c_sym, "g", vec![TypeId::INT], TypeId::INT, statics);
    let integer = ctx.symtab.boxed_type(javelin::PrimTag::Int);
    define_method(ctx, c_sym, "boxed", vec![integer], TypeId::INT, statics);
    let object = ctx.symtab.object_type;
    let t = new_tvar(ctx, "T", object);
    define_generic_method(ctx, c_sym, "id", vec![t], vec![t], t, statics);
    c_sym
}
