//! Lint augmentation against the predefined `@SuppressWarnings` symbol,
//! module-directive flag round-trips, and doc-comment positions.

mod common;

use javelin::attribute::Compound;
use javelin::doctree::DocComment;
use javelin::{
    Attribute, Const, Directive, ExportsFlags, Flags, Lint, LintCategory, OpensFlags,
    RequiresFlags,
};

use common::context_with_source;

#[test]
fn suppress_warnings_moves_rawtypes_to_suppressed() {
    let (mut ctx, _) = context_with_source("");
    let sw = ctx.symtab.suppress_warnings_sym;
    let sw_ty = ctx.symtab.suppress_warnings_type;
    let value = ctx.names.known.value;
    let rawtypes = ctx.names.intern("rawtypes");

    let base = Lint::of(&[LintCategory::Rawtypes, LintCategory::Unchecked]);
    let anno = Attribute::Compound(Compound {
        ty: sw_ty,
        sym: sw,
        values: vec![(
            value,
            Attribute::Array(vec![Attribute::Constant(Const::String(rawtypes))]),
        )],
    });
    let augmented = base.augment(&[anno], Flags::empty(), &ctx.names, sw);

    assert!(!augmented.is_enabled(LintCategory::Rawtypes));
    assert!(augmented.is_suppressed(LintCategory::Rawtypes));
    assert!(augmented.is_enabled(LintCategory::Unchecked));
    assert!(!augmented.is_suppressed(LintCategory::Unchecked));
}

#[test]
fn augmented_lint_drives_warning_suppression() {
    let (mut ctx, _) = context_with_source("class A {}\n");
    let sw = ctx.symtab.suppress_warnings_sym;
    let value = ctx.names.known.value;
    let rawtypes = ctx.names.intern("rawtypes");
    let sw_ty = ctx.symtab.suppress_warnings_type;

    let base = Lint::of(&[LintCategory::Rawtypes]);
    let anno = Attribute::Compound(Compound {
        ty: sw_ty,
        sym: sw,
        values: vec![(
            value,
            Attribute::Array(vec![Attribute::Constant(Const::String(rawtypes))]),
        )],
    });
    let inner = base.augment(&[anno], Flags::empty(), &ctx.names, sw);

    ctx.log.push_lint(base);
    ctx.log.push_lint(inner);
    ctx.log.warning(
        Some(LintCategory::Rawtypes),
        None,
        javelin::Span::at(3),
        "compiler.warn.raw.class.use",
        vec![],
    );
    assert_eq!(ctx.log.warn_count(), 0);
    ctx.log.pop_lint();
    ctx.log.warning(
        Some(LintCategory::Rawtypes),
        None,
        javelin::Span::at(7),
        "compiler.warn.raw.class.use",
        vec![],
    );
    assert_eq!(ctx.log.warn_count(), 1);
}

#[test]
fn module_directives_round_trip_their_flags() {
    let (mut ctx, _) = context_with_source("");
    let m = ctx.define_package("m");
    let p = ctx.define_package("p");

    let requires = Directive::Requires {
        module: m,
        flags: RequiresFlags::TRANSITIVE | RequiresFlags::STATIC_PHASE | RequiresFlags::EXTRA,
    };
    match &requires {
        Directive::Requires { flags, .. } => {
            let encoded = flags.bits();
            assert_eq!(encoded, 0x0020 | 0x0040 | 0x10000);
            assert_eq!(RequiresFlags::from_bits(encoded), Some(*flags));
        }
        _ => unreachable!(),
    }

    let exports = Directive::Exports {
        package: p,
        targets: Some(vec![m]),
        flags: ExportsFlags::SYNTHETIC,
    };
    match &exports {
        Directive::Exports { flags, targets, .. } => {
            assert_eq!(ExportsFlags::from_bits(flags.bits()), Some(*flags));
            assert_eq!(targets.as_deref(), Some(&[m][..]));
        }
        _ => unreachable!(),
    }

    let opens = Directive::Opens {
        package: p,
        targets: None,
        flags: OpensFlags::MANDATED,
    };
    match &opens {
        Directive::Opens { flags, .. } => {
            assert_eq!(OpensFlags::from_bits(flags.bits()), Some(*flags));
        }
        _ => unreachable!(),
    }
}

#[test]
fn doc_comments_come_from_the_unit_table() {
    let source_text = "/** Doubles the input. */\nint twice(int x) { return x + x; }\n";
    let (mut ctx, source) = context_with_source(source_text);

    let nodes = javelin::Arena::new();
    let refs = javelin::Arena::new();
    let pool = javelin::TreePool::new(&nodes, &refs);
    let maker = javelin::TreeMaker::new(pool);
    let twice = ctx.names.intern("twice");
    let decl = maker
        .at(javelin::Span::new(26, 60))
        .method_def(twice, None, pool.slice([]), None);
    let top = maker.at(javelin::Span::new(0, 61)).top_level(pool.slice([decl]));

    let mut unit = javelin::CompilationUnit {
        tree: top,
        source,
        end_positions: javelin::source::EndPosTable::new(),
        doc_comments: javelin::DocCommentTable::new(),
    };
    unit.end_positions.store(26, 60);
    unit.doc_comments.attach(
        decl.span.start,
        DocComment {
            text: "Doubles the input.".to_string(),
            start: 4,
        },
    );

    assert_eq!(
        unit.doc_comments.text_for(decl.span.start),
        Some("Doubles the input.")
    );
    assert_eq!(unit.doc_comments.text_for(0), None);
    assert_eq!(unit.end_positions.end_pos(decl.span), 60);

    // Positions inside the comment translate through the unit line map.
    let line_map = ctx.sources.get(unit.source).line_map();
    let comment = unit.doc_comments.comment_for(decl.span.start).unwrap();
    assert_eq!(comment.line_col(0, line_map), (1, 5));
}

#[test]
fn diagnostic_raw_format_uses_line_map() {
    let (mut ctx, source) = context_with_source("class A {}\nclass A {}\n");
    ctx.with_source(source, |ctx| {
        ctx.error_at(
            javelin::Span::new(11, 21),
            "compiler.err.duplicate.class",
            vec!["A".to_string()],
        );
    });
    let rendered = ctx.log.diagnostics()[0].raw_format(&ctx.sources);
    assert_eq!(rendered, "Test.java:2:1: compiler.err.duplicate.class: A");
}
