use serde::Serialize;

use crate::attribute::{self, Attribute, AttributeVisitor};
use crate::flags::Flags;
use crate::intern::NameTable;
use crate::options::{Options, SourceVersion};
use crate::symbol::SymId;
use crate::types::Const;

/// Closed set of warning categories. The names are the spellings accepted
/// by `-Xlint` and `@SuppressWarnings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LintCategory {
    Cast,
    Classfile,
    Deprecation,
    DepAnn,
    Divzero,
    Empty,
    Fallthrough,
    Finally,
    Options,
    Overloads,
    Overrides,
    Path,
    Rawtypes,
    Serial,
    Static,
    Try,
    Unchecked,
    Varargs,
}

impl LintCategory {
    pub const ALL: &'static [LintCategory] = &[
        LintCategory::Cast,
        LintCategory::Classfile,
        LintCategory::Deprecation,
        LintCategory::DepAnn,
        LintCategory::Divzero,
        LintCategory::Empty,
        LintCategory::Fallthrough,
        LintCategory::Finally,
        LintCategory::Options,
        LintCategory::Overloads,
        LintCategory::Overrides,
        LintCategory::Path,
        LintCategory::Rawtypes,
        LintCategory::Serial,
        LintCategory::Static,
        LintCategory::Try,
        LintCategory::Unchecked,
        LintCategory::Varargs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LintCategory::Cast => "cast",
            LintCategory::Classfile => "classfile",
            LintCategory::Deprecation => "deprecation",
            LintCategory::DepAnn => "dep-ann",
            LintCategory::Divzero => "divzero",
            LintCategory::Empty => "empty",
            LintCategory::Fallthrough => "fallthrough",
            LintCategory::Finally => "finally",
            LintCategory::Options => "options",
            LintCategory::Overloads => "overloads",
            LintCategory::Overrides => "overrides",
            LintCategory::Path => "path",
            LintCategory::Rawtypes => "rawtypes",
            LintCategory::Serial => "serial",
            LintCategory::Static => "static",
            LintCategory::Try => "try",
            LintCategory::Unchecked => "unchecked",
            LintCategory::Varargs => "varargs",
        }
    }

    pub fn from_name(name: &str) -> Option<LintCategory> {
        LintCategory::ALL.iter().copied().find(|c| c.name() == name)
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Small fixed set over `LintCategory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategorySet(u32);

impl CategorySet {
    pub const EMPTY: CategorySet = CategorySet(0);

    pub fn of(categories: &[LintCategory]) -> CategorySet {
        let mut set = CategorySet::EMPTY;
        for c in categories {
            set = set.plus(*c);
        }
        set
    }

    pub fn all() -> CategorySet {
        CategorySet::of(LintCategory::ALL)
    }

    pub fn contains(self, c: LintCategory) -> bool {
        self.0 & c.bit() != 0
    }

    pub fn plus(self, c: LintCategory) -> CategorySet {
        CategorySet(self.0 | c.bit())
    }

    pub fn minus(self, c: LintCategory) -> CategorySet {
        CategorySet(self.0 & !c.bit())
    }

    pub fn is_superset(self, other: CategorySet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_subset(self, other: CategorySet) -> bool {
        other.is_superset(self)
    }
}

/// Warning-category state at one point of the reporting stack: which
/// categories are active and which have been suppressed by an enclosing
/// declaration. The two sets are disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lint {
    pub enabled: CategorySet,
    pub suppressed: CategorySet,
}

impl Lint {
    pub fn of(enabled: &[LintCategory]) -> Lint {
        Lint {
            enabled: CategorySet::of(enabled),
            suppressed: CategorySet::EMPTY,
        }
    }

    /// Categories on by default for a language level when `-Xlint` is
    /// not given; the options category joins at the module era.
    fn default_enabled(version: SourceVersion) -> CategorySet {
        let base = CategorySet::of(&[LintCategory::DepAnn]);
        if version >= SourceVersion::Jdk9 {
            base.plus(LintCategory::Options)
        } else {
            base
        }
    }

    /// Derives the root lint state from the option map: `all` and `none`
    /// override everything, otherwise the language-version default is
    /// adjusted by the comma-separated `+cat`/`-cat` entries.
    pub fn from_options(options: &Options) -> Lint {
        let mut enabled = Lint::default_enabled(options.source_version());
        if let Some(spec) = options.get("-Xlint") {
            for part in spec.split(',') {
                match part {
                    "all" => enabled = CategorySet::all(),
                    "none" => enabled = CategorySet::EMPTY,
                    _ => {
                        if let Some(rest) = part.strip_prefix('-') {
                            if let Some(cat) = LintCategory::from_name(rest) {
                                enabled = enabled.minus(cat);
                            }
                        } else if let Some(cat) = LintCategory::from_name(part) {
                            enabled = enabled.plus(cat);
                        }
                    }
                }
            }
        } else if options.is_set("-Xlint") {
            enabled = CategorySet::all();
        }
        if options.is_set("-deprecation") {
            enabled = enabled.plus(LintCategory::Deprecation);
        }
        Lint {
            enabled,
            suppressed: CategorySet::EMPTY,
        }
    }

    pub fn is_enabled(self, c: LintCategory) -> bool {
        self.enabled.contains(c)
    }

    pub fn is_suppressed(self, c: LintCategory) -> bool {
        self.suppressed.contains(c)
    }

    pub fn suppress(self, c: LintCategory) -> Lint {
        Lint {
            enabled: self.enabled.minus(c),
            suppressed: self.suppressed.plus(c),
        }
    }

    /// Augments this state with the `@SuppressWarnings` annotations of one
    /// declaration: every constant string naming a known category moves
    /// that category from `enabled` to `suppressed`. A deprecated
    /// declaration additionally suppresses the deprecation category.
    /// Returns the receiver unchanged when nothing applies.
    pub fn augment(
        self,
        attrs: &[Attribute],
        flags: Flags,
        names: &NameTable,
        suppress_warnings: SymId,
    ) -> Lint {
        let mut collector = SuppressionCollector {
            names,
            categories: Vec::new(),
        };
        for attr in attrs {
            if let Some(compound) = attr.compound() {
                if compound.sym == suppress_warnings {
                    if let Some(value) = compound.member(names.known.value) {
                        attribute::dispatch(&mut collector, value);
                    }
                }
            }
        }
        let mut result = self;
        for cat in collector.categories {
            result = result.suppress(cat);
        }
        if flags.contains(Flags::DEPRECATED) {
            result = result.suppress(LintCategory::Deprecation);
        }
        result
    }
}

struct SuppressionCollector<'n> {
    names: &'n NameTable,
    categories: Vec<LintCategory>,
}

impl AttributeVisitor for SuppressionCollector<'_> {
    fn visit_constant(&mut self, _attr: &Attribute, value: &Const) {
        if let Const::String(name) = value {
            if let Some(cat) = LintCategory::from_name(self.names.resolve(*name)) {
                self.categories.push(cat);
            }
        }
    }
}
