use bitflags::bitflags;

use crate::symbol::SymId;

bitflags! {
    /// `requires` modifier bits, exactly as encoded in a module-info
    /// class file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RequiresFlags: u32 {
        const TRANSITIVE   = 0x0020;
        const STATIC_PHASE = 0x0040;
        const SYNTHETIC    = 0x1000;
        const MANDATED     = 0x8000;
        const EXTRA        = 0x10000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExportsFlags: u32 {
        const SYNTHETIC = 0x1000;
        const MANDATED  = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpensFlags: u32 {
        const SYNTHETIC = 0x1000;
        const MANDATED  = 0x8000;
    }
}

/// One directive of a module declaration. `targets: None` means an
/// unqualified `exports`/`opens`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Requires {
        module: SymId,
        flags: RequiresFlags,
    },
    Exports {
        package: SymId,
        targets: Option<Vec<SymId>>,
        flags: ExportsFlags,
    },
    Opens {
        package: SymId,
        targets: Option<Vec<SymId>>,
        flags: OpensFlags,
    },
    Uses {
        service: SymId,
    },
    Provides {
        service: SymId,
        impls: Vec<SymId>,
    },
}

impl Directive {
    pub fn is_requires(&self) -> bool {
        matches!(self, Directive::Requires { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_flag_values_match_contract() {
        assert_eq!(RequiresFlags::TRANSITIVE.bits(), 0x0020);
        assert_eq!(RequiresFlags::STATIC_PHASE.bits(), 0x0040);
        assert_eq!(RequiresFlags::SYNTHETIC.bits(), 0x1000);
        assert_eq!(RequiresFlags::MANDATED.bits(), 0x8000);
        assert_eq!(RequiresFlags::EXTRA.bits(), 0x10000);
    }

    #[test]
    fn exports_and_opens_flags_match_contract() {
        assert_eq!(ExportsFlags::SYNTHETIC.bits(), 0x1000);
        assert_eq!(ExportsFlags::MANDATED.bits(), 0x8000);
        assert_eq!(OpensFlags::SYNTHETIC.bits(), 0x1000);
        assert_eq!(OpensFlags::MANDATED.bits(), 0x8000);
    }

    #[test]
    fn flag_sets_round_trip_through_ints() {
        let all = RequiresFlags::TRANSITIVE | RequiresFlags::MANDATED | RequiresFlags::EXTRA;
        assert_eq!(RequiresFlags::from_bits(all.bits()), Some(all));
        let none = ExportsFlags::empty();
        assert_eq!(ExportsFlags::from_bits(none.bits()), Some(none));
        let both = OpensFlags::SYNTHETIC | OpensFlags::MANDATED;
        assert_eq!(OpensFlags::from_bits(both.bits()), Some(both));
    }

    #[test]
    fn unqualified_exports_has_no_targets() {
        let d = Directive::Exports {
            package: SymId::NONE,
            targets: None,
            flags: ExportsFlags::empty(),
        };
        match d {
            Directive::Exports { targets, .. } => assert!(targets.is_none()),
            _ => unreachable!(),
        }
    }
}
