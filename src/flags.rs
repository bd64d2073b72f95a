use bitflags::bitflags;

bitflags! {
    /// Declaration modifier bits. The low sixteen match the class-file
    /// access flags; the rest are front-end bookkeeping bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u64 {
        const PUBLIC       = 0x0001;
        const PRIVATE      = 0x0002;
        const PROTECTED    = 0x0004;
        const STATIC       = 0x0008;
        const FINAL        = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const VOLATILE     = 0x0040;
        const TRANSIENT    = 0x0080;
        const NATIVE       = 0x0100;
        const INTERFACE    = 0x0200;
        const ABSTRACT     = 0x0400;
        const STRICTFP     = 0x0800;
        const SYNTHETIC    = 0x1000;
        const ANNOTATION   = 0x2000;
        const ENUM         = 0x4000;
        const MANDATED     = 0x8000;

        /// Declaration carries `@Deprecated` or a `@deprecated` doc tag.
        const DEPRECATED   = 1 << 17;
        /// Method takes a trailing variable-arity parameter.
        const VARARGS      = 1 << 34;
    }
}

impl Flags {
    pub fn is_static(self) -> bool {
        self.contains(Flags::STATIC)
    }

    pub fn is_public(self) -> bool {
        self.contains(Flags::PUBLIC)
    }

    pub fn is_abstract(self) -> bool {
        self.contains(Flags::ABSTRACT)
    }

    pub fn is_varargs(self) -> bool {
        self.contains(Flags::VARARGS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_bits_match_class_file_values() {
        assert_eq!(Flags::PUBLIC.bits(), 0x0001);
        assert_eq!(Flags::SYNTHETIC.bits(), 0x1000);
        assert_eq!(Flags::MANDATED.bits(), 0x8000);
    }

    #[test]
    fn combined_flags_round_trip_through_bits() {
        let f = Flags::PUBLIC | Flags::STATIC | Flags::VARARGS;
        assert_eq!(Flags::from_bits(f.bits()), Some(f));
        assert!(f.is_static());
        assert!(f.is_varargs());
        assert!(!f.is_abstract());
    }
}
