use std::fmt;

mod bitness;

pub use bitness::Bitness;

#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub enum Type {
    Int(Bitness),
    /// An opaque address into some memory region.
    Ptr,
    /// `void`, only valid as the type of something that produces no value.
    Void,
}

impl Type {
    pub const I1: Self = Self::Int(Bitness::B1);
    pub const I8: Self = Self::Int(Bitness::B8);
    pub const I16: Self = Self::Int(Bitness::B16);
    pub const I32: Self = Self::Int(Bitness::B32);
    pub const I64: Self = Self::Int(Bitness::B64);
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Int(b) => write!(f, "i{b}"),
            Self::Ptr => f.write_str("ptr"),
            Self::Void => f.write_str("void"),
        }
    }
}

/// An integer constant, the bits above `self.0` are always zero.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Hash)]
pub struct Int(pub Bitness, pub u64);

impl Int {
    #[must_use]
    pub const fn new(bitness: Bitness, value: u64) -> Self {
        Self(bitness, value & bitness.mask())
    }

    #[must_use]
    pub const fn i1(v: bool) -> Self {
        Self(Bitness::B1, v as u64)
    }

    #[must_use]
    pub const fn i32(v: u32) -> Self {
        Self(Bitness::B32, v as u64)
    }

    #[must_use]
    pub const fn i64(v: u64) -> Self {
        Self(Bitness::B64, v)
    }

    #[must_use]
    #[inline(always)]
    pub const fn ty(self) -> Type {
        Type::Int(self.0)
    }

    /// Sign extends [`self`](Self) to a [`i64`].
    #[must_use]
    pub const fn signed(self) -> i64 {
        let shift = 64 - self.0.to_bits() as u32;
        ((self.1 << shift) as i64) >> shift
    }

    /// Zero extends [`self`](Self) to a [`u64`].
    #[must_use]
    pub const fn unsigned(self) -> u64 {
        self.1
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0.to_bits()
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `i1` reads better as a boolean.
        if self.0 == Bitness::B1 {
            return fmt::Display::fmt(&(self.1 != 0), f);
        }

        write!(f, "{} {}", self.ty(), self.signed())
    }
}

impl fmt::LowerHex for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = (self.0.to_bits() / 4) + u8::from(self.0.to_bits() & 0b11 > 0);
        let width = width as usize;
        write!(f, "{:01$x}", self.1, width)
    }
}

#[cfg(test)]
mod tests {
    use super::{Bitness, Int};

    #[test]
    fn int_sign_extends_from_its_width() {
        let minus_one = Int::new(Bitness::B8, 0xff);
        assert_eq!(minus_one.signed(), -1);
        assert_eq!(minus_one.unsigned(), 0xff);

        assert_eq!(Int::new(Bitness::B8, 0x1ff).unsigned(), 0xff);
        assert_eq!(Int::i32(7).signed(), 7);
    }

    #[test]
    fn int_display() {
        assert_eq!(Int::i32(u32::MAX).to_string(), "i32 -1");
        assert_eq!(Int::i1(true).to_string(), "true");
        assert_eq!(format!("{:x}", Int::i32(0x2a)), "0000002a");
    }
}
