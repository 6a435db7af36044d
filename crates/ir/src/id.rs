use std::fmt;
use std::marker::PhantomData;

/// A dense, `u32` backed identifier.
pub trait Idx: Copy {
    fn from_raw(raw: u32) -> Self;
    fn raw(self) -> u32;
}

pub struct IdAllocator<T> {
    next_id: u32,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Idx> IdAllocator<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_start(0)
    }

    #[must_use]
    pub const fn with_start(start: u32) -> Self {
        Self { next_id: start, _phantom: PhantomData }
    }

    #[must_use = "ignoring the return of this function will leak an ID slot and is almost never what you want"]
    pub fn allocate(&mut self) -> T {
        let id_num = self.next_id;

        assert!(id_num < u32::MAX);

        T::from_raw(std::mem::replace(&mut self.next_id, id_num + 1))
    }

    /// Number of ids handed out so far (assuming a start of `0`).
    #[must_use]
    pub const fn allocated(&self) -> u32 {
        self.next_id
    }

    pub fn reset(&mut self) {
        self.next_id = 0;
    }
}

impl<T: Idx> Default for IdAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for IdAllocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdAllocator").field("next_id", &self.next_id).finish()
    }
}

macro_rules! define_id {
    ($(#[$attr:meta])* $name:ident, $prefix:literal) => {
        $(#[$attr])*
        #[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl Idx for $name {
            #[inline(always)]
            fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline(always)]
            fn raw(self) -> u32 {
                self.0
            }
        }

        impl $name {
            #[must_use]
            #[inline(always)]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// The result of an [`Instruction`](crate::Instruction).
    InstId,
    "%"
);

define_id!(
    /// A block's position in [`Function::blocks`](crate::Function::blocks).
    BlockId,
    "bb"
);

define_id!(
    /// A global's position in [`Function::globals`](crate::Function::globals).
    GlobalId,
    "@"
);
