// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A macro to define plain bit-flag types with explicit set helpers.
//!
//! The generated types intentionally carry no operator overloads: flags are
//! combined with [`union`](#method.union), tested with `contains` and
//! `intersects`, and modified with `insert`/`remove`.

#[macro_export]
#[doc(hidden)]
macro_rules! umbra_bitflags {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag_name:ident = $flag_value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name {
            pub(crate) bits: $ty,
        }

        impl $name {
            /// An empty set of flags.
            pub const EMPTY: Self = Self { bits: 0 };

            /// Creates a new bitflag set from the given raw bits.
            /// Bits not corresponding to any defined flag are kept.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits }
            }

            /// Returns the raw value of the bitflag set.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            /// Returns `true` if no flag is set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// Returns the union of `self` and `other`.
            #[must_use]
            pub const fn union(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }

            /// Returns the flags present in both `self` and `other`.
            #[must_use]
            pub const fn intersection(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }

            /// Returns `true` if all flags in `other` are contained within `self`.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// Returns `true` if any flag in `other` is contained within `self`.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.bits & other.bits) != 0
            }

            /// Inserts the flags in `other` into `self`.
            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            /// Removes the flags in `other` from `self`.
            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }

            /// Returns a new `Self` with `other` flags inserted.
            #[must_use]
            pub const fn with(mut self, other: Self) -> Self {
                self.bits |= other.bits;
                self
            }

            /// Returns a new `Self` with `other` flags removed.
            #[must_use]
            pub const fn without(mut self, other: Self) -> Self {
                self.bits &= !other.bits;
                self
            }

            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut bits = self.bits;
                let mut first_flag = true;

                write!(f, "{} {{ ", stringify!($name))?;

                $(
                    if ($flag_value != 0) && (bits & $flag_value) == $flag_value {
                        if !first_flag {
                            write!(f, " | ")?;
                        }
                        write!(f, "{}", stringify!($flag_name))?;
                        bits &= !$flag_value;
                        first_flag = false;
                    }
                )*

                if bits != 0 {
                    if !first_flag {
                        write!(f, " | ")?;
                    }
                    write!(f, "UNKNOWN({:#x})", bits)?;
                    first_flag = false;
                }

                if self.bits == 0 && first_flag {
                    write!(f, "EMPTY")?;
                }

                write!(f, " }}")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    umbra_bitflags! {
        /// TestFlags for macro verification
        pub struct TestFlags: u32 {
            const FLAG_A = 1 << 0;
            const FLAG_B = 1 << 1;
            const FLAG_C = 1 << 2;
            const COMBINED_AC = Self::FLAG_A.bits() | Self::FLAG_C.bits();
            const NONE_FLAG = 0;
        }
    }

    #[test]
    fn test_empty_flags() {
        let flags = TestFlags::EMPTY;
        assert!(flags.is_empty());
        assert!(flags.contains(TestFlags::EMPTY));
        assert!(!flags.contains(TestFlags::FLAG_A));
        assert_eq!(TestFlags::default().bits(), 0, "Default should be empty");
        assert_eq!(format!("{:?}", flags), "TestFlags { EMPTY }");
    }

    #[test]
    fn test_union_and_contains() {
        let flags = TestFlags::FLAG_A.union(TestFlags::FLAG_C);
        assert_eq!(flags.bits(), 0b101);
        assert_eq!(flags, TestFlags::COMBINED_AC);
        assert!(flags.contains(TestFlags::FLAG_A));
        assert!(!flags.contains(TestFlags::FLAG_B));
        assert!(!flags.contains(TestFlags::FLAG_A.union(TestFlags::FLAG_B)));
        assert_eq!(format!("{:?}", flags), "TestFlags { FLAG_A | FLAG_C }");
    }

    #[test]
    fn test_intersects_and_intersection() {
        let ab = TestFlags::FLAG_A.union(TestFlags::FLAG_B);
        let bc = TestFlags::FLAG_B.union(TestFlags::FLAG_C);
        assert!(ab.intersects(bc));
        assert_eq!(ab.intersection(bc), TestFlags::FLAG_B);
        assert!(!ab.intersects(TestFlags::FLAG_C));
        assert!(!ab.intersects(TestFlags::EMPTY));
    }

    #[test]
    fn test_insert_remove_with_without() {
        let mut flags = TestFlags::FLAG_A;
        flags.insert(TestFlags::FLAG_B);
        assert_eq!(format!("{:?}", flags), "TestFlags { FLAG_A | FLAG_B }");
        flags.remove(TestFlags::FLAG_A);
        assert_eq!(flags, TestFlags::FLAG_B);

        let initial = TestFlags::FLAG_A;
        assert_eq!(initial.with(TestFlags::FLAG_C), TestFlags::COMBINED_AC);
        assert_eq!(TestFlags::COMBINED_AC.without(TestFlags::FLAG_C), initial);
        assert_eq!(initial, TestFlags::FLAG_A, "Original should be unchanged");
    }

    #[test]
    fn test_debug_formatting_unknown_and_zero_flag() {
        let flags = TestFlags::FLAG_A.union(TestFlags::from_bits_truncate(1 << 8));
        assert_eq!(format!("{:?}", flags), "TestFlags { FLAG_A | UNKNOWN(0x100) }");
        assert_eq!(format!("{:?}", TestFlags::NONE_FLAG), "TestFlags { EMPTY }");
    }
}
