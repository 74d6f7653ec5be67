//! # Internal Macros
//!
//! This module provides internal macros for reducing boilerplate in taproot.
//!
//! ## zerocopy_accessors!
//!
//! Generates getter and setter methods for zerocopy struct fields that use
//! little-endian wrapper types (U32, U64, I64).
//!
//! ### Usage
//!
//! ```ignore
//! use zerocopy::little_endian::{I64, U32};
//!
//! #[repr(C)]
//! struct Header {
//!     order: U32,
//!     root_offset: I64,
//! }
//!
//! impl Header {
//!     zerocopy_accessors! {
//!         order: u32,
//!         root_offset: i64,
//!     }
//! }
//!
//! // Generates:
//! // pub fn order(&self) -> u32 { self.order.get() }
//! // pub fn set_order(&mut self, val: u32) { self.order = U32::new(val); }
//! // pub fn root_offset(&self) -> i64 { self.root_offset.get() }
//! // pub fn set_root_offset(&mut self, val: i64) { self.root_offset = I64::new(val); }
//! ```

/// Generates getter and setter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    (@impl $field:ident, u64) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u64 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u64) {
                self.$field = ::zerocopy::little_endian::U64::new(val);
            }
        }
    };
    (@impl $field:ident, i64) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> i64 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: i64) {
                self.$field = ::zerocopy::little_endian::I64::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )*
    };
}
