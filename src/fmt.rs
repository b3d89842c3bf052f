//! Logging shims.
//!
//! The driver logs through `log` or `defmt`, depending on which feature is
//! enabled. Without either feature the macros still type-check their
//! arguments but emit nothing.

#![macro_use]
#![allow(unused_macros)]

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        macro_rules! trace {
            ($($arg:tt)*) => { ::defmt::trace!($($arg)*) };
        }
        macro_rules! debug {
            ($($arg:tt)*) => { ::defmt::debug!($($arg)*) };
        }
        macro_rules! warn {
            ($($arg:tt)*) => { ::defmt::warn!($($arg)*) };
        }
    } else if #[cfg(feature = "log")] {
        macro_rules! trace {
            ($($arg:tt)*) => { ::log::trace!($($arg)*) };
        }
        macro_rules! debug {
            ($($arg:tt)*) => { ::log::debug!($($arg)*) };
        }
        macro_rules! warn {
            ($($arg:tt)*) => { ::log::warn!($($arg)*) };
        }
    } else {
        macro_rules! trace {
            ($($arg:tt)*) => {{ let _ = ::core::format_args!($($arg)*); }};
        }
        macro_rules! debug {
            ($($arg:tt)*) => {{ let _ = ::core::format_args!($($arg)*); }};
        }
        macro_rules! warn {
            ($($arg:tt)*) => {{ let _ = ::core::format_args!($($arg)*); }};
        }
    }
}
