//! Supporting utility type.
mod bytestr;
pub use bytestr::ByteStr;

/// Trace when `verbose` feature enabled.
macro_rules! verbose {
    ($($tt:tt)*) => {
        #[cfg(feature = "verbose")]
        tracing::trace!($($tt)*)
    };
}

/// Warn when `log` feature enabled.
macro_rules! warn_log {
    ($($tt:tt)*) => {
        #[cfg(feature = "log")]
        log::warn!($($tt)*)
    };
}

/// Declare a fieldless error type with a fixed message.
macro_rules! unit_error {
    ($(#[$doc:meta])* $vis:vis struct $name:ident($msg:literal);) => {
        $(#[$doc])*
        $vis struct $name;

        impl std::error::Error for $name { }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($msg)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "\"{self}\"")
            }
        }
    };
}

pub(crate) use {unit_error, verbose, warn_log};
