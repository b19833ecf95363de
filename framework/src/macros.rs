//! Logging shims: forward to `log` with the `logging` feature, compile to
//! nothing (arguments still type-checked) without it.

#[cfg(feature = "logging")]
macro_rules! debug {
    ($($arg:tt)*) => {
        ::log::debug!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! debug {
    ($($arg:tt)*) => {{
        let _ = ::core::format_args!($($arg)*);
    }};
}

#[cfg(feature = "logging")]
macro_rules! info {
    ($($arg:tt)*) => {
        ::log::info!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! info {
    ($($arg:tt)*) => {{
        let _ = ::core::format_args!($($arg)*);
    }};
}

#[cfg(feature = "logging")]
macro_rules! warn {
    ($($arg:tt)*) => {
        ::log::warn!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! warn {
    ($($arg:tt)*) => {{
        let _ = ::core::format_args!($($arg)*);
    }};
}
