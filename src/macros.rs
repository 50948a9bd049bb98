//! Logging macros taking any number of arguments.
//!
//! Each argument is converted with [`LogArg::from`](crate::LogArg); prefix an
//! argument with `?` to capture it through its `Debug` implementation
//! instead. The call site recorded is the macro invocation.
//!
//! # Examples
//!
//! ```
//! use context_logger_system::prelude::*;
//! use context_logger_system::{error, info};
//!
//! #[derive(Debug)]
//! struct Order {
//!     id: u32,
//! }
//!
//! let logger = Logger::<Syslog>::new();
//!
//! info!(logger, "Server started");
//! info!(logger, "listening on port", 8080);
//!
//! let order = Order { id: 7 };
//! error!(logger, "payment failed for", ?order);
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __log_args {
    (@acc []) => {
        ::std::vec::Vec::<$crate::LogArg>::new()
    };
    (@acc [$($out:expr),+]) => {
        ::std::vec![$($out),+]
    };
    (@acc [$($out:expr),*] ? $arg:expr $(, $($rest:tt)*)?) => {
        $crate::__log_args!(@acc [$($out,)* $crate::LogArg::debug(&$arg)] $($($rest)*)?)
    };
    (@acc [$($out:expr),*] $arg:expr $(, $($rest:tt)*)?) => {
        $crate::__log_args!(@acc [$($out,)* $crate::LogArg::from($arg)] $($($rest)*)?)
    };
    ($($args:tt)*) => {
        $crate::__log_args!(@acc [] $($args)*)
    };
}

/// Log at a level given by name.
///
/// # Examples
///
/// ```
/// # use context_logger_system::prelude::*;
/// # let logger = Logger::<Npm>::new();
/// use context_logger_system::log;
/// log!(logger, "verbose", "cache miss for", "user:42");
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr $(, $($args:tt)*)?) => {
        $logger.log_at($level, $crate::__log_args!($($($args)*)?))
    };
}

/// Log at `emerg` (syslog model).
#[macro_export]
macro_rules! emerg {
    ($logger:expr $(, $($args:tt)*)?) => {
        $logger.emerg($crate::__log_args!($($($args)*)?))
    };
}

/// Log at `alert` (syslog model).
#[macro_export]
macro_rules! alert {
    ($logger:expr $(, $($args:tt)*)?) => {
        $logger.alert($crate::__log_args!($($($args)*)?))
    };
}

/// Log at `crit` (syslog model).
#[macro_export]
macro_rules! crit {
    ($logger:expr $(, $($args:tt)*)?) => {
        $logger.crit($crate::__log_args!($($($args)*)?))
    };
}

/// Log at `error`.
///
/// # Examples
///
/// ```
/// # use context_logger_system::prelude::*;
/// # let logger = Logger::<Syslog>::new();
/// use context_logger_system::error;
/// error!(logger, "request failed with status", 500);
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr $(, $($args:tt)*)?) => {
        $logger.error($crate::__log_args!($($($args)*)?))
    };
}

/// Log at `warn`.
#[macro_export]
macro_rules! warn {
    ($logger:expr $(, $($args:tt)*)?) => {
        $logger.warn($crate::__log_args!($($($args)*)?))
    };
}

/// Log at `notice` (syslog model).
#[macro_export]
macro_rules! notice {
    ($logger:expr $(, $($args:tt)*)?) => {
        $logger.notice($crate::__log_args!($($($args)*)?))
    };
}

/// Log at `info`.
#[macro_export]
macro_rules! info {
    ($logger:expr $(, $($args:tt)*)?) => {
        $logger.info($crate::__log_args!($($($args)*)?))
    };
}

/// Log at `debug`.
#[macro_export]
macro_rules! debug {
    ($logger:expr $(, $($args:tt)*)?) => {
        $logger.debug($crate::__log_args!($($($args)*)?))
    };
}

/// Log at `verbose` (npm model).
#[macro_export]
macro_rules! verbose {
    ($logger:expr $(, $($args:tt)*)?) => {
        $logger.verbose($crate::__log_args!($($($args)*)?))
    };
}

/// Log at `silly` (npm model).
#[macro_export]
macro_rules! silly {
    ($logger:expr $(, $($args:tt)*)?) => {
        $logger.silly($crate::__log_args!($($($args)*)?))
    };
}
