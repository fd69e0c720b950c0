// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logging macros accepting format arguments

/// Log a formatted message with error severity
///
/// # Examples
/// ```ignore
/// log_error!(logger, Facility::Channel, "insert into full buffer at slot {}", index);
/// ```
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $facility:expr, $($arg:tt)+) => {
        $logger.error($facility, &format!($($arg)+))
    };
}

/// Log a formatted message with warning severity
#[macro_export]
macro_rules! log_warning {
    ($logger:expr, $facility:expr, $($arg:tt)+) => {
        $logger.warning($facility, &format!($($arg)+))
    };
}

/// Log a formatted message with notice severity
#[macro_export]
macro_rules! log_notice {
    ($logger:expr, $facility:expr, $($arg:tt)+) => {
        $logger.notice($facility, &format!($($arg)+))
    };
}

/// Log a formatted message with info severity
///
/// # Examples
/// ```ignore
/// log_info!(logger, Facility::Producer, "{} insert value {:#010x}", id, value);
/// ```
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $facility:expr, $($arg:tt)+) => {
        $logger.info($facility, &format!($($arg)+))
    };
}

/// Log a formatted message with debug severity
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $facility:expr, $($arg:tt)+) => {
        $logger.debug($facility, &format!($($arg)+))
    };
}

/// Log a message with key-value pairs
///
/// # Examples
/// ```ignore
/// log_kv!(logger, Severity::Info, Facility::Consumer, "remove",
///         "worker" => "0", "slot" => "3");
/// ```
#[macro_export]
macro_rules! log_kv {
    ($logger:expr, $severity:expr, $facility:expr, $msg:expr, $($key:expr => $value:expr),+) => {{
        let kvs: &[(&str, &str)] = &[$(($key, $value)),+];
        $logger.log_kv($severity, $facility, $msg, kvs)
    }};
}
