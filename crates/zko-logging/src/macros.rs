//! ---
//! zko_section: "03-persistence-logging"
//! zko_subsection: "module"
//! zko_type: "source"
//! zko_scope: "code"
//! zko_description: "Structured logging adapters for hook handlers."
//! zko_version: "v0.0.0-prealpha"
//! zko_owner: "tbd"
//! ---
#[doc(hidden)]
#[macro_export]
macro_rules! __zko_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            unit = ctx.unit.unwrap_or(""),
            hook = ctx.hook.unwrap_or(""),
            relation = ctx.relation.unwrap_or(""),
            leader = ctx.leader.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with hook context.
#[macro_export]
macro_rules! zko_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__zko_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__zko_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with hook context.
#[macro_export]
macro_rules! zko_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__zko_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__zko_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning log enriched with hook context.
#[macro_export]
macro_rules! zko_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__zko_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__zko_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with hook context.
#[macro_export]
macro_rules! zko_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__zko_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__zko_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
