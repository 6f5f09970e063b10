//! ---
//! srt_section: "03-persistence-logging"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Structured logging adapters and sinks."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
/// Emit an informational log enriched with technique context.
#[macro_export]
macro_rules! srt_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            technique = ctx.technique.unwrap_or(""),
            platform = ctx.platform.unwrap_or(""),
            correlation_id = ctx.correlation_id.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::INFO,
            technique = ctx.technique.unwrap_or(""),
            platform = ctx.platform.unwrap_or(""),
            correlation_id = ctx.correlation_id.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a debug log enriched with technique context.
#[macro_export]
macro_rules! srt_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            technique = ctx.technique.unwrap_or(""),
            platform = ctx.platform.unwrap_or(""),
            correlation_id = ctx.correlation_id.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::DEBUG,
            technique = ctx.technique.unwrap_or(""),
            platform = ctx.platform.unwrap_or(""),
            correlation_id = ctx.correlation_id.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a warning log enriched with technique context.
#[macro_export]
macro_rules! srt_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            technique = ctx.technique.unwrap_or(""),
            platform = ctx.platform.unwrap_or(""),
            correlation_id = ctx.correlation_id.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::WARN,
            technique = ctx.technique.unwrap_or(""),
            platform = ctx.platform.unwrap_or(""),
            correlation_id = ctx.correlation_id.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an error log enriched with technique context.
#[macro_export]
macro_rules! srt_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            technique = ctx.technique.unwrap_or(""),
            platform = ctx.platform.unwrap_or(""),
            correlation_id = ctx.correlation_id.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::ERROR,
            technique = ctx.technique.unwrap_or(""),
            platform = ctx.platform.unwrap_or(""),
            correlation_id = ctx.correlation_id.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}
