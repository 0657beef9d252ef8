//! Feature-gated tracing macros.
//!
//! With the `tracing` feature the macros forward to `tracing`; without it they
//! expand to no-ops so the hot decode and suppression loops carry no cost.

/// Opens an info-level span around one post-processing stage.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

/// Records counts produced by a stage (candidates, survivors, suppressed).
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
}

/// Debug-level message for precision caveats such as a truncated stride.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)+) => {
        tracing::debug!($($arg)+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)+) => {};
}

pub(crate) use trace_debug;
pub(crate) use trace_event;
pub(crate) use trace_span;

/// Stand-in span guard when tracing is compiled out.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
