//! Progress reporting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};

/// Capability handed to long-running stages.
///
/// Stages call [`report_progress`](Self::report_progress) at layer or item
/// granularity and poll [`should_cancel`](Self::should_cancel) between units
/// of work. Implementations must return quickly: the stage does not wait on
/// the callback. A stage never keeps the control past its own call.
///
/// Both methods have no-op defaults, so `impl JobControl for MyType {}` is
/// enough for a control that only reacts to one of them.
pub trait JobControl: Sync {
    /// Report completion in `[0, 1]`.
    fn report_progress(&self, _fraction: f64) {}

    /// Whether the caller asked the stage to stop.
    fn should_cancel(&self) -> bool {
        false
    }
}

/// A control that never cancels and discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoControl;

impl JobControl for NoControl {}

/// Cancelled once the flag is set.
impl JobControl for AtomicBool {
    fn should_cancel(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// Adapts a pair of closures to [`JobControl`].
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use mesh_types::{FnControl, JobControl};
///
/// let calls = AtomicUsize::new(0);
/// let control = FnControl::new(
///     |_fraction| {
///         calls.fetch_add(1, Ordering::Relaxed);
///     },
///     || false,
/// );
/// control.report_progress(0.5);
/// assert_eq!(calls.load(Ordering::Relaxed), 1);
/// assert!(!control.should_cancel());
/// ```
pub struct FnControl<P, C> {
    progress: P,
    cancel: C,
}

impl<P, C> FnControl<P, C>
where
    P: Fn(f64) + Sync,
    C: Fn() -> bool + Sync,
{
    /// Wrap a progress sink and a cancellation predicate.
    pub const fn new(progress: P, cancel: C) -> Self {
        Self { progress, cancel }
    }
}

impl<P, C> JobControl for FnControl<P, C>
where
    P: Fn(f64) + Sync,
    C: Fn() -> bool + Sync,
{
    fn report_progress(&self, fraction: f64) {
        (self.progress)(fraction.clamp(0.0, 1.0));
    }

    fn should_cancel(&self) -> bool {
        (self.cancel)()
    }
}

impl<P, C> std::fmt::Debug for FnControl<P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnControl").finish_non_exhaustive()
    }
}
