//! Scoped suppression of change capture
//!
//! Suppression is a task-local flag, not shared configuration: it only covers
//! the wrapped closure or future, and is released on every exit path
//! including panics and early returns.

use std::future::Future;

tokio::task_local! {
    static SUPPRESSED: bool;
}

/// True inside a [`without_auditing`] / [`without_auditing_async`] scope
pub fn is_suppressed() -> bool {
    SUPPRESSED.try_with(|flag| *flag).unwrap_or(false)
}

/// Run `f` with change capture suppressed
pub fn without_auditing<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    SUPPRESSED.sync_scope(true, f)
}

/// Await `fut` with change capture suppressed
pub async fn without_auditing_async<F>(fut: F) -> F::Output
where
    F: Future,
{
    SUPPRESSED.scope(true, fut).await
}
