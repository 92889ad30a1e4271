//! Progress reporting toward the presentation layer.

/// One progress update: a textual stage and an optional percentage.
/// `percent: None` means indeterminate duration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: String,
    pub percent: Option<u8>,
}

impl ProgressEvent {
    pub fn stage(text: impl Into<String>) -> Self {
        Self {
            stage: text.into(),
            percent: None,
        }
    }

    pub fn at(text: impl Into<String>, percent: u8) -> Self {
        Self {
            stage: text.into(),
            percent: Some(percent),
        }
    }
}

/// Callback invoked from loader threads; must be safe to call concurrently.
pub type ProgressFn<'a> = dyn Fn(ProgressEvent) + Send + Sync + 'a;

/// A sink that drops every event, for callers that don't observe progress.
pub fn noop_progress() -> &'static ProgressFn<'static> {
    static NOOP: fn(ProgressEvent) = |_| {};
    &NOOP
}
