#![forbid(unsafe_code)]

//! Configuration for [`ObservableSequence`](crate::ObservableSequence).

/// How `replace` treats a replacement whose length differs from the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReplacePolicy {
    /// Replacement length must equal range length; anything else is
    /// `ReplacementLengthMismatch`.
    #[default]
    Strict,
    /// Overwrite `range.start + k` for each replacement element `k`,
    /// regardless of the range length. Every overwritten position must exist.
    Positional,
}

/// How mutations behave once the sequence has been disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DisposePolicy {
    /// Fail with `SequenceError::Disposed`.
    #[default]
    Reject,
    /// Return the operation's neutral value without touching state.
    /// Operations without one (`remove_at`) still fail.
    Ignore,
}

/// Configuration for an observable sequence.
#[derive(Debug, Clone, Default)]
pub struct SequenceConfig {
    /// Label attached to log events.
    pub label: Option<String>,
    /// Replacement length policy.
    pub replace_policy: ReplacePolicy,
    /// Post-disposal mutation policy.
    pub dispose_policy: DisposePolicy,
    /// Publish the initial contents on the snapshot channel at construction.
    pub publish_initial_snapshot: bool,
}

impl SequenceConfig {
    /// Default configuration: strict replace, reject after dispose, no
    /// initial snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the replacement length policy.
    #[must_use]
    pub fn with_replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.replace_policy = policy;
        self
    }

    /// Set the post-disposal mutation policy.
    #[must_use]
    pub fn with_dispose_policy(mut self, policy: DisposePolicy) -> Self {
        self.dispose_policy = policy;
        self
    }

    /// Publish the initial contents so early subscribers get a replay value.
    #[must_use]
    pub fn with_initial_snapshot(mut self, enabled: bool) -> Self {
        self.publish_initial_snapshot = enabled;
        self
    }

    /// The log label, or `"sequence"` when unset.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("sequence")
    }
}
