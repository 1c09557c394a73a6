//! Store configuration.

use std::time::Duration;

/// Notice prepended to a page's text right before it self-destructs.
pub const DEFAULT_DESTRUCT_NOTICE: &str =
    "*This page has self-destructed. You can not return to it.*\n\n";

/// Which reads of a primed page trigger its destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfDestructTrigger {
    /// Only the gated edit and view reads.
    #[default]
    GatedReads,
    /// Every read, including raw and history reads.
    AllReads,
}

/// Configuration shared by every page of a registry.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of deltas written after a snapshot before the next
    /// revision is forced to be a snapshot.
    pub snapshot_interval: usize,

    /// Largest text accepted by `update`, if enforced.
    pub max_text_size: Option<usize>,

    /// Bucket width used for the default history listing.
    pub history_interval: Duration,

    /// Which reads of a primed page destroy it.
    pub self_destruct_trigger: SelfDestructTrigger,

    /// Whether encrypting or decrypting a page drops its earlier history
    /// instead of appending the transformed text on top of it.
    pub scrub_history_on_encrypt: bool,

    /// Whether `save` syncs the page log to disk.
    pub sync_on_save: bool,

    /// Text prepended to the final revision of a self-destructing page.
    pub destruct_notice: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_interval: 32,
            max_text_size: None,
            history_interval: Duration::from_secs(60),
            self_destruct_trigger: SelfDestructTrigger::GatedReads,
            scrub_history_on_encrypt: false,
            sync_on_save: true,
            destruct_notice: DEFAULT_DESTRUCT_NOTICE.to_string(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the snapshot interval. Values below 1 are treated as 1.
    #[must_use]
    pub const fn snapshot_interval(mut self, revisions: usize) -> Self {
        self.snapshot_interval = if revisions == 0 { 1 } else { revisions };
        self
    }

    /// Sets the maximum accepted text size.
    #[must_use]
    pub const fn max_text_size(mut self, limit: Option<usize>) -> Self {
        self.max_text_size = limit;
        self
    }

    /// Sets the default history bucket width.
    #[must_use]
    pub const fn history_interval(mut self, interval: Duration) -> Self {
        self.history_interval = interval;
        self
    }

    /// Sets which reads trigger self-destruction.
    #[must_use]
    pub const fn self_destruct_trigger(mut self, trigger: SelfDestructTrigger) -> Self {
        self.self_destruct_trigger = trigger;
        self
    }

    /// Sets whether encryption transitions drop earlier history.
    #[must_use]
    pub const fn scrub_history_on_encrypt(mut self, value: bool) -> Self {
        self.scrub_history_on_encrypt = value;
        self
    }

    /// Sets whether saves are synced to disk.
    #[must_use]
    pub const fn sync_on_save(mut self, value: bool) -> Self {
        self.sync_on_save = value;
        self
    }

    /// Sets the self-destruct notice.
    #[must_use]
    pub fn destruct_notice(mut self, notice: impl Into<String>) -> Self {
        self.destruct_notice = notice.into();
        self
    }
}
