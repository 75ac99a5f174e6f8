use esync_domain::CorruptReason;

/// Terminal classification of one file's pass through the per-file pipeline
/// `NEW -> DOWNLOADED -> NORMALIZED -> EMBEDDED -> APPENDED`. Modeled
/// explicitly rather than as exception flow so the caller's bookkeeping
/// (counts, checkpoint triggers) is a plain match, not a catch clause.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Reached APPENDED: an entry was added to the working copy.
    Appended,
    /// Normalization failed deterministically; persisted as a corrupt entry
    /// so the file is never retried.
    SkippedNormalize(CorruptReason),
    /// Embedding call failed; nothing persisted, eligible for retry next run.
    SkippedEmbed,
    /// Download from Drive failed; nothing persisted, eligible for retry.
    SkippedDownload,
}
