use std::fmt;

/// Retrieval tiers, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalTier {
    /// Previously prefetched local file.
    Cache,
    /// Time-limited signed URL from the generation backend.
    Direct,
    /// Authenticated download endpoint keyed by resource id.
    Proxy,
}

impl fmt::Display for RetrievalTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RetrievalTier::Cache => "cache",
            RetrievalTier::Direct => "direct",
            RetrievalTier::Proxy => "proxy",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Success,
    /// Tier not applicable (no cached file, no direct URL).
    Miss,
    Error,
}

/// What happened at one tier of one retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalAttempt {
    pub tier: RetrievalTier,
    pub outcome: RetrievalOutcome,
    pub detail: String,
}

impl RetrievalAttempt {
    pub(super) fn new(tier: RetrievalTier, outcome: RetrievalOutcome, detail: impl Into<String>) -> Self {
        Self {
            tier,
            outcome,
            detail: detail.into(),
        }
    }
}
