//! Placeholder results stored in a slot when an engine could not produce a translation.
//! They are recorded and displayed exactly like real results.

/// The MT service failed (mode switch or translation).
pub const MT_BUSY: &str = "伺服器忙碌";

/// No MT service is configured.
pub const MT_OFFLINE: &str = "未連線";

/// The generative service failed or is not configured.
pub const GENERATIVE_BUSY: &str = "AI 服務繁忙";

pub const ALL: [&str; 3] = [MT_BUSY, MT_OFFLINE, GENERATIVE_BUSY];

#[inline]
pub fn is_sentinel(text: &str) -> bool {
    ALL.iter().any(|s| *s == text)
}
