//! Unique, timestamp-qualified file names.

use chrono::Utc;
use uuid::Uuid;

/// `prefix` + UTC timestamp + short random tag + `suffix`.
///
/// Names sort by creation time and never collide within a process.
pub fn unique_timestamped_name(prefix: &str, suffix: &str) -> String {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S%.6f");
    format!("{prefix}{stamp}-{}{suffix}", short_tag())
}

/// Eight random hex characters.
pub fn short_tag() -> String {
    let mut tag = Uuid::new_v4().simple().to_string();
    tag.truncate(8);
    tag
}
