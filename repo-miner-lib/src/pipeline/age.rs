use chrono::{DateTime, Utc};

/// Whole calendar years between `created_at` and `now`, never rounded up.
///
/// A creation time in the future yields zero.
#[must_use]
pub fn age_years(created_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    now.years_since(created_at).unwrap_or(0)
}
