//! Game-number calendar
//!
//! The daily puzzle is numbered sequentially from a fixed epoch date, one
//! game per calendar day. The mapping is a pure function in both directions,
//! so a game number can always be recomputed from its date and vice versa.
//!
//! Day-boundary handling: the authoritative feed rolls its "day" over in its
//! home timezone, which rarely matches the clock of the machine running the
//! pipeline. `today_candidates` returns every calendar date the current
//! instant could plausibly mean, newest first, so collection can try each in
//! order until one succeeds.

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Epoch date: game number 0.
pub const EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(2021, 6, 19) {
    Some(d) => d,
    None => panic!("invalid epoch date"),
};

/// Earliest timezone on Earth to roll over to a new date (UTC+14).
const EARLIEST_ROLLOVER_OFFSET_SECS: i32 = 14 * 3600;

/// The authoritative feed's home offset (UTC-5).
const FEED_HOME_OFFSET_SECS: i32 = -5 * 3600;

/// Compute the game number for a calendar date.
///
/// Deterministic and strictly increasing with the date. Dates before the
/// epoch are rejected rather than mapped to negative numbers.
pub fn game_number(date: NaiveDate) -> Result<i64> {
    let days = date.signed_duration_since(EPOCH).num_days();
    if days < 0 {
        return Err(Error::Calendar(format!(
            "{} precedes the game epoch {}",
            date, EPOCH
        )));
    }
    Ok(days)
}

/// Inverse mapping: the calendar date a game number corresponds to.
pub fn date_for_game(game_number: i64) -> Result<NaiveDate> {
    if game_number < 0 {
        return Err(Error::Calendar(format!(
            "negative game number {}",
            game_number
        )));
    }
    EPOCH
        .checked_add_days(chrono::Days::new(game_number as u64))
        .ok_or_else(|| Error::Calendar(format!("game number {} overflows calendar", game_number)))
}

/// Calendar dates the instant `now` could mean for "today's puzzle".
///
/// Returns the date in the earliest-rollover timezone (UTC+14) followed by
/// the date in the feed's home timezone (UTC-5), deduplicated, newest first.
/// Collection tries each candidate until one yields a valid response, which
/// guards against running just before or after the feed's day boundary.
pub fn today_candidates(now: DateTime<Utc>) -> Vec<NaiveDate> {
    let earliest = FixedOffset::east_opt(EARLIEST_ROLLOVER_OFFSET_SECS)
        .map(|tz| now.with_timezone(&tz).date_naive());
    let home = FixedOffset::east_opt(FEED_HOME_OFFSET_SECS)
        .map(|tz| now.with_timezone(&tz).date_naive());

    let mut candidates: Vec<NaiveDate> = earliest.into_iter().chain(home).collect();
    candidates.sort_unstable();
    candidates.dedup();
    candidates.reverse(); // newest first
    candidates
}
