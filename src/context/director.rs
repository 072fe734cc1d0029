//! Time-passage director notes
//!
//! Before a new turn is rendered, a synthetic director message may be
//! appended describing how much wall-clock time passed since the previous
//! message. The phrase always uses the single largest applicable unit, so a
//! 26-hour gap reads "1 days later", never "1 days 2 hours later".

use chrono::{DateTime, Local, Utc};

use super::{ConversationContext, Message, Sender};

/// Gaps at or below this many seconds produce no note
const MIN_GAP_SECS: i64 = 300;

/// Format for the current local date/time inside director notes
const NOTE_DATE_FORMAT: &str = "%A, %Y/%m/%d, %H:%M";

/// Coarse elapsed-time phrase, largest applicable unit only
///
/// Returns `None` when the gap is within [`MIN_GAP_SECS`]. Mirrors
/// day/seconds-of-day cascade semantics: whole days first, then hours and
/// minutes computed from the remaining seconds within the day. A gap over
/// five minutes that still lands below one whole minute of seconds-of-day
/// yields no phrase at all; that quirk is part of the contract.
fn elapsed_phrase(last: DateTime<Utc>, now: DateTime<Utc>) -> Option<String> {
    let delta = now - last;
    if delta.num_seconds() <= MIN_GAP_SECS {
        return None;
    }

    let days = delta.num_days();
    let seconds_of_day = (delta - chrono::Duration::days(days)).num_seconds();

    if days > 0 {
        Some(format!("{days} days"))
    } else if seconds_of_day >= 3600 {
        Some(format!("{} hours", seconds_of_day / 3600))
    } else if seconds_of_day >= 60 {
        Some(format!("{} minutes", seconds_of_day / 60))
    } else {
        None
    }
}

/// Append a time-passage director note when warranted
///
/// Called once per turn, immediately before prompt construction. An empty
/// log or a last message without a timestamp (the first-ever message) gets
/// an unconditional note carrying only the current date; otherwise a note is
/// appended only when more than five minutes have passed.
pub fn add_director_note_if_needed(context: &mut ConversationContext) {
    add_director_note_at(context, Utc::now(), Local::now());
}

/// Clock-injectable body of [`add_director_note_if_needed`]
pub(crate) fn add_director_note_at(
    context: &mut ConversationContext,
    now_utc: DateTime<Utc>,
    now_local: DateTime<Local>,
) {
    let formatted_date = now_local.format(NOTE_DATE_FORMAT);

    let Some(last_date) = context.last_message().and_then(|m| m.date) else {
        context.push(Message {
            sender: Sender::Director,
            date: Some(now_utc),
            text: format!(" It's {formatted_date}."),
        });
        return;
    };

    if let Some(phrase) = elapsed_phrase(last_date, now_utc) {
        tracing::debug!(%phrase, "injecting time-passage note");
        context.push(Message {
            sender: Sender::Director,
            date: Some(now_utc),
            text: format!("{phrase} later. It's {formatted_date}."),
        });
    }
}
