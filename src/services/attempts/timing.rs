use time::{Duration, PrimitiveDateTime};

/// `None` when the exam has no time limit.
pub(crate) fn deadline(
    started_at: PrimitiveDateTime,
    time_limit_minutes: Option<i32>,
) -> Option<PrimitiveDateTime> {
    time_limit_minutes.map(|minutes| started_at + Duration::minutes(i64::from(minutes)))
}

/// Strictly past the limit; an attempt exactly at its deadline is still live.
pub(crate) fn is_expired(
    started_at: PrimitiveDateTime,
    time_limit_minutes: Option<i32>,
    now: PrimitiveDateTime,
) -> bool {
    deadline(started_at, time_limit_minutes).is_some_and(|deadline| now > deadline)
}

pub(crate) fn remaining_seconds(
    started_at: PrimitiveDateTime,
    time_limit_minutes: Option<i32>,
    now: PrimitiveDateTime,
) -> Option<i64> {
    deadline(started_at, time_limit_minutes)
        .map(|deadline| (deadline - now).whole_seconds().max(0))
}
