use time::{Duration, PrimitiveDateTime};

pub(crate) const DEFAULT_GRACE_PERIOD_SECONDS: i64 = 60;

pub(crate) fn time_limit_seconds(time_limit_minutes: Option<i32>) -> Option<i64> {
    time_limit_minutes.filter(|minutes| *minutes > 0).map(|minutes| i64::from(minutes) * 60)
}

pub(crate) fn compute_expires_at(
    started_at: PrimitiveDateTime,
    time_limit_minutes: Option<i32>,
) -> Option<PrimitiveDateTime> {
    time_limit_seconds(time_limit_minutes).map(|seconds| started_at + Duration::seconds(seconds))
}

/// Whole seconds between start and `now`, never negative.
pub(crate) fn elapsed_seconds(started_at: PrimitiveDateTime, now: PrimitiveDateTime) -> i64 {
    (now - started_at).whole_seconds().max(0)
}

/// An attempt is past its deadline once the elapsed time is strictly greater
/// than the limit plus grace. Unlimited quizzes never expire.
pub(crate) fn is_past_deadline(
    started_at: PrimitiveDateTime,
    time_limit_minutes: Option<i32>,
    grace_period_seconds: i64,
    now: PrimitiveDateTime,
) -> bool {
    match time_limit_seconds(time_limit_minutes) {
        Some(limit) => elapsed_seconds(started_at, now) > limit + grace_period_seconds.max(0),
        None => false,
    }
}
