use crate::{CandelaError, Job, Window};

/// Window start timestamps needed to cover `[start, now)` in steps of `step_ms`.
///
/// - The first element is always `start`, even when `start >= now`, so a job
///   always issues at least one request.
/// - Subsequent starts advance by exactly `step_ms` while they stay below `now`.
///
/// ```
/// use candela_core::timeseries::planner::plan;
///
/// assert_eq!(plan(0, 25, 10).unwrap(), vec![0, 10, 20]);
/// assert_eq!(plan(0, 30, 10).unwrap(), vec![0, 10, 20]);
/// assert_eq!(plan(50, 10, 10).unwrap(), vec![50]);
/// ```
///
/// # Errors
/// Returns `InvalidConfiguration` if `step_ms <= 0`.
pub fn plan(start: i64, now: i64, step_ms: i64) -> Result<Vec<i64>, CandelaError> {
    if step_ms <= 0 {
        return Err(CandelaError::invalid_config(format!(
            "window step must be positive, got {step_ms}"
        )));
    }
    let mut out = vec![start];
    let mut t = start;
    while let Some(next) = t.checked_add(step_ms) {
        if next >= now {
            break;
        }
        out.push(next);
        t = next;
    }
    Ok(out)
}

/// Plan the indexed request windows of a job against a snapshot of `now`.
///
/// # Errors
/// Returns `InvalidConfiguration` if the job's limit or timeframe duration is
/// non-positive.
pub fn plan_windows(job: &Job, now: i64) -> Result<Vec<Window>, CandelaError> {
    let step = job.step_ms()?;
    Ok(plan(job.start, now, step)?
        .into_iter()
        .enumerate()
        .map(|(index, start)| Window {
            index,
            start,
            limit: job.provider_limit,
        })
        .collect())
}
