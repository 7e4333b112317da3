//! # Calendar-driven repeat (`Crontab`).
//!
//! [`Crontab`] sleeps until the next fire time of a cron expression, runs its child,
//! and repeats. A fire can be **muted**:
//! - by an explicit `[begin, end)` window ([`Crontab::mute`]);
//! - by a weekday class: [`Crontab::workday`] mutes Saturday/Sunday fires,
//!   [`Crontab::weekend`] mutes Monday..Friday fires.
//!
//! A muted fire still advances the schedule; the child is simply not invoked.
//!
//! ## Expressions
//! - 5 fields (`min hour dom month dow`): standard cron. A `0` seconds field is
//!   prepended and numeric weekdays use `0`-`7` with Sunday as `0` or `7`.
//! - 6 or 7 fields (`sec min hour dom month dow [year]`) and `@daily`-style macros
//!   are passed to the [`cron`] crate as is: numeric weekdays there use `1`-`7`
//!   with Sunday as `1`. Names (`MON-FRI`) mean the same in both forms.
//!
//! ## Exit conditions
//! - child failure → its error;
//! - schedule exhausted → [`ExecError::NoMorePlan`] (also on the very first evaluation);
//! - context cancelled while waiting → the context error.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Local, Weekday};
use cron::Schedule;
use tracing::debug;

use crate::context::Context;
use crate::error::ExecError;
use crate::executors::executor::{Executor, ExecutorRef};

#[derive(Clone, Copy, Debug)]
struct CronFireTime(DateTime<Local>);

/// Scheduled fire time of the current [`Crontab`] run, if any.
pub fn cron_fire_time(ctx: &Context) -> Option<DateTime<Local>> {
    ctx.value::<CronFireTime>().map(|t| t.0)
}

/// Half-open time window `[begin, end)` during which fires are skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MuteWindow {
    /// First muted instant.
    pub begin: DateTime<Local>,
    /// First instant after the window.
    pub end: DateTime<Local>,
}

impl MuteWindow {
    /// True if `tm` falls inside the window.
    pub fn contains(&self, tm: &DateTime<Local>) -> bool {
        self.begin <= *tm && *tm < self.end
    }
}

/// Cron-scheduled executor with mute windows.
#[derive(Clone)]
pub struct Crontab {
    plan: String,
    workday: bool,
    weekend: bool,
    mutes: Vec<MuteWindow>,
    exec: ExecutorRef,
}

impl Crontab {
    /// Creates a schedule for `plan` running `exec`.
    pub fn new(plan: impl Into<String>, exec: ExecutorRef) -> Self {
        Self {
            plan: plan.into(),
            workday: false,
            weekend: false,
            mutes: Vec::new(),
            exec,
        }
    }

    /// Runs on workdays only (mutes Saturday and Sunday).
    pub fn workday(mut self, flag: bool) -> Self {
        self.workday = flag;
        self
    }

    /// Runs on weekends only (mutes Monday to Friday).
    pub fn weekend(mut self, flag: bool) -> Self {
        self.weekend = flag;
        self
    }

    /// Clears both weekday filters.
    pub fn everyday(mut self) -> Self {
        self.workday = false;
        self.weekend = false;
        self
    }

    /// Adds a `[begin, end)` mute window.
    pub fn mute(mut self, begin: DateTime<Local>, end: DateTime<Local>) -> Self {
        self.mutes.push(MuteWindow { begin, end });
        self
    }

    /// True if a fire at `tm` would be skipped.
    pub fn is_muted(&self, tm: &DateTime<Local>) -> bool {
        if self.mutes.iter().any(|m| m.contains(tm)) {
            return true;
        }
        match tm.weekday() {
            Weekday::Sat | Weekday::Sun => self.workday,
            _ => self.weekend,
        }
    }

    /// Parses the configured expression.
    pub fn schedule(&self) -> Result<Schedule, ExecError> {
        let plan = self.plan.trim();
        let fields: Vec<&str> = plan.split_whitespace().collect();
        let normalized = match fields.as_slice() {
            [min, hour, dom, month, dow] if !plan.starts_with('@') => {
                let dow = weekdays_to_cron(dow).ok_or_else(|| {
                    ExecError::Config(format!("cron expression {:?}: bad day-of-week {dow:?}", self.plan))
                })?;
                format!("0 {min} {hour} {dom} {month} {dow}")
            }
            _ => plan.to_string(),
        };
        Schedule::from_str(&normalized)
            .map_err(|e| ExecError::Config(format!("cron expression {:?}: {e}", self.plan)))
    }

    /// Next fire time strictly after `from`, or `None` when the schedule is exhausted.
    pub fn upcoming(schedule: &Schedule, from: &DateTime<Local>) -> Option<DateTime<Local>> {
        schedule.after(from).next()
    }
}

/// Rewrites a standard day-of-week field (`0`-`7`, Sunday = 0 or 7) into the
/// `cron` crate's numbering (`1`-`7`, Sunday = 1).
///
/// Numeric items (single days, ranges, steps) are expanded to an explicit day list;
/// `*`, `?` and named items are kept. Returns `None` for out-of-range numbers.
fn weekdays_to_cron(field: &str) -> Option<String> {
    let mut days = BTreeSet::new();
    let mut kept = Vec::new();

    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) => (base, Some(step.parse::<usize>().ok()?)),
            None => (item, None),
        };
        let day = |s: &str| s.parse::<u32>().ok();
        let bounds = match base.split_once('-') {
            _ if base == "*" || base == "?" => step.map(|_| (0, 6)),
            Some((lo, hi)) => day(lo).zip(day(hi)),
            None => day(base).map(|lo| (lo, if step.is_some() { 7 } else { lo })),
        };
        let Some((lo, hi)) = bounds else {
            kept.push(item.to_string());
            continue;
        };
        if hi > 7 || lo > hi || step == Some(0) {
            return None;
        }
        days.extend((lo..=hi).step_by(step.unwrap_or(1)).map(|d| d % 7 + 1));
    }

    let list: Vec<String> = days.iter().map(u32::to_string).chain(kept).collect();
    Some(list.join(","))
}

#[async_trait]
impl Executor for Crontab {
    async fn execute(&self, ctx: Context) -> Result<(), ExecError> {
        let schedule = self.schedule()?;
        let mut next = Self::upcoming(&schedule, &Local::now()).ok_or(ExecError::NoMorePlan)?;

        loop {
            let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = ctx.cancelled() => return Err(ctx.err().unwrap_or(ExecError::Canceled)),
            }

            if self.is_muted(&next) {
                debug!(plan = %self.plan, fire = %next, "cron fire muted");
            } else {
                self.exec.execute(ctx.with_value(CronFireTime(next))).await?;
            }

            // Never re-fire the same slot when the timer wakes slightly early.
            let from = Local::now().max(next);
            next = Self::upcoming(&schedule, &from).ok_or(ExecError::NoMorePlan)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::ExecutorFn;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).single().unwrap()
    }

    fn never_called(counter: &Arc<AtomicUsize>) -> ExecutorRef {
        let counter = counter.clone();
        ExecutorFn::arc(move |_ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn exhausted_schedule_fails_before_running() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cron = Crontab::new("0 0 0 1 1 * 2001", never_called(&counter));
        let err = cron.execute(Context::background()).await.unwrap_err();
        assert!(matches!(err, ExecError::NoMorePlan));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_expression_is_config_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cron = Crontab::new("not a cron line", never_called(&counter));
        let err = cron.execute(Context::background()).await.unwrap_err();
        assert!(matches!(err, ExecError::Config(_)));
    }

    #[test]
    fn five_field_expressions_get_seconds() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cron = Crontab::new("30 4 * * *", never_called(&counter));
        let schedule = cron.schedule().unwrap();
        let next = Crontab::upcoming(&schedule, &local(2024, 3, 1, 0)).unwrap();
        assert_eq!(next, Local.with_ymd_and_hms(2024, 3, 1, 4, 30, 0).single().unwrap());
    }

    fn fire_days(plan: &str, from: DateTime<Local>, n: usize) -> Vec<Weekday> {
        let counter = Arc::new(AtomicUsize::new(0));
        let schedule = Crontab::new(plan, never_called(&counter)).schedule().unwrap();
        schedule.after(&from).take(n).map(|t| t.weekday()).collect()
    }

    #[test]
    fn five_field_weekdays_use_standard_numbering() {
        use Weekday::*;
        // 2024-03-02 is a Saturday.
        let saturday = local(2024, 3, 2, 12);

        assert_eq!(fire_days("0 9 * * 1-5", saturday, 5), [Mon, Tue, Wed, Thu, Fri]);
        assert_eq!(fire_days("0 9 * * 0", saturday, 2), [Sun, Sun]);
        assert_eq!(fire_days("0 9 * * 7", saturday, 2), [Sun, Sun]);
        assert_eq!(fire_days("0 9 * * 5-7", saturday, 3), [Sun, Fri, Sat]);
        assert_eq!(fire_days("0 9 * * 1,3", saturday, 2), [Mon, Wed]);
        assert_eq!(fire_days("0 9 * * */2", saturday, 4), [Sun, Tue, Thu, Sat]);
        assert_eq!(fire_days("0 9 * * MON-FRI", saturday, 1), [Mon]);

        let counter = Arc::new(AtomicUsize::new(0));
        let first = Crontab::new("0 9 * * 1-5", never_called(&counter)).schedule().unwrap();
        let next = Crontab::upcoming(&first, &saturday).unwrap();
        assert_eq!(next, Local.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).single().unwrap());
    }

    #[test]
    fn out_of_range_weekday_is_config_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let err = Crontab::new("0 9 * * 8", never_called(&counter)).schedule().unwrap_err();
        assert!(matches!(err, ExecError::Config(_)));
    }

    #[test]
    fn six_field_weekdays_follow_cron_crate() {
        use Weekday::*;
        // Sunday is 1 when the seconds field is given explicitly.
        assert_eq!(fire_days("0 0 9 * * 2-6", local(2024, 3, 2, 12), 5), [Mon, Tue, Wed, Thu, Fri]);
    }

    #[test]
    fn weekday_filters() {
        let counter = Arc::new(AtomicUsize::new(0));
        // 2024-03-02 is a Saturday, 2024-03-04 a Monday.
        let saturday = local(2024, 3, 2, 12);
        let monday = local(2024, 3, 4, 12);

        let workdays = Crontab::new("* * * * * *", never_called(&counter)).workday(true);
        assert!(workdays.is_muted(&saturday));
        assert!(!workdays.is_muted(&monday));

        let weekends = Crontab::new("* * * * * *", never_called(&counter)).weekend(true);
        assert!(!weekends.is_muted(&saturday));
        assert!(weekends.is_muted(&monday));

        let every = weekends.everyday();
        assert!(!every.is_muted(&saturday));
        assert!(!every.is_muted(&monday));
    }

    #[test]
    fn mute_window_is_half_open() {
        let counter = Arc::new(AtomicUsize::new(0));
        let begin = local(2024, 3, 4, 10);
        let end = local(2024, 3, 4, 11);
        let cron = Crontab::new("* * * * * *", never_called(&counter)).mute(begin, end);
        assert!(cron.is_muted(&begin));
        assert!(cron.is_muted(&(begin + chrono::Duration::minutes(30))));
        assert!(!cron.is_muted(&end));
        assert!(!cron.is_muted(&local(2024, 3, 4, 9)));
    }

    #[tokio::test]
    async fn muted_fire_is_skipped_and_schedule_advances() {
        let fires = Arc::new(Mutex::new(Vec::new()));
        let recorder = {
            let fires = fires.clone();
            ExecutorFn::arc(move |ctx| {
                let fires = fires.clone();
                async move {
                    fires.lock().unwrap().push(cron_fire_time(&ctx));
                    Ok(())
                }
            })
        };

        let now = Local::now();
        let every_second = Crontab::new("* * * * * *", recorder.clone());
        let first = Crontab::upcoming(&every_second.schedule().unwrap(), &now).unwrap();
        let window_end = first + chrono::Duration::milliseconds(500);
        let cron = every_second.mute(now, window_end);

        let ctx = Context::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2600)).await;
            canceller.cancel();
        });

        let err = cron.execute(ctx).await.unwrap_err();
        assert!(matches!(err, ExecError::Canceled));

        let fires = fires.lock().unwrap();
        assert!(!fires.is_empty(), "schedule did not advance past the muted fire");
        for fire in fires.iter() {
            let fire = fire.expect("fire time missing from context");
            assert!(fire >= window_end, "muted fire {fire} was executed");
        }
    }
}
