use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Utc, Weekday};
use tokio::task::JoinHandle;

/// Seoul is UTC+9 year-round.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("valid KST offset")
}

type JobFn = Arc<dyn Fn() + Send + Sync>;

/// When a weekly job fires, expressed in a fixed-offset local timezone.
#[derive(Debug, Clone, Copy)]
pub struct WeeklySchedule {
    pub weekday: Weekday,
    pub at: NaiveTime,
    pub offset: FixedOffset,
}

impl WeeklySchedule {
    /// First fire time strictly after `after`.
    pub fn next_fire(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let local = after.with_timezone(&self.offset);
        let days_ahead = (self.weekday.num_days_from_monday() + 7
            - local.weekday().num_days_from_monday())
            % 7;
        let date = local.date_naive() + Duration::days(days_ahead as i64);

        // A fixed offset maps every local time to exactly one instant.
        let mut fire = match date.and_time(self.at).and_local_timezone(self.offset) {
            chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
            _ => after + Duration::weeks(1),
        };
        if fire <= after {
            fire += Duration::weeks(1);
        }
        fire
    }
}

struct Job {
    schedule: WeeklySchedule,
    run: JobFn,
}

/// Owned job scheduler. Jobs are registered by name before `start`;
/// registering the same name again replaces the previous job, so repeated
/// startup paths cannot double-schedule work.
pub struct Scheduler {
    jobs: HashMap<&'static str, Job>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
            handles: Vec::new(),
        }
    }

    pub fn register<F>(&mut self, name: &'static str, schedule: WeeklySchedule, run: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let replaced = self
            .jobs
            .insert(
                name,
                Job {
                    schedule,
                    run: Arc::new(run),
                },
            )
            .is_some();
        if replaced {
            tracing::debug!(job = name, "replaced scheduled job");
        }
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Spawns one task per registered job. Job bodies are blocking and run
    /// on the blocking thread pool.
    pub fn start(&mut self) {
        for (name, job) in &self.jobs {
            let name = *name;
            let schedule = job.schedule;
            let run = job.run.clone();

            let handle = tokio::spawn(async move {
                loop {
                    let fire_at = schedule.next_fire(Utc::now());
                    let wait = (fire_at - Utc::now()).to_std().unwrap_or_default();
                    tracing::info!(job = name, fire_at = %fire_at, "job scheduled");
                    tokio::time::sleep(wait).await;

                    let run = run.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || run()).await {
                        tracing::error!(job = name, error = %e, "scheduled job panicked");
                    }
                }
            });
            self.handles.push(handle);
        }
        tracing::info!(jobs = self.jobs.len(), "scheduler started");
    }

    /// Aborts all running job tasks.
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        tracing::info!("scheduler shut down");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn monday_ten_kst() -> WeeklySchedule {
        WeeklySchedule {
            weekday: Weekday::Mon,
            at: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            offset: kst(),
        }
    }

    #[test]
    fn fires_on_the_coming_monday() {
        // Wednesday 2025-06-04 00:00 UTC; Monday 10:00 KST is 01:00 UTC.
        let after = Utc.with_ymd_and_hms(2025, 6, 4, 0, 0, 0).unwrap();
        let fire = monday_ten_kst().next_fire(after);
        assert_eq!(fire, Utc.with_ymd_and_hms(2025, 6, 9, 1, 0, 0).unwrap());
    }

    #[test]
    fn fires_same_day_when_time_is_still_ahead() {
        // Monday 09:00 KST
        let after = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let fire = monday_ten_kst().next_fire(after);
        assert_eq!(fire, Utc.with_ymd_and_hms(2025, 6, 2, 1, 0, 0).unwrap());
    }

    #[test]
    fn exact_fire_time_rolls_to_next_week() {
        // Monday 10:00 KST on the dot
        let after = Utc.with_ymd_and_hms(2025, 6, 2, 1, 0, 0).unwrap();
        let fire = monday_ten_kst().next_fire(after);
        assert_eq!(fire, Utc.with_ymd_and_hms(2025, 6, 9, 1, 0, 0).unwrap());
    }

    #[test]
    fn registering_twice_replaces_the_job() {
        let mut scheduler = Scheduler::new();
        scheduler.register("weekly-recommendations", monday_ten_kst(), || {});
        scheduler.register("weekly-recommendations", monday_ten_kst(), || {});
        assert_eq!(scheduler.job_count(), 1);
    }
}
