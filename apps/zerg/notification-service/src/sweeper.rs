//! Periodic expiry sweep
//!
//! The notification service never sweeps on its own; this job owns the
//! schedule.

use domain_notifications::{NotificationRepository, NotificationService};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};

/// Run one sweep, logging the outcome. Returns the number removed.
pub async fn sweep_once<R: NotificationRepository>(service: &NotificationService<R>) -> usize {
    match service.cleanup_expired_notifications().await {
        Ok(0) => {
            debug!("Expiry sweep found nothing to remove");
            0
        }
        Ok(removed) => {
            info!(removed, "Expiry sweep removed notifications");
            removed
        }
        Err(e) => {
            error!(error = %e, "Expiry sweep failed");
            0
        }
    }
}

/// Start a scheduler running [`sweep_once`] on `schedule` (cron with seconds).
///
/// The caller owns the returned scheduler and must `shutdown` it.
pub async fn start_sweeper<R>(
    service: Arc<NotificationService<R>>,
    schedule: &str,
) -> Result<JobScheduler>
where
    R: NotificationRepository + 'static,
{
    let sched = JobScheduler::new()
        .await
        .wrap_err("Failed to create sweep scheduler")?;

    let job = Job::new_async(schedule, move |_uuid, _l| {
        let service = service.clone();
        Box::pin(async move {
            sweep_once(&service).await;
        })
    })
    .wrap_err_with(|| format!("Invalid SWEEP_SCHEDULE '{}'", schedule))?;

    sched.add(job).await.wrap_err("Failed to register sweep job")?;
    sched.start().await.wrap_err("Failed to start sweep scheduler")?;

    info!(schedule = %schedule, "Expiry sweeper started");
    Ok(sched)
}
