use parking_lot::Mutex;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use super::context::ServiceContext;
use std::{sync::Arc, thread::JoinHandle as StdJoinHandle, time::Duration};
use tonic_health::{server::HealthReporter, proto::health_server::{Health, HealthServer}};

const LIVELINESS: &str = "LIVELINESS";
const READINESS:  &str = "READINESS";

const PULSE: u64 = 4000;
const TIMEOUT: u64 = 6000;

lazy_static! {
    pub static ref STORE_HEARTBEAT: Mutex<DateTime<Utc>> = Mutex::new(Utc::now());
}

///
/// Create a readiness monitor to respond to readiness probes.
///
/// If the store stops answering pings it will return NOT_SERVING.
///
pub async fn start(ctx: Arc<ServiceContext>) -> (HealthReporter, HealthServer<impl Health>) {
    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter.set_service_status(LIVELINESS, tonic_health::ServingStatus::Serving).await;
    health_reporter.set_service_status(READINESS, tonic_health::ServingStatus::Serving).await;

    tokio::spawn(monitor(ctx, health_reporter.clone()));
    tracing::info!("Health probe enabled for services {} and {}", LIVELINESS, READINESS);
    (health_reporter, health_service)
}

pub async fn shutdown(mut health_reporter: HealthReporter) {
    health_reporter.set_service_status(LIVELINESS, tonic_health::ServingStatus::NotServing).await;
    health_reporter.set_service_status(READINESS, tonic_health::ServingStatus::NotServing).await;
}

///
/// Watch the store heartbeat and flip readiness when it goes stale or recovers.
///
async fn monitor(ctx: Arc<ServiceContext>, mut reporter: HealthReporter) {
    let mut healthy = true;
    let _store_handle = start_store_heartbeat(ctx);

    loop {
        tokio::time::sleep(Duration::from_millis(PULSE)).await;

        let now_healthy = heartbeat_fresh(Utc::now());
        if now_healthy != healthy {
            if now_healthy {
                tracing::info!("Service healthy (store reachable)");
                reporter.set_service_status(READINESS, tonic_health::ServingStatus::Serving).await;

            } else {
                tracing::error!("Service NOT healthy (store unreachable)");
                reporter.set_service_status(READINESS, tonic_health::ServingStatus::NotServing).await;
            }
        }

        healthy = now_healthy;
    }
}

fn heartbeat_fresh(now: DateTime<Utc>) -> bool {
    let age = now - *STORE_HEARTBEAT.lock();

    tracing::trace!("Store heartbeat age {} < timeout {}", age.num_milliseconds(), TIMEOUT);
    age.num_milliseconds() < TIMEOUT as i64
}

///
/// A stalled MongoDB blocks the tokio threads it runs on, so the pings run on their own OS
/// thread with a dedicated single-threaded runtime. Without the thread the heartbeat goes
/// stale and readiness reports NOT_SERVING.
///
fn start_store_heartbeat(ctx: Arc<ServiceContext>) -> Option<StdJoinHandle<()>> {
    std::thread::Builder::new()
        .name("store-health".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(err) => {
                    tracing::error!("Unable to start the store health runtime: {}", err);
                    return
                },
            };

            rt.block_on(async {
                loop {
                    tracing::trace!("Pinging the store");

                    match ctx.store().ping().await {
                        Ok(()) => *STORE_HEARTBEAT.lock() = Utc::now(),
                        Err(err) => tracing::trace!("Store ping failed: {:?}", err),
                    };

                    tokio::time::sleep(Duration::from_millis(PULSE)).await;
                }
            })
        })
        .map_err(|err| tracing::error!("Unable to spawn the store health thread: {}", err))
        .ok()
}
