use parking_lot::Mutex;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use super::context::ServiceContext;
use crate::db::mongo;
use std::{sync::Arc, thread::JoinHandle as StdJoinHandle, time::Duration};
use tonic_health::{server::HealthReporter, proto::health_server::{Health, HealthServer}};

const LIVELINESS: &str = "LIVELINESS";
const READINESS:  &str = "READINESS";

const PULSE: u64 = 4000;
const TIMEOUT: u64 = 6000;

lazy_static! {
    pub static ref MONGODB_HEARTBEAT: Mutex<DateTime<Utc>> = Mutex::new(Utc::now());

    // A stalled MongoDB will block the runtime, so spawn a new one to monitor the health.
    static ref RT: tokio::runtime::Runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .enable_io()
        .max_blocking_threads(2)
        .worker_threads(1)
        .thread_name("mongodb-health")
        .build()
        .unwrap();
}

///
/// Create a readiness monitor to respond to readiness probes.
///
/// If downstream connection issues are detected it will return NOT_SERVING.
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
/// Monitor MongoDB and flip our readiness if it becomes un-contactable.
///
async fn monitor(ctx: Arc<ServiceContext>, mut reporter: HealthReporter) {

    let mut mongo = true;

    let _mongo_handle = start_mongo_heartbeat(ctx);

    loop {
        // We'll keep checking the heartbeat as each pulse ticks.
        tokio::time::sleep(Duration::from_millis(PULSE)).await;

        let new_mongo = mongo_healthy().await;

        if new_mongo != mongo {
            if new_mongo {
                tracing::info!("Service healthy (MongoDB contactable again)");
                reporter.set_service_status(READINESS, tonic_health::ServingStatus::Serving).await;

            } else {
                tracing::error!("Service NOT healthy (MongoDB not contactable)");
                reporter.set_service_status(READINESS, tonic_health::ServingStatus::NotServing).await;
            }
        }

        mongo = new_mongo;
    }
}

///
/// Compare when the last heartbeat was received to the timeout.
///
async fn mongo_healthy() -> bool {
    let duration: chrono::Duration = {
        let lock = MONGODB_HEARTBEAT.lock();
        let last_heartbeat: DateTime<Utc> = *lock;
        Utc::now() - last_heartbeat
    };

    let limit = TIMEOUT as i64;

    tracing::trace!("MongoDB heartbeat age {} < timeout {}", duration.num_milliseconds(), limit);
    duration.num_milliseconds() < limit
}

///
/// Start a new OS thread with an async runtime - use this to monitor MongoDB. We need
/// the OS thread because a stalled Mongo will block the tokio threads, so this way
/// we can use the async runtime in isolation from the main app.
///
fn start_mongo_heartbeat(ctx: Arc<ServiceContext>) -> StdJoinHandle<()> {
    let handle = RT.handle();

    std::thread::spawn(move || {
        handle.block_on(async {
            loop {
                tracing::trace!("Pinging MongoDB");

                match mongo::ping(ctx.db()).await {
                    Ok(_doc) => {
                        let mut lock = MONGODB_HEARTBEAT.lock();
                        *lock = Utc::now();
                    },
                    Err(err) => {
                        tracing::trace!("Mongo ping failed: {:?}", err);
                    },
                };

                tokio::time::sleep(Duration::from_millis(PULSE)).await;
            }
        })
    })
}
