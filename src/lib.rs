pub mod auth;
pub mod db;
pub mod model;
pub mod utils;
mod services;

use db::mongo;
use utils::health;
use tokio::signal;
use dotenv::dotenv;
use std::sync::Arc;
use utils::errors::{ErrorCode, GateError};
use utils::context::ServiceContext;
use utils::config::{Configuration, self};
use grpc::api::gatehouse_server::GatehouseServer;
use grpc::admin::admin_server::AdminServer;
use tokio::sync::oneshot::{self};
use tonic::transport::{Identity, Server, ServerTlsConfig};
use opentelemetry::{global, sdk::{propagation::TraceContextPropagator, trace, trace::Sampler}};
use tracing_subscriber::{prelude::__tracing_subscriber_SubscriberExt, Registry, util::SubscriberInitExt};

///
/// These are the generated gRPC/protobuf modules which give us access to the message structures,
/// services, servers and clients to talk to our APIs. The services are implemented in services/mod.rs
///
pub mod grpc {
    pub mod common {
        tonic::include_proto!("grpc.common");
    }

    pub mod api {
        tonic::include_proto!("grpc.gatehouse");
    }

    pub mod admin {
        tonic::include_proto!("grpc.admin");
    }
}

const APP_NAME: &str = "Gatehouse";

///
/// Entry point to start the app.
///
pub async fn lib_main() -> Result<(), GateError> {

    // Load any local dev settings as environment variables from a .env file.
    dotenv().ok();

    // Default log level to INFO if it's not specified.
    config::default_env("RUST_LOG", "INFO");

    // SIGINT/ctrl+c handling for graceful shutdown.
    let (signal_tx, signal_rx) = oneshot::channel();
    let _signal = tokio::spawn(wait_for_signal(signal_tx));

    // Load the service configuration into struct and initialise any lazy statics.
    let config = Configuration::from_env().expect("The service configuration is not correct");

    // Initialise open-telemetry distributed tracing.
    let tracing = init_tracing(&config);

    tracing::info!("{}\n{}", BANNER, config.fmt_console()?);

    // TLS set-up - optional, local dev runs in the clear.
    let identity = init_tls(&config).await?;

    // Create a MongoDB client and connect to it before proceeding.
    let db = mongo::get_mongo_db(APP_NAME, &config).await?;

    // Ensure the schema is in sync with the code.
    mongo::update_mongo(&db).await?;

    // The service context gives every gRPC endpoint access to the authenticator, db and clock.
    let ctx = Arc::new(ServiceContext::new(config.clone(), db));

    let (health_reporter, health_service) = health::start(ctx.clone()).await;

    let addr = config.address.parse()
        .map_err(|err| ErrorCode::InvalidAddress.with_msg(&format!("Unable to parse address {}: {}", config.address, err)))?;

    let mut builder = Server::builder();

    if let Some(identity) = identity {
        builder = builder.tls_config(ServerTlsConfig::new().identity(identity))?;
        tracing::info!("{} listening on {} and using tls", APP_NAME, addr);
    } else {
        tracing::info!("{} listening on {}", APP_NAME, addr);
    }

    let server = builder
        .add_service(GatehouseServer::new(ctx.clone()))
        .add_service(AdminServer::new(ctx.clone()))
        .add_service(health_service)
        .serve_with_shutdown(addr, async {
            signal_rx.await.ok();
            tracing::info!("Graceful shutdown");
        });

    server.await?;

    health::shutdown(health_reporter).await;

    if tracing {
        opentelemetry::global::shutdown_tracer_provider(); // sending remaining spans
    }

    Ok(())
}

///
/// Sends a oneshot signal when a SIGINT is received (Ctrl+C)
///
async fn wait_for_signal(tx: oneshot::Sender<()>) {
    let _ = signal::ctrl_c().await;
    tracing::info!("SIGINT received: shutting down");
    let _ = tx.send(());
}

///
/// Bind to the server-side key and certificate, if configured.
///
async fn init_tls(config: &Configuration) -> Result<Option<Identity>, GateError> {

    let (cert_path, key_path) = match (&config.tls_cert, &config.tls_key) {
        (Some(cert), Some(key)) => (cert, key),
        _ => return Ok(None),
    };

    tracing::info!("Initialising TLS config");

    let cert = tokio::fs::read(cert_path)
        .await
        .map_err(|e| ErrorCode::IOError.with_msg(&format!("Failed to open pem {}: {}", cert_path, e)))?;

    let key = tokio::fs::read(key_path)
        .await
        .map_err(|e| ErrorCode::IOError.with_msg(&format!("Failed to open key {}: {}", key_path, e)))?;

    Ok(Some(Identity::from_pem(cert, key)))
}

///
/// Initialise tracing and plug-in the Jaeger feature if enabled.
///
fn init_tracing(config: &Configuration) -> bool {
    global::set_text_map_propagator(TraceContextPropagator::new());

    match config.distributed_tracing {
        true => { // Install the Jaeger pipeline.
            let tracer = opentelemetry_jaeger::new_pipeline()
                .with_service_name(APP_NAME)
                .with_trace_config(trace::config().with_sampler(Sampler::AlwaysOn))
                .with_agent_endpoint(config.jaeger_endpoint.clone().unwrap_or_default())
                .install_batch(opentelemetry::runtime::Tokio)
                .expect("Unable to build Jaeger pipeline");

            if let Err(err) = Registry::default()
                .with(tracing_subscriber::EnvFilter::from_default_env()) // Set the tracing level to match RUST_LOG env variable.
                .with(tracing_subscriber::fmt::layer().with_test_writer().with_ansi(true))
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init() {
                    tracing::info!("Tracing already initialised: {}", err.to_string()); // Allowed error here - tests call this fn repeatedly.
            }

            true
        },
        false => {
            if let Err(err) = Registry::default()
                .with(tracing_subscriber::EnvFilter::from_default_env()) // Set the tracing level to match RUST_LOG env variable.
                .with(tracing_subscriber::fmt::layer().with_test_writer().with_ansi(true))
                .try_init() {
                    tracing::info!("Tracing already initialised: {}", err.to_string()); // Allowed error here - tests call this fn repeatedly.
            }

            false
        }
    }
}

const BANNER: &str = r#"
  ________        __         .__
 /  _____/_____ _/  |_  ____ |  |__   ____  __ __  ______ ____
/   \  ___\__  \\   __\/ __ \|  |  \ /  _ \|  |  \/  ___// __ \
\    \_\  \/ __ \|  | \  ___/|   Y  (  <_> )  |  /\___ \\  ___/
 \______  (____  /__|  \___  >___|  /\____/|____//____  >\___  >
        \/     \/          \/     \/                  \/     \/
"#;
