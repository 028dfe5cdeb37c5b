mod auth;
mod db;
mod model;
mod services;
pub mod utils;

use tokio::signal;
use dotenv::dotenv;
use std::sync::Arc;
use std::net::SocketAddr;
use utils::health;
use utils::errors::WardenError;
use utils::context::ServiceContext;
use crate::utils::errors::ErrorCode;
use auth::revocation::sweep_periodically;
use model::algorithm::argon::ArgonPolicy;
use utils::config::{Configuration, self};
use grpc::api::warden_server::WardenServer;
use grpc::admin::admin_server::AdminServer;
use tokio::sync::oneshot::{self};
use tonic::transport::{Identity, Server, ServerTlsConfig};
use opentelemetry::{global, sdk::{propagation::TraceContextPropagator,trace,trace::Sampler}};
use tracing_subscriber::{prelude::__tracing_subscriber_SubscriberExt, Registry, util::SubscriberInitExt};

///
/// These are the generated gRPC/protobuf modules which give us access to the message structures, services,
/// servers and clients to talk to our APIs. The services are implemented in services/mod.rs
///
pub mod grpc {
    pub mod common {
        tonic::include_proto!("grpc.common");
    }

    pub mod api {
        tonic::include_proto!("grpc.warden");
    }

    pub mod admin {
        tonic::include_proto!("grpc.admin");
    }
}

const APP_NAME: &str = "Warden";

///
/// Entry point to start the app.
///
pub async fn lib_main() -> Result<(), WardenError> {

    // Load any local dev settings as environment variables from a .env file.
    dotenv().ok();

    // Default log level to INFO if it's not specified.
    config::default_env("RUST_LOG", "INFO");

    // SIGINT/ctrl+c handling for graceful shutdown.
    let (signal_tx, signal_rx) = oneshot::channel();
    let _signal = tokio::spawn(wait_for_signal(signal_tx));

    // Load the service configuration into struct.
    let config = Configuration::from_env()?;

    let exporting_spans = init_tracing(&config)?;

    tracing::info!("{}\n{}", BANNER, config.fmt_console()?);

    // Refuse to start with argon parameters that can't produce a hash.
    ArgonPolicy::from(&config).check()?;

    // TLS set-up.
    let identity = init_tls(&config).await?;

    // Connect to the configured store before proceeding.
    let store = db::connect(APP_NAME, &config).await?;

    // The service context allows any gRPC service access to shared stuff (store, auth services, clock, etc.).
    let ctx = Arc::new(ServiceContext::new(&config, store));

    let (mut health_reporter, health_service) = health::start(ctx.clone()).await;
    health_reporter
        .set_serving::<WardenServer<Arc<ServiceContext>>>()
        .await;

    // Expired blacklist entries are purged in the background.
    tokio::spawn(sweep_periodically(
        ctx.registry().clone(),
        std::time::Duration::from_secs(config.revocation_sweep_seconds.max(1))));

    // The address we'll serve on.
    let addr: SocketAddr = config.address.parse()
        .map_err(|err| ErrorCode::InvalidConfig.with_msg(&format!("Invalid address {}: {}", config.address, err)))?;

    let mut builder = Server::builder();
    if let Some(identity) = identity {
        builder = builder.tls_config(ServerTlsConfig::new().identity(identity))?;
    }

    tracing::info!("{} listening on {}{}", APP_NAME, addr, if config.tls_cert.is_some() { " and using tls" } else { "" });

    // The admin service moves the clock and reads outbound mail. It is only routed when enabled.
    if config.admin_api {
        tracing::warn!("The unauthenticated admin API is enabled on {}", addr);
    }

    let server = builder
        .add_service(WardenServer::new(ctx.clone()))
        .add_optional_service(config.admin_api.then(|| AdminServer::new(ctx.clone())))
        .add_service(health_service)
        .serve_with_shutdown(addr, async {
            signal_rx.await.ok();
            tracing::info!("Graceful shutdown");
        });

    server.await?;

    health::shutdown(health_reporter).await;

    if exporting_spans {
        global::shutdown_tracer_provider(); // Flush anything still buffered.
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
/// Bind to the server-side key and certificate. TLS is off unless both are configured.
///
async fn init_tls(config: &Configuration) -> Result<Option<Identity>, WardenError> {
    let (cert, key) = match (&config.tls_cert, &config.tls_key) {
        (Some(cert), Some(key)) => (cert, key),
        (None, None) => return Ok(None),
        _ => return Err(ErrorCode::InvalidConfig.with_msg("Both TLS_CERT and TLS_KEY are required for TLS")),
    };

    tracing::info!("Initialising TLS config");

    let cert = tokio::fs::read(cert)
        .await
        .map_err(|e| ErrorCode::IOError.with_msg(&format!("Failed to open pem: {}", e)))?;

    let key = tokio::fs::read(key)
        .await
        .map_err(|e| ErrorCode::IOError.with_msg(&format!("Failed to open key: {}", e)))?;

    Ok(Some(Identity::from_pem(cert, key)))
}

///
/// Install the subscriber: RUST_LOG filtering, console output and, when distributed tracing is
/// on, span export to Jaeger. Returns true if spans are being exported.
///
fn init_tracing(config: &Configuration) -> Result<bool, WardenError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let jaeger = match config.distributed_tracing {
        true => {
            let tracer = opentelemetry_jaeger::new_pipeline()
                .with_service_name(APP_NAME)
                .with_trace_config(trace::config().with_sampler(Sampler::AlwaysOn))
                .with_agent_endpoint(config.jaeger_endpoint.clone().unwrap_or_default())
                .install_batch(opentelemetry::runtime::Tokio)
                .map_err(|err| ErrorCode::InvalidConfig.with_msg(&format!("Unable to build Jaeger pipeline: {}", err)))?;

            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        },
        false => None,
    };

    let exporting = jaeger.is_some();

    // Integration tests start the server more than once per process.
    if let Err(err) = Registry::default()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_test_writer().with_ansi(true))
        .with(jaeger)
        .try_init() {
            tracing::info!("Tracing already initialised: {}", err);
    }

    Ok(exporting)
}

const BANNER: &str = r#"
 __      __                  .___
/  \    /  \_____  _______  __| _/____   ____
\   \/\/   /\__  \ \_  __ \/ __ |/ __ \ /    \
 \        /  / __ \_|  | \/ /_/ \  ___/|   |  \
  \__/\  /  (____  /|__|  \____ |\___  >___|  /
       \/        \/            \/    \/     \/
"#;
