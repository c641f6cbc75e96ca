//! `eventrouter` binary: watch cluster Events and forward them to the configured sink
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use eventrouter::{
    config::{HttpSinkConfig, SinkConfig},
    runtime::{EventRouter, Informer},
    sinks::manufacture_sink,
    Config,
};
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Config file, `/etc/eventrouter/config.yaml` is used when present
    #[arg(long, env = "EVENTROUTER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured sink
    #[arg(long, value_enum)]
    sink: Option<SinkKind>,

    /// Endpoint for `--sink http`
    #[arg(long, required_if_eq("sink", "http"), requires = "sink")]
    http_url: Option<String>,

    /// Only watch Events in this namespace
    #[arg(long, env = "EVENTROUTER_NAMESPACE")]
    namespace: Option<String>,

    /// Format of the process' own log output
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SinkKind {
    Stdout,
    Log,
    Http,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(ns) = &self.namespace {
            config.namespace = Some(ns.clone());
        }
        if self.http_url.is_some() && self.sink != Some(SinkKind::Http) {
            warn!("--http-url only applies to --sink http, ignoring it");
        }
        config.sink = match (self.sink, &self.http_url) {
            (None, _) => return,
            (Some(SinkKind::Stdout), _) => SinkConfig::Stdout,
            (Some(SinkKind::Log), _) => SinkConfig::Log,
            (Some(SinkKind::Http), url) => SinkConfig::Http(HttpSinkConfig {
                url: url.clone().unwrap_or_default(),
                timeout_seconds: None,
            }),
        };
    }
}

fn init_logging(format: LogFormat) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = match format {
        LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
        LogFormat::Text => fmt::layer().compact().boxed(),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to initialize logging")
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_format)?;

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    let sink = manufacture_sink(&config.sink)?;

    let client = kube::Client::try_default()
        .await
        .context("failed to create kubernetes client")?;
    let informer = Informer::events(client, config.namespace.as_deref(), config.watcher_config());
    let router = Arc::new(
        EventRouter::new(informer.ready_token(), sink)
            .with_span(info_span!("eventrouter", namespace = config.namespace.as_deref().unwrap_or("*"))),
    );

    let stop = CancellationToken::new();
    // the watch stops with the router, so nothing is delivered once the sink is closed
    let watch = tokio::spawn({
        let router = router.clone();
        let watch_stop = stop.child_token();
        async move { informer.run(&router, watch_stop).await }
    });
    tokio::spawn({
        let stop = stop.clone();
        async move {
            shutdown_signal().await;
            info!("shutdown requested");
            stop.cancel();
        }
    });

    let result = router.run(stop).await;
    if let Err(err) = watch.await {
        warn!(error = %err, "informer task failed");
    }
    result.context("event router failed")?;
    info!("eventrouter stopped");
    Ok(())
}
