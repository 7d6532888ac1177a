use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;

/// The terminal owns stdout, so events go to a daily log file instead.
pub fn get_subscriber(
    log_dir: &Path,
    debug: bool,
) -> (impl tracing::Subscriber + Send + Sync, WorkerGuard) {
    let default_filter = if debug { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let file_appender = tracing_appender::rolling::daily(log_dir, "diary-autosave.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let file_log = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(file_log);

    (subscriber, guard)
}

pub fn init_subscriber(
    log_dir: &Path,
    debug: bool,
) -> Result<WorkerGuard, tracing::subscriber::SetGlobalDefaultError> {
    let (subscriber, guard) = get_subscriber(log_dir, debug);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(guard)
}
