use std::sync::Arc;
use std::time::Duration;

use service_watch::DiscoveryConfig;
use service_watch::Error;
use service_watch::InstanceCollection;
use service_watch::JsonInstanceSerializer;
use service_watch::Listener;
use service_watch::MemoryCoordinator;
use service_watch::Result;
use service_watch::ServiceInstance;
use service_watch::TreeDirectory;
use service_watch::WatchDriver;
use service_watch::WatcherRegistry;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_BASE_PORT: u16 = 8080;

/// Logs every instance list it is handed
struct LoggingListener;

impl Listener for LoggingListener {
    fn on_service_changed(
        &self,
        service_name: &str,
        instances: &InstanceCollection,
    ) {
        info!(
            service = service_name,
            count = instances.count(),
            "instances changed: {}",
            instances.describe()
        );
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = DiscoveryConfig::new()?.validate()?;

    init_observability();
    info!(?settings, "starting service watcher");

    let (graceful_tx, graceful_rx) = watch::channel(());

    let (store, events) = MemoryCoordinator::new();
    let store = Arc::new(store);
    let serializer = Arc::new(JsonInstanceSerializer);

    let registry = Arc::new(WatcherRegistry::new(
        settings.directory.services.iter().cloned(),
        &settings.directory.base_path,
        serializer.clone(),
    ));
    let listener: Arc<dyn Listener> = Arc::new(LoggingListener);
    for watcher in registry.watchers() {
        watcher.add_listener(listener.clone());
    }

    registry.initialize_all(store.clone()).await?;
    let mut driver = WatchDriver::spawn(registry.clone(), events, &settings.watch, graceful_rx);

    // Seed every watched service with a demo instance.
    let directory = TreeDirectory::new(settings.directory.base_path.clone(), store, serializer);
    let demo: InstanceCollection = registry
        .clone_names()
        .into_iter()
        .enumerate()
        .map(|(i, name)| ServiceInstance::new(name, "127.0.0.1", demo_port(i)))
        .collect();
    if let Err(e) = demo.register_all(&directory).await {
        error!("Failed to register demo instances: {}", e);
    }

    info!("Application started. Waiting for CTRL+C signal...");
    tokio::select! {
        result = graceful_shutdown(&graceful_tx) => result?,
        Some(failure) = driver.next_failure() => {
            error!(service = %failure.service_name, "watcher stopped, shutting down: {}", failure.error);
            let _ = graceful_tx.send(());
        }
    }

    match tokio::time::timeout(Duration::from_secs(5), driver.join()).await {
        Ok(Err(e)) => error!("watch driver stopped with error: {}", e),
        Err(_) => error!("watch driver did not stop in time"),
        Ok(Ok(())) => {}
    }

    info!("Exiting program.");
    Ok(())
}

/// Port of the `index`-th demo instance, saturating at `u16::MAX`
fn demo_port(index: usize) -> u16 {
    u16::try_from(index)
        .map(|offset| DEMO_BASE_PORT.saturating_add(offset))
        .unwrap_or(u16::MAX)
}

async fn graceful_shutdown(graceful_tx: &watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| Error::Fatal(format!("Failed to install SIGINT handler: {e}")))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| Error::Fatal(format!("Failed to install SIGTERM handler: {e}")))?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        Error::Fatal(format!("Failed to send shutdown signal: {e}"))
    })?;

    info!("Shutdown signal sent");
    Ok(())
}

fn init_observability() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();
}
