use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;

use service_watch::InstanceCollection;
use service_watch::JsonInstanceSerializer;
use service_watch::Listener;
use service_watch::MemoryCoordinator;
use service_watch::TreeDirectory;
use service_watch::WatchedEvent;
use service_watch::WatcherRegistry;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const BASE_PATH: &str = "/services";
pub const WAIT: Duration = Duration::from_secs(2);

static LOGGER_INIT: Once = Once::new();

pub fn enable_logger() {
    LOGGER_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// One delivery: service name and the delivered instance ids
pub type Delivery = (String, Vec<String>);

/// Forwards every delivery into a channel the test can await
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ChannelListener {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl Listener for ChannelListener {
    fn on_service_changed(
        &self,
        service_name: &str,
        instances: &InstanceCollection,
    ) {
        let ids = instances.ids().into_iter().map(str::to_string).collect();
        let _ = self.tx.send((service_name.to_string(), ids));
    }
}

pub async fn next_delivery(rx: &mut mpsc::UnboundedReceiver<Delivery>) -> Delivery {
    timeout(WAIT, rx.recv())
        .await
        .expect("delivery should arrive in time")
        .expect("listener channel should stay open")
}

pub async fn assert_no_delivery(rx: &mut mpsc::UnboundedReceiver<Delivery>) {
    let result = timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(result.is_err(), "unexpected delivery: {result:?}");
}

pub struct Cluster {
    pub store: Arc<MemoryCoordinator>,
    pub events: mpsc::UnboundedReceiver<WatchedEvent>,
    pub registry: Arc<WatcherRegistry>,
    pub directory: TreeDirectory<MemoryCoordinator>,
}

pub fn setup(services: &[&str]) -> Cluster {
    enable_logger();
    let (store, events) = MemoryCoordinator::new();
    let store = Arc::new(store);
    let registry = Arc::new(WatcherRegistry::new(
        services.iter().copied(),
        BASE_PATH,
        Arc::new(JsonInstanceSerializer),
    ));
    let directory = TreeDirectory::new(BASE_PATH, store.clone(), Arc::new(JsonInstanceSerializer));
    Cluster {
        store,
        events,
        registry,
        directory,
    }
}
