//! I/O core and event loop.
//!
//! The `IoCore` struct owns the nodes, the interrupt bridge and the timer
//! queue. All node code runs on the loop thread; the only cross-thread
//! traffic is interrupt notifications and inbound host messages, both
//! delivered through channels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use ctr700_common::config::{AppConfig, ConfigError, RuntimeConfig, WatchdogConfig};
use ctr700_common::hal::error::DriverError;
use ctr700_common::node::config::NodeConfig;

use crate::bridge::{InterruptBridge, Notification};
use crate::handle::DriverHandle;
use crate::host::{HostSink, InboundMessage};
use crate::nodes::{build_node, trace_enabled, Node, NodeContext, NodeId, NodeTimer};
use crate::timer::{TimerId, TimerQueue};

/// Errors of the I/O core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No backend registered under the requested name.
    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    /// Board-level driver call failed.
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Timer payload of the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Timer owned by a node.
    Node {
        /// Owner.
        node: NodeId,
        /// Purpose.
        tag: NodeTimer,
    },
    /// Board watchdog service.
    Watchdog,
}

/// Event-loop counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Interrupt notifications delivered to a node.
    pub notifications_dispatched: u64,
    /// Interrupt notifications without a subscribed node.
    pub notifications_dropped: u64,
    /// Messages emitted to the host.
    pub messages_emitted: u64,
    /// Inbound host messages processed.
    pub messages_received: u64,
    /// Timers fired.
    pub timers_fired: u64,
    /// Successful watchdog services.
    pub watchdog_services: u64,
}

struct NodeSlot {
    name: String,
    trace: bool,
    node: Box<dyn Node>,
}

/// Node host and event loop.
pub struct IoCore<S: HostSink> {
    driver: Arc<DriverHandle>,
    bridge: InterruptBridge,
    timers: TimerQueue<TimerEvent>,
    routes: HashMap<u8, NodeId>,
    nodes: Vec<NodeSlot>,
    sink: S,
    inbound_tx: Sender<InboundMessage>,
    inbound_rx: Receiver<InboundMessage>,
    running: Arc<AtomicBool>,
    runtime: RuntimeConfig,
    watchdog: WatchdogConfig,
    watchdog_timer: Option<TimerId>,
    started: bool,
    stats: RuntimeStats,
}

impl<S: HostSink> IoCore<S> {
    /// Create a core without nodes.
    pub fn new(
        driver: Arc<DriverHandle>,
        runtime: RuntimeConfig,
        watchdog: WatchdogConfig,
        sink: S,
    ) -> Self {
        let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded();
        info!(
            backend = driver.backend_name(),
            status_period_ms = runtime.status_period_ms,
            "IoCore created"
        );
        Self {
            driver,
            bridge: InterruptBridge::new(),
            timers: TimerQueue::new(),
            routes: HashMap::new(),
            nodes: Vec::new(),
            sink,
            inbound_tx,
            inbound_rx,
            running: Arc::new(AtomicBool::new(false)),
            runtime,
            watchdog,
            watchdog_timer: None,
            started: false,
            stats: RuntimeStats::default(),
        }
    }

    /// Create a core and open every configured node in file order.
    pub fn from_config(driver: Arc<DriverHandle>, config: &AppConfig, sink: S) -> Self {
        let mut core = Self::new(
            driver,
            config.runtime.clone(),
            config.watchdog.clone(),
            sink,
        );
        for node in &config.nodes {
            core.add_node(node);
        }
        info!(
            "Opened {} nodes ({} enabled)",
            core.node_count(),
            core.enabled_count()
        );
        core
    }

    /// Build and open one node.
    ///
    /// A node that fails to open is kept, disabled; the error is logged.
    pub fn add_node(&mut self, config: &NodeConfig) -> NodeId {
        let id = self.nodes.len();
        let name = if config.name().is_empty() {
            format!("{}-{}", config.kind(), id)
        } else {
            config.name().to_string()
        };
        let trace = trace_enabled(config, &self.runtime);
        self.nodes.push(NodeSlot {
            name,
            trace,
            node: build_node(config),
        });

        let result = self.with_node(id, Instant::now(), |node, ctx| node.open(ctx));
        if let Some(Err(e)) = result {
            error!(node = %self.nodes[id].name, kind = config.kind(), "Node disabled: {}", e);
        }
        id
    }

    /// Arm the watchdog and let every node publish its initial state.
    pub fn start(&mut self) -> Result<(), CoreError> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        let now = Instant::now();

        if self.watchdog.enabled {
            self.driver.open()?;
            if let Err(e) = self.driver.enable_watchdog(self.watchdog.monitor_only) {
                self.driver.close()?;
                return Err(e.into());
            }
            let period = Duration::from_millis(self.watchdog.service_interval_ms);
            self.watchdog_timer = Some(self.timers.schedule_interval(now, period, TimerEvent::Watchdog));
            info!(
                monitor_only = self.watchdog.monitor_only,
                interval_ms = self.watchdog.service_interval_ms,
                "Watchdog enabled"
            );
        }

        for id in 0..self.nodes.len() {
            self.with_node(id, now, |node, ctx| {
                if node.is_enabled() {
                    node.start(ctx);
                }
            });
        }
        Ok(())
    }

    /// Run the event loop until the running flag is cleared.
    pub fn run(&mut self) -> Result<(), CoreError> {
        self.start()?;
        info!("Starting IoCore event loop...");
        self.running.store(true, Ordering::SeqCst);

        if detect_rt_mode() {
            info!("Running in real-time mode");
        } else {
            info!("Running in standard (non-RT) mode");
        }

        let notifications = self.bridge.receiver().clone();
        let inbound = self.inbound_rx.clone();
        let idle_tick = Duration::from_millis(self.runtime.idle_tick_ms);

        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            let timeout = self
                .timers
                .next_deadline()
                .map(|due| due.saturating_duration_since(now))
                .map_or(idle_tick, |wait| wait.min(idle_tick));

            select! {
                recv(notifications) -> n => {
                    if let Ok(n) = n {
                        self.dispatch_notification(n, Instant::now());
                    }
                }
                recv(inbound) -> m => {
                    if let Ok(m) = m {
                        self.dispatch_inbound(&m, Instant::now());
                    }
                }
                default(timeout) => {}
            }
            self.process_pending(Instant::now());
        }

        info!(
            "IoCore event loop stopped ({} messages out, {} in, {} interrupts)",
            self.stats.messages_emitted,
            self.stats.messages_received,
            self.stats.notifications_dispatched
        );
        Ok(())
    }

    /// Handle everything already queued or due at `now` without blocking.
    ///
    /// Returns the number of events handled.
    pub fn process_pending(&mut self, now: Instant) -> usize {
        let mut handled = 0;
        while let Some(n) = self.bridge.try_next() {
            self.dispatch_notification(n, now);
            handled += 1;
        }
        while let Ok(m) = self.inbound_rx.try_recv() {
            self.dispatch_inbound(&m, now);
            handled += 1;
        }
        while let Some((_, event)) = self.timers.pop_due(now) {
            self.dispatch_timer(event, now);
            handled += 1;
        }
        handled
    }

    fn dispatch_notification(&mut self, n: Notification, now: Instant) {
        let Some(&id) = self.routes.get(&n.channel) else {
            self.stats.notifications_dropped += 1;
            debug!(channel = n.channel, "Interrupt without subscriber dropped");
            return;
        };
        self.stats.notifications_dispatched += 1;
        self.with_node(id, now, |node, ctx| node.on_interrupt(ctx, n.value));
    }

    fn dispatch_inbound(&mut self, message: &InboundMessage, now: Instant) {
        self.stats.messages_received += 1;
        for id in 0..self.nodes.len() {
            let slot = &self.nodes[id];
            if !slot.node.accepts_input() {
                continue;
            }
            if let Some(target) = &message.node {
                if *target != slot.name {
                    continue;
                }
            }
            self.with_node(id, now, |node, ctx| node.on_input(ctx, message));
        }
    }

    fn dispatch_timer(&mut self, event: TimerEvent, now: Instant) {
        self.stats.timers_fired += 1;
        match event {
            TimerEvent::Node { node, tag } => {
                self.with_node(node, now, |n, ctx| n.on_timer(ctx, tag));
            }
            TimerEvent::Watchdog => match self.driver.service_watchdog() {
                Ok(()) => self.stats.watchdog_services += 1,
                Err(e) => warn!("Watchdog service failed: {}", e),
            },
        }
    }

    fn with_node<R>(
        &mut self,
        id: NodeId,
        now: Instant,
        f: impl FnOnce(&mut dyn Node, &mut NodeContext<'_>) -> R,
    ) -> Option<R> {
        let NodeSlot { name, trace, node } = self.nodes.get_mut(id)?;
        let mut ctx = NodeContext {
            id,
            name,
            trace: *trace,
            driver: &self.driver,
            now,
            status_period: Duration::from_millis(self.runtime.status_period_ms),
            bridge: &self.bridge,
            routes: &mut self.routes,
            timers: &mut self.timers,
            sink: &mut self.sink,
            stats: &mut self.stats,
        };
        Some(f(node.as_mut(), &mut ctx))
    }

    /// Close every node in reverse order, then release the watchdog.
    pub fn shutdown(&mut self) -> Result<(), CoreError> {
        info!("Shutdown requested");
        self.running.store(false, Ordering::SeqCst);
        let now = Instant::now();

        for id in (0..self.nodes.len()).rev() {
            self.with_node(id, now, |node, ctx| node.close(ctx));
        }

        if let Some(timer) = self.watchdog_timer.take() {
            self.timers.cancel(timer);
            self.driver.close()?;
        }
        self.started = false;

        let s = &self.stats;
        info!(
            dispatched = s.notifications_dispatched,
            dropped = s.notifications_dropped,
            emitted = s.messages_emitted,
            received = s.messages_received,
            timers = s.timers_fired,
            watchdog = s.watchdog_services,
            "IoCore stopped"
        );
        Ok(())
    }

    /// Get the running flag for signal handlers.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Sender for inbound host messages; usable from any thread.
    pub fn inbound_sender(&self) -> Sender<InboundMessage> {
        self.inbound_tx.clone()
    }

    /// Queue an inbound host message.
    pub fn submit(&self, message: InboundMessage) {
        // Both channel ends live in `self`.
        let _ = self.inbound_tx.send(message);
    }

    /// Shared driver handle.
    pub fn driver(&self) -> &Arc<DriverHandle> {
        &self.driver
    }

    /// Event-loop counters.
    pub fn stats(&self) -> RuntimeStats {
        self.stats
    }

    /// Host sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Host sink, mutable (e.g. to drain collected events).
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Number of configured nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes that opened successfully.
    pub fn enabled_count(&self) -> usize {
        self.nodes.iter().filter(|s| s.node.is_enabled()).count()
    }

    /// Id of a node by display name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|s| s.name == name)
    }

    /// `true` if the named node opened successfully.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.node_id(name)
            .is_some_and(|id| self.nodes[id].node.is_enabled())
    }
}

/// Detect if running in real-time mode by checking scheduler policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{sched_getscheduler, SCHED_FIFO, SCHED_RR};
        // SAFETY: sched_getscheduler(0) only queries the calling thread.
        unsafe {
            let policy = sched_getscheduler(0);
            policy == SCHED_FIFO || policy == SCHED_RR
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
