use tracing::{info, trace};

use crate::class::TrafficClass;
use crate::config::{ClassParams, ConfigError, Policy};
use crate::filter::Filter;
use crate::packet::Packet;
use crate::scheduler::{DrrScheduler, Scheduler, SpqScheduler};

pub const DEFAULT_MAX_PACKETS: usize = 100;

/// Classifies packets into traffic classes on enqueue and lets the scheduler
/// pick on dequeue.
///
/// Class 0 is the fallback for packets no class claims.
pub struct DispatchEngine<T> {
    classes: Vec<TrafficClass<T>>,
    scheduler: Box<dyn Scheduler<T>>,
    max_packets: usize,
    engine_drops: u64,
}

impl<T: AsRef<[u8]>> DispatchEngine<T> {
    pub fn new(scheduler: Box<dyn Scheduler<T>>) -> Self {
        Self {
            classes: Vec::new(),
            scheduler,
            max_packets: DEFAULT_MAX_PACKETS,
            engine_drops: 0,
        }
    }

    pub fn spq() -> Self {
        Self::new(Box::new(SpqScheduler::new()))
    }

    pub fn drr() -> Self {
        Self::new(Box::new(DrrScheduler::new()))
    }

    /// Builds one class per parameter, in order: priorities for SPQ, quanta
    /// for DRR. Any invalid parameter aborts the whole construction.
    pub fn from_params(policy: Policy, params: &ClassParams) -> Result<Self, ConfigError> {
        if params.count() == 0 {
            return Err(ConfigError::NoClasses);
        }

        let mut engine = match policy {
            Policy::Spq => Self::spq(),
            Policy::Drr => Self::drr(),
        };

        for (index, &value) in params.values().iter().enumerate() {
            let class = match policy {
                Policy::Spq => TrafficClass::new().with_priority(value),
                Policy::Drr => {
                    if value == 0 {
                        return Err(ConfigError::ZeroQuantum { index });
                    }
                    TrafficClass::new().with_quantum(value)
                }
            };
            info!(class = index, %policy, value, "added traffic class");
            engine.add_traffic_class(class);
        }
        Ok(engine)
    }

    pub fn with_max_packets(mut self, max_packets: usize) -> Self {
        self.max_packets = max_packets;
        self
    }

    pub fn max_packets(&self) -> usize {
        self.max_packets
    }

    pub fn policy_name(&self) -> &'static str {
        self.scheduler.name()
    }

    pub fn add_traffic_class(&mut self, class: TrafficClass<T>) {
        self.classes.push(class);
    }

    /// Attaches a filter to an existing class. Returns false for an unknown
    /// index.
    pub fn add_filter(&mut self, index: usize, filter: Filter) -> bool {
        match self.classes.get_mut(index) {
            Some(class) => {
                info!(class = index, %filter, "attached filter");
                class.add_filter(filter);
                true
            }
            None => false,
        }
    }

    pub fn traffic_class(&self, index: usize) -> Option<&TrafficClass<T>> {
        self.classes.get(index)
    }

    /// Applies one capacity to every class. Classes are otherwise read-only
    /// from outside, so only the scheduler takes packets out.
    pub fn set_class_capacity(&mut self, capacity: usize) {
        for class in &mut self.classes {
            class.set_capacity(capacity);
        }
    }

    pub fn traffic_classes(&self) -> &[TrafficClass<T>] {
        &self.classes
    }

    pub fn n_traffic_classes(&self) -> usize {
        self.classes.len()
    }

    /// Total packets queued across all classes.
    pub fn len(&self) -> usize {
        self.classes.iter().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.iter().all(|c| c.is_empty())
    }

    /// Packets refused before classification: engine-wide bound hit, or no
    /// classes to put them in.
    pub fn engine_drops(&self) -> u64 {
        self.engine_drops
    }

    /// Index of the first class whose filters match, else 0.
    pub fn classify(&self, packet: &Packet<T>) -> usize {
        match self.classes.iter().position(|c| c.matches(packet)) {
            Some(index) => {
                trace!(class = index, "packet matched traffic class");
                index
            }
            None => {
                trace!("no matching traffic class, using default (0)");
                0
            }
        }
    }

    /// Hands the packet back if it was dropped: engine full, no classes, or
    /// its class full. A full class never spills into another one.
    pub fn enqueue(&mut self, packet: Packet<T>) -> Result<(), Packet<T>> {
        if self.len() >= self.max_packets {
            trace!(max = self.max_packets, "engine full, dropping packet");
            self.engine_drops += 1;
            return Err(packet);
        }

        let index = self.classify(&packet);
        let Some(class) = self.classes.get_mut(index) else {
            trace!("no traffic classes, dropping packet");
            self.engine_drops += 1;
            return Err(packet);
        };

        class.enqueue(packet)?;
        trace!(class = index, "packet enqueued");
        Ok(())
    }

    pub fn dequeue(&mut self) -> Option<Packet<T>> {
        if self.is_empty() {
            return None;
        }
        self.remove()
    }

    /// Runs the scheduler directly.
    pub fn remove(&mut self) -> Option<Packet<T>> {
        self.scheduler.schedule(&mut self.classes)
    }

    /// Head of the first non-empty class in index order. This is a preview
    /// only: it does not follow the scheduling policy, so it can differ from
    /// what the next `dequeue` returns.
    pub fn peek(&self) -> Option<&Packet<T>> {
        self.classes.iter().find_map(|c| c.peek())
    }
}
