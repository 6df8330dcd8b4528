use std::collections::VecDeque;

use tracing::trace;

use crate::filter::Filter;
use crate::packet::Packet;

pub const DEFAULT_CLASS_CAPACITY: usize = 100;
pub const DEFAULT_QUANTUM: u32 = 1500;

/// Running totals since the class was created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassStats {
    pub enqueued: u64,
    pub dropped: u64,
    pub dequeued: u64,
    pub dequeued_bytes: u64,
}

/// A match predicate, a bounded FIFO, and the attributes the schedulers read.
///
/// Filters are OR-ed; a class without filters matches every packet and makes
/// a natural default class.
#[derive(Debug)]
pub struct TrafficClass<T> {
    name: Option<String>,
    filters: Vec<Filter>,
    queue: VecDeque<Packet<T>>,
    capacity: usize,
    priority: u32,
    quantum: u32,
    stats: ClassStats,
}

impl<T> Default for TrafficClass<T> {
    fn default() -> Self {
        Self {
            name: None,
            filters: Vec::new(),
            queue: VecDeque::new(),
            capacity: DEFAULT_CLASS_CAPACITY,
            priority: 0,
            quantum: DEFAULT_QUANTUM,
            stats: ClassStats::default(),
        }
    }
}

impl<T> TrafficClass<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Lower is more urgent.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_quantum(mut self, quantum: u32) -> Self {
        self.quantum = quantum;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    // Setup-time only; nothing attaches filters once traffic flows.
    pub(crate) fn add_filter(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    // Packets already queued beyond a lowered capacity stay queued.
    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn quantum(&self) -> u32 {
        self.quantum
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn stats(&self) -> ClassStats {
        self.stats
    }

    /// Hands the packet back when the queue is full.
    pub fn enqueue(&mut self, packet: Packet<T>) -> Result<(), Packet<T>> {
        if self.queue.len() >= self.capacity {
            trace!(class = ?self.name, capacity = self.capacity, "class full, dropping packet");
            self.stats.dropped += 1;
            return Err(packet);
        }
        self.queue.push_back(packet);
        self.stats.enqueued += 1;
        Ok(())
    }

    pub fn dequeue(&mut self) -> Option<Packet<T>> {
        let packet = self.queue.pop_front()?;
        self.stats.dequeued += 1;
        self.stats.dequeued_bytes += packet.pkt_len as u64;
        Some(packet)
    }

    pub fn peek(&self) -> Option<&Packet<T>> {
        self.queue.front()
    }
}

impl<T: AsRef<[u8]>> TrafficClass<T> {
    pub fn matches(&self, packet: &Packet<T>) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        let view = packet.headers();
        self.filters.iter().any(|f| f.matches_view(&view))
    }
}
