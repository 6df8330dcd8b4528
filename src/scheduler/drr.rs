use tracing::{debug, trace};

use crate::class::TrafficClass;
use crate::packet::Packet;
use crate::scheduler::Scheduler;

/// Deficit round robin over the engine's classes, quantum taken from each
/// class.
///
/// One packet leaves per `schedule` call. A class that wins a turn keeps it on
/// the following calls while its deficit still covers its head packet, so over
/// a backlogged period class `i` gets `quantum[i] / sum(quantum)` of the bytes.
/// A class that empties forfeits its remaining deficit.
#[derive(Debug, Default, Clone)]
pub struct DrrScheduler {
    deficits: Vec<u64>,
    last_served: Option<usize>,
    // last_served still holds its turn
    in_turn: bool,
}

impl DrrScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deficit(&self, index: usize) -> u64 {
        self.deficits.get(index).copied().unwrap_or(0)
    }

    pub fn last_served(&self) -> Option<usize> {
        self.last_served
    }

    // Classes only get added before traffic flows, but the scheduler may be
    // built first.
    fn sync(&mut self, n: usize) {
        if self.deficits.len() < n {
            self.deficits.resize(n, 0);
        }
    }

    fn send<T>(&mut self, index: usize, class: &mut TrafficClass<T>) -> Option<Packet<T>> {
        let packet = class.dequeue()?;
        let deficit = &mut self.deficits[index];
        *deficit = deficit.saturating_sub(packet.pkt_len as u64);
        self.last_served = Some(index);
        self.in_turn = true;

        if class.is_empty() {
            debug!(class = index, forfeited = *deficit, "drr class drained, resetting deficit");
            *deficit = 0;
            self.in_turn = false;
        }
        trace!(class = index, len = packet.pkt_len, deficit = self.deficits[index], "drr sent packet");
        Some(packet)
    }

    fn fits<T>(deficit: u64, class: &TrafficClass<T>) -> bool {
        class.peek().is_some_and(|p| p.pkt_len as u64 <= deficit)
    }
}

impl<T> Scheduler<T> for DrrScheduler {
    fn schedule(&mut self, classes: &mut [TrafficClass<T>]) -> Option<Packet<T>> {
        let n = classes.len();
        if n == 0 {
            return None;
        }
        self.sync(n);

        // Current turn continues while the head packet is covered
        if let Some(current) = self.last_served.filter(|&i| i < n && self.in_turn) {
            if Self::fits(self.deficits[current], &classes[current]) {
                return self.send(current, &mut classes[current]);
            }
            self.in_turn = false;
        }

        let start = self.last_served.map_or(0, |i| (i + 1) % n);
        for offset in 0..n {
            let index = (start + offset) % n;
            let class = &mut classes[index];
            let deficit = &mut self.deficits[index];
            if class.is_empty() {
                // drained outside send() still forfeits its credit
                *deficit = 0;
                continue;
            }

            *deficit = deficit.saturating_add(class.quantum() as u64);
            debug!(class = index, quantum = class.quantum(), deficit = *deficit, "drr class takes its turn");

            if Self::fits(*deficit, class) {
                return self.send(index, class);
            }
            trace!(
                class = index,
                head = class.peek().map(|p| p.pkt_len),
                deficit = *deficit,
                "drr head exceeds deficit, carrying over"
            );
        }

        trace!("drr rotation found no class able to send");
        None
    }

    fn name(&self) -> &'static str {
        "drr"
    }
}
