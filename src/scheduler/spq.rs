use tracing::trace;

use crate::class::TrafficClass;
use crate::packet::Packet;
use crate::scheduler::Scheduler;

/// Strict priority: always the non-empty class with the lowest priority
/// value, ties to the lowest index. Lower classes starve while a higher one
/// has backlog.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpqScheduler;

impl SpqScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl<T> Scheduler<T> for SpqScheduler {
    fn schedule(&mut self, classes: &mut [TrafficClass<T>]) -> Option<Packet<T>> {
        // min_by_key keeps the first of equal keys, so ties go to the lowest index
        let (index, class) = classes
            .iter_mut()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .min_by_key(|(_, c)| c.priority())?;

        trace!(class = index, priority = class.priority(), "spq serving class");
        class.dequeue()
    }

    fn name(&self) -> &'static str {
        "spq"
    }
}
