use crate::class::TrafficClass;
use crate::packet::Packet;

mod drr;
mod spq;

pub use drr::DrrScheduler;
pub use spq::SpqScheduler;

/// Picks the class to serve next and dequeues one packet from it.
///
/// Policy state (deficits, cursors) lives in the implementor; the class list
/// only carries queues and per-class attributes.
pub trait Scheduler<T> {
    fn schedule(&mut self, classes: &mut [TrafficClass<T>]) -> Option<Packet<T>>;

    fn name(&self) -> &'static str;
}
