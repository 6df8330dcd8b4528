use std::cell::Cell;
use std::fmt;
use std::net::Ipv4Addr;
use std::rc::Rc;

use crate::headers::HeaderView;
use crate::packet::Packet;

/// Evaluation counter behind a `PacketOrdinal` element.
///
/// Each `FilterElement::packet_ordinal` gets its own counter. Elements that
/// should count together are built with `packet_ordinal_with` from clones of
/// the same handle.
#[derive(Debug, Clone, Default)]
pub struct OrdinalCounter(Rc<Cell<u64>>);

impl OrdinalCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of evaluations seen so far.
    pub fn get(&self) -> u64 {
        self.0.get()
    }

    pub fn reset(&self) {
        self.0.set(0);
    }

    fn tick(&self) -> u64 {
        let next = self.0.get().wrapping_add(1);
        self.0.set(next);
        next
    }

    pub fn is_shared_with(&self, other: &OrdinalCounter) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Atomic predicate over one packet attribute.
#[derive(Debug, Clone)]
pub enum FilterElement {
    SourceAddress(Ipv4Addr),
    DestAddress(Ipv4Addr),
    SourcePort(u16),
    DestPort(u16),
    Protocol(u8),
    Tos(u8),
    /// Matches the n-th, 2n-th, ... packet this element evaluates. `every == 0`
    /// never matches.
    PacketOrdinal { every: u64, counter: OrdinalCounter },
}

impl FilterElement {
    pub fn packet_ordinal(every: u64) -> Self {
        Self::PacketOrdinal {
            every,
            counter: OrdinalCounter::new(),
        }
    }

    pub fn packet_ordinal_with(every: u64, counter: &OrdinalCounter) -> Self {
        Self::PacketOrdinal {
            every,
            counter: counter.clone(),
        }
    }

    pub fn matches<T: AsRef<[u8]>>(&self, packet: &Packet<T>) -> bool {
        self.matches_view(&packet.headers())
    }

    /// A header layer the element needs but the packet lacks is a no-match.
    pub fn matches_view(&self, view: &HeaderView) -> bool {
        match self {
            FilterElement::SourceAddress(addr) => view.src_addr() == Some(*addr),
            FilterElement::DestAddress(addr) => view.dst_addr() == Some(*addr),
            FilterElement::SourcePort(port) => view.src_port() == Some(*port),
            FilterElement::DestPort(port) => view.dst_port() == Some(*port),
            FilterElement::Protocol(proto) => view.protocol() == Some(*proto),
            FilterElement::Tos(tos) => view.tos() == Some(*tos),
            FilterElement::PacketOrdinal { every, counter } => {
                let seen = counter.tick();
                *every != 0 && seen % every == 0
            }
        }
    }
}

impl fmt::Display for FilterElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterElement::SourceAddress(addr) => write!(f, "src={addr}"),
            FilterElement::DestAddress(addr) => write!(f, "dst={addr}"),
            FilterElement::SourcePort(port) => write!(f, "sport={port}"),
            FilterElement::DestPort(port) => write!(f, "dport={port}"),
            FilterElement::Protocol(proto) => write!(f, "proto={proto}"),
            FilterElement::Tos(tos) => write!(f, "tos={tos:#04x}"),
            FilterElement::PacketOrdinal { every, .. } => write!(f, "every={every}"),
        }
    }
}
