//! DiffServ egress scheduling: packets are classified into traffic classes by
//! composable header filters and released by a strict-priority or
//! deficit-round-robin scheduler.

pub mod class;
pub mod config;
pub mod engine;
pub mod filter;
pub mod headers;
pub mod monitor;
pub mod packet;
pub mod scheduler;
pub mod token_bucket;

pub use class::{ClassStats, TrafficClass};
pub use config::{ClassParams, ConfigError, Policy};
pub use engine::DispatchEngine;
pub use filter::{Filter, FilterElement, FilterParseError, OrdinalCounter};
pub use headers::HeaderView;
pub use packet::Packet;
pub use scheduler::{DrrScheduler, Scheduler, SpqScheduler};
