pub mod index;
pub mod model;
pub mod route_match;

pub use index::RuntimeIndex;
pub use model::{HealthState, Protocol, QueryMapEntry, QueryMapping, Route, Service};
