// Domain layer: chat and retrieval models plus the ports the adapters implement.

pub mod model;
pub mod ports;
