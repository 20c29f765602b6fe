//! Configuration resolution and the
//! cache/relational gateways behind the
//! padawan signup service.

pub mod domain;
pub mod infra;
pub mod ports;
