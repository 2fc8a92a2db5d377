//! Risk gate interposed before every quote cycle.
//!
//! Four ordered checks run against the latest account snapshot; the first
//! failure denies the cycle with a structured reason. The gate never places
//! or cancels anything itself; execution stays with the engine.

pub mod gates;

pub use gates::{RiskConfig, RiskDenial, RiskGate};
