//! Quote decision modules.
//!
//! Three stateless components sit between the orderbook event and order
//! emission:
//! - `SpreadEngine`: book health plus depth-imbalance driven target spread
//! - `Sizer`: per-level size ladder under fixed / percentage / tiered modes
//! - `InventoryShaper`: position skew and per-market bias applied to the
//!   reference price
//!
//! All of them read the injected `MakerConfig` and the latest account view;
//! none of them talk to the venue.

pub mod config;
pub mod inventory;
pub mod sizer;
pub mod spread;

pub use config::{AssetParams, HedgeConfig, MakerConfig, QuantityMode, SpreadConfig};
pub use inventory::{InventoryShaper, ShapedQuote};
pub use sizer::{SizeError, Sizer};
pub use spread::{BookHealth, DepthSpread, SpreadEngine};
