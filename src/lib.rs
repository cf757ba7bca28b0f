//! Client for a bond depository protocol on an EVM chain.
//!
//! [`actions::BondActions`] drives approvals, bond pricing, purchases and
//! redemptions. Results and alerts are published through
//! [`store::Dispatcher`] for whatever renders them.

pub mod actions;
mod bindings;
pub mod bond;
pub mod chain;
pub mod cli;
pub mod config;
pub mod error;
pub mod store;
pub mod units;

pub use actions::BondActions;
pub use config::{Ctx, setup_tracing};
pub use error::{ActionError, Alert};
