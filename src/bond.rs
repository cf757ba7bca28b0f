//! Bond descriptors and the per-network contract registry.
//!
//! Descriptors are static configuration. [`BondRegistry::resolve`] is
//! the contract accessor: it maps a bond key on a given network to
//! every address an action needs (bond depository, reserve token,
//! bonding calculator, treasury, optional price feed).

use std::collections::BTreeMap;
use std::fmt;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Identifier of a bond market, e.g. `mai` or `mai_clam`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/lib/store/")]
#[serde(transparent)]
pub struct BondKey(String);

impl BondKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Display for BondKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Underlying asset of a bond.
///
/// LP bonds are valued through the bonding calculator and quoted with 9
/// decimals; token bonds take the reserve token directly (18 decimals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BondKind {
    Lp,
    Token,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BondDescriptor {
    pub key: BondKey,
    pub name: String,
    pub kind: BondKind,
    #[serde(default)]
    pub stable: bool,
    pub oracle: Option<Address>,
    #[serde(default)]
    pub deprecated: bool,
    pub address: Address,
    pub reserve: Address,
}

impl BondDescriptor {
    pub const fn is_lp(&self) -> bool {
        matches!(self.kind, BondKind::Lp)
    }
}

const fn default_quote_token_price() -> u64 {
    1
}

fn default_payout_symbol() -> String {
    "CLAM".to_owned()
}

/// Protocol deployment on one chain.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Network {
    pub chain_id: u64,
    pub treasury: Address,
    pub bonding_calculator: Address,
    /// Pair of protocol token and quote token used for the market price.
    pub market_pair: Address,
    pub protocol_token: Address,
    pub staked_protocol_token: Address,
    /// USD price of the pair's quote token. Stands in for an external
    /// price service; stablecoin quote tokens leave it at 1.
    #[serde(default = "default_quote_token_price")]
    pub quote_token_price: u64,
    #[serde(default = "default_payout_symbol")]
    pub payout_symbol: String,
    #[serde(default)]
    pub bonds: Vec<BondDescriptor>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("network {0} is not configured")]
    UnknownNetwork(u64),
    #[error("bond {key} is not configured on network {network}")]
    UnknownBond { key: BondKey, network: u64 },
    #[error("network {0} is configured more than once")]
    DuplicateNetwork(u64),
    #[error("bond {key} is configured more than once on network {network}")]
    DuplicateBond { key: BondKey, network: u64 },
}

/// All configured networks, indexed by chain id.
#[derive(Debug, Clone, Default)]
pub struct BondRegistry {
    networks: BTreeMap<u64, Network>,
}

impl BondRegistry {
    pub fn new(networks: Vec<Network>) -> Result<Self, RegistryError> {
        let mut by_chain = BTreeMap::new();

        for network in networks {
            let mut seen = Vec::with_capacity(network.bonds.len());
            for bond in &network.bonds {
                if seen.contains(&&bond.key) {
                    return Err(RegistryError::DuplicateBond {
                        key: bond.key.clone(),
                        network: network.chain_id,
                    });
                }
                seen.push(&bond.key);
            }

            let chain_id = network.chain_id;
            if by_chain.insert(chain_id, network).is_some() {
                return Err(RegistryError::DuplicateNetwork(chain_id));
            }
        }

        Ok(Self { networks: by_chain })
    }

    pub fn network(&self, chain_id: u64) -> Result<&Network, RegistryError> {
        self.networks
            .get(&chain_id)
            .ok_or(RegistryError::UnknownNetwork(chain_id))
    }

    pub fn resolve(&self, key: &BondKey, chain_id: u64) -> Result<ResolvedBond<'_>, RegistryError> {
        let network = self.network(chain_id)?;
        let descriptor = network
            .bonds
            .iter()
            .find(|bond| &bond.key == key)
            .ok_or_else(|| RegistryError::UnknownBond {
                key: key.clone(),
                network: chain_id,
            })?;

        Ok(ResolvedBond {
            descriptor,
            network,
        })
    }
}

/// A bond together with the network it is deployed on.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedBond<'a> {
    pub descriptor: &'a BondDescriptor,
    pub network: &'a Network,
}

impl ResolvedBond<'_> {
    pub fn key(&self) -> &BondKey {
        &self.descriptor.key
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub const fn depository(&self) -> Address {
        self.descriptor.address
    }

    pub const fn reserve(&self) -> Address {
        self.descriptor.reserve
    }

    pub const fn calculator(&self) -> Address {
        self.network.bonding_calculator
    }

    pub const fn treasury(&self) -> Address {
        self.network.treasury
    }

    pub const fn oracle(&self) -> Option<Address> {
        self.descriptor.oracle
    }
}
