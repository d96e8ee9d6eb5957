//! Preset node states for tests and demos.

use clearline_types::{Address, ChainId, SupportedAsset};

use crate::node::MockNode;

/// A funded single-operator scenario: two supported assets, a usable usdc
/// balance, and a fixed counterparty address for session tests.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub node: MockNode,
    pub counterparty: Address,
}

impl Scenario {
    pub fn funded(chain_id: ChainId) -> Self {
        let node = MockNode::new(chain_id)
            .with_asset(SupportedAsset {
                token: Address::new([0xaa; 20]),
                chain_id,
                symbol: "usdc".to_string(),
                decimals: 6,
            })
            .with_asset(SupportedAsset {
                token: Address::new([0xbb; 20]),
                chain_id,
                symbol: "weth".to_string(),
                decimals: 18,
            })
            .with_balance("usdc", 1000.0)
            .with_balance("weth", 2.5);
        Self {
            node,
            counterparty: Address::new([0x02; 20]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Scenario;

    #[test]
    fn funded_scenario_has_assets_and_balances() {
        let scenario = Scenario::funded(1337);
        assert_eq!(scenario.node.available_balance("usdc"), Some(1000.0));
        assert_eq!(scenario.node.available_balance("weth"), Some(2.5));
        assert!(!scenario.node.is_authenticated());
    }
}
