use crate::chain::Address;
use serde::{
    Deserialize,
    Serialize,
};

const MAINNET_CHIP_TOKEN: Address = Address([
    0x8f, 0x99, 0x20, 0x28, 0x34, 0x70, 0xf5, 0x21, 0x28, 0xbf, 0x11, 0xb0, 0xc1, 0x4e, 0x79,
    0x8b, 0xe7, 0x04, 0xfd, 0x15,
]);
const MAINNET_DICE_CONTRACT: Address = Address([
    0x99, 0x89, 0x83, 0x99, 0xac, 0xb3, 0x5b, 0x17, 0xfb, 0x98, 0xcd, 0xec, 0xd7, 0xb3, 0xbd,
    0x89, 0x82, 0xb1, 0x5d, 0xf3,
]);
const APOTHEM_CHIP_TOKEN: Address = Address([
    0x4e, 0x4b, 0x3e, 0x41, 0xdc, 0xf2, 0xf7, 0x09, 0xeb, 0x9f, 0x2e, 0xcb, 0x2b, 0x8e, 0x53,
    0xb0, 0xfd, 0x3f, 0x9c, 0x1d,
]);
const APOTHEM_DICE_CONTRACT: Address = Address([
    0x6c, 0x5b, 0xa9, 0x16, 0x42, 0xf1, 0x02, 0x82, 0xb5, 0x76, 0xd9, 0x19, 0x22, 0xae, 0x64,
    0x48, 0xc9, 0xd5, 0x2f, 0x4e,
]);

/// Networks the client knows how to talk to. Chain id 50 is the XDC
/// mainnet deployment, 51 the Apothem test network.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Apothem,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 50,
            Network::Apothem => 51,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Apothem => "apothem",
        }
    }

    /// Deployed contract addresses for this network.
    pub fn config(&self) -> NetworkConfig {
        let (chip_token, dice_contract) = match self {
            Network::Mainnet => (MAINNET_CHIP_TOKEN, MAINNET_DICE_CONTRACT),
            Network::Apothem => (APOTHEM_CHIP_TOKEN, APOTHEM_DICE_CONTRACT),
        };
        NetworkConfig {
            network: *self,
            chain_id: self.chain_id(),
            chip_token,
            dice_contract,
        }
    }
}

/// The full configuration surface the lifecycle core consumes: a chain id
/// and the two contract addresses (chip token, dice contract).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network: Network,
    pub chain_id: u64,
    pub chip_token: Address,
    pub dice_contract: Address,
}
