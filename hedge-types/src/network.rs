use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Testnet => f.write_str("testnet"),
            Network::Mainnet => f.write_str("mainnet"),
        }
    }
}

/// Contract ids the dashboard talks to on a given network.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContractAddresses {
    pub hedge: String,
    pub reflector_forex: String,
    pub rpc_url: String,
    pub network_passphrase: String,
}

impl ContractAddresses {
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Testnet => Self {
                hedge: "CCQYSKW4OZRDB7WGHTMZLKBP3QZB32RLHZQQIZ235GZRAMUJTA63TXCV".to_string(),
                reflector_forex: "CCSSOHTBL3LEWUCBBEB5NJFC2OKFRC74OWEIJIZLRJBGAAU4VMU5NV4W".to_string(),
                rpc_url: "https://soroban-testnet.stellar.org".to_string(),
                network_passphrase: "Test SDF Network ; September 2015".to_string(),
            },
            Network::Mainnet => Self {
                hedge: "CARCB6GR4ZMONFVEAD567ETTOWR3LSFDIA3MHZRIELDMRE6UHRAOVVTJ".to_string(),
                reflector_forex: "CBKGPWGKSKZF52CFHMTRR23TBWTPMRDIYZ4O2P5VS65BMHYH4DXMCJZC".to_string(),
                rpc_url: "https://soroban-rpc.mainnet.stellar.org".to_string(),
                network_passphrase: "Public Global Stellar Network ; September 2015".to_string(),
            },
        }
    }
}
