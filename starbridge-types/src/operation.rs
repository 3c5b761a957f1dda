use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::asset::AssetInfo;
use crate::chain::ChainId;
use crate::primitives::{Amount, DepositId};
use crate::registry::ChainRegistry;

/// The operation kinds a release transaction may contain.
///
/// Chain backends map their own operation types onto these; anything else becomes
/// `Unrecognized` with the backend's name for it.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Direct transfer to a destination account.
    Payment {
        destination: String,
        asset: AssetInfo,
        amount: Amount,
    },
    /// Stellar claimable balance the recipient claims later.
    CreateClaimableBalance {
        claimant: String,
        asset: AssetInfo,
        amount: Amount,
    },
    /// Smart-contract call (Soroban or EVM).
    InvokeContract {
        contract: String,
        function: String,
        args: Vec<Vec<u8>>,
    },
    /// An operation kind this relay has no model for.
    Unrecognized { kind: String },
}

impl Operation {
    /// Stable snake_case name of the variant.
    pub fn kind(&self) -> &str {
        match self {
            Operation::Payment { .. } => "payment",
            Operation::CreateClaimableBalance { .. } => "create_claimable_balance",
            Operation::InvokeContract { .. } => "invoke_contract",
            Operation::Unrecognized { kind } => kind,
        }
    }

    /// The asset moved by this operation, if any.
    pub fn asset(&self) -> Option<&AssetInfo> {
        match self {
            Operation::Payment { asset, .. } | Operation::CreateClaimableBalance { asset, .. } => {
                Some(asset)
            }
            Operation::InvokeContract { .. } | Operation::Unrecognized { .. } => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Operation::Payment {
                destination,
                asset,
                amount,
            } => write!(f, "payment of {} {} to {}", amount, asset.code, destination),
            Operation::CreateClaimableBalance {
                claimant,
                asset,
                amount,
            } => write!(
                f,
                "claimable balance of {} {} for {}",
                amount, asset.code, claimant
            ),
            Operation::InvokeContract {
                contract,
                function,
                args,
            } => write!(f, "call {}::{} ({} args)", contract, function, args.len()),
            Operation::Unrecognized { kind } => write!(f, "unrecognized operation '{}'", kind),
        }
    }
}

/// Chain-agnostic body of a release transaction, as witnesses encode it into an
/// envelope.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct BridgeTransaction {
    /// Chain the deposit was observed on.
    pub source_chain: ChainId,
    /// Source-chain deposit this release answers.
    pub deposit_id: DepositId,
    pub operations: Vec<Operation>,
}

impl BridgeTransaction {
    /// Borsh-encode into envelope body bytes.
    pub fn to_body(&self) -> Result<Vec<u8>, std::io::Error> {
        borsh::to_vec(self)
    }

    /// Parse envelope body bytes.
    pub fn from_body(body: &[u8]) -> Result<Self, std::io::Error> {
        Self::try_from_slice(body)
    }

    /// One line per operation, with each moved asset resolved to its identity on
    /// `destination`.
    pub fn describe(&self, registry: &ChainRegistry, destination: ChainId) -> Vec<String> {
        self.operations
            .iter()
            .map(|op| match op.asset() {
                Some(asset) => match registry.local_asset(destination, asset) {
                    Ok(local) => format!("{} -> {}", op, local),
                    Err(e) => format!("{} -> unresolved ({})", op, e),
                },
                None => op.to_string(),
            })
            .collect()
    }
}
