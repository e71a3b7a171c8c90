use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PoolId {
    Address(Address),
}

impl Display for PoolId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolId::Address(address) => write!(f, "{address:#}"),
        }
    }
}

impl From<Address> for PoolId {
    fn from(address: Address) -> Self {
        PoolId::Address(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_id_display() {
        let address = Address::repeat_byte(7);
        assert_eq!(PoolId::from(address), PoolId::Address(address));
        assert_eq!(PoolId::from(address).to_string(), format!("{address:#}"));
    }

    #[test]
    fn test_pool_id_order() {
        let low = PoolId::Address(Address::repeat_byte(1));
        let high = PoolId::Address(Address::repeat_byte(2));
        assert!(low < high);
    }
}
