// Treasury - the redemption sink
//
// Spendable units sent to the treasury leave circulation: the sender is
// debited and the burned total grows, while the treasury balance is untouched.
// The treasury can still hold units minted to it directly on stage entry.

use crate::identity::Address;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    address: Address,
}

impl Treasury {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// A transfer to the treasury is a redemption rather than a credit
    pub fn is_redemption(&self, to: &Address) -> bool {
        *to == self.address
    }
}
