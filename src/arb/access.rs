use alloy::primitives::Address;
use log::warn;

use super::error::EngineError;

/// The single identity allowed to call privileged engine operations.
///
/// Fixed at construction; there is no transfer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator(Address);

impl Operator {
    /// Creates the gate for `address`
    #[must_use]
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    /// The operator's address
    #[must_use]
    pub const fn address(&self) -> Address {
        self.0
    }

    /// Fails with [`EngineError::Unauthorized`] unless `caller` is the operator
    ///
    /// # Errors
    /// * If `caller` is any other identity
    pub fn authorize(&self, caller: Address) -> Result<(), EngineError> {
        if caller == self.0 {
            Ok(())
        } else {
            warn!("Refusing privileged call from {caller}");
            Err(EngineError::Unauthorized { caller })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arb::test_helpers::addr;

    #[test]
    fn test_authorize() {
        let operator = Operator::new(addr("0"));
        assert!(operator.authorize(addr("0")).is_ok());
        assert!(matches!(
            operator.authorize(addr("1")),
            Err(EngineError::Unauthorized { caller }) if caller == addr("1")
        ));
    }
}
