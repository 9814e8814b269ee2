//! asset vault
//!
//! the pool never holds balances itself. everything it owns lives on the
//! external chain behind an [`AssetBackend`]; the vault is the pool's view
//! of that chain: pull funds in, pay funds out, read its own holdings.
//!
//! ```text
//!   payer ──pull──▶ [ pool address ] ──push──▶ recipient, fee beneficiary
//! ```

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{PoolError, TransferError};
use crate::value::{Amount, Asset};

/// one outgoing transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub to: Address,
    pub asset: Asset,
    pub amount: Amount,
}

impl Payout {
    pub fn new(to: Address, asset: Asset, amount: Amount) -> Self {
        Self { to, asset, amount }
    }
}

/// the chain the pool settles on
///
/// every call is an external interaction: it either fully applies or
/// reports an error and changes nothing.
pub trait AssetBackend {
    /// balance of `owner` in `asset`
    fn balance_of(&self, owner: &Address, asset: &Asset) -> Amount;

    /// move `amount` from `from` into `to`.
    ///
    /// native: the value attached to the call. token: transferFrom, spending
    /// the allowance `from` granted to `to`.
    fn pull(
        &mut self,
        asset: &Asset,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// pay out of `from`; all payouts land or none do
    fn push(&mut self, from: &Address, payouts: &[Payout]) -> Result<(), TransferError>;
}

/// the pool's account on a backend
#[derive(Clone, Debug)]
pub struct AssetVault<B> {
    address: Address,
    backend: B,
}

impl<B: AssetBackend> AssetVault<B> {
    pub fn new(address: Address, backend: B) -> Self {
        Self { address, backend }
    }

    /// take `amount` of `asset` from `from`.
    ///
    /// `attached` is the native value sent along with the call: it must equal
    /// `amount` for native deposits and be zero for token deposits.
    pub fn receive(
        &mut self,
        from: &Address,
        asset: &Asset,
        amount: Amount,
        attached: Amount,
    ) -> Result<(), PoolError> {
        let expected = match asset {
            Asset::Native => amount,
            Asset::Token(_) => Amount::ZERO,
        };
        if attached != expected {
            return Err(PoolError::AmountMismatch {
                expected,
                actual: attached,
            });
        }

        self.backend.pull(asset, from, &self.address, amount)?;
        Ok(())
    }

    /// pay out a batch from the vault, all or nothing
    pub fn pay(&mut self, payouts: &[Payout]) -> Result<(), PoolError> {
        if payouts.is_empty() {
            return Ok(());
        }
        self.backend.push(&self.address, payouts)?;
        Ok(())
    }

    /// current holding of `asset`
    pub fn balance(&self, asset: &Asset) -> Amount {
        self.backend.balance_of(&self.address, asset)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn vault() -> (AssetVault<MemoryBackend>, Address) {
        let payer = Address::derive(b"alice");
        let mut backend = MemoryBackend::new();
        backend.mint_native(&payer, Amount(1_000)).unwrap();
        (AssetVault::new(Address::derive(b"pool"), backend), payer)
    }

    #[test]
    fn test_receive_native_requires_exact_value() {
        let (mut vault, payer) = vault();

        assert_eq!(
            vault.receive(&payer, &Asset::Native, Amount(100), Amount(99)),
            Err(PoolError::AmountMismatch {
                expected: Amount(100),
                actual: Amount(99)
            })
        );
        assert_eq!(vault.balance(&Asset::Native), Amount::ZERO);

        vault
            .receive(&payer, &Asset::Native, Amount(100), Amount(100))
            .unwrap();
        assert_eq!(vault.balance(&Asset::Native), Amount(100));
        assert_eq!(
            vault.backend().balance_of(&payer, &Asset::Native),
            Amount(900)
        );
    }

    #[test]
    fn test_receive_token_rejects_attached_value() {
        let (mut vault, payer) = vault();
        let token = Asset::Token(Address::derive(b"usdc"));
        assert!(matches!(
            vault.receive(&payer, &token, Amount(5), Amount(1)),
            Err(PoolError::AmountMismatch { .. })
        ));
    }

    #[test]
    fn test_receive_token_needs_allowance() {
        let (mut vault, payer) = vault();
        let usdc = Address::derive(b"usdc");
        let token = Asset::Token(usdc);
        let pool = vault.address();
        vault.backend_mut().mint_token(&usdc, &payer, Amount(50)).unwrap();

        assert_eq!(
            vault.receive(&payer, &token, Amount(20), Amount::ZERO),
            Err(PoolError::InsufficientAllowance {
                required: Amount(20),
                available: Amount::ZERO
            })
        );

        vault.backend_mut().approve(&usdc, &payer, &pool, Amount(20));
        vault.receive(&payer, &token, Amount(20), Amount::ZERO).unwrap();
        assert_eq!(vault.balance(&token), Amount(20));
        assert_eq!(vault.backend().allowance(&usdc, &payer, &pool), Amount::ZERO);
    }

    #[test]
    fn test_pay_is_all_or_nothing() {
        let (mut vault, payer) = vault();
        vault
            .receive(&payer, &Asset::Native, Amount(100), Amount(100))
            .unwrap();

        let bob = Address::derive(b"bob");
        let relayer = Address::derive(b"relayer");
        vault.backend_mut().set_rejects_native(&relayer, true);

        let payouts = [
            Payout::new(bob, Asset::Native, Amount(90)),
            Payout::new(relayer, Asset::Native, Amount(10)),
        ];
        assert!(matches!(
            vault.pay(&payouts),
            Err(PoolError::TransferFailed(TransferError::Rejected { .. }))
        ));
        assert_eq!(vault.balance(&Asset::Native), Amount(100));
        assert_eq!(vault.backend().balance_of(&bob, &Asset::Native), Amount::ZERO);

        vault.backend_mut().set_rejects_native(&relayer, false);
        vault.pay(&payouts).unwrap();
        assert_eq!(vault.balance(&Asset::Native), Amount::ZERO);
        assert_eq!(vault.backend().balance_of(&bob, &Asset::Native), Amount(90));
    }

    #[test]
    fn test_pay_more_than_held() {
        let (mut vault, _) = vault();
        let bob = Address::derive(b"bob");
        assert!(matches!(
            vault.pay(&[Payout::new(bob, Asset::Native, Amount(1))]),
            Err(PoolError::TransferFailed(TransferError::InsufficientBalance { .. }))
        ));
    }
}
