//! Standard-library composites: coins, keys, addresses, `Maybe`, `Either`

use num_bigint::BigUint;
use num_traits::ToPrimitive;

use super::primitives::{CompactBoolean, CompactBytes, CompactUnsignedInteger};
use super::{CompactType, ValueReader};
use crate::error::{RuntimeError, RuntimeResult};
use crate::types::{
    Alignment, CoinInfo, CoinPublicKey, ContractAddress, QualifiedCoinInfo, Recipient, Value,
};

const BYTES32: CompactBytes<32> = CompactBytes::<32>;

fn uint(length: u32) -> CompactUnsignedInteger {
    CompactUnsignedInteger::for_bytes(length)
}

fn to_u128(x: BigUint) -> RuntimeResult<u128> {
    x.to_u128()
        .ok_or_else(|| RuntimeError::out_of_range(format!("{x} does not fit in Uint<128>")))
}

fn to_u64(x: BigUint) -> RuntimeResult<u64> {
    x.to_u64()
        .ok_or_else(|| RuntimeError::out_of_range(format!("{x} does not fit in Uint<64>")))
}

/// Skip the segments of an absent member
fn skip(reader: &mut ValueReader<'_>, alignment: &Alignment, what: &str) -> RuntimeResult<()> {
    for _ in 0..alignment.len() {
        reader.shift(what)?;
    }
    Ok(())
}

// ============================================================================
// Keys and addresses
// ============================================================================

/// `ZswapCoinPublicKey`: `Bytes<32>`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactCoinPublicKey;

impl CompactType for CompactCoinPublicKey {
    type Native = CoinPublicKey;

    fn alignment(&self) -> Alignment {
        BYTES32.alignment()
    }

    fn to_value(&self, native: &CoinPublicKey) -> RuntimeResult<Value> {
        BYTES32.to_value(&native.0)
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<CoinPublicKey> {
        Ok(CoinPublicKey(BYTES32.from_value(reader)?))
    }
}

/// `ContractAddress`: `Bytes<32>`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactContractAddress;

impl CompactType for CompactContractAddress {
    type Native = ContractAddress;

    fn alignment(&self) -> Alignment {
        BYTES32.alignment()
    }

    fn to_value(&self, native: &ContractAddress) -> RuntimeResult<Value> {
        BYTES32.to_value(native.as_bytes())
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<ContractAddress> {
        Ok(ContractAddress::new(BYTES32.from_value(reader)?))
    }
}

// ============================================================================
// Coins
// ============================================================================

/// `CoinInfo`: nonce `Bytes<32>`, color `Bytes<32>`, value `Uint<128>`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactCoinInfo;

impl CompactType for CompactCoinInfo {
    type Native = CoinInfo;

    fn alignment(&self) -> Alignment {
        Alignment::concat([&BYTES32.alignment(), &BYTES32.alignment(), &uint(16).alignment()])
    }

    fn to_value(&self, native: &CoinInfo) -> RuntimeResult<Value> {
        let mut value = BYTES32.to_value(&native.nonce)?;
        value.extend(BYTES32.to_value(&native.color)?);
        value.extend(uint(16).to_value(&BigUint::from(native.value))?);
        Ok(value)
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<CoinInfo> {
        let nonce = BYTES32.from_value(reader)?;
        let color = BYTES32.from_value(reader)?;
        let value = to_u128(uint(16).from_value(reader)?)?;
        Ok(CoinInfo {
            nonce,
            color,
            value,
        })
    }
}

/// `QualifiedCoinInfo`: a `CoinInfo` followed by its Merkle index `Uint<64>`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactQualifiedCoinInfo;

impl CompactType for CompactQualifiedCoinInfo {
    type Native = QualifiedCoinInfo;

    fn alignment(&self) -> Alignment {
        Alignment::concat([&CompactCoinInfo.alignment(), &uint(8).alignment()])
    }

    fn to_value(&self, native: &QualifiedCoinInfo) -> RuntimeResult<Value> {
        let mut value = CompactCoinInfo.to_value(&native.to_coin_info())?;
        value.extend(uint(8).to_value(&BigUint::from(native.mt_index))?);
        Ok(value)
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<QualifiedCoinInfo> {
        let coin = CompactCoinInfo.from_value(reader)?;
        let mt_index = to_u64(uint(8).from_value(reader)?)?;
        Ok(QualifiedCoinInfo::new(coin, mt_index))
    }
}

/// `Either<ZswapCoinPublicKey, ContractAddress>`
///
/// The side not taken is encoded as zero bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactRecipient;

impl CompactType for CompactRecipient {
    type Native = Recipient;

    fn alignment(&self) -> Alignment {
        Alignment::concat([
            &CompactBoolean.alignment(),
            &BYTES32.alignment(),
            &BYTES32.alignment(),
        ])
    }

    fn to_value(&self, native: &Recipient) -> RuntimeResult<Value> {
        let (is_left, left, right) = match native {
            Recipient::User(key) => (true, key.0, [0u8; 32]),
            Recipient::Contract(address) => (false, [0u8; 32], *address.as_bytes()),
        };
        let mut value = CompactBoolean.to_value(&is_left)?;
        value.extend(BYTES32.to_value(&left)?);
        value.extend(BYTES32.to_value(&right)?);
        Ok(value)
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<Recipient> {
        let is_left = CompactBoolean.from_value(reader)?;
        let left = BYTES32.from_value(reader)?;
        let right = BYTES32.from_value(reader)?;
        Ok(if is_left {
            Recipient::User(CoinPublicKey(left))
        } else {
            Recipient::Contract(ContractAddress::new(right))
        })
    }
}

// ============================================================================
// Maybe and Either
// ============================================================================

/// `Maybe<T>`: presence flag then the value, zeroed when absent
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactMaybe<T> {
    inner: T,
}

impl<T: CompactType> CompactMaybe<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: CompactType> CompactType for CompactMaybe<T> {
    type Native = Option<T::Native>;

    fn alignment(&self) -> Alignment {
        Alignment::concat([&CompactBoolean.alignment(), &self.inner.alignment()])
    }

    fn to_value(&self, native: &Option<T::Native>) -> RuntimeResult<Value> {
        let mut value = CompactBoolean.to_value(&native.is_some())?;
        match native {
            Some(inner) => value.extend(self.inner.to_value(inner)?),
            None => value.extend(self.inner.alignment().zero_value()),
        }
        Ok(value)
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<Option<T::Native>> {
        if CompactBoolean.from_value(reader)? {
            Ok(Some(self.inner.from_value(reader)?))
        } else {
            skip(reader, &self.inner.alignment(), "Maybe")?;
            Ok(None)
        }
    }
}

/// Native value of an `Either<L, R>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

/// `Either<A, B>`: side flag, then the left and the right value, the side not
/// taken zeroed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactEither<A, B> {
    left: A,
    right: B,
}

impl<A: CompactType, B: CompactType> CompactEither<A, B> {
    pub fn new(left: A, right: B) -> Self {
        Self { left, right }
    }
}

impl<A: CompactType, B: CompactType> CompactType for CompactEither<A, B> {
    type Native = Either<A::Native, B::Native>;

    fn alignment(&self) -> Alignment {
        Alignment::concat([
            &CompactBoolean.alignment(),
            &self.left.alignment(),
            &self.right.alignment(),
        ])
    }

    fn to_value(&self, native: &Self::Native) -> RuntimeResult<Value> {
        let mut value = CompactBoolean.to_value(&matches!(native, Either::Left(_)))?;
        match native {
            Either::Left(left) => {
                value.extend(self.left.to_value(left)?);
                value.extend(self.right.alignment().zero_value());
            }
            Either::Right(right) => {
                value.extend(self.left.alignment().zero_value());
                value.extend(self.right.to_value(right)?);
            }
        }
        Ok(value)
    }

    fn from_value(&self, reader: &mut ValueReader<'_>) -> RuntimeResult<Self::Native> {
        if CompactBoolean.from_value(reader)? {
            let left = self.left.from_value(reader)?;
            skip(reader, &self.right.alignment(), "Either")?;
            Ok(Either::Left(left))
        } else {
            skip(reader, &self.left.alignment(), "Either")?;
            Ok(Either::Right(self.right.from_value(reader)?))
        }
    }
}
