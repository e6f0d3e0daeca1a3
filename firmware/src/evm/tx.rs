// Portal Hardware Wallet firmware and supporting software libraries
//
// Copyright (C) 2024 Alekos Filini
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use gui::ReviewItem;

use super::rlp::{self, RlpError, RlpItem};
use super::units;

const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
const ERC20_TRANSFER_LEN: usize = 4 + 32 + 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    Legacy,
    /// EIP-2930
    AccessList,
    /// EIP-1559
    DynamicFee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxError {
    Rlp(RlpError),
    UnsupportedType(u8),
    WrongNumberOfFields(usize),
    InvalidAddress,
    NumberTooLarge,
    /// Legacy transactions with a chain id must end with two empty fields
    InvalidEip155Fields,
}

impl From<RlpError> for TxError {
    fn from(e: RlpError) -> Self {
        TxError::Rlp(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthTransaction {
    pub tx_type: TxType,
    pub chain_id: Option<u64>,
    pub nonce: Vec<u8>,
    /// `gas_price` for legacy and EIP-2930, `max_fee_per_gas` for EIP-1559
    pub max_fee_per_gas: Vec<u8>,
    pub gas_limit: Vec<u8>,
    pub to: Option<[u8; 20]>,
    pub value: Vec<u8>,
    pub data: Vec<u8>,
}

fn number(item: &RlpItem<'_>) -> Result<Vec<u8>, TxError> {
    let bytes = item.bytes()?;
    if bytes.len() > 32 {
        return Err(TxError::NumberTooLarge);
    }
    Ok(bytes.to_vec())
}

fn chain_id(item: &RlpItem<'_>) -> Result<u64, TxError> {
    units::to_u64(item.bytes()?).ok_or(TxError::NumberTooLarge)
}

fn address(item: &RlpItem<'_>) -> Result<Option<[u8; 20]>, TxError> {
    match item.bytes()? {
        [] => Ok(None),
        bytes if bytes.len() == 20 => {
            let mut addr = [0u8; 20];
            addr.copy_from_slice(bytes);
            Ok(Some(addr))
        }
        _ => Err(TxError::InvalidAddress),
    }
}

fn format_address(addr: &[u8]) -> String {
    format!("0x{}", hex::encode(addr))
}

impl EthTransaction {
    pub fn parse(payload: &[u8]) -> Result<Self, TxError> {
        let (tx_type, encoded) = match payload.first() {
            Some(0x01) => (TxType::AccessList, &payload[1..]),
            Some(0x02) => (TxType::DynamicFee, &payload[1..]),
            Some(v) if *v >= 0xC0 => (TxType::Legacy, payload),
            Some(v) => return Err(TxError::UnsupportedType(*v)),
            None => return Err(RlpError::Empty.into()),
        };

        let fields = rlp::decode_exact(encoded)?.list()?;

        match (tx_type, fields.as_slice()) {
            (TxType::Legacy, [nonce, gas_price, gas_limit, to, value, data, rest @ ..]) => {
                let chain_id = match rest {
                    [] => None,
                    [id, r, s] => {
                        if !r.bytes()?.is_empty() || !s.bytes()?.is_empty() {
                            return Err(TxError::InvalidEip155Fields);
                        }
                        Some(chain_id(id)?)
                    }
                    _ => return Err(TxError::WrongNumberOfFields(fields.len())),
                };

                Ok(EthTransaction {
                    tx_type,
                    chain_id,
                    nonce: number(nonce)?,
                    max_fee_per_gas: number(gas_price)?,
                    gas_limit: number(gas_limit)?,
                    to: address(to)?,
                    value: number(value)?,
                    data: data.bytes()?.to_vec(),
                })
            }
            (TxType::AccessList, [id, nonce, gas_price, gas_limit, to, value, data, access_list]) => {
                access_list.list()?;
                Ok(EthTransaction {
                    tx_type,
                    chain_id: Some(chain_id(id)?),
                    nonce: number(nonce)?,
                    max_fee_per_gas: number(gas_price)?,
                    gas_limit: number(gas_limit)?,
                    to: address(to)?,
                    value: number(value)?,
                    data: data.bytes()?.to_vec(),
                })
            }
            (
                TxType::DynamicFee,
                [id, nonce, _priority_fee, max_fee, gas_limit, to, value, data, access_list],
            ) => {
                access_list.list()?;
                Ok(EthTransaction {
                    tx_type,
                    chain_id: Some(chain_id(id)?),
                    nonce: number(nonce)?,
                    max_fee_per_gas: number(max_fee)?,
                    gas_limit: number(gas_limit)?,
                    to: address(to)?,
                    value: number(value)?,
                    data: data.bytes()?.to_vec(),
                })
            }
            _ => Err(TxError::WrongNumberOfFields(fields.len())),
        }
    }

    /// Recipient and amount of an ERC-20 `transfer(address,uint256)` call
    pub fn erc20_transfer(&self) -> Option<(&[u8], &[u8])> {
        if self.to.is_none()
            || self.data.len() != ERC20_TRANSFER_LEN
            || self.data[..4] != ERC20_TRANSFER_SELECTOR
            || self.data[4..16].iter().any(|b| *b != 0)
        {
            return None;
        }

        Some((&self.data[16..36], &self.data[36..]))
    }

    /// Anything carrying call data that isn't a plain token transfer can't be displayed
    pub fn requires_blind_signing(&self) -> bool {
        !self.data.is_empty() && self.erc20_transfer().is_none()
    }

    /// Recovery value `v` for a signature with the given `R` parity
    pub fn signature_v(&self, parity: u8) -> u8 {
        match (self.tx_type, self.chain_id) {
            (TxType::Legacy, Some(id)) if id > 0 => {
                id.wrapping_mul(2).wrapping_add(35 + parity as u64) as u8
            }
            (TxType::Legacy, _) => 27 + parity,
            _ => parity,
        }
    }

    pub fn max_fees(&self) -> Vec<u8> {
        units::mul(&self.gas_limit, &self.max_fee_per_gas)
    }

    pub fn review_items(&self) -> Vec<ReviewItem> {
        let mut items = vec![];

        if let Some(id) = self.chain_id {
            items.push(ReviewItem::new("Chain ID", id.to_string()));
        }

        match (self.erc20_transfer(), self.to) {
            (Some((receiver, amount)), Some(token)) => {
                items.push(ReviewItem::new("Token", format_address(&token)));
                items.push(ReviewItem::new("Receiver", format_address(receiver)));
                items.push(ReviewItem::new("Amount", units::to_decimal(amount)));
                if !units::to_decimal(&self.value).eq("0") {
                    items.push(ReviewItem::new("Value", units::format_coin(&self.value)));
                }
            }
            (_, to) => {
                let to = match to {
                    Some(to) => format_address(&to),
                    None => "Deploy contract".to_string(),
                };
                let title = if self.data.is_empty() {
                    "Receiver"
                } else {
                    "Contract"
                };
                items.push(ReviewItem::new(title, to));
                items.push(ReviewItem::new("Amount", units::format_coin(&self.value)));
            }
        }

        items.push(ReviewItem::new("Nonce", units::to_decimal(&self.nonce)));
        items.push(ReviewItem::new("Gas limit", units::to_decimal(&self.gas_limit)));
        items.push(ReviewItem::new("Max fees", units::format_coin(&self.max_fees())));

        if self.requires_blind_signing() {
            items.push(ReviewItem::new(
                "Data size",
                format!("{} bytes", self.data.len()),
            ));
        }

        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_hex(s: &str) -> EthTransaction {
        EthTransaction::parse(&hex::decode(s).unwrap()).unwrap()
    }

    #[test]
    fn test_dynamic_fee_transfer() {
        let tx = parse_hex("02f78205318402a8af41843b9aca00850d8c7b50e68303d090944a2962ac08962819a8a17661970e3c0db765565e8817addd0864728ae780c0");
        assert_eq!(tx.tx_type, TxType::DynamicFee);
        assert_eq!(tx.chain_id, Some(1329));
        assert!(!tx.requires_blind_signing());
        assert_eq!(tx.signature_v(1), 1);

        let items = tx.review_items();
        let find = |title: &str| {
            items
                .iter()
                .find(|i| i.title == title)
                .map(|i| i.value.clone())
        };
        assert_eq!(find("Chain ID").as_deref(), Some("1329"));
        assert_eq!(
            find("Receiver").as_deref(),
            Some("0x4a2962ac08962819a8a17661970e3c0db765565e")
        );
        assert_eq!(find("Amount").as_deref(), Some("1.706262861957991143 SEI"));
        assert_eq!(find("Nonce").as_deref(), Some("44609345"));
        assert_eq!(find("Gas limit").as_deref(), Some("250000"));
        assert_eq!(find("Max fees").as_deref(), Some("0.0145478666815 SEI"));
        assert_eq!(find("Data size"), None);
    }

    #[test]
    fn test_legacy_eip155() {
        let tx = parse_hex("eb80856d6e2edc00832dc6c094df073477da421520cf03af261b782282c304ad6684abcdef00808205318080");
        assert_eq!(tx.tx_type, TxType::Legacy);
        assert_eq!(tx.chain_id, Some(1329));
        assert!(!tx.requires_blind_signing());
        // 1329 * 2 + 35 = 2693 = 0x0A85
        assert_eq!(tx.signature_v(0), 0x85);
        assert_eq!(tx.signature_v(1), 0x86);
        assert_eq!(units::format_coin(&tx.max_fees()), "1.41 SEI");
    }

    #[test]
    fn test_legacy_without_chain_id() {
        // same transfer with only six fields
        let tx = parse_hex("e680856d6e2edc00832dc6c094df073477da421520cf03af261b782282c304ad6684abcdef0080");
        assert_eq!(tx.chain_id, None);
        assert_eq!(tx.signature_v(1), 28);
    }

    #[test]
    fn test_erc20_is_clear_signed() {
        let tx = parse_hex("f86e80856d6e2edc00832dc6c0941d80c49bbbcd1c0911346656b529df9e5c2f783d8203e8b844a9059cbb000000000000000000000000b7784e5ad303d44067d2a6353441b784c226ccaf00000000000000000000000000000000000000000000000000000000075bca008205318080");
        assert!(!tx.requires_blind_signing());

        let (receiver, amount) = tx.erc20_transfer().unwrap();
        assert_eq!(hex::encode(receiver), "b7784e5ad303d44067d2a6353441b784c226ccaf");
        assert_eq!(units::to_decimal(amount), "123456000");

        let titles = tx
            .review_items()
            .into_iter()
            .map(|i| i.title)
            .collect::<Vec<_>>();
        assert_eq!(
            titles,
            vec!["Chain ID", "Token", "Receiver", "Amount", "Value", "Nonce", "Gas limit", "Max fees"]
        );
    }

    #[test]
    fn test_blind_signing_required() {
        // contract deployment
        let tx = parse_hex("f85c80856d6e2edc00832dc6c08084abcdef00b8441a8451e6000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000008205318080");
        assert_eq!(tx.to, None);
        assert!(tx.requires_blind_signing());
        let items = tx.review_items();
        assert_eq!(items[1], ReviewItem::new("Contract", "Deploy contract"));
        assert_eq!(items.last().unwrap(), &ReviewItem::new("Data size", "68 bytes"));

        // short call data
        let tx = parse_hex("ef80856d6e2edc00832dc6c094c67dce33d7a8efa5ffeb961899c73fe01bce92738203e886b302f39300018205318080");
        assert!(tx.requires_blind_signing());
    }

    #[test]
    fn test_malformed() {
        assert!(EthTransaction::parse(&[]).is_err());
        assert_eq!(
            EthTransaction::parse(&[0x05]),
            Err(TxError::UnsupportedType(0x05))
        );
        // truncated list
        assert!(EthTransaction::parse(&hex::decode("eb80856d6e2edc00").unwrap()).is_err());
        // too few fields
        assert_eq!(
            EthTransaction::parse(&[0xC2, 0x80, 0x80]),
            Err(TxError::WrongNumberOfFields(2))
        );
    }
}
