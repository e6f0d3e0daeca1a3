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

use bitcoin::bech32::{self, ToBase32, Variant};
use bitcoin::hashes::{hash160, Hash};
use bitcoin::secp256k1::{self, ecdsa, All, PublicKey, Secp256k1, SecretKey};
use bitcoin::util::bip32::{ChildNumber, DerivationPath, ExtendedPrivKey};
use bitcoin::Network;

use sha3::{Digest, Keccak256};

use model::{Bip32Path, HARDENED_FLAG};

use crate::Error;

pub const ETH_ADDR_LEN: usize = 20;

/// Keys derived from the device seed
pub struct Keychain {
    secp: Secp256k1<All>,
    master: ExtendedPrivKey,
}

/// `r`, `s` and the parity of the `R` point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub parity: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl Keychain {
    pub fn from_mnemonic(mnemonic: &str) -> Result<Self, Error> {
        let mnemonic = bip39::Mnemonic::parse_in_normalized(bip39::Language::English, mnemonic)
            .map_err(|_| Error::InvalidMnemonic)?;
        let seed = mnemonic.to_seed("");

        Ok(Keychain {
            secp: Secp256k1::new(),
            master: ExtendedPrivKey::new_master(Network::Bitcoin, &seed)?,
        })
    }

    fn derive(&self, path: &Bip32Path) -> Result<ExtendedPrivKey, Error> {
        let path = DerivationPath::from(
            path.components()
                .iter()
                .map(|c| ChildNumber::from(*c))
                .collect::<Vec<_>>(),
        );
        Ok(self.master.derive_priv(&self.secp, &path)?)
    }

    pub fn secret_key(&self, path: &Bip32Path) -> Result<SecretKey, Error> {
        Ok(self.derive(path)?.private_key)
    }

    pub fn chain_code(&self, path: &Bip32Path) -> Result<[u8; 32], Error> {
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&self.derive(path)?.chain_code[..]);
        Ok(chain_code)
    }

    pub fn public_key(&self, path: &Bip32Path) -> Result<PublicKey, Error> {
        let sk = self.secret_key(path)?;
        Ok(PublicKey::from_secret_key(&self.secp, &sk))
    }

    /// Deterministic (RFC6979) ECDSA signature of a 32 bytes digest
    pub fn sign_digest(
        &self,
        path: &Bip32Path,
        digest: &[u8; 32],
    ) -> Result<RecoverableSignature, Error> {
        let sk = self.secret_key(path)?;
        let msg = secp256k1::Message::from_slice(digest)?;
        let sig: ecdsa::RecoverableSignature = self.secp.sign_ecdsa_recoverable(&msg, &sk);
        let (recid, compact) = sig.serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);

        Ok(RecoverableSignature {
            parity: recid.to_i32() as u8,
            r,
            s,
        })
    }
}

/// Only `m/44'/60'/x/x/x` paths are accepted
pub fn validate_path(path: &Bip32Path) -> Result<(), Error> {
    match path.components() {
        [purpose, coin, _, _, _]
            if *purpose == 44 | HARDENED_FLAG && *coin == 60 | HARDENED_FLAG =>
        {
            Ok(())
        }
        _ => Err(Error::InvalidPath),
    }
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn eth_address(pk: &PublicKey) -> [u8; ETH_ADDR_LEN] {
    let uncompressed = pk.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);

    let mut addr = [0u8; ETH_ADDR_LEN];
    addr.copy_from_slice(&hash[32 - ETH_ADDR_LEN..]);
    addr
}

/// Lowercase hex, without the `0x` prefix
pub fn eth_address_hex(pk: &PublicKey) -> String {
    hex::encode(eth_address(pk))
}

pub fn bech32_address(pk: &PublicKey, hrp: &str) -> Result<String, Error> {
    let hash = hash160::Hash::hash(&pk.serialize());
    Ok(bech32::encode(hrp, hash.into_inner().to_base32(), Variant::Bech32)?)
}
