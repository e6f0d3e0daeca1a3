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

use bitcoin::secp256k1::{ecdsa, Message, PublicKey, Secp256k1};
use sha3::{Digest, Keccak256};

use sdk::Signature;

use crate::Error;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Check `signature` over the keccak-256 digest of `raw_payload`
///
/// `expected_public_key` is a SEC1 key, compressed or not. High-S signatures are checked
/// through their low-S form.
pub fn verify(raw_payload: &[u8], signature: &Signature, expected_public_key: &[u8]) -> bool {
    let pk = match PublicKey::from_slice(expected_public_key) {
        Ok(pk) => pk,
        Err(e) => {
            log::warn!("Invalid public key: {}", e);
            return false;
        }
    };

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(&signature.r);
    compact[32..].copy_from_slice(&signature.s);
    let mut sig = match ecdsa::Signature::from_compact(&compact) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    sig.normalize_s();

    let digest = keccak256(raw_payload);
    let msg = match Message::from_slice(&digest) {
        Ok(msg) => msg,
        Err(_) => return false,
    };

    Secp256k1::verification_only()
        .verify_ecdsa(&msg, &sig, &pk)
        .is_ok()
}

pub fn verify_or_fail(
    raw_payload: &[u8],
    signature: &Signature,
    expected_public_key: &[u8],
) -> Result<(), Error> {
    match verify(raw_payload, signature, expected_public_key) {
        true => Ok(()),
        false => Err(Error::Verification(format!(
            "Signature r={} s={} does not match {}",
            hex::encode(signature.r),
            hex::encode(signature.s),
            hex::encode(expected_public_key)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::secp256k1::SecretKey;

    use super::*;
    use crate::fixtures::{EXPECTED_ETH_PK, EXPECTED_PK};

    const ORDER: &str = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";

    fn sign(payload: &[u8]) -> (Signature, PublicKey) {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let pk = PublicKey::from_secret_key(&secp, &sk);
        let msg = Message::from_slice(&keccak256(payload)).unwrap();
        let compact = secp.sign_ecdsa(&msg, &sk).serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);
        (Signature { v: 0, r, s }, pk)
    }

    /// n - s, the other valid s for the same r
    fn negate_s(s: &[u8; 32]) -> [u8; 32] {
        let n = hex::decode(ORDER).unwrap();
        let mut out = [0u8; 32];
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let mut v = n[i] as i16 - s[i] as i16 - borrow;
            borrow = if v < 0 { 1 } else { 0 };
            if v < 0 {
                v += 256;
            }
            out[i] = v as u8;
        }
        out
    }

    #[test]
    fn test_verify() {
        let payload = hex::decode("eb80856d6e2edc00832dc6c094df073477da421520cf03af261b782282c304ad6684abcdef00808205318080").unwrap();
        let (sig, pk) = sign(&payload);

        assert!(verify(&payload, &sig, &pk.serialize()));
        assert!(verify(&payload, &sig, &pk.serialize_uncompressed()));
        assert!(verify_or_fail(&payload, &sig, &pk.serialize()).is_ok());

        let high_s = Signature {
            s: negate_s(&sig.s),
            ..sig
        };
        assert!(verify(&payload, &high_s, &pk.serialize()));

        let mut other = payload.clone();
        other[1] ^= 0x01;
        assert!(!verify(&other, &sig, &pk.serialize()));
        assert!(matches!(
            verify_or_fail(&other, &sig, &pk.serialize()),
            Err(Error::Verification(_))
        ));
    }

    #[test]
    fn test_wrong_key() {
        let payload = b"payload";
        let (sig, _) = sign(payload);

        assert!(!verify(payload, &sig, &hex::decode(EXPECTED_PK).unwrap()));
        assert!(!verify(payload, &sig, &hex::decode(EXPECTED_ETH_PK).unwrap()));
        assert!(!verify(payload, &sig, &[0x02; 10]));
    }

    #[test]
    fn test_keccak() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}
