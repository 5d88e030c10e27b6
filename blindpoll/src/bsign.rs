//! RSA blind signatures.
//!
//! The server side is a bare modular exponentiation: it signs whatever integer it
//! is handed, so a client can hide its ballot behind a blinding factor. Only
//! verification knows about hashing.

use num_bigint_dig::{BigInt, BigUint, ModInverse, RandBigInt, Sign};
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const HASH_LEN: usize = 32;

/// Sign a message, returning `message^d mod N`.
///
/// The message is read as a big-endian unsigned integer. No hashing or padding
/// is applied, the caller is expected to have hashed and blinded it already.
pub fn sign(key: &RsaPrivateKey, message: &[u8]) -> BigUint {
    let m = BigUint::from_bytes_be(message);
    m.modpow(key.d(), key.n())
}

/// Check that `signature^e mod N == SHA-256(ballot)`.
///
/// Any malformed signature simply fails to verify.
pub fn verify(key: &RsaPublicKey, ballot: &[u8], signature: &[u8]) -> bool {
    let s = BigUint::from_bytes_be(signature);
    if &s >= key.n() {
        return false;
    }

    let recovered = s.modpow(key.e(), key.n()).to_bytes_be();
    if recovered.len() > HASH_LEN {
        return false;
    }
    let mut padded = [0u8; HASH_LEN];
    padded[HASH_LEN - recovered.len()..].copy_from_slice(&recovered);

    let hash = Sha256::digest(ballot);
    padded[..].ct_eq(hash.as_slice()).into()
}

/// A blinded ballot hash, ready to be sent for signing, with the factor needed to unblind it.
pub struct Blinded {
    pub envelope: Vec<u8>,
    pub factor: BigUint,
}

/// Blind `SHA-256(ballot)` as `hash * r^e mod N` for a random `r` coprime to N.
pub fn blind<R: RngCore + CryptoRng>(key: &RsaPublicKey, ballot: &[u8], rng: &mut R) -> Blinded {
    let n = key.n();
    let hash = BigUint::from_bytes_be(&Sha256::digest(ballot));

    let factor = loop {
        let r = rng.gen_biguint_below(n);
        if !r.is_zero() && num_integer::Integer::gcd(&r, n).is_one() {
            break r;
        }
    };

    let blinded = (hash * factor.modpow(key.e(), n)) % n;
    Blinded {
        envelope: blinded.to_bytes_be(),
        factor,
    }
}

/// Strip the blinding factor from a signed envelope: `s * r^-1 mod N`.
///
/// Returns `None` if `factor` has no inverse modulo N.
pub fn unblind(key: &RsaPublicKey, signed_envelope: &[u8], factor: &BigUint) -> Option<BigUint> {
    let n = key.n();
    let modulus = BigInt::from_biguint(Sign::Plus, n.clone());
    let inverse = factor.clone().mod_inverse(n)?;
    let inverse = ((inverse % &modulus) + &modulus) % &modulus;
    let inverse = inverse.to_biguint()?;
    let s = BigUint::from_bytes_be(signed_envelope);
    Some((s * inverse) % n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let mut rng = rand::thread_rng();
        let secret = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let public = secret.to_public_key();
        (secret, public)
    }

    #[test]
    fn test_blind_sign_roundtrip() {
        let (secret, public) = keypair();
        let mut rng = rand::thread_rng();

        for _ in 0..5 {
            let mut ballot = [0u8; 48];
            rng.fill_bytes(&mut ballot);

            let blinded = blind(&public, &ballot, &mut rng);
            let signed = sign(&secret, &blinded.envelope);
            let signature = unblind(&public, &signed.to_bytes_be(), &blinded.factor).unwrap();

            assert!(verify(&public, &ballot, &signature.to_bytes_be()));
        }
    }

    #[test]
    fn test_unblinded_signature() {
        let (secret, public) = keypair();

        // Signing the plain hash gives the same signature blinding would
        let hash = Sha256::digest(b"12345678");
        let signature = sign(&secret, &hash).to_bytes_be();
        assert!(verify(&public, b"12345678", &signature));
        assert!(!verify(&public, b"Some value", &signature));
    }

    #[test]
    fn test_tampered_signature() {
        let (secret, public) = keypair();
        let hash = Sha256::digest(b"ballot");
        let signature = sign(&secret, &hash).to_bytes_be();

        for i in 0..signature.len() {
            for bit in 0..8 {
                let mut tampered = signature.clone();
                tampered[i] ^= 1 << bit;
                assert!(!verify(&public, b"ballot", &tampered));
            }
        }
    }

    #[test]
    fn test_malformed_signature() {
        let (_secret, public) = keypair();

        assert!(!verify(&public, b"ballot", &[]));
        assert!(!verify(&public, b"ballot", &[0]));

        // Values at or above the modulus are rejected outright
        let n = public.n().to_bytes_be();
        assert!(!verify(&public, b"ballot", &n));
        let mut too_long = vec![0xff];
        too_long.extend_from_slice(&n);
        assert!(!verify(&public, b"ballot", &too_long));
    }

    #[test]
    fn test_wrong_key() {
        let (secret, _public) = keypair();
        let (_other_secret, other_public) = keypair();

        let hash = Sha256::digest(b"ballot");
        let signature = sign(&secret, &hash).to_bytes_be();
        assert!(!verify(&other_public, b"ballot", &signature));
    }
}
