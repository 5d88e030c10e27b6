use crate::*;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sled::transaction::{ConflictableTransactionResult, TransactionalTree};

/// Modulus size of poll keys
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Generate a fresh RSA key for a poll
pub fn generate_key(bits: usize) -> Result<RsaPrivateKey, Error> {
    let mut rng = rand::rngs::OsRng;
    RsaPrivateKey::new(&mut rng, bits).map_err(Error::KeyGeneration)
}

/// PKCS#1 DER encoding of the public half of a poll key.
///
/// This is the only form in which key material leaves the server.
pub fn public_key_der(key: &RsaPrivateKey) -> Result<Vec<u8>, Error> {
    let public = RsaPublicKey::from(key);
    let der = public.to_pkcs1_der().map_err(Error::KeyEncode)?;
    Ok(der.as_bytes().to_vec())
}

/// Validate a key and encode it for storage
pub(crate) fn encode_key(key: &RsaPrivateKey) -> Result<Vec<u8>, Error> {
    key.validate().map_err(Error::InvalidKey)?;
    let der = key.to_pkcs1_der().map_err(Error::KeyEncode)?;
    Ok(der.as_bytes().to_vec())
}

pub(crate) fn put_key(
    keys: &TransactionalTree,
    poll_id: PollId,
    der: &[u8],
) -> ConflictableTransactionResult<(), Error> {
    keys.insert(key_key(poll_id), der)?;
    Ok(())
}

impl Store {
    /// Store the key of a poll
    pub fn save_key(&self, poll_id: PollId, key: &RsaPrivateKey) -> Result<(), Error> {
        let der = encode_key(key)?;
        self.keys
            .transaction(|keys| put_key(keys, poll_id, &der))
            .map_err(Error::from)
    }

    /// Read the key of a poll
    pub fn get_key(&self, poll_id: PollId) -> Result<RsaPrivateKey, Error> {
        let der = self
            .keys
            .get(key_key(poll_id))?
            .ok_or(Error::KeyNotFound(poll_id))?;
        RsaPrivateKey::from_pkcs1_der(&der).map_err(Error::KeyDecode)
    }
}
