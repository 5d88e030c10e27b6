//! Database layout.
//!
//! All state lives in a single `sled` database split into three trees:
//!
//! * `keys` maps a poll id to the PKCS#1 DER encoding of its RSA private key.
//! * `polls` holds every poll, each under its own prefix (the big-endian poll id):
//!   - `id ‖ 0x00`: header, the number of questions
//!   - `id ‖ 0x01 ‖ index`: one CBOR question per index
//!   - `id ‖ 0x02 ‖ token`: `[1]` for an unused token, `[0]` once used
//!   - `id ‖ 0x03 ‖ ballot`: CBOR signature and answers of the vote cast with that ballot
//! * `meta` holds the last allocated poll id under `poll_seq`.
//!
//! Every write goes through a `sled` transaction, which is serializable, so the
//! checks done inside one (token unused, poll exists) hold when it commits.

use crate::*;
use sled::transaction::{abort, ConflictableTransactionResult, TransactionalTree};
use sled::IVec;
use std::convert::TryInto;
use std::path::Path;

/// Identifier of a poll, starting at 1
pub type PollId = u32;

const KEYS_TREE: &str = "keys";
const POLLS_TREE: &str = "polls";
const META_TREE: &str = "meta";

pub(crate) const POLL_SEQ: &[u8] = b"poll_seq";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Region {
    Header = 0,
    Question = 1,
    Token = 2,
    Vote = 3,
}

pub(crate) const TOKEN_UNUSED: u8 = 1;
pub(crate) const TOKEN_USED: u8 = 0;

/// Handle to the poll database. Cheap to clone, safe to share between threads.
#[derive(Clone)]
pub struct Store {
    db: sled::Db,
    pub(crate) keys: sled::Tree,
    pub(crate) polls: sled::Tree,
    pub(crate) meta: sled::Tree,
}

impl Store {
    /// Open (or create) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        log::debug!("opening poll database at {}", path.as_ref().display());
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open a throwaway database, removed when dropped
    pub fn temporary() -> Result<Self, Error> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, Error> {
        Ok(Store {
            keys: db.open_tree(KEYS_TREE)?,
            polls: db.open_tree(POLLS_TREE)?,
            meta: db.open_tree(META_TREE)?,
            db,
        })
    }

    /// Block until all pending writes are on disk
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    /// Does a poll with this id exist
    pub fn poll_exists(&self, poll_id: PollId) -> Result<bool, Error> {
        Ok(self.polls.contains_key(header_key(poll_id))?)
    }
}

pub(crate) fn key_key(poll_id: PollId) -> Vec<u8> {
    poll_id.to_be_bytes().to_vec()
}

pub(crate) fn poll_prefix(poll_id: PollId, region: Region) -> Vec<u8> {
    let mut key = Vec::with_capacity(5);
    key.extend_from_slice(&poll_id.to_be_bytes());
    key.push(region as u8);
    key
}

pub(crate) fn header_key(poll_id: PollId) -> Vec<u8> {
    poll_prefix(poll_id, Region::Header)
}

pub(crate) fn question_key(poll_id: PollId, index: u32) -> Vec<u8> {
    let mut key = poll_prefix(poll_id, Region::Question);
    key.extend_from_slice(&index.to_be_bytes());
    key
}

pub(crate) fn token_key(poll_id: PollId, token: &[u8]) -> Vec<u8> {
    let mut key = poll_prefix(poll_id, Region::Token);
    key.extend_from_slice(token);
    key
}

pub(crate) fn vote_key(poll_id: PollId, ballot: &[u8]) -> Vec<u8> {
    let mut key = poll_prefix(poll_id, Region::Vote);
    key.extend_from_slice(ballot);
    key
}

pub(crate) fn encode_u32(value: u32) -> IVec {
    IVec::from(&value.to_be_bytes()[..])
}

pub(crate) fn decode_u32(bytes: &[u8]) -> Result<u32, Error> {
    let bytes: [u8; 4] = bytes
        .try_into()
        .map_err(|_| Error::Corrupted("integer of wrong length"))?;
    Ok(u32::from_be_bytes(bytes))
}

/// Abort a transaction with `err` if `res` failed
pub(crate) fn abort_on<T, E: Into<Error>>(
    res: Result<T, E>,
) -> ConflictableTransactionResult<T, Error> {
    match res {
        Ok(t) => Ok(t),
        Err(e) => abort(e.into()),
    }
}

/// Reserve the next poll id. Only advances if the enclosing transaction commits.
pub(crate) fn next_poll_id(
    meta: &TransactionalTree,
) -> ConflictableTransactionResult<PollId, Error> {
    let last = match meta.get(POLL_SEQ)? {
        Some(bytes) => abort_on(decode_u32(&bytes))?,
        None => 0,
    };
    let next = match last.checked_add(1) {
        Some(next) => next,
        None => return abort(Error::Corrupted("poll id sequence exhausted")),
    };
    meta.insert(POLL_SEQ, encode_u32(next))?;
    Ok(next)
}

/// Number of questions of a poll, or `None` if it does not exist
pub(crate) fn poll_header(
    polls: &TransactionalTree,
    poll_id: PollId,
) -> ConflictableTransactionResult<Option<u32>, Error> {
    match polls.get(header_key(poll_id))? {
        Some(bytes) => Ok(Some(abort_on(decode_u32(&bytes))?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(header_key(1), vec![0, 0, 0, 1, 0]);
        assert_eq!(question_key(258, 3), vec![0, 0, 1, 2, 1, 0, 0, 0, 3]);
        assert_eq!(token_key(1, b"ab"), vec![0, 0, 0, 1, 2, b'a', b'b']);
        assert_eq!(vote_key(1, b"x"), vec![0, 0, 0, 1, 3, b'x']);

        // Regions of one poll sort together and before the next poll
        assert!(vote_key(1, &[0xff; 8]) < header_key(2));
    }

    #[test]
    fn test_u32_encoding() {
        assert_eq!(decode_u32(&encode_u32(12345)).unwrap(), 12345);
        assert!(decode_u32(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_open_path() {
        let dir = std::env::temp_dir().join(format!("blindpoll-store-{}", std::process::id()));
        {
            let store = Store::open(&dir).unwrap();
            store.polls.insert(header_key(1), encode_u32(0)).unwrap();
            store.flush().unwrap();
            assert!(store.poll_exists(1).unwrap());
            assert!(!store.poll_exists(2).unwrap());
        }
        std::fs::remove_dir_all(&dir).ok();
    }
}
