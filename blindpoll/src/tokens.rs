//! One-time voting tokens.
//!
//! A token of a poll is either absent, unused (after [`Store::save_token`]) or
//! used (after [`Store::accept_token`]). Once used it stays used: it can neither
//! be accepted again nor re-saved.

use crate::*;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sled::transaction::abort;

impl Store {
    /// Register an unused token for a poll
    pub fn save_token(&self, poll_id: PollId, token: &[u8]) -> Result<(), Error> {
        if token.is_empty() {
            return Err(Error::EmptyToken);
        }

        let key = token_key(poll_id, token);
        self.polls
            .transaction(|polls| {
                if poll_header(polls, poll_id)?.is_none() {
                    return abort(Error::PollNotFound(poll_id));
                }
                if let Some(state) = polls.get(&key)? {
                    if state[..] == [TOKEN_USED] {
                        return abort(Error::TokenAlreadyUsed);
                    }
                }
                polls.insert(key.as_slice(), &[TOKEN_UNUSED][..])?;
                Ok(())
            })
            .map_err(Error::from)
    }

    /// Use up a token.
    ///
    /// Succeeds exactly once per saved token; the check and the update happen
    /// in one transaction.
    pub fn accept_token(&self, poll_id: PollId, token: &[u8]) -> Result<(), Error> {
        let key = token_key(poll_id, token);
        let res = self.polls.transaction(|polls| {
            if poll_header(polls, poll_id)?.is_none() {
                return abort(Error::PollNotFound(poll_id));
            }
            match polls.get(&key)? {
                None => abort(Error::NoSuchToken),
                Some(state) if state[..] == [TOKEN_USED] => abort(Error::TokenAlreadyUsed),
                Some(_) => {
                    polls.insert(key.as_slice(), &[TOKEN_USED][..])?;
                    Ok(())
                }
            }
        });

        if let Err(sled::transaction::TransactionError::Abort(ref e)) = res {
            log::warn!("token rejected for poll {}: {}", poll_id, e);
        }
        res.map_err(Error::from)
    }

    /// Tokens of a poll that have not been used yet
    pub fn unused_tokens(&self, poll_id: PollId) -> Result<Vec<Vec<u8>>, Error> {
        let prefix = poll_prefix(poll_id, Region::Token);
        let mut tokens = Vec::new();
        for item in self.polls.scan_prefix(&prefix) {
            let (key, state) = item?;
            if state[..] == [TOKEN_UNUSED] {
                tokens.push(key[prefix.len()..].to_vec());
            }
        }
        Ok(tokens)
    }
}

/// Source of voting tokens.
///
/// Deciding who deserves a token (identity checks and the like) happens
/// outside of this crate; an issuer only has to hand out a fresh token and
/// register it with the store.
pub trait TokenIssuer {
    fn issue_token(&self, store: &Store, poll_id: PollId) -> Result<Vec<u8>, Error>;
}

/// Issues SHA-256 hashes of 256 random bits
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokenIssuer;

impl TokenIssuer for RandomTokenIssuer {
    fn issue_token(&self, store: &Store, poll_id: PollId) -> Result<Vec<u8>, Error> {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        let token = Sha256::digest(&seed).to_vec();

        store.save_token(poll_id, &token)?;
        Ok(token)
    }
}
