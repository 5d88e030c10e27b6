use crate::*;
use sled::transaction::abort;
use std::str::FromStr;

/// Reply sent back for an accepted vote
pub const VOTE_ACCEPTED: &str = "Thank you for your vote!";

/// A vote as submitted by a voter: the answers, the ballot they were cast
/// with, and the unblinded signature over that ballot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteRequest {
    pub poll_id: PollId,
    pub answers: Vec<Answer>,

    #[serde(with = "hex_serde")]
    pub ballot: Vec<u8>,

    #[serde(with = "hex_serde")]
    pub signature: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VoteReply {
    pub message: String,
}

/// A vote read back from the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVote {
    pub ballot: Vec<u8>,
    pub signature: Vec<u8>,
    pub answers: Vec<Answer>,
}

// Value stored under the ballot key
#[derive(Serialize, Deserialize)]
struct VoteRecord {
    signature: Vec<u8>,
    answers: Vec<Answer>,
}

/// What to do when a ballot that already voted votes again
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResubmitPolicy {
    /// The newer answers replace the older ones
    Overwrite,
    /// The second vote fails with [`Error::BallotAlreadyCast`]
    Reject,
}

impl Default for ResubmitPolicy {
    fn default() -> Self {
        ResubmitPolicy::Overwrite
    }
}

impl FromStr for ResubmitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(ResubmitPolicy::Overwrite),
            "reject" => Ok(ResubmitPolicy::Reject),
            _ => Err(format!("unknown resubmit policy `{}`", s)),
        }
    }
}

impl Store {
    /// Record a vote.
    ///
    /// The answers are checked against the questions stored for the poll in
    /// the same transaction that writes the vote. The signature is stored as
    /// given; checking it is up to the caller.
    pub fn save_vote(
        &self,
        vote: &VoteRequest,
        policy: ResubmitPolicy,
    ) -> Result<VoteReply, Error> {
        if vote.ballot.is_empty() {
            return Err(Error::EmptyBallot);
        }

        let poll_id = vote.poll_id;
        let key = vote_key(poll_id, &vote.ballot);
        let record = serde_cbor::to_vec(&VoteRecord {
            signature: vote.signature.clone(),
            answers: vote.answers.clone(),
        })?;

        self.polls.transaction(|polls| {
            let count = match poll_header(polls, poll_id)? {
                Some(count) => count,
                None => return abort(Error::PollNotFound(poll_id)),
            };

            let mut questions: Vec<Question> = Vec::with_capacity(count as usize);
            for index in 0..count {
                match polls.get(question_key(poll_id, index))? {
                    Some(bytes) => questions.push(abort_on(serde_cbor::from_slice(&bytes))?),
                    None => return abort(Error::Corrupted("question missing")),
                }
            }
            abort_on(validate_answers(&questions, &vote.answers))?;

            if policy == ResubmitPolicy::Reject && polls.get(&key)?.is_some() {
                return abort(Error::BallotAlreadyCast);
            }

            polls.insert(key.as_slice(), record.as_slice())?;
            Ok(())
        })?;

        log::info!("vote recorded for poll {}", poll_id);
        Ok(VoteReply {
            message: VOTE_ACCEPTED.to_owned(),
        })
    }

    /// All votes cast in a poll, ordered by ballot
    pub fn votes(&self, poll_id: PollId) -> Result<Vec<StoredVote>, Error> {
        let prefix = poll_prefix(poll_id, Region::Vote);
        let mut votes = Vec::new();
        for item in self.polls.scan_prefix(&prefix) {
            let (key, bytes) = item?;
            let record: VoteRecord = serde_cbor::from_slice(&bytes)?;
            votes.push(StoredVote {
                ballot: key[prefix.len()..].to_vec(),
                signature: record.signature,
                answers: record.answers,
            });
        }
        Ok(votes)
    }
}
