use crate::*;
use sled::transaction::{abort, ConflictableTransactionResult, TransactionalTree};
use sled::Transactional;
use std::convert::TryFrom;

/// A poll as returned to clients: its id and questions
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    pub id: PollId,
    pub schema: PollSchema,
}

/// Everything stored for a poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRecord {
    pub id: PollId,
    pub schema: PollSchema,

    /// Tokens that can still be used
    pub tokens: Vec<Vec<u8>>,
    pub votes: Vec<StoredVote>,
}

/// Aggregated results of a poll
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PollSummary {
    pub id: PollId,

    /// Number of distinct ballots cast
    pub votes: usize,
    pub questions: Vec<QuestionSummary>,
}

/// Every answer given to one question
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QuestionSummary {
    pub question: Question,

    /// Free text answers, in ballot order
    pub answers: Vec<String>,

    /// How many times each option was selected
    pub counts: Vec<u64>,
}

impl QuestionSummary {
    fn new(question: Question) -> Self {
        let counts = vec![0; question.options.len()];
        QuestionSummary {
            question,
            answers: vec![],
            counts,
        }
    }

    fn add(&mut self, answer: &Answer) {
        self.answers.extend(answer.text.iter().cloned());
        for &option in answer.selected.iter() {
            if let Some(count) = self.counts.get_mut(option) {
                *count += 1;
            }
        }
    }
}

/// Validate a schema and write it under a newly allocated poll id
pub(crate) fn insert_poll(
    meta: &TransactionalTree,
    polls: &TransactionalTree,
    schema: &PollSchema,
    encoded: &[Vec<u8>],
) -> ConflictableTransactionResult<PollId, Error> {
    abort_on(schema.validate())?;

    let count = match u32::try_from(encoded.len()) {
        Ok(count) => count,
        Err(_) => return abort(Error::Corrupted("too many questions")),
    };

    let poll_id = next_poll_id(meta)?;
    polls.insert(header_key(poll_id), encode_u32(count))?;
    for (index, question) in (0..count).zip(encoded.iter()) {
        polls.insert(question_key(poll_id, index), question.as_slice())?;
    }
    Ok(poll_id)
}

fn encode_questions(schema: &PollSchema) -> Result<Vec<Vec<u8>>, Error> {
    let encoded = schema
        .questions
        .iter()
        .map(serde_cbor::to_vec)
        .collect::<Result<_, _>>()?;
    Ok(encoded)
}

impl Store {
    /// Create a poll.
    ///
    /// The schema is validated in the same transaction that stores it, so an
    /// invalid schema leaves no trace, not even a used-up poll id.
    pub fn new_poll(&self, schema: &PollSchema) -> Result<Poll, Error> {
        let encoded = encode_questions(schema)?;
        let poll_id = (&self.meta, &self.polls)
            .transaction(|(meta, polls)| insert_poll(meta, polls, schema, &encoded))?;

        log::info!("created poll {} with {} questions", poll_id, schema.questions.len());
        Ok(Poll {
            id: poll_id,
            schema: schema.clone(),
        })
    }

    /// Create a poll together with its key, atomically
    pub fn new_poll_with_key(
        &self,
        schema: &PollSchema,
        key: &rsa::RsaPrivateKey,
    ) -> Result<Poll, Error> {
        let encoded = encode_questions(schema)?;
        let der = crate::keys::encode_key(key)?;
        let poll_id = (&self.meta, &self.polls, &self.keys).transaction(
            |(meta, polls, keys)| -> ConflictableTransactionResult<PollId, Error> {
                let poll_id = insert_poll(meta, polls, schema, &encoded)?;
                crate::keys::put_key(keys, poll_id, &der)?;
                Ok(poll_id)
            },
        )?;

        log::info!("created poll {} with {} questions", poll_id, schema.questions.len());
        Ok(Poll {
            id: poll_id,
            schema: schema.clone(),
        })
    }

    /// Questions of a poll
    pub fn get_schema(&self, poll_id: PollId) -> Result<PollSchema, Error> {
        let count = match self.polls.get(header_key(poll_id))? {
            Some(bytes) => decode_u32(&bytes)?,
            None => return Err(Error::PollNotFound(poll_id)),
        };

        let mut questions = Vec::with_capacity(count as usize);
        for item in self.polls.scan_prefix(poll_prefix(poll_id, Region::Question)) {
            let (_, bytes) = item?;
            questions.push(serde_cbor::from_slice(&bytes)?);
        }
        if questions.len() != count as usize {
            return Err(Error::Corrupted("question count does not match header"));
        }

        Ok(PollSchema { questions })
    }

    /// Read everything stored for a poll
    pub fn get_poll(&self, poll_id: PollId) -> Result<PollRecord, Error> {
        let schema = self.get_schema(poll_id)?;
        let tokens = self.unused_tokens(poll_id)?;
        let votes = self.votes(poll_id)?;

        Ok(PollRecord {
            id: poll_id,
            schema,
            tokens,
            votes,
        })
    }

    /// Collect the answers of every vote cast in a poll
    pub fn get_summary(&self, poll_id: PollId) -> Result<PollSummary, Error> {
        let schema = self.get_schema(poll_id)?;
        let mut questions: Vec<QuestionSummary> =
            schema.questions.into_iter().map(QuestionSummary::new).collect();

        let votes = self.votes(poll_id)?;
        for vote in votes.iter() {
            for answer in vote.answers.iter() {
                if let Some(summary) = questions.get_mut(answer.question) {
                    summary.add(answer);
                }
            }
        }

        Ok(PollSummary {
            id: poll_id,
            votes: votes.len(),
            questions,
        })
    }

    /// Ids of all polls, in creation order
    pub fn poll_ids(&self) -> Result<Vec<PollId>, Error> {
        let last = match self.meta.get(POLL_SEQ)? {
            Some(bytes) => decode_u32(&bytes)?,
            None => 0,
        };

        let mut ids = Vec::new();
        for poll_id in 1..=last {
            if self.poll_exists(poll_id)? {
                ids.push(poll_id);
            }
        }
        Ok(ids)
    }
}
