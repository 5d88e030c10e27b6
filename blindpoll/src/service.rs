//! The operations exposed to voters and poll administrators.

use crate::*;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::RsaPublicKey;

/// A blinded ballot hash to be signed with a poll key, paid for with a token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeToSign {
    pub poll_id: PollId,

    #[serde(with = "hex_serde")]
    pub envelope: Vec<u8>,

    #[serde(with = "hex_serde")]
    pub token: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    #[serde(with = "hex_serde")]
    pub envelope: Vec<u8>,

    #[serde(with = "hex_serde")]
    pub signature: Vec<u8>,
}

/// Questions of a poll together with the public half of its key
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PollWithKey {
    /// PKCS#1 DER
    #[serde(with = "hex_serde")]
    pub public_key: Vec<u8>,
    pub schema: PollSchema,
}

impl PollWithKey {
    pub fn decode_public_key(&self) -> Result<RsaPublicKey, Error> {
        RsaPublicKey::from_pkcs1_der(&self.public_key).map_err(Error::KeyDecode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Modulus size of newly generated poll keys
    pub key_bits: usize,
    pub resubmit: ResubmitPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            key_bits: DEFAULT_KEY_BITS,
            resubmit: ResubmitPolicy::default(),
        }
    }
}

/// Entry point for all poll operations.
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct PollService {
    store: Store,
    config: ServiceConfig,
}

impl PollService {
    pub fn new(store: Store) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: Store, config: ServiceConfig) -> Self {
        PollService { store, config }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Create a poll with a fresh key
    pub fn poll_init(&self, schema: &PollSchema) -> Result<PollRecord, Error> {
        schema.validate().context("poll init")?;

        // Key generation is slow, keep it out of the transaction
        let key = generate_key(self.config.key_bits).context("poll init")?;
        let poll = self
            .store
            .new_poll_with_key(schema, &key)
            .context("poll init")?;

        Ok(PollRecord {
            id: poll.id,
            schema: poll.schema,
            tokens: vec![],
            votes: vec![],
        })
    }

    /// Questions and public key of a poll
    pub fn get_poll(&self, poll_id: PollId) -> Result<PollWithKey, Error> {
        let key = self.store.get_key(poll_id).context("get poll")?;
        let public_key = public_key_der(&key).context("get poll")?;
        let schema = self.store.get_schema(poll_id).context("get poll")?;

        Ok(PollWithKey { public_key, schema })
    }

    /// Spend a token to get a blinded ballot hash signed
    pub fn sign_ballot(&self, request: &EnvelopeToSign) -> Result<SignedEnvelope, Error> {
        if request.envelope.is_empty() {
            return Err(Error::EmptyEnvelope.context("sign ballot"));
        }

        // Without a usable key the token must stay unused
        let key = self.store.get_key(request.poll_id).context("sign ballot")?;
        self.store
            .accept_token(request.poll_id, &request.token)
            .context("sign ballot")?;
        let signature = bsign::sign(&key, &request.envelope);

        log::info!("signed envelope for poll {}", request.poll_id);
        Ok(SignedEnvelope {
            envelope: request.envelope.clone(),
            signature: signature.to_bytes_be(),
        })
    }

    /// Cast a vote with an unblinded signature
    pub fn poll_vote(&self, vote: &VoteRequest) -> Result<VoteReply, Error> {
        let key = self.store.get_key(vote.poll_id).context("poll vote")?;
        if !bsign::verify(&key.to_public_key(), &vote.ballot, &vote.signature) {
            log::warn!("rejected vote with invalid signature for poll {}", vote.poll_id);
            return Err(Error::InvalidSignature.context("poll vote"));
        }

        self.store
            .save_vote(vote, self.config.resubmit)
            .context("poll vote")
    }

    pub fn get_summary(&self, poll_id: PollId) -> Result<PollSummary, Error> {
        self.store.get_summary(poll_id).context("get summary")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rsa::traits::PublicKeyParts;

    fn service() -> PollService {
        let config = ServiceConfig {
            key_bits: 1024,
            ..ServiceConfig::default()
        };
        PollService::with_config(Store::temporary().unwrap(), config)
    }

    fn schema() -> PollSchema {
        PollSchema::new(vec![
            Question::new("Do you like this system?", QuestionType::Close)
                .with_options(&["yes", "no"]),
        ])
    }

    #[test]
    fn test_poll_init() {
        let service = service();

        let record = service.poll_init(&schema()).unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.schema, schema());
        assert!(record.tokens.is_empty());

        let poll = service.get_poll(1).unwrap();
        assert_eq!(poll.schema, schema());
        assert_eq!(poll.decode_public_key().unwrap().size(), 128);
    }

    #[test]
    fn test_poll_init_invalid() {
        let service = service();
        let mut schema = schema();
        schema.questions[0].kind = 9;

        let err = service.poll_init(&schema).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_matches!(
            err.root(),
            Error::Validation(ValidationError::InvalidQuestionType(9))
        );
        assert_eq!(
            err.to_string(),
            "poll init: blindpoll: validation error: blindpoll validation: wrong question type 9"
        );
        assert_eq!(service.get_poll(1).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_sign_ballot() {
        let service = service();
        service.poll_init(&schema()).unwrap();
        service.store().save_token(1, b"Good token").unwrap();

        let mut request = EnvelopeToSign {
            poll_id: 1,
            envelope: vec![1, 3, 4, 5, 6, 7, 8, 9, 0],
            token: b"Good token".to_vec(),
        };
        let signed = service.sign_ballot(&request).unwrap();
        assert_eq!(signed.envelope, request.envelope);
        assert!(!signed.signature.is_empty());

        let err = service.sign_ballot(&request).unwrap_err();
        assert_matches!(err.root(), Error::TokenAlreadyUsed);

        request.token = b"Bad token".to_vec();
        assert_matches!(service.sign_ballot(&request).unwrap_err().root(), Error::NoSuchToken);
    }

    #[test]
    fn test_empty_envelope_keeps_token() {
        let service = service();
        service.poll_init(&schema()).unwrap();
        service.store().save_token(1, b"Good token").unwrap();

        let request = EnvelopeToSign {
            poll_id: 1,
            envelope: vec![],
            token: b"Good token".to_vec(),
        };
        let err = service.sign_ballot(&request).unwrap_err();
        assert_matches!(err.root(), Error::EmptyEnvelope);
        assert_eq!(err.to_string(), "sign ballot: blindpoll: envelope shouldn't be null");

        assert_eq!(service.store().unused_tokens(1).unwrap(), vec![b"Good token".to_vec()]);
    }

    #[test]
    fn test_missing_key_keeps_token() {
        let service = service();
        service.store().new_poll(&schema()).unwrap();
        service.store().save_token(1, b"Good token").unwrap();

        let request = EnvelopeToSign {
            poll_id: 1,
            envelope: vec![1, 3, 4, 5, 6, 7, 8, 9, 0],
            token: b"Good token".to_vec(),
        };
        let err = service.sign_ballot(&request).unwrap_err();
        assert_matches!(err.root(), Error::KeyNotFound(1));
        assert_eq!(service.store().unused_tokens(1).unwrap(), vec![b"Good token".to_vec()]);

        // Once the key exists the same token still buys a signature
        let key = generate_key(1024).unwrap();
        service.store().save_key(1, &key).unwrap();
        service.sign_ballot(&request).unwrap();
        assert!(service.store().unused_tokens(1).unwrap().is_empty());
    }

    #[test]
    fn test_vote_with_bad_signature() {
        let service = service();
        service.poll_init(&schema()).unwrap();

        let vote = VoteRequest {
            poll_id: 1,
            answers: vec![Answer::select(0, &[0])],
            ballot: b"12345678".to_vec(),
            signature: vec![1, 2, 3],
        };
        let err = service.poll_vote(&vote).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SignatureInvalid);
        assert!(service.store().votes(1).unwrap().is_empty());

        let mut elsewhere = vote.clone();
        elsewhere.poll_id = 2;
        assert_matches!(service.poll_vote(&elsewhere).unwrap_err().root(), Error::KeyNotFound(2));
    }
}
