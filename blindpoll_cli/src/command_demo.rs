use super::*;
use blindpoll::{bsign, Answer, EnvelopeToSign, VoteRequest};
use rand::RngCore;

pub fn command_demo(matches: &clap::ArgMatches, config: &Config) {
    let command = "blindpoll demo";
    let poll_id = poll_id(command, matches);
    let token = decode_token(command, matches);
    let answers: Vec<Answer> = read_json(command, matches.value_of("ANSWERS").unwrap_or_default());

    let service = open_service(config);
    let mut rng = rand::rngs::OsRng;

    // Get the poll key, as a client would
    let poll = service
        .get_poll(poll_id)
        .unwrap_or_else(|e| exit_with(command, e));
    let public_key = poll
        .decode_public_key()
        .unwrap_or_else(|e| exit_with(command, e));

    // Pick a random ballot and blind its hash
    let mut ballot = vec![0u8; 32];
    rng.fill_bytes(&mut ballot);
    let blinded = bsign::blind(&public_key, &ballot, &mut rng);

    let signed = service
        .sign_ballot(&EnvelopeToSign {
            poll_id,
            envelope: blinded.envelope,
            token,
        })
        .unwrap_or_else(|e| exit_with(command, e));
    let signature = bsign::unblind(&public_key, &signed.signature, &blinded.factor)
        .unwrap_or_else(|| exit_with(command, "unable to unblind signature"));

    let vote = VoteRequest {
        poll_id,
        answers,
        ballot,
        signature: signature.to_bytes_be(),
    };
    let reply = service
        .poll_vote(&vote)
        .unwrap_or_else(|e| exit_with(command, e));
    service
        .store()
        .flush()
        .unwrap_or_else(|e| exit_with(command, e));

    println!("ballot: {}", hex::encode(&vote.ballot));
    println!("{}", reply.message);
}
