use super::*;
use blindpoll::{RandomTokenIssuer, TokenIssuer};

pub fn command_token(matches: &clap::ArgMatches, config: &Config) {
    // Subcommands
    match matches.subcommand() {
        ("save", Some(matches)) => command_token_save(matches, config),
        ("issue", Some(matches)) => command_token_issue(matches, config),
        _ => {}
    }
}

pub fn command_token_save(matches: &clap::ArgMatches, config: &Config) {
    let poll_id = poll_id("blindpoll token save", matches);
    let token = decode_token("blindpoll token save", matches);

    let service = open_service(config);
    service
        .store()
        .save_token(poll_id, &token)
        .unwrap_or_else(|e| exit_with("blindpoll token save", e));
    service
        .store()
        .flush()
        .unwrap_or_else(|e| exit_with("blindpoll token save", e));
}

pub fn command_token_issue(matches: &clap::ArgMatches, config: &Config) {
    let poll_id = poll_id("blindpoll token issue", matches);

    let service = open_service(config);
    let token = RandomTokenIssuer
        .issue_token(service.store(), poll_id)
        .unwrap_or_else(|e| exit_with("blindpoll token issue", e));
    service
        .store()
        .flush()
        .unwrap_or_else(|e| exit_with("blindpoll token issue", e));

    println!("{}", hex::encode(token));
}

pub fn decode_token(command: &str, matches: &clap::ArgMatches) -> Vec<u8> {
    let token = matches.value_of("TOKEN").unwrap_or_default();
    hex::decode(token).unwrap_or_else(|e| exit_with(command, format!("invalid token: {}", e)))
}
