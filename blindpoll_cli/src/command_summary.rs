use super::*;

pub fn command_summary(matches: &clap::ArgMatches, config: &Config) {
    let poll_id = poll_id("blindpoll summary", matches);
    let summary = open_service(config)
        .get_summary(poll_id)
        .unwrap_or_else(|e| exit_with("blindpoll summary", e));

    print_json("blindpoll summary", &summary);
}
