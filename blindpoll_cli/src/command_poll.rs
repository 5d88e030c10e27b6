use super::*;
use blindpoll::PollSchema;

pub fn command_init(config: &Config) {
    let service = open_service(config);
    let polls = service
        .store()
        .poll_ids()
        .unwrap_or_else(|e| exit_with("blindpoll init", e));
    service
        .store()
        .flush()
        .unwrap_or_else(|e| exit_with("blindpoll init", e));

    println!("database: {}", config.db_path);
    println!("polls: {}", polls.len());
    println!("key-bits: {}", config.key_bits);
    println!("resubmit: {:?}", config.resubmit);
    println!("port: {}", config.port);
}

pub fn command_poll_init(matches: &clap::ArgMatches, config: &Config) {
    let filename = matches.value_of("SCHEMA").unwrap_or_default();
    let schema: PollSchema = read_json("blindpoll poll-init", filename);

    let service = open_service(config);
    let poll = service
        .poll_init(&schema)
        .unwrap_or_else(|e| exit_with("blindpoll poll-init", e));
    service
        .store()
        .flush()
        .unwrap_or_else(|e| exit_with("blindpoll poll-init", e));

    print_json("blindpoll poll-init", &blindpoll::Poll {
        id: poll.id,
        schema: poll.schema,
    });
}

pub fn command_get_poll(matches: &clap::ArgMatches, config: &Config) {
    let poll_id = poll_id("blindpoll get-poll", matches);
    let poll = open_service(config)
        .get_poll(poll_id)
        .unwrap_or_else(|e| exit_with("blindpoll get-poll", e));

    print_json("blindpoll get-poll", &poll);
}

pub fn command_list(config: &Config) {
    let service = open_service(config);
    let poll_ids = service
        .store()
        .poll_ids()
        .unwrap_or_else(|e| exit_with("blindpoll list", e));

    for poll_id in poll_ids {
        let schema = service
            .store()
            .get_schema(poll_id)
            .unwrap_or_else(|e| exit_with("blindpoll list", e));
        let first = schema
            .questions
            .first()
            .map(|q| q.text.as_str())
            .unwrap_or("");
        println!("{}\t{} questions\t{}", poll_id, schema.questions.len(), first);
    }
}
