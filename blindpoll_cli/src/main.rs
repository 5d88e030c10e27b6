use blindpoll::{PollId, PollService, Store};
use clap::{App, AppSettings, Arg, SubCommand};
use std::fmt::Display;

mod command_demo;
mod command_poll;
mod command_summary;
mod command_token;
mod config;

use command_demo::*;
use command_poll::*;
use command_summary::*;
use command_token::*;
use config::Config;

fn main() {
    let poll_id_arg = Arg::with_name("POLL-ID")
        .index(1)
        .required(true)
        .help("Poll id");

    let matches = App::new("BlindPoll CLI")
        .version("0.1")
        .about("Runs anonymous polls backed by RSA blind signatures")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .arg(
            Arg::with_name("db")
                .long("db")
                .value_name("PATH")
                .takes_value(true)
                .help("Database directory - can also be set with BLINDPOLL_DB_PATH"),
        )
        .subcommand(SubCommand::with_name("init").about("Open or create the poll database"))
        .subcommand(
            SubCommand::with_name("poll-init")
                .about("Create a poll with a fresh key")
                .arg(
                    Arg::with_name("SCHEMA")
                        .index(1)
                        .required(true)
                        .help("Poll questions in JSON format"),
                ),
        )
        .subcommand(
            SubCommand::with_name("get-poll")
                .about("Print the questions and public key of a poll")
                .arg(poll_id_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("token")
                .about("Manage voting tokens")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("save")
                        .about("Register a token for a poll")
                        .arg(poll_id_arg.clone())
                        .arg(
                            Arg::with_name("TOKEN")
                                .index(2)
                                .required(true)
                                .help("Token, hex encoded"),
                        ),
                )
                .subcommand(
                    SubCommand::with_name("issue")
                        .about("Generate and register a random token")
                        .arg(poll_id_arg.clone()),
                ),
        )
        .subcommand(
            SubCommand::with_name("summary")
                .about("Print the collected answers of a poll")
                .arg(poll_id_arg.clone()),
        )
        .subcommand(SubCommand::with_name("list").about("List all polls"))
        .subcommand(
            SubCommand::with_name("demo")
                .about("Cast a vote as a client would: blind, sign, unblind and vote")
                .arg(poll_id_arg)
                .arg(
                    Arg::with_name("TOKEN")
                        .index(2)
                        .required(true)
                        .help("Token, hex encoded"),
                )
                .arg(
                    Arg::with_name("ANSWERS")
                        .index(3)
                        .required(true)
                        .help("Answers in JSON format"),
                ),
        )
        .get_matches();

    let level = match matches.occurrences_of("v") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = Config::from_env().unwrap_or_else(|e| exit_with("blindpoll", e));
    if let Some(db_path) = matches.value_of("db") {
        config.db_path = expand(db_path);
    }
    log::debug!("config: {:?}", config);

    // Subcommands
    match matches.subcommand() {
        ("init", Some(_)) => command_init(&config),
        ("poll-init", Some(matches)) => command_poll_init(matches, &config),
        ("get-poll", Some(matches)) => command_get_poll(matches, &config),
        ("token", Some(matches)) => command_token(matches, &config),
        ("summary", Some(matches)) => command_summary(matches, &config),
        ("list", Some(_)) => command_list(&config),
        ("demo", Some(matches)) => command_demo(matches, &config),
        _ => {}
    }
}

pub fn expand(input: &str) -> String {
    shellexpand::full(input)
        .unwrap_or_else(|e| exit_with("blindpoll", e))
        .into_owned()
}

pub fn exit_with(command: &str, err: impl Display) -> ! {
    eprintln!("{}: {}", command, err);
    std::process::exit(1);
}

pub fn open_service(config: &Config) -> PollService {
    let store = Store::open(&config.db_path).unwrap_or_else(|e| exit_with("blindpoll", e));
    PollService::with_config(store, config.service_config())
}

pub fn poll_id(command: &str, matches: &clap::ArgMatches) -> PollId {
    let poll_id = matches.value_of("POLL-ID").unwrap_or_default();
    poll_id
        .parse()
        .unwrap_or_else(|_| exit_with(command, format!("invalid poll id `{}`", poll_id)))
}

pub fn read_json<T: serde::de::DeserializeOwned>(command: &str, filename: &str) -> T {
    let filename = expand(filename);
    let bytes = std::fs::read(&filename)
        .unwrap_or_else(|e| exit_with(command, format!("unable to read {}: {}", filename, e)));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| exit_with(command, format!("unable to parse {}: {}", filename, e)))
}

pub fn print_json<T: serde::Serialize>(command: &str, value: &T) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|e| exit_with(command, e));
    println!("{}", json);
}
