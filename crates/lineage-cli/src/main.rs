//! `lineage` command line tool

use anyhow::{bail, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use lineage_cli::{
    build_forests, forest_summaries, json_report, render_rows, render_summaries, Document,
    LineageConfig,
};
use lineage_history::RevisionGraph;
use lineage_validate::{CollectingSink, TeeSink, TracingSink, Validator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn common_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON document with revisions, branches and snapshots"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Output as JSON"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
}

fn cli() -> Command {
    Command::new("lineage")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build change-history lineage forests and validate them against live snapshots")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            common_args(Command::new("validate").about("Validate every branch head")).arg(
                Arg::new("branch")
                    .long("branch")
                    .short('b')
                    .action(ArgAction::Append)
                    .help("Validate only this branch (repeatable)"),
            ),
        )
        .subcommand(common_args(
            Command::new("forests").about("Build the forests and print their statistics"),
        ))
}

fn init_tracing(filter: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load(args: &ArgMatches) -> Result<(LineageConfig, Document)> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => LineageConfig::load(path)?,
        None => LineageConfig::default(),
    };
    init_tracing(config.log_filter(), args.get_flag("log-json"));

    let Some(input) = args.get_one::<PathBuf>("input") else {
        bail!("--input is required");
    };
    let document = Document::load(input)?;
    tracing::info!(
        revisions = document.history.revisions().len(),
        branches = document.history.branch_heads().len(),
        "loaded {}",
        input.display()
    );
    Ok((config, document))
}

fn validate(args: &ArgMatches) -> Result<ExitCode> {
    let (mut config, document) = load(args)?;
    if let Some(branches) = args.get_many::<String>("branch") {
        config.validation.branches = branches.cloned().collect();
    }

    let forests = build_forests(&document.history, &config)?;
    let collecting = CollectingSink::new();
    let tee = TeeSink::new(&TracingSink, &collecting);
    let report = Validator::new(&document.history, &forests, &document.snapshots)
        .with_sink(&tee)
        .with_config(config.validation.clone())
        .validate();

    if args.get_flag("json") {
        println!("{}", json_report(&report, &collecting.take())?);
    } else {
        print!("{}", render_rows(&report));
    }

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn forests(args: &ArgMatches) -> Result<ExitCode> {
    let (config, document) = load(args)?;
    let forests = build_forests(&document.history, &config)?;
    let summaries = forest_summaries(&document.history, &forests);

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print!("{}", render_summaries(&summaries));
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("validate", args)) => validate(args),
        Some(("forests", args)) => forests(args),
        Some((other, _)) => bail!("unknown subcommand '{other}'"),
        None => bail!("no subcommand given"),
    }
}
