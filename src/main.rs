use anyhow::Result;
use clap::{Arg, Command};

use hostmetrics::commands;

fn pipeline_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("collector-interval")
                .long("collector-interval")
                .value_name("DURATION")
                .help("How often each collector polls the host (e.g. 5s) [env: COLLECTOR_INTERVAL]"),
        )
        .arg(
            Arg::new("sample-interval")
                .long("sample-interval")
                .value_name("DURATION")
                .help("How often a merged sample is published (e.g. 250ms) [env: SAMPLE_INTERVAL]"),
        )
        .arg(
            Arg::new("buffer-size")
                .long("buffer-size")
                .value_name("N")
                .help("Mailbox capacity between collectors and the aggregator [env: BUFFER_SIZE]"),
        )
        .arg(
            Arg::new("collectors")
                .long("collectors")
                .value_name("KINDS")
                .help("Comma-separated kinds to collect: cpu,memory,disk,network [env: COLLECTORS]"),
        )
}

fn main() -> Result<()> {
    let matches = Command::new("hostmetrics")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Samples host CPU, memory, disk and network metrics and serves them over HTTP")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(pipeline_args(
            Command::new("serve")
                .about("Run the collectors and serve /metrics, /metrics/latest, /healthz and /readyz")
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("HTTP port to listen on [env: PORT]"),
                ),
        ))
        .subcommand(pipeline_args(
            Command::new("snapshot")
                .about("Collect once and print the first complete sample as JSON")
                .arg(
                    Arg::new("wait")
                        .short('w')
                        .long("wait")
                        .value_name("DURATION")
                        .help("Give up after this long (default 10s)"),
                ),
        ))
        .get_matches();

    hostmetrics::init_logging();

    match matches.subcommand() {
        Some(("serve", sub_matches)) => commands::serve(sub_matches),
        Some(("snapshot", sub_matches)) => commands::snapshot(sub_matches),
        _ => unreachable!("clap enforces a subcommand"),
    }
}
