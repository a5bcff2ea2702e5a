use crate::bench::{run, RunnerOpt};
use crate::stores::{self, Registry};
use crate::workload::WorkloadOpt;
use clap::ValueHint::FilePath;
use clap::{Args, Parser, Subcommand};
use log::debug;
use std::fs::read_to_string;

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(short = 'm', long, default_value_t = 512)]
    #[arg(help = "Minimum value length in bytes")]
    vmin: usize,

    #[arg(short = 'x', long, default_value_t = 512 * 1024)]
    #[arg(help = "Maximum value length in bytes (exclusive)")]
    vmax: usize,

    #[arg(short = 'k', long, default_value_t = 16 * 1024 * 1024)]
    #[arg(help = "Number of distinct keys in the key space")]
    keys: u64,

    #[arg(short = 'N', long, default_value_t = 16 * 1024 * 1024)]
    #[arg(help = "Number of operations each worker issues")]
    ops: u64,

    #[arg(short = 'S', long, default_value_t = 1)]
    #[arg(help = "Seed for the random generators")]
    seed: u64,

    #[arg(short = 't', long, default_value_t = 1)]
    #[arg(help = "Number of concurrent workers")]
    workers: usize,

    #[arg(short = 'T', long, default_value_t = 0)]
    #[arg(help = "Seconds to sleep before the run starts")]
    delay: u64,

    #[arg(long, default_value_t = 60)]
    #[arg(help = "Percentage of get operations in the mix")]
    get_perc: u8,

    #[arg(long, default_value_t = 30)]
    #[arg(help = "Percentage of set operations in the mix")]
    set_perc: u8,

    #[arg(long, default_value_t = 5)]
    #[arg(help = "Percentage of create operations in the mix")]
    create_perc: u8,

    #[arg(long, default_value_t = 5)]
    #[arg(help = "Percentage of remove operations in the mix")]
    remove_perc: u8,

    #[arg(short = 's')]
    #[arg(value_hint = FilePath)]
    #[arg(help = "Path to the key-value store's TOML config file")]
    store_config: String,
}

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Run a load generation cycle")]
    Run(RunArgs),
    #[command(about = "List all registered key-value stores")]
    List,
}

fn run_cli(args: &RunArgs) {
    let text = read_to_string(args.store_config.as_str()).unwrap();
    let client = stores::init(&text);
    let opt = RunnerOpt {
        workers: args.workers,
        quota: args.ops,
        seed: args.seed,
        delay: args.delay,
        workload: WorkloadOpt {
            get_perc: args.get_perc,
            set_perc: args.set_perc,
            create_perc: args.create_perc,
            remove_perc: args.remove_perc,
            vmin: args.vmin,
            vmax: args.vmax,
            keys: args.keys,
        },
    };
    let report = run(client, &opt);
    println!("{}", report);
}

fn list_cli() {
    for r in inventory::iter::<Registry> {
        println!("Registered store: {}", r.name);
    }
}

/// The default command line interface.
///
/// This function is public and can be called from a different crate: register your own
/// store's constructor with [`Registry`](crate::stores::Registry) and call this function in
/// your `main`, and the resulting binary has the same usage as the one in this crate.
///
/// ## Usage
///
/// To get the usage of the command line interface, run:
///
/// ```bash
/// kvload -h
/// ```
///
/// The interface supports two modes, `run` and `list`.
///
/// ### Run Mode
///
/// Usage:
///
/// ```bash
/// kvload run -s <STORE_CONFIG> [-m <VMIN>] [-x <VMAX>] [-k <KEYS>] [-N <OPS>] \
///     [-S <SEED>] [-t <WORKERS>] [-T <DELAY>] \
///     [--get-perc <P>] [--set-perc <P>] [--create-perc <P>] [--remove-perc <P>]
/// ```
///
/// Where `STORE_CONFIG` is the path to the key-value store's configuration file, documented
/// in [`crate::stores`]. All numeric flags default to the classic memcached driver's values:
/// values of 512 bytes to 512 KiB, 16M keys, 16M operations per worker, one worker, and a
/// 60/30/5/5 get/set/create/remove mix. The mix percentages must sum to 100. An unparsable
/// flag or an invalid configuration terminates the process with a non-zero status before any
/// worker starts.
///
/// ### List Mode
///
/// Usage:
///
/// ```bash
/// kvload list
/// ```
///
/// This command lists all registered key-value stores' names.
pub fn cmdline() {
    env_logger::init();
    let cli = Cli::parse();
    debug!("starting kvload with args: {:?}", cli);
    match cli.command {
        Commands::Run(args) => run_cli(&args),
        Commands::List => list_cli(),
    }
}
