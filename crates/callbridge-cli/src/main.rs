use callbridge::{
    commands::{
        bench::{self, BenchCommand},
        call::{self, CallCommand},
        config::{self, ConfigAction},
        native::{self, NativeCommand},
    },
    GlobalOpts,
};
use callbridge_logger as logger;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Overrides the `tracing` filter for native call events
const TRACING_ENV_VAR: &str = "CALLBRIDGE_LOG";

#[derive(Parser)]
#[command(name = "callbridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Native call bridge",
    long_about = "callbridge calls a native (int, int) -> int function hosted in a managed runtime or exported by a native library."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call the configured method once through the hosting bridge
    Call(CallCommand),
    /// Call an export of a native library found by file name pattern
    Native(NativeCommand),
    /// Call the configured method repeatedly and report timings
    Bench(BenchCommand),
    /// Configure callbridge
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

fn init_tracing(opts: &GlobalOpts) {
    if opts.no_stdout {
        return;
    }
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env(TRACING_ENV_VAR)
                .unwrap_or_else(|_| opts.tracing_directive().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_with_verbosity(cli.global.verbosity_level(), cli.global.no_stdout)
    {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing(&cli.global);

    let (name, result) = match cli.command {
        Commands::Call(cmd) => ("Call", call::handle_call(cmd, &cli.global)),
        Commands::Native(cmd) => ("Native", native::handle_native(cmd, &cli.global)),
        Commands::Bench(cmd) => ("Bench", bench::handle_bench(cmd, &cli.global)),
        Commands::Config { action } => ("Config", config::handle_config(action, &cli.global)),
    };

    if let Err(e) = result {
        logger::error(&format!("{} command failed: {:#}", name, e));
        if cli.global.verbosity_level() > 0 {
            logger::show_log_path();
        }
        std::process::exit(1);
    }
}
