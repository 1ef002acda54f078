use clap::ArgAction;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use leafsite_server::cli_error::CliError;
use log::{error, warn};

fn main() {
    let args = CliArgs::parse();
    let dotenv_result = dotenv();

    let env = env_logger::Env::new().filter_or(
        "RUST_LOG",
        match args.global_opts.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        },
    );
    env_logger::Builder::from_env(env).init();
    if let Err(e) = dotenv_result {
        warn!("Could not read .env file: {}", e);
    }

    if let Err(e) = run(args.command) {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Serve => leafsite_server::web::serve(),
        Command::MigrateDatabase => leafsite_server::cli::database_migration::run_migrations(),
        Command::AddUser => leafsite_server::cli::manage_users::add_user(),
        Command::ListReservations { new } => {
            leafsite_server::cli::manage_reservations::print_reservation_list(new)
        }
    }
}

/// Room reservation server: availability search, booking and administration of a small lodging
#[derive(Debug, Parser)]
#[clap(name = "leafsite_server", version)]
pub struct CliArgs {
    #[clap(flatten)]
    global_opts: GlobalOpts,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the reservation web application
    Serve,
    /// Migrate the database schema to the current version
    MigrateDatabase,
    /// Interactively create a user account for the admin area
    AddUser,
    /// Print a table of the reservations
    ListReservations {
        /// Only list reservations which have not been processed yet
        #[clap(long)]
        new: bool,
    },
}

#[derive(Debug, Args)]
struct GlobalOpts {
    /// Verbosity level (can be specified multiple times)
    #[clap(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,
}
