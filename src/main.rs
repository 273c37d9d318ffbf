use clap::Parser;
use expense_client::args::{Args, CategoriesCommand, Command, ExpensesCommand, PrefsCommand};
use expense_client::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            debug!("Error details: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();
    let today = chrono::Local::now().date_naive();

    // When EXPENSE_CLIENT_IN_TEST_MODE is set and non-empty the in-memory backend is used instead
    // of the HTTP API.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.api_url()).await?.print(),

        Command::Login(login_args) => {
            let config = Config::load(home).await?;
            commands::login(&config, login_args.token()).await?.print()
        }

        Command::Logout => commands::logout(&Config::load(home).await?).await?.print(),

        Command::Health => commands::health(&Config::load(home).await?, mode)
            .await?
            .print(),

        Command::Dashboard(dashboard_args) => {
            let config = Config::load(home).await?;
            match dashboard_args.monthly() {
                Some(year) => commands::monthly_stats(&config, mode, year, today)
                    .await?
                    .print(),
                None => commands::dashboard(&config, mode, dashboard_args, today)
                    .await?
                    .print(),
            }
        }

        Command::Expenses { command } => {
            let config = Config::load(home).await?;
            match command {
                ExpensesCommand::List(list_args) => {
                    commands::list_expenses(&config, mode, list_args, today)
                        .await?
                        .print()
                }
                ExpensesCommand::Add(fields) => commands::add_expense(&config, mode, fields, today)
                    .await?
                    .print(),
                ExpensesCommand::Update(update_args) => {
                    commands::update_expense(&config, mode, update_args, today)
                        .await?
                        .print()
                }
                ExpensesCommand::Delete(delete_args) => {
                    commands::delete_expense(&config, mode, delete_args)
                        .await?
                        .print()
                }
                ExpensesCommand::Export(export_args) => {
                    commands::export_expenses(&config, mode, export_args, today)
                        .await?
                        .print()
                }
            }
        }

        Command::Categories { command } => {
            let config = Config::load(home).await?;
            match command {
                CategoriesCommand::List => {
                    commands::list_categories(&config, mode).await?.print()
                }
                CategoriesCommand::Add(fields) => commands::add_category(&config, mode, fields)
                    .await?
                    .print(),
                CategoriesCommand::Update(update_args) => {
                    commands::update_category(&config, mode, update_args)
                        .await?
                        .print()
                }
                CategoriesCommand::Delete(delete_args) => {
                    commands::delete_category(&config, mode, delete_args)
                        .await?
                        .print()
                }
            }
        }

        Command::Prefs { command } => {
            let config = Config::load(home).await?;
            match command {
                PrefsCommand::Show => commands::show_prefs(&config).await?.print(),
                PrefsCommand::Set(set_args) => {
                    commands::set_prefs(&config, set_args).await?.print()
                }
            }
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this package's crates only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
