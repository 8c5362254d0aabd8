use battwheels_journal::args::{Args, Command, DraftCommand};
use battwheels_journal::model::DateRange;
use battwheels_journal::{commands, error_type, Config, Mode, Result};
use clap::Parser;
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
            match error_type(&e) {
                Some(t) => error!("Exiting with {t} error: {e:#}"),
                None => error!("Exiting with error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().battwheels_home().path();

    // This allows for running the program without a Battwheels OS server. When
    // BATTWHEELS_IN_TEST_MODE is set and non-empty, then the mode will be Mode::Testing,
    // otherwise it will be Mode::Http.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.api_url(), init_args.organization_id())
                .await?
                .print()
        }

        Command::Auth(auth_args) => {
            let config = Config::load(home).await?;
            commands::auth(&config, auth_args.token()).await?.print()
        }

        Command::Draft(draft_args) => {
            let config = Config::load(home).await?;
            match draft_args.command() {
                DraftCommand::New(a) => {
                    commands::draft_new(&config, a.description.as_deref(), a.date)
                        .await?
                        .print()
                }
                DraftCommand::List => commands::draft_list(&config).await?.print(),
                DraftCommand::Show(a) => commands::draft_show(&config, &a.draft).await?.print(),
                DraftCommand::Edit(a) => {
                    commands::draft_edit(&config, &a.draft, a.description.as_deref(), a.date)
                        .await?
                        .print()
                }
                DraftCommand::AddLine(a) => commands::draft_add_line(&config, &a.draft, &a.line)
                    .await?
                    .print(),
                DraftCommand::SetLine(a) => {
                    commands::draft_set_line(&config, &a.draft, a.line_number, &a.line)
                        .await?
                        .print()
                }
                DraftCommand::RemoveLine(a) => {
                    commands::draft_remove_line(&config, &a.draft, a.line_number)
                        .await?
                        .print()
                }
                DraftCommand::Discard(a) => {
                    commands::draft_discard(&config, &a.draft).await?.print()
                }
            }
        }

        Command::Post(post_args) => {
            let config = Config::load(home).await?;
            commands::post(&config, mode, &post_args.draft)
                .await?
                .print()
        }

        Command::Ledger(ledger_args) => {
            let config = Config::load(home).await?;
            let range = DateRange::new(ledger_args.start_date, ledger_args.end_date);
            commands::ledger(&config, mode, &ledger_args.account_id, range)
                .await?
                .print()
        }

        Command::Export(export_args) => {
            let config = Config::load(home).await?;
            let range = DateRange::new(export_args.date_from, export_args.date_to);
            commands::export(
                &config,
                mode,
                export_args.format,
                range,
                export_args.output.as_deref(),
            )
            .await?
            .print()
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
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                "battwheels_journal",
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
