use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use ytlookup::cli::{Cli, Commands};
use ytlookup::error::LookupError;
use ytlookup::resolve::{self, ResolveConfig};
use ytlookup::search::{self, SearchConfig};
use ytlookup::service;
use ytlookup::telemetry;
use ytlookup::tools::yt_dlp::YtDlpTool;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            // --help and --version also arrive here and are not failures.
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Resolve(args) => {
            telemetry::init_logging("warn");
            let config = ResolveConfig::try_from_args(args)?;
            let tool = YtDlpTool::new(config.extractor);
            let url = resolve::execute(
                &tool,
                &config.song,
                config.selection,
                config.cookies.as_deref(),
            )
            .await?;
            println!("{url}");
        }
        Commands::Search(args) => {
            telemetry::init_logging("warn");
            let config = SearchConfig::try_from_args(args)?;
            let tool = YtDlpTool::new(config.extractor);
            let results = if config.strict {
                search::execute(&tool, &config.query).await?
            } else {
                search::execute_or_empty(&tool, &config.query).await
            };
            let json = if config.pretty {
                serde_json::to_string_pretty(&results)?
            } else {
                serde_json::to_string(&results)?
            };
            println!("{json}");
        }
        Commands::Serve(args) => service::serve(args).await?,
    }
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<LookupError>()
        .map(LookupError::exit_code)
        .unwrap_or(1)
}
