//! Subcommand implementations.
//!
//! | Subcommand | Function | Output |
//! |------------|----------|--------|
//! | `filings` | [`filings::run_filings`] | JSON Lines or CSV of SCAC filings |
//! | `search` | [`filings::run_search`] | JSON Lines on stdout |
//! | `sec-directory` | [`sec::run_directory`] | `ticker,cik,name` CSV |
//! | `sec-index` | [`sec::run_index`] | 10-K index CSV |
//! | `sec-download` | [`sec::run_download`] | one file per 10-K |
//! | `sec-all` | [`sec::run_all`] | all three SEC stages |

pub mod filings;
pub mod sec;

use crate::cli::Command;
use crate::config::AppConfig;
use crate::error::Result;
use tracing::info;

/// Run one subcommand to completion.
pub async fn dispatch(config: &AppConfig, command: &Command) -> Result<()> {
    match command {
        Command::Filings(args) => {
            filings::run_filings(config, args).await?;
        }
        Command::Search(args) => {
            filings::run_search(config, args).await?;
        }
        Command::SecDirectory(args) => {
            sec::run_directory(config, &args.output).await?;
        }
        Command::SecIndex(args) => {
            sec::run_index(config, args).await?;
        }
        Command::SecDownload(args) => {
            let summary = sec::run_download(config, args).await?;
            info!(?summary, "SEC download finished");
        }
        Command::SecAll(args) => {
            let summary = sec::run_all(config, args).await?;
            info!(?summary, "SEC pipeline finished");
        }
    }
    Ok(())
}
