use backwatch_app::{AppError, run_app};

use crate::context::{CliError, CliResult, classify_config};

pub(crate) async fn handle_watch() -> CliResult<()> {
    run_app().await.map_err(|err| match err {
        AppError::Config { source, .. } => classify_config(source),
        other => CliError::failure(other),
    })
}
