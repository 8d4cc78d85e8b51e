//! `threadvault serve` command implementation.

use crate::config::Config;
use crate::error::Result;
use crate::server::serve;
use crate::tools::ToolContext;
use std::io;
use tracing::info;

/// Run the tool server on stdin/stdout until stdin closes.
///
/// # Errors
///
/// Returns an error if the configured stores cannot be built or stdio fails.
pub fn run(config: &Config) -> Result<()> {
    let context = ToolContext::from_config(config)?;
    info!(
        path = %config.storage.path.display(),
        backend = ?config.storage.backend,
        remote = config.remote.is_enabled(),
        "serving tools on stdio"
    );

    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let report = serve(stdin, &mut stdout, &context)?;

    info!(
        frames = report.processed_frames,
        errors = report.error_count,
        "server stopped"
    );
    Ok(())
}
