//! Map validated CLI matches to an action.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_DSN, ARG_PORT, ARG_TOKEN_SECRET, ARG_TOKEN_TTL};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let token_secret = matches
        .get_one::<String>(ARG_TOKEN_SECRET)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --token-secret")?;
    let token_ttl_seconds = matches
        .get_one::<u32>(ARG_TOKEN_TTL)
        .copied()
        .unwrap_or(3600);

    Ok(Action::Server(Args {
        port,
        dsn,
        token_secret,
        token_ttl_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn handler_builds_server_action() -> Result<()> {
        let matches = commands::new().try_get_matches_from(vec![
            "custodia",
            "--port",
            "8081",
            "--dsn",
            "postgres://localhost:5432/custodia",
            "--token-secret",
            "s3cr3t",
            "--token-ttl",
            "120",
        ])?;

        let Action::Server(args) = handler(&matches)?;

        assert_eq!(args.port, 8081);
        assert_eq!(args.dsn, "postgres://localhost:5432/custodia");
        assert_eq!(args.token_secret.expose_secret(), "s3cr3t");
        assert_eq!(args.token_ttl_seconds, 120);
        Ok(())
    }
}
