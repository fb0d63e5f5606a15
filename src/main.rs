use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use oauth_grant::{
    ExchangeConfig, Grant, GrantError, HttpTokenExchange, ImplicitGrant, PkceChallenge, PkceGrant,
    RedirectComponents, ResponseTypes,
};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(
    name = "oauth-grant",
    about = "Turn a captured OAuth callback URL into credentials and print them as JSON."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Tokens returned directly in the callback fragment.
    Implicit {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Authorization code exchanged for tokens with a PKCE verifier.
    Pkce {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long)]
        client_id: String,
        #[arg(long)]
        token_url: String,
        #[arg(long)]
        redirect_uri: String,
        /// Verifier used when the authorization request was built.
        #[arg(long, env = "OAUTH_GRANT_VERIFIER", hide_env_values = true)]
        verifier: String,
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Space separated response types, e.g. "code id_token".
    #[arg(long)]
    response_type: Option<String>,
    #[arg(long)]
    nonce: Option<String>,
    callback_url: String,
}

#[tokio::main]
async fn main() -> Result<(), GrantError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (grant, callback_url) = build_grant(cli.command)?;

    let components = RedirectComponents::parse(&callback_url)?;
    let values = grant.values_from_redirect(&components);
    let credentials = grant.credentials_from(&values).await?;

    let output =
        serde_json::to_string_pretty(&credentials).map_err(|err| GrantError::InvalidResponse {
            message: err.to_string(),
            body: String::new(),
        })?;

    println!("{output}");
    Ok(())
}

fn build_grant(command: Command) -> Result<(Grant, String), GrantError> {
    match command {
        Command::Implicit { common } => {
            let response_types = parse_response_types(common.response_type.as_deref(), "token")?;
            let mut grant = ImplicitGrant::new(response_types);
            if let Some(nonce) = common.nonce {
                grant = grant.with_nonce(nonce);
            }
            Ok((grant.into(), common.callback_url))
        }
        Command::Pkce {
            common,
            client_id,
            token_url,
            redirect_uri,
            verifier,
            timeout_secs,
        } => {
            let response_types = parse_response_types(common.response_type.as_deref(), "code")?;
            let config = ExchangeConfig::new(client_id, token_url)
                .with_timeout(Duration::from_secs(timeout_secs));
            let exchange = Arc::new(HttpTokenExchange::new(config)?);
            let mut grant = PkceGrant::new(
                exchange,
                Url::parse(&redirect_uri)?,
                PkceChallenge::from_verifier(verifier),
                response_types,
            );
            if let Some(nonce) = common.nonce {
                grant = grant.with_nonce(nonce);
            }
            Ok((grant.into(), common.callback_url))
        }
    }
}

fn parse_response_types(value: Option<&str>, default: &str) -> Result<ResponseTypes, GrantError> {
    value.unwrap_or(default).parse()
}
