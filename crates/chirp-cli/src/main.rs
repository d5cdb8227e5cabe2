use std::env;

use anyhow::{anyhow, Context, Result};
use chirp_core::auth::{
    AuthError, CallbackQuery, CredentialStore, FileCredentialStore, Handshake, MemorySessionStore,
    RetryPolicy, StoredCredentials, TokenPair,
};
use chirp_core::config::{ClientConfig, ConfigLocator, ConfigOverrides};
use chirp_core::rest::HttpConnector;
use chirp_core::services::{AccountService, StatusService};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tokio::task;
use url::Url;

const DEFAULT_PROFILE: &str = "default";

/// Out-of-band callback: the service shows the user a PIN instead of
/// redirecting anywhere.
const OOB_CALLBACK: &str = "oob";

#[derive(Parser, Debug)]
#[command(author, version, about = "OAuth1 social API client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Authentication related commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Authenticated account details
    #[command(subcommand)]
    Account(AccountCommand),
    /// Status updates
    #[command(subcommand)]
    Status(StatusCommand),
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Log in using the out-of-band OAuth1 flow
    Login(LoginArgs),
    /// Forget stored credentials for a profile
    Logout(LogoutArgs),
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Verify the stored credentials and show who you are
    Show(ShowArgs),
}

#[derive(Subcommand, Debug)]
enum StatusCommand {
    /// Post a status update
    Post(PostArgs),
}

#[derive(Args, Debug)]
struct LoginArgs {
    /// Profile name for stored credentials
    #[arg(long, default_value = DEFAULT_PROFILE)]
    profile: String,
}

#[derive(Args, Debug)]
struct LogoutArgs {
    /// Profile name for stored credentials
    #[arg(long, default_value = DEFAULT_PROFILE)]
    profile: String,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Profile name for stored credentials
    #[arg(long, default_value = DEFAULT_PROFILE)]
    profile: String,
    /// Output the raw credentials record as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct PostArgs {
    /// Text of the status update
    text: String,
    /// Profile name for stored credentials
    #[arg(long, default_value = DEFAULT_PROFILE)]
    profile: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Auth(command) => match command {
            AuthCommand::Login(args) => auth_login(args).await?,
            AuthCommand::Logout(args) => auth_logout(args)?,
        },
        Commands::Account(command) => match command {
            AccountCommand::Show(args) => account_show(args).await?,
        },
        Commands::Status(command) => match command {
            StatusCommand::Post(args) => status_post(args).await?,
        },
    }
    Ok(())
}

async fn auth_login(args: LoginArgs) -> Result<()> {
    let locator = ConfigLocator::new().context("unable to locate configuration directory")?;
    let config = load_config(&locator)?;
    let policy = RetryPolicy::from_config(&config);
    let connector = HttpConnector::new(config).context("failed to build API connector")?;

    let session = MemorySessionStore::new();
    let handshake = Handshake::new(&connector, &session, policy, OOB_CALLBACK);

    let redirect = handshake
        .begin()
        .await
        .context("could not reach the service; try again later")?;

    println!("\nAuthorize chirp by visiting:\n  {}\n", redirect.url);

    let input = prompt_for_verifier().await?;
    let query = parse_callback_input(&input, redirect.oauth_token());

    let user = handshake
        .complete(&query)
        .await
        .context("authorization could not be completed")?;

    let screen_name = user
        .credentials
        .get("screen_name")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let store = FileCredentialStore::new(locator);
    store
        .save(
            &args.profile,
            &StoredCredentials {
                tokens: user.tokens,
                screen_name: screen_name.clone(),
            },
        )
        .context("failed to store credentials")?;

    println!(
        "Login succeeded. Credentials stored for profile '{}'.",
        args.profile
    );
    if let Some(name) = screen_name {
        println!("Logged in as @{name}");
    }
    Ok(())
}

fn auth_logout(args: LogoutArgs) -> Result<()> {
    let store = FileCredentialStore::with_default_locator()
        .context("unable to initialise credential store")?;
    store
        .delete(&args.profile)
        .context("failed to remove stored credentials")?;
    println!("Deleted credentials for profile '{}'.", args.profile);
    Ok(())
}

async fn account_show(args: ShowArgs) -> Result<()> {
    let locator = ConfigLocator::new().context("unable to locate configuration directory")?;
    let config = load_config(&locator)?;
    let policy = RetryPolicy::from_config(&config);
    let connector = HttpConnector::new(config).context("failed to build API connector")?;
    let tokens = load_tokens(&locator, &args.profile)?;

    let service = AccountService::new(&connector, policy);
    let credentials = service
        .verify_credentials(&tokens)
        .await
        .context("could not verify the stored credentials")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&credentials)?);
    } else {
        render_credentials(&credentials);
    }
    Ok(())
}

async fn status_post(args: PostArgs) -> Result<()> {
    let locator = ConfigLocator::new().context("unable to locate configuration directory")?;
    let config = load_config(&locator)?;
    let policy = RetryPolicy::from_config(&config);
    let connector = HttpConnector::new(config).context("failed to build API connector")?;
    let tokens = load_tokens(&locator, &args.profile)?;

    let service = StatusService::new(&connector, policy);
    let response = service
        .update(&tokens, &args.text)
        .await
        .context("could not post the status update")?;

    match response.get("id").and_then(Value::as_i64) {
        Some(id) => println!("Posted status {id}."),
        None => println!("Posted status."),
    }
    Ok(())
}

fn load_config(locator: &ConfigLocator) -> Result<ClientConfig> {
    let config = ClientConfig::load(locator, overrides_from_env())
        .context("failed to load configuration")?;
    if config.consumer_key.is_empty() || config.consumer_secret.is_empty() {
        return Err(anyhow!(
            "no consumer credentials configured; set CHIRP_CONSUMER_KEY and \
             CHIRP_CONSUMER_SECRET or add them to {}",
            locator.settings_file().display()
        ));
    }
    Ok(config)
}

fn overrides_from_env() -> ConfigOverrides {
    let nonempty = |value: String| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_owned())
    };
    ConfigOverrides {
        consumer_key: env::var("CHIRP_CONSUMER_KEY").ok().and_then(nonempty),
        consumer_secret: env::var("CHIRP_CONSUMER_SECRET").ok().and_then(nonempty),
        user_agent: env::var("CHIRP_USER_AGENT").ok().and_then(nonempty),
        ..ConfigOverrides::default()
    }
}

fn load_tokens(locator: &ConfigLocator, profile: &str) -> Result<TokenPair> {
    let store = FileCredentialStore::new(locator.clone());
    let credentials = store
        .load(profile)
        .context("failed to read stored credentials")?
        .ok_or_else(|| {
            anyhow!("no credentials stored for profile '{profile}'; run `chirp auth login`")
        })?;
    Ok(credentials.tokens)
}

async fn prompt_for_verifier() -> Result<String> {
    task::spawn_blocking(|| {
        use std::io::{self, Write};
        print!("Paste the PIN or the full callback URL: ");
        io::stdout().flush().map_err(AuthError::Io)?;
        let mut input = String::new();
        io::stdin().read_line(&mut input).map_err(AuthError::Io)?;
        Ok::<_, AuthError>(input.trim().to_owned())
    })
    .await
    .context("prompt interrupted")?
    .context("failed to read input")
}

/// Accepts either the full callback URL the service redirected to or a raw
/// PIN; a raw PIN keeps the request token issued at the start of the flow.
fn parse_callback_input(input: &str, request_token: Option<String>) -> CallbackQuery {
    if let Ok(url) = Url::parse(input) {
        let query = CallbackQuery::from_url(&url);
        if query.oauth_verifier.is_some() {
            return query;
        }
    }
    CallbackQuery {
        oauth_token: request_token,
        oauth_verifier: Some(input.to_owned()),
    }
}

fn render_credentials(credentials: &Value) {
    if let Some(name) = credentials.get("screen_name").and_then(Value::as_str) {
        println!("Handle : @{name}");
    }
    if let Some(name) = credentials.get("name").and_then(Value::as_str) {
        println!("Name   : {name}");
    }
    if let Some(id) = credentials.get("id").and_then(Value::as_i64) {
        println!("ID     : {id}");
    }
    if credentials.get("screen_name").is_none() && credentials.get("name").is_none() {
        println!("{credentials}");
    }
}
