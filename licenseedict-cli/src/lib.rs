//! Argument parsing and command handlers for the `licenseedict` binary.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use licenseedict::{
    Client, ClientConfig, Event, EventData, EventType, HeartbeatOptions, License,
    decode_unverified,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "licenseedict")]
#[command(about = "Validate, renew and report on LicenseEdict license tokens")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every subcommand that talks to a [`Client`].
#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Base64 Ed25519 public key used to verify tokens
    #[arg(long, env = "LICENSEEDICT_PUBLIC_KEY", global = true, hide_env_values = true)]
    pub public_key: Option<String>,

    /// Signed license token
    #[arg(long, env = "LICENSEEDICT_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Licensing server URL (overrides the one carried by the token)
    #[arg(long, env = "LICENSEEDICT_SERVER_URL", global = true)]
    pub server_url: Option<String>,

    /// Application name, used to place the license cache
    #[arg(long, global = true, default_value = "")]
    pub app_name: String,

    /// Application publisher, used to place the license cache
    #[arg(long, global = true, default_value = "")]
    pub app_publisher: String,

    /// Explicit license cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Do not read or write the license cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Instance ID reported for seat tracking
    #[arg(long, global = true)]
    pub instance_id: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, default_value = "10")]
    pub timeout: u64,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Verify the token and print the license
    Validate {
        /// Also report whether the license includes these features
        #[arg(short, long = "feature")]
        features: Vec<String>,

        /// Fall back to the cached license without verifying anything
        #[arg(long)]
        from_cache: bool,
    },
    /// Decode the token payload without checking its signature
    Inspect,
    /// Exchange the token for a fresh one
    Renew,
    /// Hold a seat by heartbeating until the duration elapses or Ctrl-C
    Heartbeat {
        /// Seconds to run; 0 runs until interrupted
        #[arg(short, long, default_value = "60")]
        duration: u64,

        /// Initial heartbeat interval in seconds
        #[arg(short, long, default_value = "30")]
        interval: u64,

        /// Keep the seat when exiting instead of checking out
        #[arg(long)]
        no_checkout: bool,
    },
    /// Release this instance's seat
    Checkout,
}

impl ClientArgs {
    /// Builds the client configuration these arguments describe.
    ///
    /// Auto-renewal is disabled; renewal happens only through `renew`.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::new()
            .with_app_info(&self.app_name, &self.app_publisher)
            .with_http_timeout(Duration::from_secs(self.timeout))
            .without_auto_renew();

        if let Some(key) = self.public_key.as_deref().filter(|k| !k.is_empty()) {
            config = config.with_public_key(key).context("invalid public key")?;
        }
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            config = config.with_token(token.trim());
        }
        if let Some(url) = self.server_url.as_deref().filter(|u| !u.is_empty()) {
            config = config.with_server_url(url);
        }
        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir);
        }
        if self.no_cache {
            config = config.without_cache();
        }
        if let Some(id) = &self.instance_id {
            config = config.with_instance_id(id);
        }
        Ok(config)
    }
}

/// Runs the parsed command to completion.
pub async fn run(cli: Cli) -> Result<()> {
    if cli.command == Command::Inspect {
        return inspect(&cli.client);
    }

    let mut config = cli.client.client_config()?;
    if let Command::Heartbeat { interval, .. } = &cli.command {
        config = config.with_heartbeat_interval(Duration::from_secs(*interval));
    }

    let client = Client::new(config)?;
    let result = match &cli.command {
        Command::Validate {
            features,
            from_cache,
        } => validate(&client, features, *from_cache).await,
        Command::Renew => renew(&client).await,
        Command::Heartbeat {
            duration,
            no_checkout,
            ..
        } => heartbeat(&client, Duration::from_secs(*duration), *no_checkout).await,
        Command::Checkout => checkout(&client).await,
        Command::Inspect => Ok(()),
    };

    client.close().await?;
    result
}

fn inspect(args: &ClientArgs) -> Result<()> {
    let Some(token) = args.token.as_deref().filter(|t| !t.is_empty()) else {
        bail!("no token given (use --token or LICENSEEDICT_TOKEN)");
    };
    let payload = decode_unverified(token)?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

async fn validate(client: &Client, features: &[String], from_cache: bool) -> Result<()> {
    let license = if from_cache {
        client.validate_from_cache().await?
    } else {
        client.validate(None).await?
    };
    print_license(&license);

    for feature in features {
        let mark = if license.has_feature(feature) { "yes" } else { "no" };
        println!("  feature {feature}: {mark}");
    }

    if !license.valid {
        bail!("license {} is not valid", license.license_id);
    }
    Ok(())
}

async fn renew(client: &Client) -> Result<()> {
    if let Err(e) = client.validate(None).await {
        // The current token may be expired or unverifiable; the server decides.
        warn!("current token did not validate: {e}");
    }

    let result = client.renew_result().await?;
    let status = if result.status.is_empty() {
        "ok"
    } else {
        result.status.as_str()
    };
    println!("Renewal {status}");
    if !result.previous_expires_at.is_empty() {
        println!("  previous expiry: {}", result.previous_expires_at);
    }
    if !result.expires_at.is_empty() {
        println!("  new expiry:      {}", result.expires_at);
    }
    println!("  token: {}", result.signed_token);

    if let Some(license) = client.license().await {
        if license.signed_token == result.signed_token {
            print_license(&license);
        }
    }
    Ok(())
}

async fn heartbeat(client: &Client, duration: Duration, no_checkout: bool) -> Result<()> {
    if client.config().public_key.is_some() {
        let license = client.validate(None).await?;
        print_license(&license);
    }

    let mut events = client
        .take_events()
        .context("event stream already taken")?;

    let mut options = HeartbeatOptions::for_this_device();
    options.instance_id = client.instance_id().to_string();
    client.start_heartbeat(Some(options)).await?;
    info!("holding seat as instance {}", client.instance_id());

    let deadline = tokio::time::sleep(if duration.is_zero() {
        Duration::MAX
    } else {
        duration
    });
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
        }
    }

    let outcome = if no_checkout {
        client.stop_heartbeat().await;
        Ok(())
    } else {
        client.checkout().await.map_err(anyhow::Error::from)
    };

    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }
    outcome
}

async fn checkout(client: &Client) -> Result<()> {
    if client.config().public_key.is_some() {
        // Adopts the server URL from the token when none is configured.
        if let Err(e) = client.validate(None).await {
            debug!("validation before checkout failed: {e}");
        }
    }
    client.checkout().await?;
    println!("Seat released for instance {}", client.instance_id());
    Ok(())
}

fn print_license(license: &License) {
    println!("License {}", license.license_id);
    println!("  valid:    {}", license.valid);
    println!("  product:  {}", license.product_id);
    if !license.licensee.is_empty() {
        println!("  licensee: {}", license.licensee);
    }
    println!("  plan:     {}", license.plan);
    println!("  seats:    {}", license.max_seats);
    if !license.features.is_empty() {
        let features: Vec<&str> = license.features.iter().map(String::as_str).collect();
        println!("  features: {}", features.join(", "));
    }
    match (license.expires_at, license.time_remaining()) {
        (Some(expires_at), Some(remaining)) => {
            println!("  expires:  {expires_at} ({}d left)", remaining.num_days());
        }
        _ => println!("  expires:  never"),
    }
}

fn print_event(event: &Event) {
    match (&event.kind, &event.data) {
        (EventType::HeartbeatOk, Some(EventData::Heartbeat(status))) => println!(
            "[heartbeat] ok: {}/{} seats in use, next in {}s",
            status.active_sessions, status.max_sessions, status.heartbeat_interval
        ),
        (EventType::HeartbeatRejected, _) => println!("[heartbeat] rejected: {}", event.message),
        (EventType::HeartbeatError, _) => println!("[heartbeat] error: {}", event.message),
        (EventType::SeatReleased, _) => println!("[seat] released"),
        (EventType::LicenseRenewed, _) => println!("[license] renewed"),
        (EventType::ServerUnreachable, _) => println!("[server] unreachable: {}", event.message),
        (kind, _) => println!("[{kind:?}] {}", event.message),
    }
}
