use clap::Parser;
use licenseedict_cli::{Cli, Command};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("licenseedict").chain(args.iter().copied())).unwrap()
}

#[test]
fn validate_with_features() {
    let cli = parse(&["--token", "tok", "validate", "-f", "PRO", "--feature", "EXPORT"]);
    assert_eq!(cli.client.token.as_deref(), Some("tok"));
    assert_eq!(
        cli.command,
        Command::Validate {
            features: vec!["PRO".into(), "EXPORT".into()],
            from_cache: false,
        }
    );
}

#[test]
fn global_flags_after_subcommand() {
    let cli = parse(&["inspect", "--token", "tok", "--verbose", "--no-cache"]);
    assert_eq!(cli.command, Command::Inspect);
    assert_eq!(cli.client.token.as_deref(), Some("tok"));
    assert!(cli.verbose);
    assert!(cli.client.no_cache);
}

#[test]
fn heartbeat_defaults() {
    let cli = parse(&["heartbeat"]);
    assert_eq!(
        cli.command,
        Command::Heartbeat {
            duration: 60,
            interval: 30,
            no_checkout: false,
        }
    );
    assert_eq!(cli.client.timeout, 10);
}

#[test]
fn heartbeat_overrides() {
    let cli = parse(&["heartbeat", "-d", "0", "-i", "5", "--no-checkout"]);
    assert_eq!(
        cli.command,
        Command::Heartbeat {
            duration: 0,
            interval: 5,
            no_checkout: true,
        }
    );
}

#[test]
fn subcommand_is_required() {
    assert!(Cli::try_parse_from(["licenseedict"]).is_err());
    assert!(Cli::try_parse_from(["licenseedict", "frobnicate"]).is_err());
}

#[test]
fn config_from_arguments() {
    let cli = parse(&[
        "--server-url",
        "https://licenses.example.com",
        "--instance-id",
        "node-1",
        "--timeout",
        "3",
        "--app-name",
        "MyApp",
        "--app-publisher",
        "MyCompany",
        "--token",
        "  tok  ",
        "checkout",
    ]);
    let config = cli.client.client_config().unwrap();
    assert_eq!(config.server_url.as_deref(), Some("https://licenses.example.com"));
    assert_eq!(config.instance_id.as_deref(), Some("node-1"));
    assert_eq!(config.http_timeout, Duration::from_secs(3));
    assert_eq!(config.app_name, "MyApp");
    assert_eq!(config.app_publisher, "MyCompany");
    assert_eq!(config.token.as_deref(), Some("tok"));
    assert!(config.disable_auto_renew);
    assert!(config.public_key.is_none());
}

#[test]
fn config_rejects_malformed_public_key() {
    let cli = parse(&["--public-key", "not-a-key", "validate"]);
    let err = cli.client.client_config().unwrap_err();
    assert!(err.to_string().contains("invalid public key"));
}
