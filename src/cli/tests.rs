//! CLI tests module
//!
//! Argument parsing and the shape of JSON output.

use super::*;
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_cli_definition_is_consistent() {
    build_cli().debug_assert();
}

#[test]
fn test_parse_submit_with_all_flags() {
    let cli = Cli::try_parse_from([
        "eec",
        "submit",
        "app.json",
        "--inputs",
        "inputs.json",
        "--id",
        "my-app",
        "--detach",
    ])
    .unwrap();

    match cli.command {
        Commands::Submit {
            artefact,
            inputs,
            id,
            detach,
        } => {
            assert_eq!(artefact, PathBuf::from("app.json"));
            assert_eq!(inputs, Some(PathBuf::from("inputs.json")));
            assert_eq!(id.as_deref(), Some("my-app"));
            assert!(detach);
        }
        _ => panic!("expected submit"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "eec",
        "status",
        "abc",
        "--json",
        "--store",
        "memory",
        "--poll-interval",
        "5",
    ])
    .unwrap();

    assert!(cli.json);
    assert_eq!(cli.store, Some(StoreArg::Memory));
    assert_eq!(cli.poll_interval, Some(5));
    assert!(matches!(cli.command, Commands::Status { ref id } if id == "abc"));
}

#[test]
fn test_store_arg_maps_to_backend() {
    assert_eq!(
        eec_config::StoreBackend::from(StoreArg::File),
        eec_config::StoreBackend::File
    );
    assert_eq!(
        eec_config::StoreBackend::from(StoreArg::Memory),
        eec_config::StoreBackend::Memory
    );
}

#[test]
fn test_unknown_store_rejected() {
    assert!(Cli::try_parse_from(["eec", "list", "--store", "redis"]).is_err());
}

#[test]
fn test_serve_force_flag() {
    let cli = Cli::try_parse_from(["eec", "serve", "--force"]).unwrap();
    assert!(matches!(cli.command, Commands::Serve { force: true }));
}

#[test]
fn test_submit_requires_artefact() {
    assert!(Cli::try_parse_from(["eec", "submit"]).is_err());
}
