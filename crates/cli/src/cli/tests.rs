use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_call_command() {
	let args = vec!["playgodot", "call", "/root/Game", "make_move", "4"];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Call { path, method, args } => {
			assert_eq!(path, "/root/Game");
			assert_eq!(method, "make_move");
			assert_eq!(args, ["4"]);
		}
		_ => panic!("Expected Call command"),
	}
}

#[test]
fn parse_global_flags_after_subcommand() {
	let args = vec![
		"playgodot",
		"scene",
		"--godot-path",
		"/opt/godot",
		"--project",
		"game",
		"--transport",
		"tcp:6007",
		"--timeout",
		"15000",
		"-vv",
	];
	let cli = Cli::try_parse_from(args).unwrap();

	assert!(matches!(cli.command, Commands::Scene));
	assert_eq!(cli.session.godot_path, Some(PathBuf::from("/opt/godot")));
	assert_eq!(cli.session.project, PathBuf::from("game"));
	assert_eq!(cli.session.transport, Some(TransportMode::Tcp { port: 6007 }));
	assert_eq!(cli.session.timeout, Some(15000));
	assert_eq!(cli.verbose, 2);
}

#[test]
fn parse_headless_switch() {
	let cli = Cli::try_parse_from(["playgodot", "reload", "--headless"]).unwrap();
	assert_eq!(cli.session.headless, Some(true));

	let cli = Cli::try_parse_from(["playgodot", "reload", "--headless=false"]).unwrap();
	assert_eq!(cli.session.headless, Some(false));

	let cli = Cli::try_parse_from(["playgodot", "--headless", "reload"]).unwrap();
	assert_eq!(cli.session.headless, Some(true));
	assert!(matches!(cli.command, Commands::Reload));

	let cli = Cli::try_parse_from(["playgodot", "reload"]).unwrap();
	assert_eq!(cli.session.headless, None);
}

#[test]
fn parse_click_path_or_position() {
	let cli = Cli::try_parse_from(["playgodot", "click", "/root/Game/RestartButton"]).unwrap();
	match cli.command {
		Commands::Click(args) => {
			assert_eq!(args.path.as_deref(), Some("/root/Game/RestartButton"));
			assert_eq!(args.at, None);
		}
		_ => panic!("Expected Click command"),
	}

	let cli = Cli::try_parse_from(["playgodot", "click", "--at", "370, 525"]).unwrap();
	match cli.command {
		Commands::Click(args) => assert_eq!(args.at, Some((370.0, 525.0))),
		_ => panic!("Expected Click command"),
	}
}

#[test]
fn click_requires_exactly_one_target() {
	assert!(Cli::try_parse_from(["playgodot", "click"]).is_err());
	assert!(Cli::try_parse_from(["playgodot", "click", "/root/A", "--at", "1,2"]).is_err());
	assert!(Cli::try_parse_from(["playgodot", "click", "--at", "12"]).is_err());
}

#[test]
fn invalid_transport_rejected() {
	let result = Cli::try_parse_from(["playgodot", "scene", "--transport", "carrier-pigeon"]);
	assert!(result.is_err());
}

#[test]
fn parse_demo_output_dir() {
	let cli = Cli::try_parse_from(["playgodot", "demo"]).unwrap();
	match cli.command {
		Commands::Demo { out } => assert_eq!(out, PathBuf::from("screenshots")),
		_ => panic!("Expected Demo command"),
	}
}
