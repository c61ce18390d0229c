//! RAX FTP Client - Entry Point
//!
//! Runs one operation against the host configured in `config.toml`
//! (or the `RAX_FTP_*` environment).

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::process;

use clap::{Parser, Subcommand};
use log::info;

use rax_ftp_client::error::handlers::{error_to_exit_code, handle_error};
use rax_ftp_client::utils::logging::setup_logging;
use rax_ftp_client::{ClientError, FtpClient, Settings};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "rax-ftp-client", about = "A minimal FTP/FTPS client.")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Remote directory to work in
    #[arg(long = "cd", value_name = "PATH", global = true)]
    path: Option<String>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Action {
    /// List the remote directory
    #[command(name = "ls")]
    List,
    /// Print a remote file to stdout
    Get { file: String },
    /// Upload a local file
    Put { local: String, remote: String },
    /// Delete a remote file
    #[command(name = "rm")]
    Remove { file: String },
}

#[derive(Debug)]
enum CliError {
    Client(ClientError),
    Io(io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Client(e) => write!(f, "{}", e),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl From<ClientError> for CliError {
    fn from(error: ClientError) -> Self {
        CliError::Client(error)
    }
}

impl From<io::Error> for CliError {
    fn from(error: io::Error) -> Self {
        CliError::Io(error)
    }
}

fn run(client: &mut FtpClient, settings: &Settings, cli: &Cli) -> Result<(), CliError> {
    client.open(&settings.connection)?;
    if let Some(path) = &cli.path {
        client.cd(path);
    }

    let mut stdout = io::stdout().lock();
    match &cli.action {
        Action::List => {
            for entry in client.ls()? {
                writeln!(stdout, "{}", entry.id)?;
            }
        }
        Action::Get { file } => {
            let body = client.read(file)?;
            stdout.write_all(&body)?;
        }
        Action::Put { local, remote } => {
            let content = fs::read(local)?;
            client.write(remote, &content)?;
            info!("Uploaded {} bytes to {}", content.len(), remote);
        }
        Action::Remove { file } => {
            client.rm(file)?;
            info!("Deleted {}", file);
        }
    }
    stdout.flush()?;

    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            process::exit(64);
        }
        Err(e) => e.exit(),
    };

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {e}");
            process::exit(78);
        }
    };

    setup_logging(&settings.verbosity);
    info!("Launching FTP client...");

    let mut client = FtpClient::new();
    let result = run(&mut client, &settings, &cli);
    client.close();

    match result {
        Ok(()) => {}
        Err(CliError::Client(e)) => {
            handle_error(&e);
            process::exit(error_to_exit_code(&e));
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(74);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("rax-ftp-client").chain(args.iter().copied()))
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse(&["ls"]).unwrap().action, Action::List);
        assert_eq!(
            parse(&["get", "a.txt"]).unwrap().action,
            Action::Get {
                file: "a.txt".into()
            }
        );
        assert_eq!(
            parse(&["put", "local.txt", "remote.txt"]).unwrap().action,
            Action::Put {
                local: "local.txt".into(),
                remote: "remote.txt".into()
            }
        );
        assert_eq!(
            parse(&["rm", "a.txt"]).unwrap().action,
            Action::Remove {
                file: "a.txt".into()
            }
        );
    }

    #[test]
    fn parses_global_options() {
        let cli = parse(&["--cd", "/pub", "--config", "my.toml", "ls"]).unwrap();
        assert_eq!(cli.path.as_deref(), Some("/pub"));
        assert_eq!(cli.config.as_deref(), Some("my.toml"));
        assert_eq!(cli.action, Action::List);

        let cli = parse(&["get", "a", "-c", "other.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("other.toml"));
        assert!(cli.path.is_none());
    }

    #[test]
    fn rejects_bad_invocations() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["get"]).is_err());
        assert!(parse(&["mkdir", "x"]).is_err());
        assert!(parse(&["ls", "--cd"]).is_err());
        assert!(parse(&["put", "only-local"]).is_err());
    }

    #[test]
    fn definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
