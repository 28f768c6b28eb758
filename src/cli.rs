use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::profile::{AuthMethod, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(
    name = "tarsend",
    author,
    version,
    about = "Bundle local files into a tar.gz and ship them to a remote host over SSH"
)]
pub struct Cli {
    /// profile 文件路径 (覆盖配置)
    #[arg(long, global = true, value_name = "FILE")]
    pub profiles_file: Option<PathBuf>,

    /// 输出更多日志 (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage saved connection profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    /// Archive files/folders, upload and optionally extract them remotely
    Send(SendArgs),
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// List saved profiles
    List,
    /// Show a profile (password hidden)
    Show {
        #[arg(help = "Profile name")]
        name: String,
    },
    /// Create or overwrite a profile
    Add(AddProfileArgs),
    /// Delete a profile
    Remove {
        #[arg(help = "Profile name")]
        name: String,
    },
    /// Try to open an SSH session with a saved profile
    Test {
        #[arg(help = "Profile name")]
        name: String,
    },
    /// Write all profiles to a file (passwords in plain text)
    Export {
        #[arg(help = "Destination JSON file")]
        file: PathBuf,
    },
    /// Merge profiles from an exported file
    Import {
        #[arg(help = "Source JSON file")]
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct AddProfileArgs {
    #[arg(help = "A unique name for the profile")]
    pub name: String,
    #[arg(long, help = "Host name or IP address")]
    pub host: String,
    #[arg(short, long, default_value_t = DEFAULT_PORT, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,
    #[arg(short, long, help = "SSH user name")]
    pub user: String,
    #[arg(long, default_value = "password", help = "password or key")]
    pub auth_method: AuthMethod,
    #[arg(long, help = "Password (prompted when omitted)")]
    pub password: Option<String>,
    #[arg(short = 'i', long, help = "Path to the private key file")]
    pub key_file: Option<PathBuf>,
    #[arg(short, long, default_value = "", help = "Remote destination directory")]
    pub remote_path: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[arg(required = true, value_name = "PATH", help = "Files and folders to transfer")]
    pub paths: Vec<PathBuf>,
    #[arg(short = 'P', long, help = "Profile to use (defaults to the last used one)")]
    pub profile: Option<String>,
    #[arg(short, long, help = "Remote directory (defaults to the profile's remote path)")]
    pub remote_path: Option<String>,
    #[arg(long, conflicts_with = "no_extract", help = "Extract the archive on the remote host")]
    pub extract: bool,
    #[arg(long, help = "Leave the uploaded archive packed")]
    pub no_extract: bool,
}

impl SendArgs {
    pub fn should_extract(&self, default: bool) -> bool {
        if self.no_extract {
            false
        } else {
            self.extract || default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add_profile() {
        let cli = Cli::try_parse_from([
            "tarsend", "profile", "add", "prod", "--host", "10.0.0.5", "-p", "2222", "-u", "deploy",
            "--auth-method", "key", "-i", "/home/deploy/.ssh/id_ed25519", "-r", "/srv/drop",
        ])
        .unwrap();
        match cli.command {
            Commands::Profile { command: ProfileCommand::Add(args) } => {
                assert_eq!(args.name, "prod");
                assert_eq!(args.port, 2222);
                assert_eq!(args.auth_method, AuthMethod::Key);
                assert_eq!(args.remote_path, "/srv/drop");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_port_zero_is_rejected() {
        let res = Cli::try_parse_from(["tarsend", "profile", "add", "p", "--host", "h", "-p", "0", "-u", "u"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_send_extract_flags() {
        let cli = Cli::try_parse_from(["tarsend", "send", "a.txt", "dir", "--no-extract"]).unwrap();
        let Commands::Send(args) = cli.command else { panic!("expected send") };
        assert_eq!(args.paths.len(), 2);
        assert!(!args.should_extract(true));

        let cli = Cli::try_parse_from(["tarsend", "send", "a.txt"]).unwrap();
        let Commands::Send(args) = cli.command else { panic!("expected send") };
        assert!(args.should_extract(true));
        assert!(!args.should_extract(false));

        assert!(Cli::try_parse_from(["tarsend", "send", "a", "--extract", "--no-extract"]).is_err());
        assert!(Cli::try_parse_from(["tarsend", "send"]).is_err());
    }
}
