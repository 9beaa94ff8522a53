use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use portal_core::Target;

#[derive(Debug, Parser)]
#[command(name = "portal", version, about = "Civil registry resource portal client")]
pub struct Cli {
    /// Configuration file (RON). Defaults to ./portal.ron when present.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write the log to ./portal.log.
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the catalog reverse proxy.
    Proxy,
    /// Sign in to the local backend and remember the session.
    Login {
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Search the library catalog.
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Upload a resource to the local backend and/or the repository.
    Upload(UploadArgs),
    /// Show repository statistics.
    Dashboard {
        /// Limit the statistics to one collection.
        #[arg(long)]
        scope: Option<String>,
        /// Also show submission statistics for this repository user id.
        #[arg(long)]
        user: Option<String>,
        #[command(flatten)]
        repository: RepositoryLogin,
    },
    /// List or search files stored in the local backend.
    Files {
        #[arg(long, short)]
        query: Option<String>,
    },
    /// Create a local backend account.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Search every connected system at once.
    Resources {
        query: String,
        #[arg(long, value_parser = ["local", "koha", "dspace", "vufind"])]
        source: Option<String>,
        #[arg(long = "type")]
        resource_type: Option<String>,
        #[arg(long)]
        year: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Show one resource of the local backend.
    Resource { id: u64 },
    /// Download a resource, or print where it can be found.
    Download {
        id: u64,
        /// Directory to save the file in.
        #[arg(long, short, default_value = ".")]
        out: PathBuf,
    },
    /// Show usage analytics (admin accounts).
    Analytics {
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long, default_value = "")]
    pub authors: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Repository collection id; required for the repository target.
    #[arg(long)]
    pub collection: Option<String>,
    /// Extra repository metadata as `field=value`, e.g. `dc.date.issued=1921`.
    #[arg(long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
    #[arg(long = "file")]
    pub files: Vec<PathBuf>,
    #[arg(long = "target", value_enum, default_values_t = [TargetArg::Local])]
    pub targets: Vec<TargetArg>,
    #[command(flatten)]
    pub repository: RepositoryLogin,
}

/// Repository credentials, needed because the repository session lives
/// only as long as one command.
#[derive(Debug, Args)]
pub struct RepositoryLogin {
    #[arg(long, env = "PORTAL_REPOSITORY_EMAIL")]
    pub repository_email: Option<String>,
    #[arg(long, env = "PORTAL_REPOSITORY_PASSWORD", hide_env_values = true)]
    pub repository_password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    Local,
    Repository,
}

impl From<TargetArg> for Target {
    fn from(value: TargetArg) -> Self {
        match value {
            TargetArg::Local => Target::Local,
            TargetArg::Repository => Target::Repository,
        }
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected field=value, got {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_defaults_to_local_target() {
        let cli = Cli::parse_from(["portal", "upload", "--title", "Acta", "--file", "a.pdf"]);
        let Command::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(args.targets, vec![TargetArg::Local]);
        assert_eq!(args.files, vec![PathBuf::from("a.pdf")]);
    }

    #[test]
    fn extra_fields_are_split_on_equals() {
        let cli = Cli::parse_from([
            "portal",
            "upload",
            "--title",
            "Acta",
            "--target",
            "repository",
            "--collection",
            "c1",
            "--field",
            "dc.date.issued=1921",
        ]);
        let Command::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(
            args.fields,
            vec![("dc.date.issued".to_string(), "1921".to_string())]
        );
        assert!(parse_field("no-equals").is_err());
    }

    #[test]
    fn resource_search_filters_are_restricted() {
        let cli = Cli::parse_from([
            "portal", "resources", "actas", "--source", "dspace", "--type", "thesis",
        ]);
        let Command::Resources {
            source,
            resource_type,
            limit,
            ..
        } = cli.command
        else {
            panic!("expected resources");
        };
        assert_eq!(source.as_deref(), Some("dspace"));
        assert_eq!(resource_type.as_deref(), Some("thesis"));
        assert_eq!(limit, 20);
        assert!(Cli::try_parse_from(["portal", "resources", "x", "--source", "web"]).is_err());
    }

    #[test]
    fn verbosity_is_global() {
        let cli = Cli::parse_from(["portal", "search", "registro", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }
}
