use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "orgo-server")]
#[command(version, about = "Orgo school management backend")]
pub struct Cli {
    /// Configuration file (YAML); missing file means built-in defaults
    #[arg(short, long, global = true, default_value = "config/orgo.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the REST API and run the attendance check (default)
    Serve,

    /// Apply pending database migrations and exit
    Migrate,

    /// Create a staff account
    CreateStaff(CreateStaffArgs),

    /// Enrol a class roster, one full name per line, and write credentials
    ImportStudents(ImportStudentsArgs),

    /// Run the proximity attendance check once
    CheckAttendance {
        /// Ignore the daily time window
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct CreateStaffArgs {
    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub email: String,

    /// Read from ORGO_STAFF_PASSWORD when omitted
    #[arg(long, env = "ORGO_STAFF_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long, default_value = "")]
    pub first_name: String,

    #[arg(long, default_value = "")]
    pub last_name: String,
}

#[derive(Args, Debug)]
pub struct ImportStudentsArgs {
    /// Text file with one "LastName FirstName [Patronymic]" per line
    pub roster: PathBuf,

    #[arg(long)]
    pub school: String,

    #[arg(long)]
    pub class: String,

    /// Domain of the generated email addresses
    #[arg(long, default_value = "orgo.local")]
    pub email_domain: String,

    /// Where to write the generated credentials (TSV)
    #[arg(short, long, default_value = "credentials.tsv")]
    pub output: PathBuf,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
