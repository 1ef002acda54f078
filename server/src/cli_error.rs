use crate::data_store::StoreError;
use crate::setup::SetupError;

/// Failure of a `leafsite_server` command, reported on the terminal and as process exit code
#[derive(Debug)]
pub enum CliError {
    /// An environment variable is missing or has an invalid value
    Configuration(SetupError),
    /// The PostgreSQL server could not be reached or refused the login
    DatabaseUnreachable(String),
    /// A database query failed while executing the command
    DatabaseFailure(String),
    /// The web server could not listen on the configured address
    Listen {
        address: String,
        error: std::io::Error,
    },
    /// The web server stopped with an io error
    Server(std::io::Error),
    /// Applying the schema migrations failed
    Migration(String),
    /// The database schema is older than this version of the application
    MigrationsPending(Vec<String>),
    /// A user account with this email address exists already
    DuplicateUser(String),
    /// The password of a new user account could not be hashed
    PasswordHashing(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::DuplicateUser(_) => 1,
            Self::DatabaseFailure(_) | Self::PasswordHashing(_) => 2,
            Self::Listen { .. } | Self::Server(_) => 3,
            Self::DatabaseUnreachable(_) | Self::Migration(_) => 4,
            Self::MigrationsPending(_) => 5,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "Invalid configuration: {}", e),
            Self::DatabaseUnreachable(e) => write!(f, "Database is not reachable: {}", e),
            Self::DatabaseFailure(e) => write!(f, "Database query failed: {}", e),
            Self::Listen { address, error } => {
                write!(f, "Cannot listen for HTTP requests on {}: {}", address, error)
            }
            Self::Server(e) => write!(f, "Web server stopped: {}", e),
            Self::Migration(e) => write!(f, "Migrating the database schema failed: {}", e),
            Self::MigrationsPending(names) => write!(
                f,
                "The database schema is outdated. Run `leafsite_server migrate-database` to apply: {}",
                names.join(", ")
            ),
            Self::DuplicateUser(email) => {
                write!(f, "There is a user account for {} already", email)
            }
            Self::PasswordHashing(e) => write!(f, "Could not hash the password: {}", e),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConnectionError(e) => Self::DatabaseUnreachable(e),
            e => Self::DatabaseFailure(e.to_string()),
        }
    }
}

impl From<SetupError> for CliError {
    fn from(e: SetupError) -> Self {
        Self::Configuration(e)
    }
}

impl From<diesel::ConnectionError> for CliError {
    fn from(e: diesel::ConnectionError) -> Self {
        Self::DatabaseUnreachable(e.to_string())
    }
}
