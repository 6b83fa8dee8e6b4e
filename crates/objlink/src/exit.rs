use std::fmt;

use objlink_client::ClientError;

// Exit code constants shared by all subcommands.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const DATA_INVALID: i32 = 60;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Wire(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ClientError::Transport(err) => CliError::new(FAILURE, format!("{context}: {err}")),
        ClientError::Closed => CliError::new(FAILURE, format!("{context}: channel closed")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}
