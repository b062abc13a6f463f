use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- session errors --------------------------------------------
    #[error("no debug session is running")]
    NoSession,
    #[error("nothing to run: no target program given")]
    NoTarget,
    #[error("launch failed: {0}")]
    LaunchFailed(String),
    #[error("invalid line range [{start}, {end}]")]
    InvalidRange { start: u32, end: u32 },

    // --------------------------------- history errors --------------------------------------------
    #[error("already at the beginning of the recorded history")]
    AtBeginning,
    #[error("program ended before replay reached line {target_line}{}", last_line(.reached))]
    ReplayExhausted {
        target_line: u32,
        reached: Option<u32>,
    },

    // --------------------------------- protocol errors -------------------------------------------
    #[error("no stop event within {0:?}")]
    Timeout(Duration),
    #[error("protocol error: {0:#}")]
    Protocol(anyhow::Error),
}

fn last_line(reached: &Option<u32>) -> String {
    reached
        .map(|line| format!(" (stopped at line {line})"))
        .unwrap_or_default()
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Protocol(e)
    }
}

impl Error {
    /// Return a hint to a caller - keep working with the current session after error
    /// or treat it as ended.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::NoSession => false,
            Error::NoTarget => false,
            Error::InvalidRange { .. } => false,
            Error::AtBeginning => false,
            Error::Timeout(_) => false,
            Error::Protocol(_) => false,

            // session is gone after these
            Error::LaunchFailed(_) => true,
            Error::ReplayExhausted { .. } => true,
        }
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "controller", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "controller", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and put error into debug logs if it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}
