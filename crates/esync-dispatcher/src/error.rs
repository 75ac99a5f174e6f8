use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to spawn worker process: {0}")]
    Spawn(std::io::Error),

    #[error("could not determine path to the current executable: {0}")]
    CurrentExe(std::io::Error),
}
