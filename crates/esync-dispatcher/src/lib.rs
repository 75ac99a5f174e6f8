pub mod config_env;
pub mod dispatcher;
pub mod error;
pub mod handle;

pub use config_env::config_envs;
pub use dispatcher::{
    Dispatcher, ENV_BATCH_MODE, ENV_BATCH_TASKS, ENV_DRIVE_URL, ENV_UUID, ENV_USE_EMBED_V4,
};
pub use error::DispatchError;
pub use handle::ExecutionHandle;
