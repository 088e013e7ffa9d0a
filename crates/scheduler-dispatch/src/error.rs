use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Database(#[from] scheduler_database::Error),

    #[error(transparent)]
    Broker(#[from] scheduler_broker::Error),

    #[error(transparent)]
    Core(#[from] scheduler_core::Error),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
