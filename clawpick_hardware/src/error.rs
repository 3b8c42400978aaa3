use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("uart error: {0}")]
    Uart(String),
    #[error("serial write timeout")]
    WriteTimeout,
    #[error("serial link not open")]
    NotOpen,
    #[error("camera unavailable: {0}")]
    Camera(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
