use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("unable to load configuration")]
    Config,
    #[display("unable to open storage")]
    Storage,
    #[display("unable to create HTTP client")]
    Fetch,
    #[display("offline engine failed")]
    Engine,
    #[display("invalid URL: {_0}")]
    InvalidUrl(#[error(not(source))] String),
}
