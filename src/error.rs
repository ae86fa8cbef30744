use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unparsable url {input:?}: {source}")]
    UrlError {
        input: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported scheme {scheme:?} in {url}")]
    UnsupportedScheme { scheme: String, url: String },
    #[error("url has no host: {0}")]
    MissingHost(String),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn url(input: &str, source: url::ParseError) -> Self {
        Error::UrlError {
            input: input.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
