use snafu::Snafu;
use std::string::FromUtf8Error;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to decode base64 blob: {}", source))]
    Base64Decode { source: base64::DecodeError },

    #[snafu(display("Decoded base64 blob is not valid UTF-8: {}", source))]
    Utf8Decode { source: FromUtf8Error },
}

pub type Result<T> = std::result::Result<T, Error>;
