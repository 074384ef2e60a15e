use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Bad url: {0}")]
    HttpBadUrl(String),
    #[error("Bad response: {0}")]
    HttpBadResponse(String),
    #[error("Document is neither RSS nor Atom")]
    XmlBadFormat,
    #[error("Could not parse feed: {0}")]
    XmlDeserialize(String),
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Invalid arguments for `{command}`: {reason}")]
    InvalidArgs { command: String, reason: String },
    #[error("Unexpected reply to `{command}`: {reply}")]
    UnexpectedReply { command: String, reply: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Stable name of the variant, used as `kind` on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Db(_) => "Db",
            Error::Io(_) => "Io",
            Error::Config(_) => "Config",
            Error::Json(_) => "Json",
            Error::HttpBadUrl(_) => "HttpBadUrl",
            Error::HttpBadResponse(_) => "HttpBadResponse",
            Error::XmlBadFormat => "XmlBadFormat",
            Error::XmlDeserialize(_) => "XmlDeserialize",
            Error::UnknownCommand(_) => "UnknownCommand",
            Error::InvalidArgs { .. } => "InvalidArgs",
            Error::UnexpectedReply { .. } => "UnexpectedReply",
            Error::NotFound(_) => "NotFound",
            Error::Custom(_) => "Custom",
        }
    }
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Error", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
