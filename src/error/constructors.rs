use super::types::{Error, Kind};

impl Error {
    #[must_use]
    pub fn cancelled() -> Error {
        Error::new(Kind::Cancelled)
    }

    #[must_use]
    pub fn timeout() -> Error {
        Error::new(Kind::Timeout)
    }

    #[must_use]
    pub fn sandbox_blocked() -> Error {
        Error::new(Kind::SandboxBlocked)
    }

    #[must_use]
    pub fn protocol(msg: impl Into<String>) -> Error {
        Error::new(Kind::Protocol).with(std::io::Error::other(msg.into()))
    }

    #[must_use]
    pub fn stream_reset(msg: impl Into<String>) -> Error {
        Error::new(Kind::StreamReset).with(std::io::Error::other(msg.into()))
    }

    #[must_use]
    pub fn body_framing(msg: impl Into<String>) -> Error {
        Error::new(Kind::BodyFraming).with(std::io::Error::other(msg.into()))
    }

    #[must_use]
    pub fn redirect(msg: impl Into<String>) -> Error {
        Error::new(Kind::Redirect).with(std::io::Error::other(msg.into()))
    }

    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Error {
        Error::new(Kind::Validation).with(std::io::Error::other(msg.into()))
    }

    #[must_use]
    pub fn nat64_exhausted(msg: impl Into<String>) -> Error {
        Error::new(Kind::Nat64Exhausted).with(std::io::Error::other(msg.into()))
    }

    #[must_use]
    pub fn connect(msg: impl Into<String>) -> Error {
        Error::new(Kind::Connect).with(std::io::Error::other(msg.into()))
    }

    #[must_use]
    pub fn tls(msg: impl Into<String>) -> Error {
        Error::new(Kind::Tls).with(std::io::Error::other(msg.into()))
    }

    #[must_use]
    pub fn decode(msg: impl Into<String>) -> Error {
        Error::new(Kind::Decode).with(std::io::Error::other(msg.into()))
    }

    #[must_use]
    pub fn pool(msg: impl Into<String>) -> Error {
        Error::new(Kind::Pool).with(std::io::Error::other(msg.into()))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::new(Kind::Connect).with(e)
    }
}
