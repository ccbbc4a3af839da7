//! Platform-agnostic representation of errors raised by a transport
//! implementation.

use std::borrow::Cow;

use derive_more::Display;

/// Error returned from a transport implementation.
#[derive(Clone, Debug, Display, PartialEq)]
#[display(fmt = "{}: {}", name, message)]
pub struct Error {
    /// Name of the error, following the [DOMException] naming where
    /// applicable.
    ///
    /// [DOMException]: https://webidl.spec.whatwg.org/#idl-DOMException
    pub name: Cow<'static, str>,

    /// Human-readable description of the error.
    pub message: Cow<'static, str>,
}

impl Error {
    /// Creates a new [`Error`] with the provided `name` and `message`.
    #[inline]
    #[must_use]
    pub fn new<N, M>(name: N, message: M) -> Self
    where
        N: Into<Cow<'static, str>>,
        M: Into<Cow<'static, str>>,
    {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[cfg(feature = "webrtc")]
impl From<webrtc::Error> for Error {
    #[inline]
    fn from(err: webrtc::Error) -> Self {
        Self::new("WebRtcError", err.to_string())
    }
}
