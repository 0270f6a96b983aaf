// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine errors and the sink for non-fatal failures.

use std::error::Error;

use understory_css::ParseError;

type BoxedError = Box<dyn Error + Send + Sync>;

/// Errors produced while parsing, applying or converting styles.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    /// Stylesheet, declaration, selector or value text could not be parsed.
    #[error(transparent)]
    Malformed(#[from] ParseError),
    /// A handler does not support this property on this element.
    #[error("unsupported property `{property}`")]
    UnsupportedProperty {
        /// Property name.
        property: String,
    },
    /// A property handler failed.
    #[error("handler for `{property}` failed")]
    Handler {
        /// Property name.
        property: String,
        /// Underlying failure.
        #[source]
        source: BoxedError,
    },
    /// A value converter failed.
    #[error("conversion to `{target}` failed")]
    Conversion {
        /// Name of the target type.
        target: &'static str,
        /// Underlying failure.
        #[source]
        source: BoxedError,
    },
    /// Reading style text from a stream failed.
    #[error("failed to read style source")]
    Io(#[from] std::io::Error),
}

impl StyleError {
    /// Shorthand for [`StyleError::UnsupportedProperty`].
    pub fn unsupported(property: impl Into<String>) -> Self {
        Self::UnsupportedProperty {
            property: property.into(),
        }
    }

    /// Shorthand for [`StyleError::Handler`].
    pub fn handler(property: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Handler {
            property: property.into(),
            source: source.into(),
        }
    }

    /// Shorthand for [`StyleError::Conversion`] targeting `T`.
    pub fn conversion<T: ?Sized + 'static>(source: impl Into<BoxedError>) -> Self {
        Self::Conversion {
            target: core::any::type_name::<T>(),
            source: source.into(),
        }
    }

    /// Returns `true` for [`StyleError::UnsupportedProperty`].
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedProperty { .. })
    }
}

/// Receives failures that do not abort a styling pass.
pub trait ErrorHandler {
    /// Called once per reported failure.
    fn error(&self, error: &StyleError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&StyleError),
{
    fn error(&self, error: &StyleError) {
        self(error);
    }
}

/// [`ErrorHandler`] that forwards failures to the `log` facade.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn error(&self, error: &StyleError) {
        match Error::source(error) {
            Some(source) => log::warn!("css: {error}: {source}"),
            None => log::warn!("css: {error}"),
        }
    }
}
