//! Release identifiers and the compose channel they map to

use crate::error::{Error, Result};
use serde::Serialize;

/// Literal channel token used for in-development (branched) composes
pub const BRANCHED_TOKEN: &str = "branched";

/// Identifier of the rolling development release
pub const RAWHIDE: &str = "rawhide";

/// What to fetch: a release identifier plus the recognised mode flags
///
/// Immutable once constructed; [`ReleaseSpec::new`] validates the identifier so
/// that every value of this type can be turned into URLs without further checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReleaseSpec {
    identifier: String,
    minimal: bool,
    branched: bool,
}

impl ReleaseSpec {
    /// Validate `identifier` and build a spec
    ///
    /// Fails with [`Error::Config`] if the identifier is empty, is `.` or `..`,
    /// or contains anything other than ASCII letters, digits, `.`, `_` and `-`.
    pub fn new(identifier: impl Into<String>, minimal: bool, branched: bool) -> Result<Self> {
        let identifier = identifier.into();
        if identifier.is_empty() {
            return Err(Error::config(
                "release identifier must not be empty",
                "identifier",
            ));
        }
        if !is_valid_segment(&identifier) {
            return Err(Error::config(
                format!(
                    "release identifier '{}' is not a valid URL path segment",
                    identifier
                ),
                "identifier",
            ));
        }
        Ok(Self {
            identifier,
            minimal,
            branched,
        })
    }

    /// The identifier as given by the caller
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Restrict to the single minimal base image
    pub fn is_minimal(&self) -> bool {
        self.minimal
    }

    /// Use the branched channel token instead of the identifier
    pub fn is_branched(&self) -> bool {
        self.branched
    }

    /// Channel this spec resolves to
    pub fn channel(&self) -> Channel {
        if self.branched {
            return Channel::Branched;
        }
        if self.identifier.eq_ignore_ascii_case(RAWHIDE) {
            return Channel::Rawhide;
        }
        if self.identifier.chars().all(|c| c.is_ascii_digit()) {
            Channel::Numbered(self.identifier.clone())
        } else {
            Channel::Named(self.identifier.clone())
        }
    }
}

impl std::fmt::Display for ReleaseSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier)?;
        if self.branched {
            write!(f, " (branched)")?;
        }
        if self.minimal {
            write!(f, " [minimal]")?;
        }
        Ok(())
    }
}

/// Compose channel derived from a [`ReleaseSpec`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Channel {
    /// A numbered stable release such as `40`
    Numbered(String),
    /// The rolling development release
    Rawhide,
    /// The branched in-development release, addressed by channel token
    Branched,
    /// Any other branch label, used verbatim
    Named(String),
}

impl Channel {
    /// Directory segment under the compose root (`40`, `rawhide`, `branched`)
    pub fn segment(&self) -> &str {
        match self {
            Channel::Numbered(v) | Channel::Named(v) => v,
            Channel::Rawhide => RAWHIDE,
            Channel::Branched => BRANCHED_TOKEN,
        }
    }

    /// Label used inside compose and file names (`40`, `Rawhide`, `Branched`)
    pub fn label(&self) -> &str {
        match self {
            Channel::Numbered(v) | Channel::Named(v) => v,
            Channel::Rawhide => "Rawhide",
            Channel::Branched => "Branched",
        }
    }
}

/// Whether `value` can be used unescaped as a single URL path segment
pub(crate) fn is_valid_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
