//! Configuration types for building and rendering conversations.
//!
//! These are plain library structs without any CLI framework dependency.
//!
//! - [`CarrierNumbers`] - the phone's own number, as matched and as displayed
//! - [`BuildConfig`] - where media goes and which address is "us"
//! - [`RenderConfig`] - how documents are labelled and localized
//!
//! # Example
//!
//! ```rust
//! use smsthread::config::{BuildConfig, CarrierNumbers, RenderConfig};
//!
//! let numbers = CarrierNumbers::new("555-123-4567");
//! let build = BuildConfig::new("out").with_carrier_number(numbers.dummy());
//! let render = RenderConfig::new(numbers.real());
//!
//! assert_eq!(build.carrier_number, "15551234567");
//! assert_eq!(render.carrier_number, "15551234567");
//! ```

use std::path::PathBuf;

use chrono::Locale;
use serde::{Deserialize, Serialize};

use tracing::warn;

use crate::address::normalize_address;
use crate::error::{Result, SmsError};

/// The backed-up phone's own number.
///
/// Some backups record the owner's legs of group MMS under a placeholder
/// ("dummy") number rather than the real one. The dummy number is matched
/// against MMS recipients to drop the owner's own leg; the real number is only
/// shown in rendered documents. With a single number both roles coincide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierNumbers {
    dummy: String,
    real: String,
}

impl CarrierNumbers {
    /// Uses one number for both matching and display.
    pub fn new(number: &str) -> Self {
        let number = normalize_address(number);
        Self {
            dummy: number.clone(),
            real: number,
        }
    }

    /// Uses separate dummy and real numbers.
    pub fn with_dummy(dummy: &str, real: &str) -> Self {
        Self {
            dummy: normalize_address(dummy),
            real: normalize_address(real),
        }
    }

    /// Normalized number matched against MMS recipients.
    pub fn dummy(&self) -> &str {
        &self.dummy
    }

    /// Normalized number shown in documents.
    pub fn real(&self) -> &str {
        &self.real
    }
}

/// Configuration for the conversation builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory extracted MMS images are written to.
    pub media_dir: PathBuf,

    /// Normalized number whose MMS legs are not separate conversations.
    pub carrier_number: String,
}

impl BuildConfig {
    /// Creates a configuration writing media into `media_dir`.
    pub fn new(media_dir: impl Into<PathBuf>) -> Self {
        Self {
            media_dir: media_dir.into(),
            carrier_number: String::new(),
        }
    }

    /// Sets the carrier number. The value is normalized.
    #[must_use]
    pub fn with_carrier_number(mut self, number: &str) -> Self {
        self.carrier_number = normalize_address(number);
        self
    }
}

/// Configuration for the document renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig<'a> {
    /// Normalized number displayed for the phone's own side.
    pub carrier_number: &'a str,

    /// Locale for month names, weekday names and AM/PM markers.
    pub locale: Locale,
}

impl<'a> RenderConfig<'a> {
    /// Creates a configuration with the default `en_US` locale.
    pub fn new(carrier_number: &'a str) -> Self {
        Self {
            carrier_number,
            locale: Locale::en_US,
        }
    }

    /// Sets the locale.
    #[must_use]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }
}

/// Parses a POSIX locale name such as `en_US` or `de_DE`.
///
/// A trailing encoding or modifier (`en_US.UTF-8`, `de_DE@euro`) is ignored,
/// as are the `C` and `POSIX` names which map to `en_US`.
///
/// # Example
///
/// ```rust
/// use chrono::Locale;
/// use smsthread::config::parse_locale;
///
/// assert_eq!(parse_locale("fr_FR.UTF-8").unwrap(), Locale::fr_FR);
/// assert!(parse_locale("not a locale").is_err());
/// ```
pub fn parse_locale(name: &str) -> Result<Locale> {
    let base = name.split(['.', '@']).next().unwrap_or_default();
    match base {
        "" | "C" | "POSIX" => Ok(Locale::en_US),
        _ => Locale::try_from(base).map_err(|_| SmsError::invalid_locale(name)),
    }
}

/// Environment variables consulted for the date locale, highest priority first.
pub const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_TIME", "LANG"];

/// Picks the date locale from the process environment.
///
/// See [`locale_from_vars`].
pub fn locale_from_env() -> Locale {
    locale_from_vars(|key| std::env::var(key).ok())
}

/// Picks the date locale from environment-style variables.
///
/// The first non-empty of [`LOCALE_VARS`] wins, as with
/// `setlocale(LC_TIME, "")`. A name the date formatter does not know falls
/// back to `en_US` with a warning, as does an empty environment.
///
/// # Example
///
/// ```rust
/// use chrono::Locale;
/// use smsthread::config::locale_from_vars;
///
/// let env = |key: &str| (key == "LANG").then(|| "fr_FR.UTF-8".to_string());
/// assert_eq!(locale_from_vars(env), Locale::fr_FR);
/// assert_eq!(locale_from_vars(|_| None), Locale::en_US);
/// ```
pub fn locale_from_vars<F>(lookup: F) -> Locale
where
    F: Fn(&str) -> Option<String>,
{
    let Some(name) = LOCALE_VARS
        .into_iter()
        .find_map(|key| lookup(key).filter(|value| !value.is_empty()))
    else {
        return Locale::en_US;
    };

    parse_locale(&name).unwrap_or_else(|_| {
        warn!(locale = %name, "Unknown locale in environment; using en_US");
        Locale::en_US
    })
}
