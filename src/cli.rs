//! Command-line interface definition using clap.
//!
//! Two ways of naming the phone's own number are accepted:
//!
//! - `-n/--number` when the backup uses the real number throughout
//! - `-d/--dummy_number` with `-r/--real_number` when the backup files the
//!   owner's MMS legs under a placeholder number

use std::path::PathBuf;

use chrono::Locale;
use clap::Parser;

use crate::config::{CarrierNumbers, locale_from_env, parse_locale};
use crate::error::Result;

/// Turn SMS Backup & Restore XML into HTML conversations with images.
#[derive(Parser, Debug, Clone)]
#[command(name = "smsthread")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    smsthread sms-20240401.xml -o html -n 555-123-4567
    smsthread old.xml new.xml -o html -n +15551234567
    smsthread sms.xml -o html -d 0000000000 -r 555-123-4567
    smsthread sms.xml -o html -n 5551234567 --locale de_DE")]
pub struct Args {
    /// Input XML file(s), processed in order
    #[arg(required = true, value_name = "INPUT")]
    pub input: Vec<PathBuf>,

    /// Output directory (created if missing)
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// The phone's own number
    #[arg(
        short = 'n',
        long,
        value_name = "NUMBER",
        conflicts_with_all = ["dummy_number", "real_number"],
        required_unless_present_any = ["dummy_number", "real_number"]
    )]
    pub number: Option<String>,

    /// Placeholder number the backup uses for this phone in MMS recipients
    #[arg(short = 'd', long = "dummy_number", alias = "dummy-number", value_name = "NUMBER")]
    pub dummy_number: Option<String>,

    /// This phone's real number, shown in the documents
    #[arg(short = 'r', long = "real_number", alias = "real-number", value_name = "NUMBER")]
    pub real_number: Option<String>,

    /// Locale for month names and AM/PM markers
    /// [default: from LC_ALL, LC_TIME or LANG, else en_US]
    #[arg(long, value_name = "LOCALE")]
    pub locale: Option<String>,

    /// Log per-record details
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Resolves the number options.
    ///
    /// When only one of the dummy/real pair is given it serves both roles.
    pub fn carrier_numbers(&self) -> CarrierNumbers {
        match (&self.number, &self.dummy_number, &self.real_number) {
            (Some(number), _, _) => CarrierNumbers::new(number),
            (None, Some(dummy), Some(real)) => CarrierNumbers::with_dummy(dummy, real),
            (None, Some(only), None) | (None, None, Some(only)) => CarrierNumbers::new(only),
            (None, None, None) => CarrierNumbers::new(""),
        }
    }

    /// Resolves the date locale.
    ///
    /// An explicit `--locale` must be known; otherwise the environment decides.
    pub fn resolve_locale(&self) -> Result<Locale> {
        match &self.locale {
            Some(name) => parse_locale(name),
            None => Ok(locale_from_env()),
        }
    }
}
