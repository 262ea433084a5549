use std::num::NonZeroU32;

use aspnet_hash::{HashParameters, HashScheme};
use clap::Parser;
use clap::builder::NonEmptyStringValueParser;

use crate::error::Error;
use crate::operation::Operation;
use crate::pipeline::PipelineConfig;

/// Username delimiter used when `--username` is given without `--delimiter`.
pub const DEFAULT_DELIMITER: &str = ",";

/// Largest accepted `--subkey-length`, in bytes.
pub const MAX_SUBKEY_LENGTH: i64 = 4096;

/// Largest accepted `--salt-size`, in bytes.
pub const MAX_SALT_SIZE: i64 = 4096;

const ADVANCED: &str = "Advanced options";

#[derive(Parser, Debug)]
#[command(name = "aspnet-hash-tool", version)]
#[command(about = "Convert or generate ASP.NET MVC4/WebForms password hashes")]
#[command(long_about = "Convert mode (default) reads MVC4 hashes from stdin and writes hashcat \
mode 12000 compatible hashes to stdout.\nGenerate mode (-g) reads plaintext from stdin and writes \
hashes to stdout.")]
#[command(after_help = "WARNING: changing the advanced options results in hashes that are \
incompatible with ASP.NET.")]
pub struct Args {
    /// Generate hashes from plaintext input instead of converting
    #[arg(short, long)]
    pub generate: bool,

    /// Hash type to generate: mvc4 (SimpleMembershipProvider) or webforms
    /// (DefaultMembershipProvider). Defaults to mvc4
    #[arg(short = 'M', long = "mode", value_name = "SCHEME")]
    pub scheme: Option<HashScheme>,

    /// Input lines are prefixed with a username
    #[arg(short, long)]
    pub username: bool,

    /// Delimiter between username and hash when --username is used [default: ","]
    #[arg(short, long, value_parser = NonEmptyStringValueParser::new())]
    pub delimiter: Option<String>,

    /// Lines per second to process, 0 = no limit
    #[arg(short, long, default_value_t = 0)]
    pub rate_limit: u32,

    /// Maximum number of concurrent workers, 0 = no limit
    #[arg(short, long, default_value_t = 0)]
    pub max_workers: usize,

    /// Suppress logging
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable progress spinner
    #[arg(long)]
    pub no_progress: bool,

    /// Number of PBKDF2 iterations
    #[arg(short, long = "iter", default_value = "1000", help_heading = ADVANCED)]
    pub iterations: NonZeroU32,

    /// PBKDF2 subkey length in bytes (1-4096)
    #[arg(
        short = 'l',
        long,
        default_value_t = 32,
        value_parser = clap::value_parser!(u32).range(1..=MAX_SUBKEY_LENGTH),
        help_heading = ADVANCED
    )]
    pub subkey_length: u32,

    /// Salt size in bytes, 1-4096 (WebForms only, MVC4 always uses 16)
    #[arg(
        short,
        long,
        default_value_t = 16,
        value_parser = clap::value_parser!(u32).range(1..=MAX_SALT_SIZE),
        help_heading = ADVANCED
    )]
    pub salt_size: u32,
}

/// Validated settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub operation: Operation,
    pub pipeline: PipelineConfig,
    pub quiet: bool,
    pub progress: bool,
}

impl Args {
    /// Rejects flag combinations that make no sense together.
    pub fn into_config(self) -> Result<RunConfig, Error> {
        if self.generate && self.username {
            return Err(Error::GenerateWithUsername);
        }
        if !self.generate && self.scheme.is_some() {
            return Err(Error::SchemeInConvertMode);
        }
        let custom_delimiter = self.delimiter.as_deref().is_some_and(|d| d != DEFAULT_DELIMITER);
        if custom_delimiter && !self.username {
            return Err(Error::DelimiterWithoutUsername);
        }

        let operation = if self.generate {
            Operation::Generate {
                scheme: self.scheme.unwrap_or_default(),
                params: HashParameters {
                    iterations: self.iterations.get(),
                    subkey_length: self.subkey_length as usize,
                    salt_size: self.salt_size as usize,
                },
            }
        } else {
            Operation::Convert {
                delimiter: self
                    .username
                    .then(|| self.delimiter.unwrap_or_else(|| DEFAULT_DELIMITER.to_string())),
                iterations: self.iterations.get(),
            }
        };

        Ok(RunConfig {
            operation,
            pipeline: PipelineConfig { rate_limit: self.rate_limit, max_workers: self.max_workers },
            quiet: self.quiet,
            progress: !self.quiet && !self.no_progress,
        })
    }
}
