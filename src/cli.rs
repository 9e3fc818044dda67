//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::mtls::ThumbprintAlgorithm;

/// Gate HTTP requests on a client certificate forwarded by a reverse proxy
#[derive(Parser, Debug)]
#[command(name = "cert-gate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "CERT_GATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "CERT_GATE_PORT", global = true)]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "CERT_GATE_HOST", global = true)]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "CERT_GATE_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "CERT_GATE_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the gate server (default)
    Serve,

    /// Print the subject, issuer, validity and thumbprint of a certificate file
    Inspect {
        /// PEM or DER certificate file
        #[arg(required = true)]
        file: PathBuf,

        /// Thumbprint digest
        #[arg(short, long, value_enum, default_value_t = AlgorithmArg::Sha1)]
        algorithm: AlgorithmArg,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Generate a self-signed client certificate to pin
    Generate {
        /// Common Name of the certificate subject
        #[arg(long, required = true)]
        cn: String,

        /// Organisation of the certificate subject
        #[arg(long)]
        org: Option<String>,

        /// Validity period in days
        #[arg(long, default_value_t = 365)]
        days: u32,

        /// Output directory for `<cn>.crt` and `<cn>.key`
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

/// Thumbprint digest selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlgorithmArg {
    /// SHA-1
    Sha1,
    /// SHA-256
    Sha256,
}

impl From<AlgorithmArg> for ThumbprintAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Sha1 => Self::Sha1,
            AlgorithmArg::Sha256 => Self::Sha256,
        }
    }
}
