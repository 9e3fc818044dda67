//! cert-gate - forwarded client-certificate gate
//!
//! Serves HTTP and admits only requests whose proxy-forwarded client
//! certificate matches the configured pin.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use cert_gate::{
    cli::{AlgorithmArg, Cli, Command},
    config::Config,
    gateway::Gateway,
    mtls::{CertGenerator, ClientCertParams, inspect, load_certificate},
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let mut cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command.take() {
        Some(Command::Inspect {
            file,
            algorithm,
            format,
        }) => run_inspect(&file, algorithm, &format),
        Some(Command::Generate { cn, org, days, out }) => {
            run_generate(&cn, org.as_deref(), days, &out)
        }
        Some(Command::Serve) | None => run_server(cli).await,
    }
}

/// Print the values needed to pin a certificate
fn run_inspect(file: &Path, algorithm: AlgorithmArg, format: &str) -> ExitCode {
    let report = match load_certificate(file).and_then(|der| inspect(&der, algorithm.into())) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    if format == "json" {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("❌ Failed to serialize to JSON: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    let cert = &report.certificate;
    println!("Subject:    {}", cert.subject_dn());
    println!("Issuer:     {}", cert.issuer_dn());
    println!("Not before: {}", cert.not_before());
    println!("Not after:  {}", cert.not_after());
    println!("Thumbprint: {} ({})", cert.thumbprint(), report.thumbprint_algorithm);
    println!("\nHeader value:\n{}", report.header_value);
    ExitCode::SUCCESS
}

/// Generate a self-signed client certificate and print its pin
fn run_generate(cn: &str, org: Option<&str>, days: u32, out: &Path) -> ExitCode {
    let params = ClientCertParams {
        cn,
        organization: org,
        validity_days: days,
    };

    let generated = match CertGenerator::self_signed_client(&params) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = CertGenerator::write_to_dir(&generated, out, cn) {
        eprintln!("❌ {e}");
        return ExitCode::FAILURE;
    }

    let report = match inspect(&generated.cert_der, AlgorithmArg::Sha1.into()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("✅ Wrote {cn}.crt and {cn}.key to {}", out.display());
    println!("\nclient_cert:");
    println!("  subject: \"CN={cn}\"");
    println!("  issuer_cn: \"CN={cn}\"");
    println!("  thumbprint: \"{}\"", report.certificate.thumbprint());
    ExitCode::SUCCESS
}

/// Run the gate server
async fn run_server(cli: Cli) -> ExitCode {
    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host.clone_from(host);
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "Starting cert-gate"
    );

    let gateway = match Gateway::new(config) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = gateway.run().await {
        error!("Gateway error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Gateway shutdown complete");
    ExitCode::SUCCESS
}
