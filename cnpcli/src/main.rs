//! cnpauth - construit, inspecte et envoie des autorisations cnpOnline
//!
//! Usage:
//!   cnpauth [--config <dir>] payload <request.yaml> [--pretty]
//!   cnpauth [--config <dir>] curl <request.yaml>
//!   cnpauth [--config <dir>] send <request.yaml> [--json]
//!   cnpauth [--config <dir>] profile
//!   cnpauth encrypt <password>
//!
//! Les logs vont sur stderr; `RUST_LOG` surcharge `logging.min_level`.

mod request_file;

use std::{env, path::Path, process};

use anyhow::{Result, anyhow};
use cnpconfig::{Config, encryption::encrypt_password};
use cnpgateway::{AuthorizationRequest, CnpClient, GatewayConfigExt};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::request_file::RequestFile;

/// Arguments de la ligne de commande, une fois `--config` extrait
#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    config_dir: String,
    command: String,
    operands: Vec<String>,
    flags: Vec<String>,
}

impl CliArgs {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut config_dir = String::new();
        let mut positional = Vec::new();
        let mut flags = Vec::new();

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            if arg == "--config" || arg == "-c" {
                config_dir = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config needs a directory"))?;
            } else if arg.starts_with("--") {
                flags.push(arg);
            } else {
                positional.push(arg);
            }
        }

        if positional.is_empty() {
            return Err(anyhow!("Missing command"));
        }
        let command = positional.remove(0);

        Ok(Self {
            config_dir,
            command,
            operands: positional,
            flags,
        })
    }

    /// Rejette les options que la commande ne connaît pas
    fn check_flags(&self) -> Result<()> {
        let known: &[&str] = match self.command.as_str() {
            "payload" => &["--pretty"],
            "send" => &["--json"],
            _ => &[],
        };
        match self.flags.iter().find(|flag| !known.contains(&flag.as_str())) {
            Some(flag) => Err(anyhow!("Unknown option '{}' for '{}'", flag, self.command)),
            None => Ok(()),
        }
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    fn operand(&self, what: &str) -> Result<&str> {
        self.operands
            .first()
            .map(String::as_str)
            .ok_or_else(|| anyhow!("Missing {} for '{}'", what, self.command))
    }
}

/// Origine de la configuration, pour le premier message de log
fn config_source(config: &Config) -> String {
    match config.config_dir() {
        Some(dir) => dir.display().to_string(),
        None => "embedded defaults".to_string(),
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.get_log_min_level()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let args = match CliArgs::parse(env::args().skip(1)).and_then(|args| {
        args.check_flags()?;
        Ok(args)
    }) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            process::exit(1);
        }
    };

    match run(&args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Exécute la commande; retourne le code de sortie
fn run(args: &CliArgs) -> Result<i32> {
    if args.command == "encrypt" {
        let encrypted = encrypt_password(args.operand("password")?)?;
        println!("{}", encrypted);
        eprintln!("\nAdd this to your config.yaml:");
        eprintln!("gateway:\n  merchant:\n    password: \"{}\"", encrypted);
        return Ok(0);
    }

    let config = Config::load_config(&args.config_dir)?;
    init_logging(&config);
    info!(source = %config_source(&config), "Configuration loaded");
    debug!(command = %args.command, "cnpauth starting");

    match args.command.as_str() {
        "payload" => {
            let client = CnpClient::from_config(&config)?;
            let request = load_request(args, &config)?;
            let prepared = client.prepare(&request)?;
            let xml = if args.has_flag("--pretty") {
                prepared.document().to_pretty_string()?
            } else {
                prepared.to_xml_string()?
            };
            println!("{}", xml);
            Ok(0)
        }
        "curl" => {
            let client = CnpClient::from_config(&config)?;
            let request = load_request(args, &config)?;
            println!("{}", client.prepare(&request)?.to_curl()?);
            Ok(0)
        }
        "send" => {
            let client = CnpClient::from_config(&config)?;
            let request = load_request(args, &config)?;
            let response = client.authorize(&request)?;

            if args.has_flag("--json") {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("Successful : {}", response.is_successful());
                println!("Code       : {}", response.response_code());
                println!("Message    : {}", response.message());
                if let Some(reference) = response.transaction_reference() {
                    println!("Reference  : {}", reference);
                }
                if let Some(auth_code) = response.auth_code() {
                    println!("Auth code  : {}", auth_code);
                }
                if let Some(token) = response.token() {
                    println!("Token      : {}", token);
                }
            }
            Ok(if response.is_successful() { 0 } else { 2 })
        }
        "profile" => {
            let profile = config.get_gateway_profile()?;
            let mode = config.get_gateway_mode();
            println!("Profile    : {} ({})", profile.name, profile.version);
            println!("Root       : {} xmlns={}", profile.root_element, profile.namespace);
            println!("Mode       : {}", mode.environment());
            println!("Endpoint   : {}", profile.endpoint_for(&mode));
            Ok(0)
        }
        other => {
            eprintln!("Error: Unknown command '{}'", other);
            print_usage();
            Ok(1)
        }
    }
}

fn load_request(args: &CliArgs, config: &Config) -> Result<AuthorizationRequest> {
    let path = args.operand("request file")?;
    RequestFile::load(Path::new(path))?.into_request(config)
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cnpauth [--config <dir>] payload <request.yaml> [--pretty]");
    eprintln!("  cnpauth [--config <dir>] curl <request.yaml>");
    eprintln!("  cnpauth [--config <dir>] send <request.yaml> [--json]");
    eprintln!("  cnpauth [--config <dir>] profile");
    eprintln!("  cnpauth encrypt <password>");
    eprintln!("\nThe configuration directory defaults to $CNPGATEWAY_CONFIG, ./.cnpgateway or ~/.cnpgateway");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<CliArgs> {
        CliArgs::parse(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_command_and_config() {
        let parsed = args(&["--config", "/tmp/cnp", "send", "req.yaml", "--json"]).unwrap();
        assert_eq!(
            parsed,
            CliArgs {
                config_dir: "/tmp/cnp".to_string(),
                command: "send".to_string(),
                operands: vec!["req.yaml".to_string()],
                flags: vec!["--json".to_string()],
            }
        );
        assert!(parsed.has_flag("--json"));
        assert_eq!(parsed.operand("request file").unwrap(), "req.yaml");
    }

    #[test]
    fn test_config_anywhere() {
        let parsed = args(&["payload", "req.yaml", "-c", "conf"]).unwrap();
        assert_eq!(parsed.config_dir, "conf");
        assert_eq!(parsed.command, "payload");
    }

    #[test]
    fn test_unknown_flags_rejected() {
        assert!(args(&["send", "req.yaml", "--json"]).unwrap().check_flags().is_ok());
        assert!(args(&["payload", "req.yaml", "--pretty"]).unwrap().check_flags().is_ok());

        let err = args(&["send", "req.yaml", "--jsn"]).unwrap().check_flags().unwrap_err();
        assert_eq!(err.to_string(), "Unknown option '--jsn' for 'send'");
        assert!(args(&["curl", "req.yaml", "--json"]).unwrap().check_flags().is_err());
    }

    #[test]
    fn test_config_source() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config_source(&config), "embedded defaults");
    }

    #[test]
    fn test_parse_errors() {
        assert!(args(&[]).is_err());
        assert!(args(&["--config"]).is_err());
        let parsed = args(&["curl"]).unwrap();
        assert!(parsed.operand("request file").is_err());
    }
}
