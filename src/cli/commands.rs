//! CLI command definitions

use clap::Args;

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Variable overrides (key=value)
    #[arg(long = "set", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,

    /// Fail `stop` on the first job that refuses it
    #[arg(long)]
    pub strict_stop: bool,
}

/// Validate a pipeline file
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,
}

/// Print the compiled state tree
#[derive(Debug, Args, Clone)]
pub struct StateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
