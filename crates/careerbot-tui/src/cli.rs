use std::path::PathBuf;

use clap::Parser;

/// Terminal client for the CareerBot career-advice assistant.
#[derive(Debug, Parser)]
#[command(name = "careerbot", version, about)]
pub struct Cli {
    /// Base URL of the answer service (overrides config and CAREERBOT_BASE_URL)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Path to the JSON config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Sign in with a pre-issued bearer token instead of email and password
    #[arg(long, env = "CAREERBOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Display name used with --token
    #[arg(long, default_value = "Student")]
    pub name: String,

    /// Email shown in the profile when signing in with --token
    #[arg(long)]
    pub email: Option<String>,

    /// Where to write logs (the terminal is taken by the UI)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Show replies at once instead of typing them out
    #[arg(long)]
    pub no_reveal: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["careerbot"]).unwrap();
        assert!(cli.base_url.is_none());
        assert_eq!(cli.name, "Student");
        assert!(!cli.no_reveal);
    }

    #[test]
    fn test_token_sign_in_flags() {
        let cli = Cli::try_parse_from([
            "careerbot",
            "--base-url",
            "http://10.0.0.5:5000",
            "--token",
            "abc",
            "--name",
            "Ada",
            "--no-reveal",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://10.0.0.5:5000"));
        assert_eq!(cli.token.as_deref(), Some("abc"));
        assert_eq!(cli.name, "Ada");
        assert!(cli.no_reveal);
    }
}
