use std::io::{self, Write};

use console::{Term, style};
use steward::gitlab::GitLabClient;

use crate::config::Config;

/// Build a GitLab client from the resolved configuration.
pub(crate) fn gitlab_client(config: &Config) -> Result<GitLabClient, Box<dyn std::error::Error>> {
    let token = config
        .gitlab_token()
        .ok_or("STEWARD_GITLAB__TOKEN must be set in environment, .env file, or config file")?;

    let client = GitLabClient::new(&config.gitlab.api_url, &token)?;
    Ok(match config.gitlab.per_page {
        Some(per_page) => client.with_per_page(per_page),
        None => client,
    })
}

/// Ask before a fleet-wide mutation.
///
/// Returns `true` without prompting when `skip` is set or stdout is not a
/// terminal.
pub(crate) fn confirm(action: &str, skip: bool) -> io::Result<bool> {
    if skip || !Term::stdout().is_term() {
        return Ok(true);
    }

    println!("{} About to {}", style("⚠").yellow().bold(), action);
    print!("Continue? [y/N] ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    if !input.trim().eq_ignore_ascii_case("y") {
        println!("Aborted.");
        return Ok(false);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_is_skipped_with_yes() {
        assert!(confirm("do anything", true).unwrap());
    }

    #[test]
    fn gitlab_client_requires_token() {
        let config = Config::default();
        let err = gitlab_client(&config).unwrap_err();
        assert!(err.to_string().contains("STEWARD_GITLAB__TOKEN"));
    }

    #[test]
    fn gitlab_client_uses_configured_api_url() {
        let mut config = Config::default();
        config.gitlab.token = Some("glpat-test".to_string());
        config.gitlab.api_url = "https://gitlab.example.com/api/v4".to_string();

        let client = gitlab_client(&config).unwrap();
        assert_eq!(client.api_url(), "https://gitlab.example.com/api/v4");
    }
}
