use std::collections::HashMap;

use crate::config::{AppConfig, CliConfig, PromptInput};

/// CLI Registry for building assistant invocations from the configured CLIs
pub struct CliRegistry {
    clis: HashMap<String, CliConfig>,
    default_cli: String,
    working_dir: Option<String>,
}

impl CliRegistry {
    /// Create a new CLI registry with the given config
    pub fn new(config: &AppConfig) -> Self {
        Self {
            clis: config.clis.clone(),
            default_cli: config.default_cli.clone(),
            working_dir: config.working_dir.clone(),
        }
    }

    pub fn default_cli(&self) -> &str {
        &self.default_cli
    }

    /// Build command, arguments, and environment variables for the named CLI
    pub fn build_command(&self, cli_name: &str, verbose: bool) -> Result<BuiltCommand, RegistryError> {
        let cli = self
            .clis
            .get(cli_name)
            .ok_or_else(|| RegistryError::UnknownCli(cli_name.to_string()))?;

        let mut args = cli.base_args.clone();
        let mut env = HashMap::new();

        if verbose {
            if let Some(ref flag) = cli.verbose_flag {
                args.push(flag.clone());
            }
        }

        // Add model flag
        if let (Some(model_flag), Some(model)) = (&cli.model_flag, &cli.default_model) {
            args.push(model_flag.clone());
            args.push(model.clone());
        }

        // Add environment variables from CLI config
        if let Some(ref cli_env) = cli.env {
            env.extend(cli_env.clone());
        }

        Ok(BuiltCommand {
            command: cli.command.clone(),
            args,
            env,
            stdin: None,
            cwd: self.working_dir.clone(),
        })
    }

    /// Build command with the prompt delivered the way the CLI expects it
    pub fn build_command_with_prompt(
        &self,
        cli_name: &str,
        prompt: &str,
        verbose: bool,
    ) -> Result<BuiltCommand, RegistryError> {
        let mut built = self.build_command(cli_name, verbose)?;
        let cli = self
            .clis
            .get(cli_name)
            .ok_or_else(|| RegistryError::UnknownCli(cli_name.to_string()))?;

        match cli.prompt_via {
            PromptInput::Argument => {
                if let Some(ref flag) = cli.prompt_flag {
                    built.args.push(flag.clone());
                }
                built.args.push(prompt.to_string());
            }
            PromptInput::Stdin => {
                if let Some(ref flag) = cli.prompt_flag {
                    built.args.push(flag.clone());
                }
                built.stdin = Some(prompt.to_string());
            }
        }

        Ok(built)
    }

    /// Prompt-bearing command for the default CLI
    pub fn build_default(&self, prompt: &str, verbose: bool) -> Result<BuiltCommand, RegistryError> {
        self.build_command_with_prompt(&self.default_cli, prompt, verbose)
    }
}

/// A built command ready for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Written to the child's stdin, which is then closed
    pub stdin: Option<String>,
    pub cwd: Option<String>,
}

impl BuiltCommand {
    /// The prompt this command carries, whichever way it is delivered
    pub fn prompt(&self) -> Option<&str> {
        self.stdin.as_deref().or_else(|| self.args.last().map(|s| s.as_str()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown CLI: {0}")]
    UnknownCli(String),
}
