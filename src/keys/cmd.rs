use std::{process::Stdio, str::FromStr};

use tokio::{io::AsyncWriteExt, process::Command};

use crate::awg::Key;

use super::{KeyError, KeyPair, KeyService};

const DEFAULT_AWG_TOOL: &str = "awg";

/// Runs `awg genkey`, `awg pubkey` and `awg genpsk`.
#[derive(Debug, Clone)]
pub struct AwgCmdBackend {
    tool: String,
}

impl Default for AwgCmdBackend {
    fn default() -> Self {
        Self::new(std::env::var("AWG_TOOL").unwrap_or_else(|_| DEFAULT_AWG_TOOL.into()))
    }
}

impl AwgCmdBackend {
    pub fn new(tool: String) -> Self {
        Self { tool }
    }

    async fn run(&self, subcommand: &str, input: Option<&str>) -> Result<Key, KeyError> {
        let mut child = Command::new(&self.tool)
            .arg(subcommand)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin.write_all(input.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
        }

        let out = child.wait_with_output().await?;
        if !out.status.success() {
            log::debug!(
                "{} {subcommand}: {}",
                self.tool,
                String::from_utf8_lossy(&out.stderr).trim()
            );
            return Err(KeyError::CommandFail(self.tool.clone(), out.status.code()));
        }

        let key_str = String::from_utf8_lossy(&out.stdout);

        Ok(Key::from_str(key_str.trim())?)
    }
}

impl KeyService for AwgCmdBackend {
    type Error = KeyError;

    async fn generate_keypair(&self) -> Result<KeyPair, Self::Error> {
        let private = self.run("genkey", None).await?;
        let public = self.run("pubkey", Some(&private.to_string())).await?;

        Ok(KeyPair { private, public })
    }

    async fn derive_public(&self, private: &str) -> Result<KeyPair, Self::Error> {
        let private = Key::from_str(private.trim())?;
        let public = self.run("pubkey", Some(&private.to_string())).await?;

        Ok(KeyPair { private, public })
    }

    async fn generate_psk(&self) -> Result<Key, Self::Error> {
        self.run("genpsk", None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_tool_is_io_error() {
        let backend = AwgCmdBackend::new("/nonexistent/awg-tool".to_string());

        assert!(matches!(
            backend.generate_psk().await,
            Err(KeyError::IoError(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_private_key_not_sent() {
        let backend = AwgCmdBackend::new("/nonexistent/awg-tool".to_string());

        assert!(matches!(
            backend.derive_public("not a key").await,
            Err(KeyError::DecodeError(_))
        ));
    }
}
