//! Process configuration.
//! All environment access happens here at startup; the cores receive an
//! explicitly constructed dependency bundle and never read ambient globals.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    /// Root folder for identity documents and stored objects.
    pub data_root: PathBuf,
    /// HMAC secret for minted access tokens.
    pub token_secret: String,
    /// Base URL clients use to reach this server; upload URLs are built on it.
    pub public_base_url: String,
    pub federated_issuer: String,
    pub federated_audience: String,
    /// Folder of PEM public keys for the federated issuer (rotated set).
    pub federated_keys_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let http_port = std::env::var("INKPRESS_HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("INKPRESS_HTTP_PORT must be a port number")?;
        let data_root = PathBuf::from(std::env::var("INKPRESS_DATA_ROOT").unwrap_or_else(|_| "data".to_string()));
        let Ok(token_secret) = std::env::var("SECRET_ACCESS_KEY") else {
            bail!("SECRET_ACCESS_KEY must be set");
        };
        if token_secret.is_empty() {
            bail!("SECRET_ACCESS_KEY must not be empty");
        }
        let public_base_url = std::env::var("INKPRESS_PUBLIC_BASE")
            .unwrap_or_else(|_| format!("http://localhost:{}", http_port));
        let federated_issuer = std::env::var("INKPRESS_FEDERATED_ISSUER")
            .unwrap_or_else(|_| "https://accounts.google.com".to_string());
        let federated_audience = std::env::var("INKPRESS_FEDERATED_AUDIENCE").unwrap_or_default();
        let federated_keys_dir = std::env::var("INKPRESS_FEDERATED_KEYS_DIR").ok().map(PathBuf::from);
        Ok(Self {
            http_port,
            data_root,
            token_secret,
            public_base_url,
            federated_issuer,
            federated_audience,
            federated_keys_dir,
        })
    }

    /// Load the federated issuer's PEM key set from the configured folder.
    /// Missing configuration yields an empty set: federated signin then
    /// rejects every token, but password flows are unaffected.
    pub fn load_federated_keys(&self) -> Result<Vec<String>> {
        let Some(dir) = &self.federated_keys_dir else { return Ok(Vec::new()); };
        read_pem_dir(dir)
    }
}

fn read_pem_dir(dir: &Path) -> Result<Vec<String>> {
    let mut pems = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read federated keys dir {}", dir.display()))?;
    for entry in entries {
        let p = entry?.path();
        if p.extension().and_then(|e| e.to_str()) == Some("pem") {
            pems.push(std::fs::read_to_string(&p)
                .with_context(|| format!("cannot read key {}", p.display()))?);
        }
    }
    pems.sort();
    Ok(pems)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pem_dir_loading() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("k1.pem"), "KEY-ONE").unwrap();
        std::fs::write(tmp.path().join("k2.pem"), "KEY-TWO").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();
        let pems = read_pem_dir(tmp.path()).unwrap();
        assert_eq!(pems, vec!["KEY-ONE".to_string(), "KEY-TWO".to_string()]);
    }

    #[test]
    fn missing_keys_dir_is_empty_set() {
        let cfg = Config {
            http_port: 3000,
            data_root: PathBuf::from("data"),
            token_secret: "s".into(),
            public_base_url: "http://localhost:3000".into(),
            federated_issuer: "https://accounts.google.com".into(),
            federated_audience: String::new(),
            federated_keys_dir: None,
        };
        assert!(cfg.load_federated_keys().unwrap().is_empty());
    }
}
