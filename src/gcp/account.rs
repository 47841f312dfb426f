//! Service account key files

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// The fields of a service account JSON key that we use.
///
/// Unknown keys are ignored; missing or `null` keys read as empty strings.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccountFile {
    #[serde(deserialize_with = "null_as_empty")]
    pub private_key_id: String,
    /// PEM-encoded private key
    #[serde(deserialize_with = "null_as_empty")]
    pub private_key: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub client_email: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub client_id: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl fmt::Debug for AccountFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountFile")
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"[redacted]")
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl AccountFile {
    /// Read and decode a key file
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path).with_context(|| format!("Error loading account file '{}'", path.display()))
    }
}

/// Decode the first JSON value in the file; anything after it is ignored
fn load_json(path: &Path) -> Result<AccountFile> {
    let file = File::open(path)?;
    let mut de = serde_json::Deserializer::from_reader(BufReader::new(file));
    let account = AccountFile::deserialize(&mut de)?;
    Ok(account)
}
