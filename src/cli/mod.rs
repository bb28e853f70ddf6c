//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::records::Kind;
use crate::store::{DocumentStore, FileStore};
use crate::sync::CollectionSynchronizer;
use crate::vault::{Identity, UnlockProtocol, VaultSession};

/// Environment variable consulted before prompting for the passphrase.
pub const PASSPHRASE_ENV: &str = "PASSVAULT_PASSPHRASE";

/// Identity used when neither `--identity` nor the config names one.
pub const DEFAULT_IDENTITY: &str = "local";

/// PassVault CLI: client-side encrypted personal vault.
#[derive(Parser)]
#[command(
    name = "passvault",
    about = "Client-side encrypted vault for credentials, contacts and personal records",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Identity whose vault to open (default: from .passvault.toml, else "local")
    #[arg(long, global = true, env = "PASSVAULT_IDENTITY")]
    pub identity: Option<String>,

    /// Document store file (default: .passvault/store.json)
    #[arg(long, global = true)]
    pub store: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Show the identity and whether its vault is set up
    Status,

    /// Create the vault with a new master passphrase
    Setup,

    /// Add a record
    Add {
        #[command(subcommand)]
        record: AddRecord,
    },

    /// List records of one kind (credential, contact, person)
    List {
        /// Record kind
        kind: Kind,
    },

    /// Show one decrypted record
    Show {
        /// Record kind
        kind: Kind,
        /// Record id
        id: String,
    },

    /// Change attributes of a record (others keep their values)
    Edit {
        /// Record kind
        kind: Kind,
        /// Record id
        id: String,
        /// Attribute to overwrite, as NAME=VALUE (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        sets: Vec<String>,
        /// Replace a person's fields with KEY=VALUE entries (repeatable)
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },

    /// Remove a record
    Remove {
        /// Record kind
        kind: Kind,
        /// Record id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Print every snapshot of a collection until Ctrl-C
    Watch {
        /// Record kind
        kind: Kind,
    },
}

/// Record kinds accepted by `add`.
#[derive(clap::Subcommand)]
pub enum AddRecord {
    /// A site login (username and password are encrypted)
    Credential {
        /// Site name
        #[arg(long)]
        site: String,
        /// Site URL
        #[arg(long)]
        url: Option<String>,
        /// Category (default: personal)
        #[arg(long)]
        category: Option<String>,
        /// Login name (omit for interactive prompt)
        #[arg(long)]
        username: Option<String>,
    },

    /// A contact (phone, email and notes are encrypted)
    Contact {
        /// Contact name
        #[arg(long)]
        name: String,
        /// Category (default: otro)
        #[arg(long)]
        category: Option<String>,
        /// Phone number (omit for interactive prompt)
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// A personal record with free-form fields (fields are encrypted)
    Person {
        /// Full name
        #[arg(long)]
        name: String,
        #[arg(long)]
        nickname: Option<String>,
        /// Field as KEY=VALUE (repeatable)
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
}

impl clap::ValueEnum for Kind {
    fn value_variants<'a>() -> &'a [Self] {
        &Kind::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        let value = clap::builder::PossibleValue::new(self.as_str());
        Some(match self {
            Kind::Credential => value.aliases(["credentials", "password", "passwords"]),
            Kind::Contact => value.alias("contacts"),
            Kind::Person => value.aliases(["people", "personal"]),
        })
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Everything a command needs: settings, the opened store, and who we are.
pub struct Context {
    pub settings: Settings,
    pub store: Arc<dyn DocumentStore>,
    pub store_path: PathBuf,
    pub identity: Identity,
}

impl Context {
    /// Resolve the identity and open the document store.
    pub fn open(cli: &Cli, settings: Settings) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let store_path = match &cli.store {
            Some(path) => cwd.join(path),
            None => settings.store_path(&cwd),
        };

        let id = cli
            .identity
            .clone()
            .or_else(|| settings.identity.clone())
            .unwrap_or_else(|| DEFAULT_IDENTITY.to_string());
        validate_identity(&id)?;
        let display_name = settings.display_name.clone().unwrap_or_else(|| id.clone());

        let store = FileStore::open(&store_path)?;

        Ok(Self {
            settings,
            store: Arc::new(store),
            store_path,
            identity: Identity::new(id, display_name),
        })
    }

    /// A fresh, locked session for the resolved identity.
    pub fn session(&self) -> VaultSession {
        let protocol = UnlockProtocol::new(Arc::clone(&self.store))
            .with_min_passphrase_len(self.settings.min_passphrase_length);
        VaultSession::new(self.identity.clone(), protocol)
    }

    /// Open a session and unlock it with the master passphrase.
    pub async fn unlock(&self) -> Result<VaultSession> {
        let session = self.session();
        if !session.has_vault().await? {
            output::tip("Run `passvault setup` to create the vault.");
            return Err(VaultError::CommandFailed(format!(
                "no vault set up for identity '{}'",
                self.identity.id
            )));
        }

        let passphrase = prompt_passphrase()?;
        session.unlock(&passphrase).await?;
        Ok(session)
    }

    pub fn synchronizer(&self, kind: Kind) -> CollectionSynchronizer {
        CollectionSynchronizer::with_settings(Arc::clone(&self.store), kind.schema(), &self.settings)
    }
}

/// Get the master passphrase, trying in order:
/// 1. `PASSVAULT_PASSPHRASE` env var (scripts, CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_passphrase() -> Result<Zeroizing<String>> {
    if let Some(pw) = passphrase_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Master passphrase")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new passphrase with confirmation (used by `setup`).
///
/// Also respects `PASSVAULT_PASSPHRASE`.  The length policy itself is
/// enforced by the vault; the prompt only re-asks early.
pub fn prompt_new_passphrase(min_len: usize) -> Result<Zeroizing<String>> {
    if let Some(pw) = passphrase_from_env() {
        return Ok(pw);
    }

    loop {
        let passphrase = dialoguer::Password::new()
            .with_prompt("Choose master passphrase")
            .with_confirmation(
                "Confirm master passphrase",
                "Passphrases do not match, try again",
            )
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("passphrase prompt: {e}")))?;

        if passphrase.chars().count() < min_len {
            output::warning(&format!(
                "Passphrase must be at least {min_len} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(passphrase));
    }
}

fn passphrase_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSPHRASE_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Read a secret attribute value.
///
/// Piped stdin is used as-is (trailing newline trimmed); otherwise the
/// value is prompted for without echo.
pub fn prompt_secret(label: &str) -> Result<String> {
    if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf.trim_end_matches(['\r', '\n']).to_string());
    }

    dialoguer::Password::new()
        .with_prompt(label)
        .allow_empty_password(true)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))
}

/// Prompt for a plaintext attribute value.
pub fn prompt_text(label: &str) -> Result<String> {
    dialoguer::Input::new()
        .with_prompt(label)
        .interact_text()
        .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))
}

/// Split a `NAME=VALUE` argument.  The value may itself contain `=`.
pub fn parse_assignment(arg: &str) -> Result<(String, String)> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(VaultError::CommandFailed(format!(
            "expected NAME=VALUE, got '{arg}'"
        ))),
    }
}

/// Validate that an identity id is safe to embed in a document path.
///
/// Must be non-empty, at most 128 characters, and free of `/`.
pub fn validate_identity(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(VaultError::ConfigError("identity cannot be empty".into()));
    }

    if id.chars().count() > 128 {
        return Err(VaultError::ConfigError(
            "identity cannot exceed 128 characters".into(),
        ));
    }

    if id.contains('/') {
        return Err(VaultError::ConfigError(format!(
            "identity '{id}' is invalid: '/' is not allowed"
        )));
    }

    Ok(())
}
