//! Server configuration, deserialised from `config.toml` merged with
//! `PARLEY_`-prefixed environment variables.

use std::{
  ffi::OsString,
  path::{Path, PathBuf},
};

use parley_core::{
  actor::{Actor, Role},
  reply::ReplyPolicy,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub policy:     ReplyPolicy,
  #[serde(default)]
  pub accounts:   Vec<AccountConfig>,
}

impl ServerConfig {
  /// Read `path` if it exists, then let `PARLEY_`-prefixed environment
  /// variables override it.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::from_source(config::File::from(path).required(false))
  }

  fn from_source<S>(file: S) -> Result<Self, config::ConfigError>
  where
    S: config::Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(config::Environment::with_prefix("PARLEY"))
      .build()?
      .try_deserialize()
  }

  /// `store_path` with a leading `~` replaced by `$HOME`.
  pub fn resolved_store_path(&self) -> PathBuf {
    expand_home(&self.store_path, std::env::var_os("HOME"))
  }
}

fn expand_home(path: &Path, home: Option<OsString>) -> PathBuf {
  match (path.strip_prefix("~"), home) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}

/// One login. Identity is resolved from this table; there is no sign-up.
#[derive(Deserialize, Clone, Debug)]
pub struct AccountConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub user_id:       Uuid,
  #[serde(default)]
  pub role:          Role,
  /// Defaults to true for moderators and admins, false otherwise.
  pub can_downvote:  Option<bool>,
}

impl AccountConfig {
  pub fn actor(&self) -> Actor {
    let elevated = matches!(self.role, Role::Moderator | Role::Admin);
    Actor {
      user_id:      self.user_id,
      role:         self.role,
      can_downvote: self.can_downvote.unwrap_or(elevated),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn account(role: Role, can_downvote: Option<bool>) -> AccountConfig {
    AccountConfig {
      username: "u".into(),
      password_hash: String::new(),
      user_id: Uuid::nil(),
      role,
      can_downvote,
    }
  }

  #[test]
  fn downvote_standing_follows_role_unless_overridden() {
    assert!(!account(Role::Member, None).actor().can_downvote);
    assert!(account(Role::Moderator, None).actor().can_downvote);
    assert!(account(Role::Admin, None).actor().can_downvote);
    assert!(account(Role::Member, Some(true)).actor().can_downvote);
    assert!(!account(Role::Moderator, Some(false)).actor().can_downvote);
  }

  #[test]
  fn deserialises_from_toml_with_defaults() {
    let cfg = ServerConfig::from_source(config::File::from_str(
      r#"
        host = "127.0.0.1"
        port = 8080
        store_path = "~/parley.db"

        [policy]
        edit_window_secs = 60

        [[accounts]]
        username = "mod"
        password_hash = "x"
        user_id = "00000000-0000-0000-0000-000000000001"
        role = "moderator"
      "#,
      config::FileFormat::Toml,
    ))
    .unwrap();

    assert_eq!(cfg.policy.edit_window_secs, 60);
    assert_eq!(cfg.policy.max_content_len, ReplyPolicy::default().max_content_len);
    assert_eq!(cfg.accounts[0].role, Role::Moderator);
    assert!(cfg.accounts[0].actor().can_downvote);
  }

  #[test]
  fn only_a_leading_tilde_component_is_expanded() {
    let home = || Some(OsString::from("/home/ada"));
    assert_eq!(
      expand_home(Path::new("~/data/parley.db"), home()),
      PathBuf::from("/home/ada/data/parley.db")
    );
    assert_eq!(expand_home(Path::new("~"), home()), PathBuf::from("/home/ada"));
    assert_eq!(expand_home(Path::new("~ada/x.db"), home()), PathBuf::from("~ada/x.db"));
    assert_eq!(expand_home(Path::new("/srv/x.db"), home()), PathBuf::from("/srv/x.db"));
    assert_eq!(expand_home(Path::new("~/x.db"), None), PathBuf::from("~/x.db"));
  }
}
