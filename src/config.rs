use crate::lists::Stage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub socket_path: String,
    /// Directory the list files below are resolved against.
    pub list_dir: String,
    #[serde(default)]
    pub check: CheckConfig,
    #[serde(default)]
    pub deny_msg: DenyMsgConfig,
    #[serde(default)]
    pub rcpt: RcptConfig,
    #[serde(default)]
    pub lists: ListFiles,
    #[serde(default)]
    pub tld: TldConfig,
}

/// Which stages actually run. Disabled stages answer Continue without
/// touching any list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default = "default_enabled")]
    pub conn: bool,
    #[serde(default)]
    pub helo: bool,
    #[serde(default)]
    pub mail: bool,
    #[serde(default)]
    pub rcpt: bool,
    #[serde(default = "default_enabled")]
    pub any: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            conn: true,
            helo: false,
            mail: false,
            rcpt: false,
            any: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenyMsgConfig {
    #[serde(default = "default_conn_deny")]
    pub conn: String,
    #[serde(default = "default_helo_deny")]
    pub helo: String,
    #[serde(default = "default_mail_deny")]
    pub mail: String,
    #[serde(default = "default_rcpt_deny")]
    pub rcpt: String,
}

fn default_conn_deny() -> String {
    "You are not allowed to connect".to_string()
}

fn default_helo_deny() -> String {
    "That HELO is not allowed to connect".to_string()
}

fn default_mail_deny() -> String {
    "That sender cannot send mail here".to_string()
}

fn default_rcpt_deny() -> String {
    "That recipient is not allowed".to_string()
}

impl Default for DenyMsgConfig {
    fn default() -> Self {
        DenyMsgConfig {
            conn: default_conn_deny(),
            helo: default_helo_deny(),
            mail: default_mail_deny(),
            rcpt: default_rcpt_deny(),
        }
    }
}

/// When `accept` is set, a whitelisted recipient short-circuits the remaining
/// recipient checks instead of merely continuing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RcptConfig {
    #[serde(default)]
    pub accept: bool,
}

/// File names (relative to `list_dir`) for every list slot. A `None` slot
/// means that list simply does not exist for this deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFiles {
    #[serde(default)]
    pub white: StageFiles,
    #[serde(default)]
    pub black: StageFiles,
    #[serde(default)]
    pub re_white: StageFiles,
    #[serde(default)]
    pub re_black: StageFiles,
    pub domain: Option<String>,
}

impl Default for ListFiles {
    fn default() -> Self {
        ListFiles {
            white: StageFiles {
                conn: Some("connect.rdns_access.whitelist".to_string()),
                helo: None,
                mail: Some("mail_from.access.whitelist".to_string()),
                rcpt: Some("rcpt_to.access.whitelist".to_string()),
            },
            black: StageFiles {
                conn: Some("connect.rdns_access.blacklist".to_string()),
                helo: None,
                mail: Some("mail_from.access.blacklist".to_string()),
                rcpt: Some("rcpt_to.access.blacklist".to_string()),
            },
            re_white: StageFiles {
                conn: Some("connect.rdns_access.whitelist_regex".to_string()),
                helo: None,
                mail: Some("mail_from.access.whitelist_regex".to_string()),
                rcpt: Some("rcpt_to.access.whitelist_regex".to_string()),
            },
            re_black: StageFiles {
                conn: Some("connect.rdns_access.blacklist_regex".to_string()),
                helo: Some("helo.checks.regexps".to_string()),
                mail: Some("mail_from.access.blacklist_regex".to_string()),
                rcpt: Some("rcpt_to.access.blacklist_regex".to_string()),
            },
            domain: Some("access.domains".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageFiles {
    pub conn: Option<String>,
    pub helo: Option<String>,
    pub mail: Option<String>,
    pub rcpt: Option<String>,
}

impl StageFiles {
    pub fn get(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Conn => self.conn.as_deref(),
            Stage::Helo => self.helo.as_deref(),
            Stage::Mail => self.mail.as_deref(),
            Stage::Rcpt => self.rcpt.as_deref(),
            Stage::Any => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TldConfig {
    /// Extra two-level public suffixes merged into the builtin table.
    #[serde(default)]
    pub two_level_suffixes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            socket_path: "/var/run/access-milter.sock".to_string(),
            list_dir: "/etc/access-milter".to_string(),
            check: CheckConfig::default(),
            deny_msg: DenyMsgConfig::default(),
            rcpt: RcptConfig::default(),
            lists: ListFiles::default(),
            tld: TldConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
