use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reelbase", about = "Film catalog service")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Secret used to sign tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Password for the SMTP relay in `[mail.smtp]`
    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub admin: Option<AdminSeed>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    /// Lifetime of session, verification and reset tokens
    pub token_days: i64,
    pub bcrypt_cost: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MailConfig {
    pub sender: String,
    /// Base URL of the client; verification and reset links hang off it
    pub link_base: String,
    /// Outgoing relay. Without one, mail is only written to the log.
    pub smtp: Option<SmtpConfig>,
}

#[derive(Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    /// Defaults to the usual port for `security`
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub security: SmtpSecurity,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Implicit TLS
    Tls,
    #[default]
    Starttls,
    /// Plain text, for local relays only
    None,
}

impl SmtpConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(match self.security {
            SmtpSecurity::Tls => 465,
            SmtpSecurity::Starttls => 587,
            SmtpSecurity::None => 25,
        })
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("security", &self.security)
            .finish()
    }
}

/// Admin account created at startup when no user has this email.
#[derive(Deserialize, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    #[serde(default = "AdminSeed::default_first_name")]
    pub first_name: String,
    #[serde(default = "AdminSeed::default_last_name")]
    pub last_name: String,
    #[serde(default = "AdminSeed::default_avatar")]
    pub avatar: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_days: 15,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

// Keep the secret out of debug output
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_days", &self.token_days)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: "noreply@reelbase.local".to_string(),
            link_base: "http://localhost:3000".to_string(),
            smtp: None,
        }
    }
}

impl AdminSeed {
    fn default_first_name() -> String {
        "Site".to_string()
    }

    fn default_last_name() -> String {
        "Admin".to_string()
    }

    fn default_avatar() -> String {
        "https://reelbase.local/avatar.png".to_string()
    }
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref secret) = cli.jwt_secret {
            config.auth.jwt_secret = Some(secret.clone());
        }
        if let (Some(smtp), Some(password)) = (config.mail.smtp.as_mut(), &cli.smtp_password) {
            smtp.password = Some(password.clone());
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("reelbase.db"));
        }

        if !(4..=31).contains(&config.auth.bcrypt_cost) {
            anyhow::bail!("auth.bcrypt_cost must be between 4 and 31");
        }
        if config.auth.token_days <= 0 {
            anyhow::bail!("auth.token_days must be positive");
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match cli.data_dir.clone() {
            Some(dir) => Ok(dir),
            None => dirs::home_dir()
                .map(|home| home.join(".reelbase"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("reelbase.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(data_dir: PathBuf) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(data_dir),
            jwt_secret: None,
            smtp_password: None,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.token_days, 15);
        assert_eq!(config.auth.bcrypt_cost, 12);
        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.mail.link_base, "http://localhost:3000");
        assert!(config.database.path.is_none());
        assert!(config.admin.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli(PathBuf::from("/tmp/test-reelbase"));
        assert_eq!(
            Config::data_dir(&cli).unwrap(),
            PathBuf::from("/tmp/test-reelbase")
        );
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli(tmp.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.db_path(), tmp.path().join("reelbase.db"));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
port = 9000

[auth]
jwt_secret = "from-file"
token_days = 2
bcrypt_cost = 4

[mail]
link_base = "https://films.example"

[admin]
email = "root@films.example"
password = "changeme"
"#,
        )
        .unwrap();

        let mut cli = cli(tmp.path().to_path_buf());
        cli.config = Some(config_path);
        let config = Config::load(&cli).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-file"));
        assert_eq!(config.auth.token_days, 2);
        assert_eq!(config.mail.link_base, "https://films.example");
        assert_eq!(config.mail.sender, "noreply@reelbase.local");

        let admin = config.admin.unwrap();
        assert_eq!(admin.email, "root@films.example");
        assert_eq!(admin.first_name, "Site");
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000

[auth]
jwt_secret = "from-file"
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
            jwt_secret: Some("from-cli".to_string()),
            smtp_password: None,
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-cli"));
    }

    #[test]
    fn rejects_out_of_range_bcrypt_cost() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[auth]\nbcrypt_cost = 2\n").unwrap();

        let mut cli = cli(tmp.path().to_path_buf());
        cli.config = Some(config_path);
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn smtp_section_is_optional_and_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[mail]
sender = "Reelbase <films@films.example>"

[mail.smtp]
host = "smtp.films.example"
username = "films"
password = "from-file"
"#,
        )
        .unwrap();

        let mut cli = cli(tmp.path().to_path_buf());
        cli.config = Some(config_path);
        cli.smtp_password = Some("from-env".into());
        let config = Config::load(&cli).unwrap();

        let smtp = config.mail.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.films.example");
        assert_eq!(smtp.security, SmtpSecurity::Starttls);
        assert_eq!(smtp.port(), 587);
        assert_eq!(smtp.password.as_deref(), Some("from-env"));
        assert!(!format!("{:?}", smtp).contains("from-env"));
    }

    #[test]
    fn smtp_port_follows_security_unless_set() {
        let smtp: SmtpConfig = toml::from_str("host = \"h\"\nsecurity = \"tls\"").unwrap();
        assert_eq!(smtp.port(), 465);
        let smtp: SmtpConfig = toml::from_str("host = \"h\"\nsecurity = \"none\"\nport = 1025").unwrap();
        assert_eq!(smtp.port(), 1025);
        assert!(Config::default().mail.smtp.is_none());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut config = Config::default();
        config.auth.jwt_secret = Some("hunter2".into());
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
