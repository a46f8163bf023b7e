use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "quill", about = "A small blogging server")]
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
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub admin: Option<AdminSeed>,
    pub images: ImagesConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed to call the API with credentials.
    pub cors_origins: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
    /// Lets `POST /auth/register` honor a requested `admin` role.
    pub open_admin_registration: bool,
}

/// Admin account created at startup if no user with that email exists.
#[derive(Deserialize, Debug, Clone)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageProvider {
    #[default]
    Local,
    Cloudinary,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ImagesConfig {
    pub provider: ImageProvider,
    pub max_bytes: usize,
    pub cloudinary: CloudinaryConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            cookie_secure: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            open_admin_registration: false,
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            provider: ImageProvider::Local,
            max_bytes: 5 * 1024 * 1024,
            cloudinary: CloudinaryConfig::default(),
        }
    }
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            folder: "quill".to_string(),
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
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

        config.apply_env(|key| std::env::var(key).ok());

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("quill.db"));
        }
        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("uploads"));
        }

        Ok(config)
    }

    /// Secrets may come from the environment instead of the config file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup("QUILL_JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }
        let cloudinary = &mut self.images.cloudinary;
        if let Some(v) = lookup("CLOUDINARY_CLOUD_NAME") {
            cloudinary.cloud_name = v;
        }
        if let Some(v) = lookup("CLOUDINARY_API_KEY") {
            cloudinary.api_key = v;
        }
        if let Some(v) = lookup("CLOUDINARY_API_SECRET") {
            cloudinary.api_secret = v;
        }
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".quill")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("quill.db"))
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("uploads"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_for(dir: &std::path::Path) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(dir.to_path_buf()),
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(!config.auth.open_admin_registration);
        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.images.provider, ImageProvider::Local);
        assert_eq!(config.images.max_bytes, 5 * 1024 * 1024);
        assert!(config.admin.is_none());
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_for(std::path::Path::new("/tmp/test-quill"));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-quill"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_quill() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: None,
        };
        assert!(Config::data_dir(&cli).ends_with(".quill"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_for(tmp.path())).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.db_path(), tmp.path().join("quill.db"));
        assert_eq!(config.uploads_path(), tmp.path().join("uploads"));
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "127.0.0.1"
port = 9000
cors_origins = ["https://blog.example"]

[auth]
jwt_secret = "file-secret"
bcrypt_cost = 4
open_admin_registration = true

[admin]
username = "root"
email = "root@example.com"
password = "hunter22"

[images]
provider = "cloudinary"
max_bytes = 1024

[images.cloudinary]
cloud_name = "demo"
folder = "blog"
"#,
        )
        .unwrap();

        let mut cli = cli_for(tmp.path());
        cli.config = Some(config_path);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origins, vec!["https://blog.example"]);
        assert_eq!(config.auth.bcrypt_cost, 4);
        assert!(config.auth.open_admin_registration);
        assert_eq!(config.admin.unwrap().username, "root");
        assert_eq!(config.images.provider, ImageProvider::Cloudinary);
        assert_eq!(config.images.max_bytes, 1024);
        assert_eq!(config.images.cloudinary.cloud_name, "demo");
        assert_eq!(config.images.cloudinary.folder, "blog");
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[server]\nhost = \"192.168.1.1\"\nport = 9000\n").unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn env_overrides_secrets() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "QUILL_JWT_SECRET" => Some("from-env".to_string()),
            "CLOUDINARY_API_KEY" => Some("key".to_string()),
            _ => None,
        });
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-env"));
        assert_eq!(config.images.cloudinary.api_key, "key");
        assert!(config.images.cloudinary.api_secret.is_empty());
    }
}
