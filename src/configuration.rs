use crate::error::ConfigError;

const MIN_SECRET_LENGTH: usize = 32;
const MIN_HASH_COST: u32 = 4;
const MAX_HASH_COST: u32 = 31;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub session: SessionSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }

    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Token signing settings
///
/// Access and refresh tokens are signed with distinct secrets.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_token_expiry: i64,   // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
}

impl JwtSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.len() < MIN_SECRET_LENGTH
            || self.refresh_secret.len() < MIN_SECRET_LENGTH
        {
            return Err(ConfigError::InvalidValue(format!(
                "jwt secrets must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::InvalidValue(
                "jwt.access_secret and jwt.refresh_secret must differ".to_string(),
            ));
        }
        if self.access_token_expiry <= 0 || self.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "token expiries must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which `AccountStore` backend the server runs on
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(serde::Deserialize, Clone)]
pub struct SessionSettings {
    /// bcrypt cost for passwords and refresh fingerprints
    pub hash_cost: u32,
    /// Compare access-token epochs with the store on every protected request
    pub strict_epoch_check: bool,
    pub store: StoreBackend,
}

impl SessionSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.hash_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "session.hash_cost must be between {} and {}, got {}",
                MIN_HASH_COST, MAX_HASH_COST, self.hash_cost
            )));
        }
        Ok(())
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8000_i64)?
        .set_default("jwt.access_token_expiry", 900_i64)?
        .set_default("jwt.refresh_token_expiry", 604_800_i64)?
        .set_default("jwt.issuer", "sessionkeeper")?
        .set_default("session.hash_cost", i64::from(bcrypt::DEFAULT_COST))?
        .set_default("session.strict_epoch_check", true)?
        .set_default("session.store", "postgres")?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.jwt.validate()?;
    settings.session.validate()?;
    Ok(settings)
}
