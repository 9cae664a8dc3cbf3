use std::fmt;

use gpframe_error::{Result, ResultExt};
use tokio_postgres::Config;
use tokio_postgres::config::Host;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_DBNAME: &str = "postgres";

/// Parameters for connecting to a database.
///
/// Host, port and database name fall back to [`DEFAULT_HOST`],
/// [`DEFAULT_PORT`] and [`DEFAULT_DBNAME`] when not given.
#[derive(Clone)]
pub struct ConnectionConfig {
    inner: Config,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::with_defaults(Config::new())
    }
}

impl ConnectionConfig {
    /// Parse either a `postgres://` URL or a libpq style `key=value` string.
    pub fn parse(s: &str) -> Result<Self> {
        let inner: Config = s.trim().parse().context("Invalid connection string")?;
        Ok(Self::with_defaults(inner))
    }

    /// Build from the standard libpq environment variables.
    ///
    /// `TESTDB` is used for the database name if `PGDATABASE` is not set.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut inner = Config::new();
        if let Some(host) = get("PGHOST") {
            inner.host(&host);
        }
        if let Some(port) = get("PGPORT") {
            let port: u16 = port
                .parse()
                .context_fn(|| format!("Invalid port: {port}"))?;
            inner.port(port);
        }
        if let Some(dbname) = get("PGDATABASE").or_else(|| get("TESTDB")) {
            inner.dbname(&dbname);
        }
        if let Some(user) = get("PGUSER") {
            inner.user(&user);
        }
        if let Some(password) = get("PGPASSWORD") {
            inner.password(password);
        }
        Ok(Self::with_defaults(inner))
    }

    fn with_defaults(mut inner: Config) -> Self {
        if inner.get_hosts().is_empty() {
            inner.host(DEFAULT_HOST);
        }
        if inner.get_ports().is_empty() {
            inner.port(DEFAULT_PORT);
        }
        if inner.get_dbname().is_none() {
            inner.dbname(DEFAULT_DBNAME);
        }
        ConnectionConfig { inner }
    }

    pub fn host(&self) -> String {
        match self.inner.get_hosts().first() {
            Some(Host::Tcp(host)) => host.clone(),
            #[cfg(unix)]
            Some(Host::Unix(path)) => path.display().to_string(),
            None => DEFAULT_HOST.to_string(),
        }
    }

    pub fn port(&self) -> u16 {
        self.inner.get_ports().first().copied().unwrap_or(DEFAULT_PORT)
    }

    pub fn dbname(&self) -> &str {
        self.inner.get_dbname().unwrap_or(DEFAULT_DBNAME)
    }

    pub fn user(&self) -> Option<&str> {
        self.inner.get_user()
    }

    pub fn password(&self) -> Option<&[u8]> {
        self.inner.get_password()
    }

    /// The driver config used to open the connection.
    pub fn driver_config(&self) -> &Config {
        &self.inner
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host())
            .field("port", &self.port())
            .field("dbname", &self.dbname())
            .field("user", &self.user())
            .field("password", &self.password().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (host, port, dbname) = (self.host(), self.port(), self.dbname());
        match self.user() {
            Some(user) => write!(f, "{user}@{host}:{port}/{dbname}"),
            None => write!(f, "{host}:{port}/{dbname}"),
        }
    }
}
