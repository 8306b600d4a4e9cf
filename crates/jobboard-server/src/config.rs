use jobboard_core::PaginationStyle;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct AuthKeys {
    pub active: Option<(String, String)>, // (kid, secret)
    pub next: Option<(String, String)>,
}

impl AuthKeys {
    pub fn enabled(&self) -> bool {
        self.active.is_some() || self.next.is_some()
    }

    pub fn secret_for(&self, kid: &str) -> Option<&str> {
        [&self.active, &self.next]
            .into_iter()
            .flatten()
            .find(|(id, _)| id == kid)
            .map(|(_, secret)| secret.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    pub data_dir: Option<PathBuf>,
    pub pagination: PaginationStyle,
    pub expand_owner: bool,
    pub auth: AuthKeys,
    pub tls: Option<(PathBuf, PathBuf)>, // (cert, key)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            data_dir: None,
            pagination: PaginationStyle::Offset,
            expand_owner: true,
            auth: AuthKeys::default(),
            tls: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let http_addr = match var("HTTP_ADDR") {
            Some(a) => a
                .parse()
                .map_err(|e| anyhow::anyhow!("HTTP_ADDR {a:?}: {e}"))?,
            None => defaults.http_addr,
        };
        let pagination = match var("LISTING_PAGINATION") {
            Some(s) => s.parse().map_err(anyhow::Error::msg)?,
            None => defaults.pagination,
        };
        let expand_owner = match var("LISTING_EXPAND_OWNER").as_deref() {
            Some("0") | Some("false") | Some("no") => false,
            Some(_) | None => defaults.expand_owner,
        };
        let key = |secret_var: &str, id_var: &str, default_id: &str| {
            var(secret_var).map(|secret| (var(id_var).unwrap_or_else(|| default_id.into()), secret))
        };
        let auth = AuthKeys {
            active: key("CAP_KEY_ACTIVE", "CAP_KEY_ACTIVE_ID", "active"),
            next: key("CAP_KEY_NEXT", "CAP_KEY_NEXT_ID", "next"),
        };
        let tls = match (var("TLS_CERT_PATH"), var("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            _ => None,
        };
        Ok(Self {
            http_addr,
            data_dir: var("DATA_DIR").map(PathBuf::from),
            pagination,
            expand_owner,
            auth,
            tls,
        })
    }
}
