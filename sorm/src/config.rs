use serde::Deserialize;

/// Connection settings for a [`Session`](crate::Session).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Driver specific connection string, e.g. `sqlite::memory:`.
    pub dsn: String,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Keep an in-memory log of executed statements.
    pub profile: bool,

    /// Statements run once on every new connection.
    pub on_connect_do: Vec<String>,
}

impl Config {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            ..Self::default()
        }
    }

    /// The dsn with `username`/`password` spliced into its authority part,
    /// unless it already carries credentials.
    pub fn dsn_with_credentials(&self) -> String {
        let username = match &self.username {
            Some(username) => username,
            None => return self.dsn.clone(),
        };

        let (scheme, rest) = match self.dsn.split_once("://") {
            Some(parts) => parts,
            None => return self.dsn.clone(),
        };

        let authority_end = rest.find('/').unwrap_or(rest.len());
        if rest[..authority_end].contains('@') {
            return self.dsn.clone();
        }

        match &self.password {
            Some(password) => format!("{}://{}:{}@{}", scheme, username, password, rest),
            None => format!("{}://{}@{}", scheme, username, rest),
        }
    }
}
