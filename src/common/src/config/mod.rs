use serde::{Deserialize, Serialize};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use once_cell::sync::OnceCell;

pub static CONFIG: OnceCell<Configuration> = OnceCell::new();

/// Engine tuning applied when a local processing context is built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of partitions used for query execution. `None` keeps the
    /// engine default (one per core).
    pub target_partitions: Option<usize>,
    /// Row batch size for query execution.
    pub batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_partitions: None,
            batch_size: 8192,
        }
    }
}

/// Endpoint of the wide-column store used by `CassandraFixture`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CassandraConfig {
    pub host: String,
}

/// Endpoint of the search index used by `ElasticFixture`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElasticConfig {
    pub host: String,
    #[serde(default = "ElasticConfig::default_port")]
    pub port: u16,
}

impl ElasticConfig {
    pub fn default_port() -> u16 {
        9200
    }
}

/// Endpoint and credentials of the relational store used by `MysqlFixture`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MysqlConfig {
    pub host: String,
    pub user: String,
    pub password: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Engine tuning for locally built processing contexts
    pub engine: EngineConfig,
    /// Wide-column store endpoint (only needed by suites that declare
    /// cassandra fixtures)
    pub cassandra: Option<CassandraConfig>,
    /// Search index endpoint
    pub elastic: Option<ElasticConfig>,
    /// Relational store endpoint
    pub mysql: Option<MysqlConfig>,
}

impl Configuration {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file("flowtest.toml"))
            .merge(Env::prefixed("FLOWTEST__").split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }
}
