//! Fixture for the relational store.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;

use common::config::MysqlConfig;

use crate::error::FixtureError;

use super::{Fixture, read_file};

pub const DEFAULT_PORT: u16 = 3306;

/// Executes SQL statement files against a relational store.
///
/// `load` runs the whole data file as one statement batch over a fresh
/// connection and commits; `unload` does the same with the teardown
/// file. One connection per call, no pooling, no retry.
pub struct MysqlFixture {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    data_file: Option<PathBuf>,
    teardown_file: Option<PathBuf>,
}

impl MysqlFixture {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            user: user.into(),
            password: None,
            data_file: None,
            teardown_file: None,
        }
    }

    pub fn from_config(config: &MysqlConfig) -> Self {
        let mut fixture = Self::new(config.host.clone(), config.user.clone());
        fixture.password = config.password.clone();
        fixture
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    pub fn with_teardown(mut self, path: impl Into<PathBuf>) -> Self {
        self.teardown_file = Some(path.into());
        self
    }

    async fn execute(&self, statements: &str) -> Result<(), FixtureError> {
        let mut options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user);
        if let Some(password) = &self.password {
            options = options.password(password);
        }

        let mut connection = MySqlConnection::connect_with(&options).await?;
        sqlx::Executor::execute(&mut connection, sqlx::raw_sql(statements)).await?;
        connection.close().await?;

        Ok(())
    }

    async fn execute_file(&self, file: Option<&PathBuf>) -> Result<(), FixtureError> {
        if let Some(path) = file {
            let statements = read_file(path).await?;
            self.execute(&statements).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Fixture for MysqlFixture {
    async fn load(&self) -> Result<(), FixtureError> {
        self.execute_file(self.data_file.as_ref()).await
    }

    async fn unload(&self) -> Result<(), FixtureError> {
        self.execute_file(self.teardown_file.as_ref()).await
    }
}
