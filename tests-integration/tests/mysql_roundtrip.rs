//! Relational-store fixture round trip: seed rows with the fixture,
//! read them back through the processing context, verify with the
//! unordered comparator, and check the teardown leaves nothing behind.

use std::sync::Arc;

use anyhow::Result;
use datafusion::arrow::array::{Int64Array, RecordBatch, StringArray};
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::datasource::MemTable;
use serde_json::json;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{Connection, MySqlConnection, Row};
use testcontainers_modules::{mysql::Mysql, testcontainers::runners::AsyncRunner};
use testkit::prelude::*;
use tests_integration::init_test_logging;

async fn fetch_videos(port: u16) -> Result<Vec<(String, String, i64)>> {
    let options = MySqlConnectOptions::new()
        .host("127.0.0.1")
        .port(port)
        .username("root");
    let mut connection = MySqlConnection::connect_with(&options).await?;
    let rows = sqlx::query("SELECT uid, title, views FROM flowtest_test.video")
        .fetch_all(&mut connection)
        .await?;
    connection.close().await?;

    Ok(rows
        .iter()
        .map(|row| (row.get("uid"), row.get("title"), row.get("views")))
        .collect())
}

fn videos_batch(videos: &[(String, String, i64)]) -> Result<(Arc<Schema>, RecordBatch)> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("uid", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("views", DataType::Int64, false),
    ]));

    let uids: Vec<&str> = videos.iter().map(|(uid, _, _)| uid.as_str()).collect();
    let titles: Vec<&str> = videos.iter().map(|(_, title, _)| title.as_str()).collect();
    let views: Vec<i64> = videos.iter().map(|(_, _, views)| *views).collect();

    let batch = RecordBatch::try_new(
        Arc::clone(&schema),
        vec![
            Arc::new(StringArray::from(uids)),
            Arc::new(StringArray::from(titles)),
            Arc::new(Int64Array::from(views)),
        ],
    )?;

    Ok((schema, batch))
}

#[tokio::test]
async fn mysql_fixture_roundtrip_through_context() -> Result<()> {
    init_test_logging();

    let container = Mysql::default().start().await?;
    let port = container.get_host_port_ipv4(3306).await?;

    let fixture = MysqlFixture::new("127.0.0.1", "root")
        .with_port(port)
        .with_data(resource_path!("tests/resources/mysql_setup.sql"))
        .with_teardown(resource_path!("tests/resources/mysql_teardown.sql"));

    let mut harness = SuiteHarness::builder()
        .registry(Arc::new(ContextRegistry::new()))
        .build();
    harness.start().await?;

    let outcome = with_fixture(&fixture, async {
        // Pull the seeded rows back out of the store, register them with
        // the engine, and verify the computed result set.
        let videos = fetch_videos(port).await?;
        let (schema, batch) = videos_batch(&videos)?;

        let session = harness.context()?.session();
        let table = MemTable::try_new(schema, vec![vec![batch]])?;
        session.register_table("video", Arc::new(table))?;

        let df = session.sql("SELECT uid, title, views FROM video").await?;
        check_dataframe(
            df,
            &[
                json!({"uid": "v1", "title": "Video A", "views": 1000}),
                json!({"uid": "v2", "title": "Video B", "views": 2000}),
                json!({"uid": "v3", "title": "Video C", "views": 3000}),
            ],
            &CompareOptions::default(),
        )
        .await?;

        anyhow::Ok(())
    })
    .await?;
    outcome?;

    // Unload already ran; the database must be gone again
    let options = MySqlConnectOptions::new()
        .host("127.0.0.1")
        .port(port)
        .username("root");
    let mut connection = MySqlConnection::connect_with(&options).await?;
    let databases = sqlx::query("SHOW DATABASES LIKE 'flowtest_test'")
        .fetch_all(&mut connection)
        .await?;
    connection.close().await?;
    assert!(databases.is_empty());

    harness.finish().await?;
    Ok(())
}
