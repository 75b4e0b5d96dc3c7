mod common;

use common::spawn_influx;
use reqwest::StatusCode;
use sbs2influx::client::{ClientConfig, ClientError, InfluxClient};
use sbs2influx::line_protocol::Point;
use sbs2influx::FieldValue;

fn points() -> Vec<Point> {
    vec![
        Point::new(1_704_103_260)
            .tag("hexident", "4CA2C5")
            .field("altitude", Some(FieldValue::Integer(5000)))
            .field("count", Some(FieldValue::Integer(3))),
        Point::new(1_704_103_260)
            .tag("hexident", "40621D")
            .field("onground", Some(FieldValue::Bool(true)))
            .field("count", Some(FieldValue::Integer(1))),
    ]
}

#[tokio::test]
async fn write_posts_one_batch() {
    let mut influx = spawn_influx(204).await;
    let client = InfluxClient::new(ClientConfig::new(influx.url.clone(), "adsb")).unwrap();

    let written = client.write("messages", &points()).await.unwrap();
    assert_eq!(written, 2);

    let request = influx.requests.recv().await.unwrap();
    assert_eq!(request.target, "/write?precision=s&db=adsb");
    assert_eq!(
        request.body,
        "messages,hexident=4CA2C5 altitude=5000i,count=3i 1704103260\n\
         messages,hexident=40621D onground=t,count=1i 1704103260"
    );
}

#[tokio::test]
async fn write_sends_credentials() {
    let mut influx = spawn_influx(204).await;
    let config = ClientConfig::new(influx.url.clone(), "adsb")
        .with_credentials("reader".into(), "hunter2".into());
    let client = InfluxClient::new(config).unwrap();

    client.write("messages", &points()).await.unwrap();

    let request = influx.requests.recv().await.unwrap();
    assert_eq!(request.target, "/write?precision=s&db=adsb&u=reader&p=hunter2");
}

#[tokio::test]
async fn write_reports_error_status() {
    let mut influx = spawn_influx(500).await;
    let client = InfluxClient::new(ClientConfig::new(influx.url.clone(), "adsb")).unwrap();

    match client.write("messages", &points()).await {
        Err(ClientError::ServerError { status, body }) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(body.contains("boom"));
        }
        other => panic!("expected server error, got {:?}", other),
    }

    // The batch was sent exactly once
    assert!(influx.requests.recv().await.is_some());
    assert!(influx.requests.try_recv().is_err());
}

#[tokio::test]
async fn write_refuses_point_without_fields() {
    let influx = spawn_influx(204).await;
    let client = InfluxClient::new(ClientConfig::new(influx.url.clone(), "adsb")).unwrap();

    let result = client
        .write("messages", &[Point::new(1).tag("hexident", "4CA2C5")])
        .await;
    assert!(matches!(result, Err(ClientError::Encode(_))));
}

#[tokio::test]
async fn write_fails_when_unreachable() {
    let client = InfluxClient::new(ClientConfig::new("http://127.0.0.1:9", "adsb")).unwrap();

    let result = client.write("messages", &points()).await;
    assert!(matches!(result, Err(ClientError::Request(_))));
}
