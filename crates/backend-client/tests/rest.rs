use backend_client::{Backend, BackendError, OrderDraft, RestBackend};
use configuration::BackendConfig;
use core_types::FieldValue;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

const ORDER_ROW: &str = r#"[{"id":7,"user_id":"00000000-0000-0000-0000-000000000001","client_code":"C-1","product":"CDB","volume":"100","revenue":"10","created_at":"2024-05-10T12:00:00Z"}]"#;

type Log = Arc<Mutex<Vec<String>>>;

/// A canned platform: orders insert and delete succeed, custom values are rejected.
async fn stub_platform() -> (String, Log) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let log: Log = Arc::default();
    let seen = log.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream, seen.clone()));
        }
    });
    (url, log)
}

async fn serve(stream: TcpStream, log: Log) {
    let mut reader = BufReader::new(stream);
    loop {
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
            return;
        }
        let mut content_length = 0usize;
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).await.unwrap();
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).await.unwrap();

        let mut parts = request_line.split_whitespace();
        let call = format!("{} {}", parts.next().unwrap_or(""), parts.next().unwrap_or(""));
        let (status, payload) = if call.starts_with("POST /rest/v1/orders") && !call.contains("custom") {
            ("201 Created", ORDER_ROW)
        } else if call.starts_with("DELETE /rest/v1/orders") {
            ("200 OK", ORDER_ROW)
        } else {
            ("500 Internal Server Error", r#"{"message":"value rejected"}"#)
        };
        log.lock().unwrap().push(call);

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{payload}",
            payload.len()
        );
        if reader.get_mut().write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

#[tokio::test]
async fn order_is_rolled_back_when_its_custom_values_fail() {
    let (url, log) = stub_platform().await;
    let backend = RestBackend::new(&BackendConfig {
        url,
        anon_key: "anon".into(),
        service_key: Some("service".into()),
        request_timeout_secs: 5,
    })
    .unwrap();
    let draft = OrderDraft {
        client_code: "C-1".into(),
        product: "CDB".into(),
        volume: Decimal::ONE_HUNDRED,
        revenue: Decimal::TEN,
        custom_values: vec![(3, FieldValue::Text("Mesa".into()))],
    };

    let err = backend.insert_order(Uuid::from_u128(1), &draft).await.unwrap_err();

    assert!(matches!(err, BackendError::Api { status: 500, .. }));
    let calls = log.lock().unwrap().clone();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], "POST /rest/v1/orders");
    assert_eq!(calls[1], "POST /rest/v1/order_custom_values");
    assert_eq!(calls[2], "DELETE /rest/v1/orders?id=eq.7");
}
