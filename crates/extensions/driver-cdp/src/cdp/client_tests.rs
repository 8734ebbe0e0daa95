use super::*;

#[tokio::test]
async fn test_connect_without_browser() {
    // Port 9 (discard) has no DevTools endpoint.
    let result = CdpClient::connect("http://127.0.0.1:9/", Duration::from_secs(2)).await;
    match result {
        Err(err @ CdpError::ChromeNotAvailable(_)) => assert!(err.is_session_fatal()),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("connected to a browser that does not exist"),
    }
}
