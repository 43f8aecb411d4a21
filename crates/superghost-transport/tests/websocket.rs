//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a tokio-tungstenite client to check
//! that frames actually cross the network.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use superghost_transport::{Connection, Transport, WebSocketConnection, WebSocketTransport};
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

    type ClientWs = WebSocketStream<MaybeTlsStream<TcpStream>>;

    /// Binds on a random port and returns a connected (server, client)
    /// pair.
    async fn pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have addr");

        let server = tokio::spawn(async move { transport.accept().await.expect("should accept") });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_send_and_receive() {
        let (conn, mut client) = pair().await;
        assert!(conn.id().into_inner() > 0);

        conn.send(br#"{"hello":"client"}"#).await.expect("send should succeed");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "UTF-8 payloads should go out as text");
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"hello":"client"}"#);

        client
            .send(Message::Text(r#"{"hello":"server"}"#.into()))
            .await
            .unwrap();
        let received = conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"hello":"server"}"#);

        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_non_utf8_goes_out_as_binary() {
        let (conn, mut client) = pair().await;

        conn.send(&[0xff, 0x00, 0x01]).await.unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
        assert_eq!(msg.into_data().as_ref(), &[0xff, 0x00, 0x01]);
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (conn, mut client) = pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending() {
        let (conn, mut client) = pair().await;
        let conn = Arc::new(conn);

        let reader = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move { conn.recv().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        tokio::time::timeout(Duration::from_secs(1), conn.send(b"pushed"))
            .await
            .expect("send must not wait for the pending recv")
            .unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"pushed");

        client.send(Message::Text("reply".into())).await.unwrap();
        let received = reader.await.unwrap().unwrap().unwrap();
        assert_eq!(received, b"reply");
    }

    #[tokio::test]
    async fn test_connection_ids_are_unique() {
        let (a, _ca) = pair().await;
        let (b, _cb) = pair().await;
        assert_ne!(a.id(), b.id());
    }
}
