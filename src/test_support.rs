use std::future::Future;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;

/// Accept a single websocket client on a random local port and hand it to
/// `handler`. Returns the `ws://` endpoint.
pub async fn spawn_ws_server<F, Fut>(handler: F) -> String
where
    F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        handler(ws).await;
    });
    format!("ws://{addr}/ws")
}
