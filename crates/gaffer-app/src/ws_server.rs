// WebSocket server: accepts client connections and relays each command frame
// to the application loop, writing the reply back on the same connection.

use futures_util::stream::Stream;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Events emitted by the WebSocket server to the application layer.
#[derive(Debug)]
pub enum WsEvent {
    Connected {
        addr: String,
    },
    Disconnected {
        addr: String,
    },
    /// A text frame from a client. The app answers through `reply`.
    Request {
        addr: String,
        payload: String,
        reply: oneshot::Sender<String>,
    },
}

/// Bind `127.0.0.1:{port}` and serve connections until the task is cancelled.
/// Each connection runs in its own task.
pub async fn run(port: u16, tx: mpsc::Sender<WsEvent>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    info!("WebSocket server listening on {}", listener.local_addr()?);
    serve(listener, tx).await
}

/// Accept loop over an already-bound listener.
pub async fn serve(listener: TcpListener, tx: mpsc::Sender<WsEvent>) -> anyhow::Result<()> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let addr = addr.to_string();
        let tx = tx.clone();

        tokio::spawn(async move {
            let ws_stream = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {addr}: {e}");
                    return;
                }
            };
            info!("Client connected from {addr}");

            if tx.send(WsEvent::Connected { addr: addr.clone() }).await.is_err() {
                return;
            }

            let (mut write, read) = ws_stream.split();
            if process_message_stream(read, &mut write, &tx, &addr).await.is_err() {
                return;
            }

            let _ = tx.send(WsEvent::Disconnected { addr }).await;
        });
    }
}

/// Relay text frames from `stream` to the app as [`WsEvent::Request`]s and
/// write each reply to `sink`.
///
/// Returns `Err(())` if the app side has gone away. A close frame, a read
/// error, or a failed write ends the connection normally.
pub async fn process_message_stream<St, Si>(
    mut stream: St,
    sink: &mut Si,
    tx: &mpsc::Sender<WsEvent>,
    addr: &str,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    Si: Sink<Message> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                let event = WsEvent::Request {
                    addr: addr.to_string(),
                    payload: text.to_string(),
                    reply: reply_tx,
                };
                if tx.send(event).await.is_err() {
                    return Err(());
                }
                let Ok(reply) = reply_rx.await else {
                    return Err(());
                };
                if sink.send(Message::Text(reply.into())).await.is_err() {
                    warn!("Failed to write reply to {addr}");
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            Ok(other) => {
                debug!("Ignoring non-text frame from {addr}: {:?}", other);
            }
        }
    }
    Ok(())
}
