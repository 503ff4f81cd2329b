//! 以每行一筆 JSON 的格式在標準輸入輸出與消息串流之間轉換。
//!
//! 輸入行: `{"body": "...", "attributes": {"amqp.routingKey": "orders.created"}}`，
//! 非 UTF-8 載荷改用 `body_hex`。
//! 輸出行: `{"routing_key": "...", "headers": {...}, "body": "..."}`。

use crate::messaging::protocol::{Headers, Message, MessageBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StdioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid message on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid body_hex on line {line}: {source}")]
    Hex {
        line: usize,
        #[source]
        source: hex::FromHexError,
    },

    #[error("Line {0} sets both body and body_hex")]
    AmbiguousBody(usize),

    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Message stream closed")]
    StreamClosed,
}

#[derive(Debug, Deserialize)]
struct InputRecord {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    body_hex: Option<String>,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct OutputRecord<'a> {
    routing_key: &'a str,
    headers: &'a Headers,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body_hex: Option<String>,
}

impl<'a> From<&'a Message> for OutputRecord<'a> {
    fn from(message: &'a Message) -> Self {
        let (body, body_hex) = match std::str::from_utf8(&message.body) {
            Ok(text) => (Some(text), None),
            Err(_) => (None, Some(hex::encode(&message.body))),
        };

        Self {
            routing_key: &message.routing_key,
            headers: &message.headers,
            body,
            body_hex,
        }
    }
}

/// 逐行讀取輸入並送入消息串流，返回讀取的消息數
///
/// 空白行會被略過，輸入結束時 `tx` 被丟棄，發布端即看到串流關閉。
pub async fn read_messages<R>(
    reader: R,
    builder: &MessageBuilder,
    tx: mpsc::Sender<Message>,
) -> Result<u64, StdioError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    let mut count = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let record: InputRecord = serde_json::from_str(&line)
            .map_err(|source| StdioError::Parse { line: line_no, source })?;

        let payload = match (record.body, record.body_hex) {
            (Some(_), Some(_)) => return Err(StdioError::AmbiguousBody(line_no)),
            (Some(body), None) => body.into_bytes(),
            (None, Some(body_hex)) => {
                hex::decode(body_hex).map_err(|source| StdioError::Hex { line: line_no, source })?
            }
            (None, None) => Vec::new(),
        };

        let message = builder.build(payload, &record.attributes);
        debug!("Read message for routing_key: {}", message.routing_key);

        tx.send(message).await.map_err(|_| StdioError::StreamClosed)?;
        count += 1;
    }

    Ok(count)
}

/// 將消息串流逐筆寫成 JSON 行，直到串流關閉，返回寫出的消息數
pub async fn write_messages<W>(mut rx: mpsc::Receiver<Message>, mut writer: W) -> Result<u64, StdioError>
where
    W: AsyncWrite + Unpin,
{
    let mut count = 0u64;

    while let Some(message) = rx.recv().await {
        let mut line = serde_json::to_vec(&OutputRecord::from(&message)).map_err(StdioError::Encode)?;
        line.push(b'\n');

        writer.write_all(&line).await?;
        writer.flush().await?;
        count += 1;
    }

    Ok(count)
}
