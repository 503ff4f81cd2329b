use crate::messaging::rabbitmq::error::{RabbitMQError, Result};
use lapin::{Channel, Connection, ConnectionProperties, ConnectionStatus};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 連線狀態輪詢間隔
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// RabbitMQ 連線
///
/// 會話存活期間持有唯一的連線，關閉與流量控制通知只記錄日誌，不會自動重連。
pub struct RabbitMQConnection {
    connection: Connection,
}

impl RabbitMQConnection {
    /// 連線到代理並註冊狀態監聽
    pub async fn connect(uri: &str) -> Result<Self> {
        debug!("Connecting to RabbitMQ");

        let properties = ConnectionProperties::default()
            .with_executor(tokio_executor_trait::Tokio::current());

        let connection = Connection::connect(uri, properties)
            .await
            .map_err(RabbitMQError::Connect)?;

        Self::watch(&connection);

        Ok(Self { connection })
    }

    /// 開啟新通道
    pub async fn create_channel(&self) -> Result<Channel> {
        self.connection
            .create_channel()
            .await
            .map_err(RabbitMQError::Channel)
    }

    pub fn status(&self) -> &ConnectionStatus {
        self.connection.status()
    }

    /// 在背景任務中記錄連線錯誤、關閉與阻塞通知
    ///
    /// 阻塞狀態以 `STATUS_POLL_INTERVAL` 輪詢取得，短於一個輪詢間隔的阻塞
    /// 可能不會被記錄。錯誤經 `on_error` 回呼即時送達，不受此限制。
    fn watch(connection: &Connection) {
        let (error_tx, mut error_rx) = mpsc::unbounded_channel();
        connection.on_error(move |err| {
            let _ = error_tx.send(err);
        });

        let status = connection.status().clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(STATUS_POLL_INTERVAL);
            let mut flow = FlowMonitor::default();

            loop {
                tokio::select! {
                    err = error_rx.recv() => match err {
                        Some(err) => warn!("RabbitMQ connection closing: {}", err),
                        None => break,
                    },
                    _ = ticker.tick() => {
                        match flow.observe(status.blocked()) {
                            Some(true) => warn!("RabbitMQ connection blocked by broker"),
                            Some(false) => info!("RabbitMQ connection unblocked"),
                            None => {}
                        }
                        if status.closed() || status.errored() {
                            info!("RabbitMQ connection closed");
                            break;
                        }
                    }
                }
            }

            debug!("Connection monitor stopped");
        });
    }
}

/// 追蹤阻塞狀態變化
#[derive(Debug, Default)]
struct FlowMonitor {
    blocked: bool,
}

impl FlowMonitor {
    /// 狀態改變時返回新狀態
    fn observe(&mut self, blocked: bool) -> Option<bool> {
        if blocked == self.blocked {
            return None;
        }
        self.blocked = blocked;
        Some(blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_monitor_reports_transitions_only() {
        let mut flow = FlowMonitor::default();

        assert_eq!(flow.observe(false), None);
        assert_eq!(flow.observe(true), Some(true));
        assert_eq!(flow.observe(true), None);
        assert_eq!(flow.observe(false), Some(false));
    }
}
