use lapin::Error as LapinError;
use std::fmt;
use thiserror::Error;

/// RabbitMQ 橋接錯誤類型
///
/// 每個變體對應一個失敗的代理操作，是否終止程序由呼叫端決定。
#[derive(Error, Debug)]
pub enum RabbitMQError {
    #[error("Failed to connect to RabbitMQ: {0}")]
    Connect(#[source] LapinError),

    #[error("Failed to open a channel: {0}")]
    Channel(#[source] LapinError),

    #[error("Exchange declare failed for {exchange:?}: {source}")]
    ExchangeDeclare {
        exchange: String,
        #[source]
        source: LapinError,
    },

    #[error("Queue declare failed for {queue:?}: {source}")]
    QueueDeclare {
        queue: String,
        #[source]
        source: LapinError,
    },

    #[error("No messages in queue: {0:?}")]
    EmptyQueue(String),

    #[error("Queue bind failed for {queue:?} on exchange {exchange:?}: {source}")]
    QueueBind {
        queue: String,
        exchange: String,
        #[source]
        source: LapinError,
    },

    #[error("Failed to set prefetch count: {0}")]
    Qos(#[source] LapinError),

    #[error("Consumer failed on queue {queue:?}: {source}")]
    Consume {
        queue: String,
        #[source]
        source: LapinError,
    },

    #[error("Error receiving delivery: {0}")]
    Delivery(#[source] LapinError),

    #[error("Failed to publish message with routing key {routing_key:?}: {source}")]
    Publish {
        routing_key: String,
        #[source]
        source: LapinError,
    },

    #[error("Failed to acknowledge delivery {delivery_tag}: {source}")]
    Ack {
        delivery_tag: u64,
        #[source]
        source: LapinError,
    },

    #[error("Output stream closed")]
    OutputClosed,

    #[error("{0} is not enabled for this session")]
    ModeDisabled(SessionMode),
}

/// 會話模式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Publish,
    Consume,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Publish => write!(f, "Publish"),
            SessionMode::Consume => write!(f, "Consume"),
        }
    }
}

impl RabbitMQError {
    /// 是否為建立會話期間的錯誤（連線、宣告、綁定、訂閱）
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            RabbitMQError::Connect(_)
                | RabbitMQError::Channel(_)
                | RabbitMQError::ExchangeDeclare { .. }
                | RabbitMQError::QueueDeclare { .. }
                | RabbitMQError::EmptyQueue(_)
                | RabbitMQError::QueueBind { .. }
                | RabbitMQError::Qos(_)
                | RabbitMQError::Consume { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RabbitMQError>;
