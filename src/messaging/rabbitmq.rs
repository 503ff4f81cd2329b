// RabbitMQ 模組
// 提供與 RabbitMQ 通訊的基礎設施

// 導出子模組
pub mod broker;
pub mod connection;
pub mod error;
pub mod session;

// 重新導出常用結構
pub use broker::{BrokerChannel, DeliveryMode, DeliveryStream, InboundDelivery, LapinChannel, PublishProperties};
pub use connection::RabbitMQConnection;
pub use error::{RabbitMQError, SessionMode};
pub use session::{RabbitMQSession, SessionConfig, CATCH_ALL_BINDING, CONTENT_ENCODING, CONTENT_TYPE};
