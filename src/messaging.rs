// 消息系統模組
// 提供進程內消息串流與 RabbitMQ topic 交換機之間的雙向橋接

// 導出子模組
pub mod protocol;
pub mod rabbitmq;

// 重新導出常用類型
pub use protocol::{HeaderValue, Headers, Message, MessageBuilder, ROUTING_KEY_ATTRIBUTE};
pub use rabbitmq::broker::{BrokerChannel, InboundDelivery, LapinChannel};
pub use rabbitmq::error::RabbitMQError;
pub use rabbitmq::session::{RabbitMQSession, SessionConfig};
