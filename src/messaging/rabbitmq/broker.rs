use crate::messaging::protocol::{headers_from_field_table, headers_to_field_table, Headers, Message};
use crate::messaging::rabbitmq::error::{RabbitMQError, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use lapin::{
    message::Delivery,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
        ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, ExchangeKind,
};
use tracing::debug;

/// 投遞模式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryMode {
    Transient = 1,
    Persistent = 2,
}

/// 發布屬性
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishProperties {
    pub content_type: String,
    pub content_encoding: String,
    pub delivery_mode: DeliveryMode,
}

/// 從代理收到的單筆投遞
#[derive(Clone, Debug, PartialEq)]
pub struct InboundDelivery {
    pub delivery_tag: u64,
    pub message: Message,
}

impl InboundDelivery {
    /// 由投遞的各部分建構，標頭原樣轉換
    pub fn from_parts(
        delivery_tag: u64,
        routing_key: &str,
        body: Vec<u8>,
        properties: &BasicProperties,
    ) -> Self {
        let headers = properties
            .headers()
            .as_ref()
            .map(headers_from_field_table)
            .unwrap_or_else(Headers::new);

        Self {
            delivery_tag,
            message: Message::new(body, routing_key, headers),
        }
    }
}

impl From<Delivery> for InboundDelivery {
    fn from(delivery: Delivery) -> Self {
        Self::from_parts(
            delivery.delivery_tag,
            delivery.routing_key.as_str(),
            delivery.data,
            &delivery.properties,
        )
    }
}

/// 發布時附帶的 AMQP 屬性
pub fn basic_properties(message: &Message, properties: &PublishProperties) -> BasicProperties {
    BasicProperties::default()
        .with_content_type(properties.content_type.clone().into())
        .with_content_encoding(properties.content_encoding.clone().into())
        .with_delivery_mode(properties.delivery_mode as u8)
        .with_headers(headers_to_field_table(&message.headers))
}

/// 投遞串流，訂閱結束時串流結束
pub type DeliveryStream = BoxStream<'static, Result<InboundDelivery>>;

/// 代理通道特徵
///
/// 會話只透過此特徵與代理交互，測試時可替換為記憶體實作。
/// 實作必須允許發布與確認從兩個任務同時呼叫。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// 被動宣告 topic 交換機（不存在時失敗）
    async fn declare_exchange_passive(&self, exchange: &str) -> Result<()>;

    /// 被動宣告佇列，返回當前待處理消息數
    async fn declare_queue_passive(&self, queue: &str) -> Result<u32>;

    async fn bind_queue(&self, queue: &str, exchange: &str, pattern: &str) -> Result<()>;

    async fn set_prefetch(&self, count: u16) -> Result<()>;

    async fn publish(
        &self,
        exchange: &str,
        message: &Message,
        properties: &PublishProperties,
    ) -> Result<()>;

    /// 以手動確認模式開始訂閱
    async fn consume(&self, queue: &str, consumer_tag: &str) -> Result<DeliveryStream>;

    /// 確認單筆投遞（非累積）
    async fn ack(&self, delivery_tag: u64) -> Result<()>;
}

/// 基於 lapin 通道的代理實作
#[derive(Clone)]
pub struct LapinChannel {
    channel: Channel,
}

impl LapinChannel {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl BrokerChannel for LapinChannel {
    async fn declare_exchange_passive(&self, exchange: &str) -> Result<()> {
        debug!("Passively declaring exchange: {}", exchange);

        self.channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    passive: true,
                    durable: true,
                    auto_delete: false,
                    internal: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
            .map_err(|source| RabbitMQError::ExchangeDeclare {
                exchange: exchange.to_string(),
                source,
            })
    }

    async fn declare_queue_passive(&self, queue: &str) -> Result<u32> {
        debug!("Passively declaring queue: {}", queue);

        let declared = self
            .channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    passive: true,
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
            .map_err(|source| RabbitMQError::QueueDeclare {
                queue: queue.to_string(),
                source,
            })?;

        Ok(declared.message_count())
    }

    async fn bind_queue(&self, queue: &str, exchange: &str, pattern: &str) -> Result<()> {
        self.channel
            .queue_bind(
                queue,
                exchange,
                pattern,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|source| RabbitMQError::QueueBind {
                queue: queue.to_string(),
                exchange: exchange.to_string(),
                source,
            })
    }

    async fn set_prefetch(&self, count: u16) -> Result<()> {
        self.channel
            .basic_qos(count, BasicQosOptions::default())
            .await
            .map_err(RabbitMQError::Qos)
    }

    async fn publish(
        &self,
        exchange: &str,
        message: &Message,
        properties: &PublishProperties,
    ) -> Result<()> {
        self.channel
            .basic_publish(
                exchange,
                &message.routing_key,
                BasicPublishOptions {
                    mandatory: false,
                    immediate: false,
                },
                &message.body,
                basic_properties(message, properties),
            )
            .await
            .map_err(|source| RabbitMQError::Publish {
                routing_key: message.routing_key.clone(),
                source,
            })?;

        Ok(())
    }

    async fn consume(&self, queue: &str, consumer_tag: &str) -> Result<DeliveryStream> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions {
                    no_local: false,
                    no_ack: false,
                    exclusive: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
            .map_err(|source| RabbitMQError::Consume {
                queue: queue.to_string(),
                source,
            })?;

        Ok(consumer
            .map(|delivery| {
                delivery
                    .map(InboundDelivery::from)
                    .map_err(RabbitMQError::Delivery)
            })
            .boxed())
    }

    async fn ack(&self, delivery_tag: u64) -> Result<()> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions { multiple: false })
            .await
            .map_err(|source| RabbitMQError::Ack {
                delivery_tag,
                source,
            })
    }
}
