use lapin::types::{AMQPValue, ByteArray, DecimalValue, FieldArray, FieldTable, LongString, ShortString};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// 保留的屬性鍵，代表傳輸層的路由鍵，建構消息時會被抽出而不寫入標頭
pub const ROUTING_KEY_ATTRIBUTE: &str = "amqp.routingKey";

/// 消息標頭
pub type Headers = BTreeMap<String, HeaderValue>;

/// 標頭值
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// 非 UTF-8 的 AMQP 長字串，保留原始位元組
    RawString(Vec<u8>),
    Bytes(Vec<u8>),
    Timestamp(u64),
    Decimal { scale: u8, value: u32 },
    Array(Vec<HeaderValue>),
    Table(Headers),
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::String(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::String(value)
    }
}

impl From<&AMQPValue> for HeaderValue {
    fn from(value: &AMQPValue) -> Self {
        match value {
            AMQPValue::Boolean(v) => HeaderValue::Bool(*v),
            AMQPValue::ShortShortInt(v) => HeaderValue::Int(i64::from(*v)),
            AMQPValue::ShortShortUInt(v) => HeaderValue::Int(i64::from(*v)),
            AMQPValue::ShortInt(v) => HeaderValue::Int(i64::from(*v)),
            AMQPValue::ShortUInt(v) => HeaderValue::Int(i64::from(*v)),
            AMQPValue::LongInt(v) => HeaderValue::Int(i64::from(*v)),
            AMQPValue::LongUInt(v) => HeaderValue::Int(i64::from(*v)),
            AMQPValue::LongLongInt(v) => HeaderValue::Int(*v),
            AMQPValue::Float(v) => HeaderValue::Float(f64::from(*v)),
            AMQPValue::Double(v) => HeaderValue::Float(*v),
            AMQPValue::DecimalValue(v) => HeaderValue::Decimal {
                scale: v.scale,
                value: v.value,
            },
            AMQPValue::ShortString(v) => HeaderValue::String(v.as_str().to_string()),
            AMQPValue::LongString(v) => match std::str::from_utf8(v.as_bytes()) {
                Ok(text) => HeaderValue::String(text.to_string()),
                Err(_) => HeaderValue::RawString(v.as_bytes().to_vec()),
            },
            AMQPValue::FieldArray(v) => {
                HeaderValue::Array(v.as_slice().iter().map(HeaderValue::from).collect())
            }
            AMQPValue::Timestamp(v) => HeaderValue::Timestamp(*v),
            AMQPValue::FieldTable(v) => HeaderValue::Table(headers_from_field_table(v)),
            AMQPValue::ByteArray(v) => HeaderValue::Bytes(v.as_slice().to_vec()),
            AMQPValue::Void => HeaderValue::Null,
        }
    }
}

impl From<&HeaderValue> for AMQPValue {
    fn from(value: &HeaderValue) -> Self {
        match value {
            HeaderValue::Null => AMQPValue::Void,
            HeaderValue::Bool(v) => AMQPValue::Boolean(*v),
            HeaderValue::Int(v) => AMQPValue::LongLongInt(*v),
            HeaderValue::Float(v) => AMQPValue::Double(*v),
            HeaderValue::String(v) => AMQPValue::LongString(LongString::from(v.clone())),
            HeaderValue::RawString(v) => AMQPValue::LongString(LongString::from(v.clone())),
            HeaderValue::Bytes(v) => AMQPValue::ByteArray(ByteArray::from(v.clone())),
            HeaderValue::Timestamp(v) => AMQPValue::Timestamp(*v),
            HeaderValue::Decimal { scale, value } => AMQPValue::DecimalValue(DecimalValue {
                scale: *scale,
                value: *value,
            }),
            HeaderValue::Array(v) => AMQPValue::FieldArray(FieldArray::from(
                v.iter().map(AMQPValue::from).collect::<Vec<_>>(),
            )),
            HeaderValue::Table(v) => AMQPValue::FieldTable(headers_to_field_table(v)),
        }
    }
}

/// 將 AMQP 標頭表轉換為內部標頭
pub fn headers_from_field_table(table: &FieldTable) -> Headers {
    table
        .inner()
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), HeaderValue::from(value)))
        .collect()
}

/// 將內部標頭轉換為 AMQP 標頭表
pub fn headers_to_field_table(headers: &Headers) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in headers {
        table.insert(ShortString::from(key.clone()), AMQPValue::from(value));
    }
    table
}

/// 消息，串流與代理之間交換的基本單位
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// 消息載荷
    pub body: Vec<u8>,
    /// 路由鍵，消費時為原發布者使用的路由鍵
    pub routing_key: String,
    /// 消息標頭
    pub headers: Headers,
}

impl Message {
    /// 創建新消息
    pub fn new(body: impl Into<Vec<u8>>, routing_key: impl Into<String>, headers: Headers) -> Self {
        Self {
            body: body.into(),
            routing_key: routing_key.into(),
            headers,
        }
    }

    /// 取得指定標頭
    pub fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.headers.get(key)
    }
}

/// 消息建構器
///
/// 由原始載荷與屬性表建構 [`Message`]。覆寫路由鍵以參數形式傳入，
/// 建構過程不讀取任何全域配置。
#[derive(Clone, Debug, Default)]
pub struct MessageBuilder {
    routing_key_override: String,
    fallback_routing_key: String,
}

impl MessageBuilder {
    /// 創建建構器，空字串表示不覆寫路由鍵
    pub fn new(routing_key_override: impl Into<String>) -> Self {
        Self {
            routing_key_override: routing_key_override.into(),
            fallback_routing_key: String::new(),
        }
    }

    /// 設置沒有路由鍵屬性且未覆寫時使用的路由鍵（預設為空字串）
    pub fn with_fallback_routing_key(mut self, key: impl Into<String>) -> Self {
        self.fallback_routing_key = key.into();
        self
    }

    pub fn routing_key_override(&self) -> &str {
        &self.routing_key_override
    }

    pub fn fallback_routing_key(&self) -> &str {
        &self.fallback_routing_key
    }

    /// 建構消息
    pub fn build(&self, payload: impl Into<Vec<u8>>, attributes: &HashMap<String, String>) -> Message {
        let mut headers = Headers::new();
        let mut attribute_key = None;

        for (key, value) in attributes {
            if key == ROUTING_KEY_ATTRIBUTE {
                attribute_key = Some(value.as_str());
            } else {
                headers.insert(key.clone(), HeaderValue::String(value.clone()));
            }
        }

        let routing_key = if !self.routing_key_override.is_empty() {
            self.routing_key_override.clone()
        } else {
            attribute_key
                .unwrap_or(self.fallback_routing_key.as_str())
                .to_string()
        };

        Message::new(payload, routing_key, headers)
    }
}
