use amqp_bridge::config::{ApplicationConfig, LogConfig};
use amqp_bridge::messaging::{MessageBuilder, RabbitMQSession, SessionConfig, ROUTING_KEY_ATTRIBUTE};
use amqp_bridge::stdio;
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化配置
    let app_config = ApplicationConfig::load_from_env().context("Failed to load configuration")?;

    // 初始化日誌系統
    init_logging(&app_config.log)?;

    let rabbitmq = &app_config.rabbitmq;

    // 建立會話失敗即退出，不重試
    let session = match RabbitMQSession::open(SessionConfig::from(rabbitmq)).await {
        Ok(session) => Arc::new(session),
        Err(err) => {
            error!(setup = err.is_setup(), "RabbitMQ session setup failed: {}", err);
            return Err(err.into());
        }
    };

    let mut tasks = JoinSet::new();

    if rabbitmq.publish {
        let builder = MessageBuilder::new(rabbitmq.routing_key.clone())
            .with_fallback_routing_key(rabbitmq.fallback_routing_key.clone());

        if builder.routing_key_override().is_empty() && builder.fallback_routing_key().is_empty() {
            warn!(
                "No routing key override or fallback configured, messages without {} are published with an empty routing key",
                ROUTING_KEY_ATTRIBUTE
            );
        }

        let (tx, rx) = mpsc::channel(rabbitmq.channel_buffer);

        tasks.spawn(async move {
            let read = stdio::read_messages(BufReader::new(tokio::io::stdin()), &builder, tx)
                .await
                .context("Failed to read messages from stdin")?;
            info!(read, "Standard input exhausted");
            anyhow::Ok(())
        });

        let session = session.clone();
        tasks.spawn(async move {
            session.publish(rx).await.context("Publish loop failed")?;
            anyhow::Ok(())
        });
    }

    if rabbitmq.consume {
        let (tx, rx) = mpsc::channel(rabbitmq.channel_buffer);

        let session = session.clone();
        tasks.spawn(async move {
            session.consume(tx).await.context("Consume loop failed")?;
            anyhow::Ok(())
        });

        tasks.spawn(async move {
            let written = stdio::write_messages(rx, tokio::io::stdout())
                .await
                .context("Failed to write messages to stdout")?;
            info!(written, "Output stream closed");
            anyhow::Ok(())
        });
    }

    // 任一迴圈失敗即終止程序
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!("{:#}", err);
                return Err(err);
            }
            Err(err) => return Err(anyhow!("Bridge task aborted: {}", err)),
        }
    }

    info!("Bridge finished");

    Ok(())
}

// 初始化日誌系統，日誌寫入 stderr，stdout 保留給消息輸出
fn init_logging(log_config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_config.level.to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match log_config.format.to_lowercase().as_str() {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    };

    result.map_err(|e| anyhow!("Failed to initialise logging: {}", e))?;

    info!("Logging initialised");
    Ok(())
}
