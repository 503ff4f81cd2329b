/// 配置管理模組
///
/// 本模組負責加載與驗證橋接程序的配置。
/// 配置來自 `config/<env>.toml` 與 `BRIDGE__` 前綴的環境變數。
pub mod loader;
pub mod types;
pub mod validation;

// 重新導出常用組件
pub use loader::{ConfigLoader, Environment, ENV_PREFIX};
pub use types::*;
pub use validation::{ValidationError, ValidationUtils, Validator};
