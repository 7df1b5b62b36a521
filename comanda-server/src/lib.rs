//! Comanda Server - 餐厅订单看板与小票核心
//!
//! # 架构概述
//!
//! - **订单** (`orders`): 渠道分类、标签页分区、生命周期命令、副作用 outbox、刷新节流
//! - **小票** (`receipt`): 备注解析 (四级策略)、小票组装、ESC/POS 渲染
//! - **赊账** (`credit`): 逾期天数、利息、应收看板
//! - **消息** (`messaging`): WhatsApp 付款提醒链接
//! - **协作方** (`collaborators`): 订单存储、库存扣减、骑手、单号、打印机
//! - **HTTP API** (`api`): axum 路由
//!
//! # 模块结构
//!
//! ```text
//! comanda-server/src/
//! ├── core/           # 配置、状态、服务器、错误
//! ├── api/            # HTTP 路由和处理器
//! ├── orders/         # 订单生命周期
//! ├── receipt/        # 小票
//! ├── credit/         # 赊账
//! ├── collaborators/  # 外部协作方
//! └── utils/          # 错误、日志、时区
//! ```

pub mod api;
pub mod collaborators;
pub mod core;
pub mod credit;
pub mod messaging;
pub mod money;
pub mod orders;
pub mod receipt;
pub mod utils;

// Re-export 公共类型
pub use collaborators::Collaborators;
pub use core::{Config, Server, ServerState};
pub use orders::{OrderBoard, OrdersManager};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境: dotenv + 日志
pub fn setup_environment() -> anyhow::Result<()> {
    // .env 不存在时忽略
    let _ = dotenv::dotenv();

    let config = Config::from_env();
    if !std::path::Path::new(&config.work_dir).exists() {
        std::fs::create_dir_all(&config.work_dir)?;
    }
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
  ____                                _
 / ___|___  _ __ ___   __ _ _ __   __| | __ _
| |   / _ \| '_ ` _ \ / _` | '_ \ / _` |/ _` |
| |__| (_) | | | | | | (_| | | | | (_| | (_| |
 \____\___/|_| |_| |_|\__,_|_| |_|\__,_|\__,_|
    "#
    );
}
