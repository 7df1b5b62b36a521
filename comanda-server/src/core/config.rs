use std::time::Duration;

use chrono_tz::Tz;
use shared::models::{Courier, StoreInfo};

use crate::orders::tabs::DeploymentMode;

/// 服务器配置 - 所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/comanda | 工作目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | - | 日志目录 (存在时启用滚动文件日志) |
/// | TIMEZONE | America/Sao_Paulo | 业务时区 |
/// | ESTABLISHMENT_ID | default | 门店 ID |
/// | DEPLOYMENT_MODE | partner_site | 主线上渠道: partner_site / online_menu |
/// | PARTNER_SITE_PATTERNS | - | 合作网站域名片段 (逗号分隔) |
/// | RETENTION_MONTHS | 3 | 订单读取窗口 (月) |
/// | REFRESH_MIN_INTERVAL_MS | 2000 | 变更通知最小刷新间隔 |
/// | NEW_ORDER_MIN_SPACING_MS | 500 | 新订单通知最小间隔 |
/// | PRINTER_ADDR | - | 小票打印机 host:port |
/// | PRINTER_TIMEOUT_MS | 5000 | 打印机连接超时 |
/// | RECEIPT_WIDTH | 48 | 每行字符数 (80mm) |
/// | STOCK_SERVICE_URL | - | 库存扣减服务地址 |
/// | STORE_NAME / STORE_ADDRESS / STORE_PHONE | - | 小票抬头 |
/// | PIX_KEY | - | PIX 收款键 |
/// | COURIERS | - | 骑手种子数据 `id:name,id:name` |
///
/// # 示例
///
/// ```ignore
/// PRINTER_ADDR=192.168.0.50:9100 DEPLOYMENT_MODE=online_menu cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// 业务时区
    pub timezone: Tz,
    pub establishment_id: String,

    // === 订单分类 ===
    pub deployment_mode: DeploymentMode,
    pub partner_site_patterns: Vec<String>,
    pub retention_months: u32,

    // === 刷新节流 ===
    pub refresh_min_interval_ms: u64,
    pub new_order_min_spacing_ms: u64,

    // === 外部协作方 ===
    pub printer_addr: Option<String>,
    pub printer_timeout_ms: u64,
    pub receipt_width: usize,
    pub stock_service_url: Option<String>,
    pub pix_key: Option<String>,
    pub couriers: Vec<Courier>,

    /// 小票抬头
    pub store: StoreInfo,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let timezone = std::env::var("TIMEZONE")
            .ok()
            .and_then(|tz| tz.parse::<Tz>().ok())
            .unwrap_or(chrono_tz::America::Sao_Paulo);

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/comanda".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: non_empty_var("LOG_DIR"),
            timezone,
            establishment_id: std::env::var("ESTABLISHMENT_ID")
                .unwrap_or_else(|_| "default".into()),

            deployment_mode: std::env::var("DEPLOYMENT_MODE")
                .ok()
                .and_then(|m| m.parse().ok())
                .unwrap_or_default(),
            partner_site_patterns: std::env::var("PARTNER_SITE_PATTERNS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            retention_months: std::env::var("RETENTION_MONTHS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3),

            refresh_min_interval_ms: std::env::var("REFRESH_MIN_INTERVAL_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(2000),
            new_order_min_spacing_ms: std::env::var("NEW_ORDER_MIN_SPACING_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(500),

            printer_addr: non_empty_var("PRINTER_ADDR"),
            printer_timeout_ms: std::env::var("PRINTER_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(5000),
            receipt_width: std::env::var("RECEIPT_WIDTH")
                .ok()
                .and_then(|p| p.parse().ok())
                .filter(|w| *w >= 32)
                .unwrap_or(48),
            stock_service_url: non_empty_var("STOCK_SERVICE_URL"),
            pix_key: non_empty_var("PIX_KEY"),
            couriers: std::env::var("COURIERS")
                .map(|v| parse_couriers(&v))
                .unwrap_or_default(),

            store: StoreInfo {
                name: std::env::var("STORE_NAME").unwrap_or_else(|_| "Comanda".into()),
                address: non_empty_var("STORE_ADDRESS"),
                phone: non_empty_var("STORE_PHONE"),
                timezone: timezone.name().to_string(),
            },
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn refresh_min_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_min_interval_ms)
    }

    pub fn new_order_min_spacing(&self) -> Duration {
        Duration::from_millis(self.new_order_min_spacing_ms)
    }

    pub fn printer_timeout(&self) -> Duration {
        Duration::from_millis(self.printer_timeout_ms)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// `id:name,id:name`; entries without a name use the id
fn parse_couriers(raw: &str) -> Vec<Courier> {
    parse_list(raw)
        .into_iter()
        .map(|entry| match entry.split_once(':') {
            Some((id, name)) if !name.trim().is_empty() => Courier::new(id.trim(), name.trim()),
            Some((id, _)) => Courier::new(id.trim(), id.trim()),
            None => Courier::new(entry.clone(), entry),
        })
        .collect()
}
