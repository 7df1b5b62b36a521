use std::sync::Arc;

use chrono::NaiveDate;

use crate::collaborators::{
    Collaborators, CourierDirectory, DisabledReceiptPrinter, DisabledStockDeduction,
    HttpStockDeduction, MemoryCourierDirectory, MemoryOrderNumberGenerator, MemoryOrderStore,
    NetworkReceiptPrinter, ReceiptPrinter, StockDeduction,
};
use crate::core::{Config, Result, ServerError};
use crate::orders::channel::{ChannelClassifier, ChannelRules};
use crate::orders::refresh::RefreshThrottle;
use crate::orders::tabs::TabTable;
use crate::orders::{OrderBoard, OrdersManager};
use crate::receipt::ReceiptComposer;
use crate::utils::time;

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Arc<Config> | 配置项 (不可变) |
/// | orders | Arc<OrdersManager> | 订单命令处理 + 副作用 |
/// | board | Arc<OrderBoard> | 看板读模型 (渠道 + 标签页) |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub orders: Arc<OrdersManager>,
    pub board: Arc<OrderBoard>,
}

impl ServerState {
    /// 按配置组装协作方并创建状态
    ///
    /// 未配置打印机 / 库存服务时使用禁用实现
    pub async fn initialize(config: &Config) -> Result<Self> {
        let printer: Arc<dyn ReceiptPrinter> = match &config.printer_addr {
            Some(addr) => Arc::new(
                NetworkReceiptPrinter::new(addr, config.receipt_width, config.printer_timeout())
                    .map_err(|e| ServerError::Config(format!("PRINTER_ADDR: {}", e)))?,
            ),
            None => {
                tracing::warn!("PRINTER_ADDR not set, receipt printing disabled");
                Arc::new(DisabledReceiptPrinter)
            }
        };

        let stock: Arc<dyn StockDeduction> = match &config.stock_service_url {
            Some(url) => Arc::new(
                HttpStockDeduction::new(url.clone())
                    .map_err(|e| ServerError::Config(format!("STOCK_SERVICE_URL: {}", e)))?,
            ),
            None => {
                tracing::info!("STOCK_SERVICE_URL not set, stock deduction skipped");
                Arc::new(DisabledStockDeduction)
            }
        };

        let couriers: Arc<dyn CourierDirectory> = Arc::new(MemoryCourierDirectory::with_couriers(
            &config.establishment_id,
            config.couriers.clone(),
        ));

        let collaborators = Collaborators {
            store: Arc::new(MemoryOrderStore::new()),
            stock,
            couriers,
            numbers: Arc::new(MemoryOrderNumberGenerator::new()),
            printer,
        };

        Ok(Self::with_collaborators(config.clone(), collaborators))
    }

    /// 使用给定协作方创建状态 (测试场景)
    pub fn with_collaborators(config: Config, collaborators: Collaborators) -> Self {
        let classifier =
            ChannelClassifier::new(ChannelRules::with_partner_patterns(&config.partner_site_patterns));
        let composer = ReceiptComposer::new(config.store.clone(), config.timezone, classifier.clone());

        let orders = OrdersManager::new(collaborators, classifier.clone(), composer, config.timezone)
            .with_establishment(config.establishment_id.clone())
            .with_retention_months(config.retention_months);
        let board = OrderBoard::new(
            classifier,
            TabTable::for_mode(config.deployment_mode),
            config.timezone,
        );

        tracing::info!(
            establishment_id = %config.establishment_id,
            deployment_mode = ?config.deployment_mode,
            timezone = %config.timezone,
            "Server state initialized"
        );

        Self {
            config: Arc::new(config),
            orders: Arc::new(orders),
            board: Arc::new(board),
        }
    }

    /// 当前业务日期
    pub fn today(&self) -> NaiveDate {
        time::today(self.config.timezone)
    }

    pub fn refresh_throttle(&self) -> RefreshThrottle {
        RefreshThrottle::new(
            self.config.refresh_min_interval(),
            self.config.new_order_min_spacing(),
        )
    }

    pub fn pix_key(&self) -> Option<&str> {
        self.config.pix_key.as_deref()
    }
}
