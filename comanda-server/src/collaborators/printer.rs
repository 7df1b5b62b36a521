//! 小票打印 (receipt printer collaborator)

use std::time::Duration;

use async_trait::async_trait;
use comanda_printer::{NetworkPrinter, Printer};
use tracing::instrument;

use super::{CollabResult, CollaboratorError, ReceiptPrinter};
use crate::receipt::{NonFiscalReceipt, ReceiptDocument, ReceiptRenderer};

/// Renders receipts and sends them to a TCP (9100) printer
#[derive(Debug, Clone)]
pub struct NetworkReceiptPrinter {
    renderer: ReceiptRenderer,
    printer: NetworkPrinter,
}

impl NetworkReceiptPrinter {
    pub fn new(addr: &str, width: usize, timeout: Duration) -> CollabResult<Self> {
        Ok(Self {
            renderer: ReceiptRenderer::new(width),
            printer: NetworkPrinter::from_addr(addr)?.with_timeout(timeout),
        })
    }
}

#[async_trait]
impl ReceiptPrinter for NetworkReceiptPrinter {
    #[instrument(skip_all, fields(order_id = %document.order_id, addr = %self.printer.addr()))]
    async fn print_receipt(&self, document: &ReceiptDocument) -> CollabResult<()> {
        let data = self.renderer.render(document);
        self.printer.print(&data).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(order_id = %receipt.document.order_id, addr = %self.printer.addr()))]
    async fn print_non_fiscal(&self, receipt: &NonFiscalReceipt) -> CollabResult<()> {
        let data = self.renderer.render_non_fiscal(receipt);
        self.printer.print(&data).await?;
        Ok(())
    }
}

/// Used when no printer is configured; every job fails
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledReceiptPrinter;

#[async_trait]
impl ReceiptPrinter for DisabledReceiptPrinter {
    async fn print_receipt(&self, _document: &ReceiptDocument) -> CollabResult<()> {
        Err(CollaboratorError::Disabled("Receipt printer"))
    }

    async fn print_non_fiscal(&self, _receipt: &NonFiscalReceipt) -> CollabResult<()> {
        Err(CollaboratorError::Disabled("Receipt printer"))
    }
}
