//! Customer receipt renderer
//!
//! Renders `ReceiptDocument` / `NonFiscalReceipt` into ESC/POS bytes.

use comanda_printer::EscPosBuilder;

use super::composer::{NonFiscalReceipt, ReceiptDocument};
use super::money::format_brl;
use crate::money::to_decimal;

/// Receipt renderer
///
/// Common widths: 58mm paper = 32 chars, 80mm paper = 48 chars.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptRenderer {
    width: usize,
}

impl ReceiptRenderer {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    /// ESC/POS bytes (Windows-1252)
    pub fn render(&self, doc: &ReceiptDocument) -> Vec<u8> {
        let mut b = EscPosBuilder::new(self.width);
        self.write_document(&mut b, doc);
        self.write_footer(&mut b);
        b.build()
    }

    pub fn render_non_fiscal(&self, receipt: &NonFiscalReceipt) -> Vec<u8> {
        let mut b = EscPosBuilder::new(self.width);
        self.write_non_fiscal(&mut b, receipt);
        b.build()
    }

    /// UTF-8 preview of the printed text
    pub fn preview(&self, doc: &ReceiptDocument) -> String {
        let mut b = EscPosBuilder::new(self.width);
        self.write_document(&mut b, doc);
        self.write_footer(&mut b);
        strip_control(&b.build_raw())
    }

    pub fn preview_non_fiscal(&self, receipt: &NonFiscalReceipt) -> String {
        let mut b = EscPosBuilder::new(self.width);
        self.write_non_fiscal(&mut b, receipt);
        strip_control(&b.build_raw())
    }

    fn write_non_fiscal(&self, b: &mut EscPosBuilder, receipt: &NonFiscalReceipt) {
        self.write_document(b, &receipt.document);
        b.center();
        b.bold();
        b.line("CUPOM NÃO FISCAL");
        b.bold_off();
        b.left();
        b.line_lr("Telefone:", &receipt.customer_phone);
        if let Some(cpf) = &receipt.cpf {
            b.line_lr("CPF:", &format_cpf(cpf));
        }
        self.write_footer(b);
    }

    fn write_document(&self, b: &mut EscPosBuilder, doc: &ReceiptDocument) {
        self.write_header(b, doc);
        b.sep_double();

        for item in &doc.items {
            let left = format!("{}x {}", item.quantity, item.name);
            b.line_lr(&left, &format_brl(to_decimal(item.total_price)));
            if item.quantity > 1 {
                b.line(&format!("   un. {}", format_brl(to_decimal(item.unit_price))));
            }
            if let Some(notes) = &item.notes {
                for segment in notes.split(" | ") {
                    b.wrapped("   ", segment);
                }
            }
        }

        b.sep_single();
        b.line_lr("Subtotal", &format_brl(to_decimal(doc.subtotal)));
        if doc.discount > 0.0 {
            b.line_lr("Desconto", &format!("-{}", format_brl(to_decimal(doc.discount))));
        }
        if doc.delivery_fee > 0.0 {
            b.line_lr("Taxa de entrega", &format_brl(to_decimal(doc.delivery_fee)));
        }
        if doc.tax > 0.0 {
            b.line_lr("Taxas", &format_brl(to_decimal(doc.tax)));
        }
        b.bold();
        b.line_lr("TOTAL", &format_brl(to_decimal(doc.total)));
        b.bold_off();

        if let Some(method) = &doc.payment_method {
            b.line_lr("Pagamento:", method);
        }

        if let Some(instructions) = &doc.general_instructions {
            b.sep_single();
            b.bold();
            b.line("Instruções:");
            b.bold_off();
            b.wrapped("", instructions);
        }
        b.sep_double();
    }

    fn write_header(&self, b: &mut EscPosBuilder, doc: &ReceiptDocument) {
        let h = &doc.header;
        b.center();
        if !h.store_name.is_empty() {
            b.bold();
            b.line(&h.store_name);
            b.bold_off();
        }
        if let Some(address) = &h.store_address {
            b.wrapped("", address);
        }
        if let Some(phone) = &h.store_phone {
            b.line(phone);
        }

        b.double_size();
        b.line(&format!("PEDIDO #{:03}", h.order_number));
        b.reset_size();
        b.line(&doc.order_type);
        b.line(&h.created_at);
        b.left();
        b.sep_single();

        if let Some(name) = &h.customer_name {
            b.line_lr("Cliente:", name);
        }
        if let Some(phone) = &h.customer_phone {
            b.line_lr("Telefone:", phone);
        }
        if let Some(table) = &h.table_number {
            b.line_lr("Mesa:", table);
        }
        if let Some(address) = &h.delivery_address {
            b.line("Endereço:");
            b.wrapped("  ", address);
        }
        if let Some(courier) = &h.courier_name {
            b.line_lr("Entregador:", courier);
        }
    }

    fn write_footer(&self, b: &mut EscPosBuilder) {
        b.center();
        b.line("Obrigado pela preferência!");
        b.left();
        b.feed(3);
        b.cut();
    }
}

impl Default for ReceiptRenderer {
    fn default() -> Self {
        Self::new(48)
    }
}

/// 529.982.247-25
fn format_cpf(cpf: &str) -> String {
    if cpf.len() != 11 {
        return cpf.to_string();
    }
    format!("{}.{}.{}-{}", &cpf[..3], &cpf[3..6], &cpf[6..9], &cpf[9..])
}

/// Drop ESC/GS command sequences, keep text and newlines
fn strip_control(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            // ESC @ has no parameter, every other command used here has one
            '\x1B' | '\x1D' => {
                let cmd = chars.next();
                if !matches!(cmd, Some('@')) {
                    chars.next();
                }
            }
            '\n' => out.push('\n'),
            c if !c.is_control() => out.push(c),
            _ => {}
        }
    }
    out
}
