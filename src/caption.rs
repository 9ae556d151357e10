//! Renewal reminder captions.
//!
//! A caption is the MarkdownV2 text posted for one due order plus, when a
//! price is known, a VietQR image for the exact transfer. The QR fetch is the
//! only step that can fail, and its failure only drops the image.

use tracing::warn;

use crate::columns::{order_cell, OrderField};
use crate::config::PaymentConfig;
use crate::jobs::DueOrder;
use crate::pricing::PriceTable;
use crate::qr::QrImageSource;
use crate::text::{escape_markdown, format_price};

/// Text and optional QR image for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub text: String,
    pub image: Option<Vec<u8>>,
}

/// Fields of an order row, as shown in a caption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct OrderFields<'a> {
    order_id: &'a str,
    product: &'a str,
    description: &'a str,
    customer: &'a str,
    contact: &'a str,
    slot: &'a str,
    registered_on: &'a str,
    duration_days: &'a str,
    expires_on: &'a str,
    sale_price: &'a str,
}

impl<'a> OrderFields<'a> {
    fn from_row(row: &'a [String]) -> Self {
        Self {
            order_id: order_cell(row, OrderField::OrderId),
            product: order_cell(row, OrderField::ProductCode),
            description: order_cell(row, OrderField::Description),
            customer: order_cell(row, OrderField::CustomerName),
            contact: order_cell(row, OrderField::ContactLink),
            slot: order_cell(row, OrderField::Slot),
            registered_on: order_cell(row, OrderField::RegisteredOn),
            duration_days: order_cell(row, OrderField::DurationDays),
            expires_on: order_cell(row, OrderField::ExpiresOn),
            sale_price: order_cell(row, OrderField::SalePrice),
        }
    }
}

/// Status line for an order with `days_remaining` days left.
pub fn status_line(days_remaining: i64) -> String {
    if days_remaining <= 0 {
        format!("Đã hết hạn {} ngày trước", days_remaining.unsigned_abs())
    } else {
        format!("Còn lại {} ngày", days_remaining)
    }
}

fn or_placeholder(value: &str) -> String {
    if value.is_empty() {
        escape_markdown("---")
    } else {
        escape_markdown(value)
    }
}

/// Builds captions for one run; borrows the run's price snapshot.
pub struct CaptionBuilder<'a> {
    prices: PriceTable<'a>,
    payment: &'a PaymentConfig,
    qr: &'a dyn QrImageSource,
}

impl<'a> CaptionBuilder<'a> {
    pub fn new(
        prices: PriceTable<'a>,
        payment: &'a PaymentConfig,
        qr: &'a dyn QrImageSource,
    ) -> Self {
        Self {
            prices,
            payment,
            qr,
        }
    }

    /// Price the order, render its text and fetch the QR image.
    ///
    /// `position` is 1-based among the orders announced in this run.
    pub async fn build(&self, order: &DueOrder, position: usize, total: usize) -> Caption {
        let fields = OrderFields::from_row(&order.row);
        let fallback = (!fields.sale_price.is_empty()).then_some(fields.sale_price);
        let price = self.prices.resolve(fields.order_id, fields.product, fallback);

        let text = self.render(&order.row, price, position, total, order.days_remaining);

        let image = if price > 0 {
            match self.qr.fetch(price, fields.order_id).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(order_id = fields.order_id, "QR image unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Caption { text, image }
    }

    /// Render the caption text for an already-priced order.
    pub fn render(
        &self,
        row: &[String],
        price: u64,
        position: usize,
        total: usize,
        days_remaining: i64,
    ) -> String {
        let f = OrderFields::from_row(row);
        let order_id = escape_markdown(f.order_id);

        let mut lines = vec![
            format!("*Đơn Cần Gia Hạn \\({position}/{total}\\)*"),
            format!("*Sản phẩm:* {}", or_placeholder(f.product)),
            format!("*Mã đơn:* `{order_id}`"),
            format!("*Trạng thái:* {}", escape_markdown(&status_line(days_remaining))),
            String::new(),
            "*THÔNG TIN SẢN PHẨM*".to_string(),
            format!("\\- *Mô tả:* {}", or_placeholder(f.description)),
        ];
        if !f.slot.is_empty() {
            lines.push(format!("\\- *Slot:* {}", escape_markdown(f.slot)));
        }
        if !f.registered_on.is_empty() {
            lines.push(format!("\\- *Ngày đăng ký:* {}", escape_markdown(f.registered_on)));
        }
        lines.push(format!("\\- *Thời hạn:* {} ngày", or_placeholder(f.duration_days)));
        lines.push(format!("\\- *Ngày hết hạn:* {}", or_placeholder(f.expires_on)));
        lines.push(format!("\\- *Giá bán:* {}", escape_markdown(&format_price(price))));

        lines.push(String::new());
        lines.push("*THÔNG TIN KHÁCH HÀNG*".to_string());
        lines.push(format!("\\- *Tên khách:* {}", or_placeholder(f.customer)));
        if !f.contact.is_empty() {
            lines.push(format!("\\- *Liên hệ:* {}", escape_markdown(f.contact)));
        }

        lines.push(String::new());
        lines.push("*THÔNG TIN THANH TOÁN*".to_string());
        lines.push(format!(
            "\\- *Ngân hàng:* {}",
            escape_markdown(&self.payment.bank_name)
        ));
        lines.push(format!(
            "\\- *Số tài khoản:* `{}`",
            escape_markdown(&self.payment.account_number)
        ));
        lines.push(format!(
            "\\- *Chủ tài khoản:* {}",
            escape_markdown(&self.payment.account_name)
        ));
        lines.push(format!("\\- *Nội dung chuyển khoản:* `{order_id}`"));
        lines.push(String::new());
        lines.push(escape_markdown(
            "Vui lòng chuyển khoản đúng số tiền và mã đơn hàng. Xin cảm ơn!",
        ));

        lines.join("\n")
    }
}
