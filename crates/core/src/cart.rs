//! Cart lines and the checkout order summary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::product::Product;
use crate::types::{Price, ProductId};

/// Sales tax applied at checkout (10%).
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// One product in a cart with its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: i32,
}

impl CartLine {
    /// Product id of this line.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product.id
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Totals shown on the checkout page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub item_count: i64,
    pub subtotal: Price,
    pub shipping: Price,
    pub taxes: Price,
    pub grand_total: Price,
}

impl OrderSummary {
    /// Compute totals for `lines`. Shipping is always free.
    #[must_use]
    pub fn from_lines(lines: &[CartLine]) -> Self {
        let subtotal: Price = lines.iter().map(CartLine::line_total).sum();
        let shipping = Price::ZERO;
        let taxes = subtotal * TAX_RATE;

        Self {
            item_count: lines.iter().map(|line| i64::from(line.quantity)).sum(),
            subtotal,
            shipping,
            taxes,
            grand_total: subtotal + shipping + taxes,
        }
    }

    /// Shipping label: `Free` or the formatted amount.
    #[must_use]
    pub fn shipping_label(&self) -> String {
        if self.shipping == Price::ZERO {
            "Free".to_string()
        } else {
            self.shipping.display()
        }
    }
}
