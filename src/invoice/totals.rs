//! Invoice arithmetic: subtotal, percentage discount, percentage tax.

use serde::Serialize;

use crate::Error;

/// One line on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl LineItem {
    /// # Errors
    ///
    /// Returns [Error::EmptyField] for a blank description, [Error::NonPositiveQuantity]
    /// if `quantity` is not greater than zero, and [Error::NonPositiveAmount] for a
    /// negative price.
    pub fn new(description: &str, quantity: f64, unit_price: f64) -> Result<Self, Error> {
        let description = description.trim();
        if description.is_empty() {
            return Err(Error::EmptyField("Item description"));
        }

        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(Error::NonPositiveQuantity(quantity));
        }

        if !unit_price.is_finite() || unit_price < 0.0 {
            return Err(Error::NonPositiveAmount(unit_price));
        }

        Ok(Self {
            description: description.to_owned(),
            quantity,
            unit_price,
        })
    }

    pub fn amount(&self) -> f64 {
        round_to_cents(self.quantity * self.unit_price)
    }
}

/// The money values printed at the bottom of an invoice, each rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub discount: f64,
    /// The subtotal after the discount, which tax is charged on.
    pub taxable: f64,
    pub tax: f64,
    pub total: f64,
}

impl InvoiceTotals {
    /// Calculate the totals for `items`.
    ///
    /// The discount is taken off the subtotal before tax is added.
    pub fn calculate(items: &[LineItem], discount_percent: f64, tax_percent: f64) -> Self {
        let subtotal = round_to_cents(
            items
                .iter()
                .map(|item| item.quantity * item.unit_price)
                .sum(),
        );
        let discount = round_to_cents(subtotal * discount_percent / 100.0);
        let taxable = round_to_cents(subtotal - discount);
        let tax = round_to_cents(taxable * tax_percent / 100.0);
        let total = round_to_cents(taxable + tax);

        Self {
            subtotal,
            discount,
            taxable,
            tax,
            total,
        }
    }
}

/// Check that `percent` is between 0 and 100 inclusive.
pub fn validate_percentage(percent: f64) -> Result<f64, Error> {
    if !(0.0..=100.0).contains(&percent) {
        return Err(Error::InvalidPercentage(percent));
    }

    Ok(percent)
}

/// Round to two decimal places, with halves rounded away from zero.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::{InvoiceTotals, LineItem, round_to_cents, validate_percentage};

    fn item(quantity: f64, unit_price: f64) -> LineItem {
        LineItem::new("Widget", quantity, unit_price).unwrap()
    }

    #[test]
    fn discount_is_applied_before_tax() {
        let totals = InvoiceTotals::calculate(&[item(2.0, 10.0), item(1.0, 5.5)], 10.0, 15.0);

        assert_eq!(
            totals,
            InvoiceTotals {
                subtotal: 25.5,
                discount: 2.55,
                taxable: 22.95,
                tax: 3.44,
                total: 26.39,
            }
        );
    }

    #[test]
    fn halves_round_away_from_zero() {
        assert_eq!(round_to_cents(0.125), 0.13);
        assert_eq!(round_to_cents(-0.125), -0.13);

        let totals = InvoiceTotals::calculate(&[item(1.0, 12.5)], 0.0, 1.0);
        assert_eq!(totals.tax, 0.13);
        assert_eq!(totals.total, 12.63);
    }

    #[test]
    fn empty_invoice_totals_are_zero() {
        let totals = InvoiceTotals::calculate(&[], 50.0, 50.0);

        assert_eq!(totals.total, 0.0);
    }

    #[test]
    fn percentages_must_be_in_range() {
        assert_eq!(validate_percentage(0.0), Ok(0.0));
        assert_eq!(validate_percentage(100.0), Ok(100.0));
        assert_eq!(validate_percentage(100.5), Err(Error::InvalidPercentage(100.5)));
        assert_eq!(validate_percentage(-1.0), Err(Error::InvalidPercentage(-1.0)));
    }

    #[test]
    fn line_item_validation() {
        assert_eq!(
            LineItem::new("Widget", 0.0, 1.0),
            Err(Error::NonPositiveQuantity(0.0))
        );
        assert_eq!(
            LineItem::new(" ", 1.0, 1.0),
            Err(Error::EmptyField("Item description"))
        );
        assert_eq!(item(3.0, 1.1).amount(), 3.3);
    }
}
