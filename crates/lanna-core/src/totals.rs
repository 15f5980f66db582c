//! # Tax Invoice Totals
//!
//! The amounts written to a tax invoice header when it is posted.
//!
//! ## Calculation
//! ```text
//! per line:
//!   gross = quantity × unit_cost            (rounded half-up to satang)
//!   net   = gross − line_discount
//!   vat   = net × tax_rate                  (rounded half-up to satang)
//!
//! header:
//!   subtotal    = Σ net
//!   vat         = Σ line vat
//!   grand_total = subtotal − discount + freight + other_charge + vat
//! ```
//!
//! VAT is rounded per line, as printed on Thai tax invoices, so the header
//! VAT is the sum of the printed line figures.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::draft::TiDraftPayload;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{TaxInvoice, TaxInvoiceLine, TaxRate};

/// Header-level amounts entered on the invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HeaderAdjustments {
    pub discount: Money,
    pub freight: Money,
    pub other_charge: Money,
}

impl From<&TaxInvoice> for HeaderAdjustments {
    fn from(ti: &TaxInvoice) -> Self {
        HeaderAdjustments {
            discount: ti.discount_amount,
            freight: ti.freight_amount,
            other_charge: ti.other_charge_amount,
        }
    }
}

/// Computed amounts for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TiLineAmounts {
    pub line_no: u32,
    pub gross: Money,
    pub discount: Money,
    pub net: Money,
    pub vat: Money,
}

/// Computed invoice totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TiTotals {
    pub lines: Vec<TiLineAmounts>,
    pub subtotal: Money,
    pub vat: Money,
    pub grand_total: Money,
}

/// Computes totals for stored invoice lines.
///
/// ## Errors
/// `CoreError::PostingRule` when there are no lines, an adjustment is
/// negative, a line discount exceeds its gross amount, the header discount
/// exceeds the subtotal, or an amount leaves the `i64` satang range.
pub fn compute_ti_totals(
    lines: &[TaxInvoiceLine],
    adjustments: HeaderAdjustments,
) -> CoreResult<TiTotals> {
    let amounts = lines
        .iter()
        .map(|l| line_amounts(l.line_no, l.quantity, l.unit_cost, l.line_discount, l.tax_rate))
        .collect::<CoreResult<Vec<_>>>()?;
    sum_totals(amounts, adjustments)
}

/// Computes totals for an unsaved form, for the live preview.
pub fn preview_ti_totals(payload: &TiDraftPayload) -> CoreResult<TiTotals> {
    let amounts = payload
        .lines
        .iter()
        .map(|l| line_amounts(l.line_no, l.quantity, l.unit_cost, l.line_discount, l.tax_rate))
        .collect::<CoreResult<Vec<_>>>()?;
    sum_totals(
        amounts,
        HeaderAdjustments {
            discount: payload.discount_amount,
            freight: payload.freight_amount,
            other_charge: payload.other_charge_amount,
        },
    )
}

fn line_amounts(
    line_no: u32,
    quantity: Quantity,
    unit_cost: Money,
    discount: Money,
    rate: TaxRate,
) -> CoreResult<TiLineAmounts> {
    let gross = unit_cost
        .checked_times_quantity(quantity)
        .ok_or_else(|| out_of_range(&format!("Line {} amount", line_no)))?;
    if discount.is_negative() || discount > gross {
        return Err(CoreError::PostingRule(format!(
            "Line {}: discount {} is outside 0..{}",
            line_no, discount, gross
        )));
    }
    let net = gross - discount;
    Ok(TiLineAmounts {
        line_no,
        gross,
        discount,
        net,
        vat: net.calculate_tax(rate),
    })
}

fn sum_totals(lines: Vec<TiLineAmounts>, adj: HeaderAdjustments) -> CoreResult<TiTotals> {
    if lines.is_empty() {
        return Err(CoreError::PostingRule(
            "Tax invoice has no lines".to_string(),
        ));
    }

    for (name, amount) in [
        ("Discount", adj.discount),
        ("Freight", adj.freight),
        ("Other charge", adj.other_charge),
    ] {
        if amount.is_negative() {
            return Err(CoreError::PostingRule(format!(
                "{} amount {} must not be negative",
                name, amount
            )));
        }
    }

    let subtotal = checked_sum(lines.iter().map(|l| l.net)).ok_or_else(|| out_of_range("Subtotal"))?;
    let vat = checked_sum(lines.iter().map(|l| l.vat)).ok_or_else(|| out_of_range("VAT total"))?;

    if adj.discount > subtotal {
        return Err(CoreError::PostingRule(format!(
            "Discount {} exceeds line subtotal {}",
            adj.discount, subtotal
        )));
    }

    let grand_total = (subtotal - adj.discount)
        .checked_add(adj.freight)
        .and_then(|t| t.checked_add(adj.other_charge))
        .and_then(|t| t.checked_add(vat))
        .ok_or_else(|| out_of_range("Grand total"))?;

    Ok(TiTotals {
        lines,
        subtotal,
        vat,
        grand_total,
    })
}

fn checked_sum(amounts: impl Iterator<Item = Money>) -> Option<Money> {
    amounts.fold(Some(Money::zero()), |acc, m| acc?.checked_add(m))
}

fn out_of_range(what: &str) -> CoreError {
    CoreError::PostingRule(format!("{} exceeds the supported amount range", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(line_no: u32, qty_milli: i64, cost: i64, discount: i64, bps: u32) -> TaxInvoiceLine {
        TaxInvoiceLine {
            id: format!("line-{}", line_no),
            ti_id: "ti-1".to_string(),
            line_no,
            sku_id: "sku".to_string(),
            quantity: Quantity::from_milli(qty_milli),
            unit_cost: Money::from_satang(cost),
            line_discount: Money::from_satang(discount),
            tax_rate: TaxRate::from_bps(bps),
        }
    }

    #[test]
    fn test_totals_with_adjustments() {
        // 10 × ฿12.50 = ฿125.00, VAT ฿8.75
        // 2.5 × ฿40.00 = ฿100.00 − ฿10.00 = ฿90.00, VAT ฿6.30
        let lines = vec![
            line(1, 10_000, 1_250, 0, 700),
            line(2, 2_500, 4_000, 1_000, 700),
        ];
        let adj = HeaderAdjustments {
            discount: Money::from_satang(1_500),
            freight: Money::from_satang(5_000),
            other_charge: Money::from_satang(200),
        };

        let totals = compute_ti_totals(&lines, adj).unwrap();
        assert_eq!(totals.subtotal.satang(), 21_500);
        assert_eq!(totals.vat.satang(), 875 + 630);
        // 215.00 − 15.00 + 50.00 + 2.00 + 15.05
        assert_eq!(totals.grand_total.satang(), 26_705);
        assert_eq!(totals.lines[1].net.satang(), 9_000);
    }

    #[test]
    fn test_vat_rounded_per_line() {
        // ฿0.10 net at 7% = 0.7 satang → 1 per line, 3 lines → 3 satang
        let lines = vec![
            line(1, 1_000, 10, 0, 700),
            line(2, 1_000, 10, 0, 700),
            line(3, 1_000, 10, 0, 700),
        ];
        let totals = compute_ti_totals(&lines, HeaderAdjustments::default()).unwrap();
        assert_eq!(totals.vat.satang(), 3);
    }

    #[test]
    fn test_zero_rated_line() {
        let totals =
            compute_ti_totals(&[line(1, 1_000, 5_000, 0, 0)], HeaderAdjustments::default()).unwrap();
        assert_eq!(totals.vat, Money::zero());
        assert_eq!(totals.grand_total.satang(), 5_000);
    }

    #[test]
    fn test_discount_above_subtotal_rejected() {
        let adj = HeaderAdjustments {
            discount: Money::from_satang(10_001),
            ..HeaderAdjustments::default()
        };
        let err = compute_ti_totals(&[line(1, 1_000, 10_000, 0, 700)], adj).unwrap_err();
        assert!(matches!(err, CoreError::PostingRule(_)));
        assert!(err.to_string().contains("exceeds line subtotal"));
    }

    #[test]
    fn test_negative_adjustment_rejected() {
        let adj = HeaderAdjustments {
            freight: Money::from_satang(-1),
            ..HeaderAdjustments::default()
        };
        let err = compute_ti_totals(&[line(1, 1_000, 100, 0, 0)], adj).unwrap_err();
        assert_eq!(err.to_string(), "Freight amount -฿0.01 must not be negative");
    }

    #[test]
    fn test_line_discount_above_gross_rejected() {
        let err = compute_ti_totals(&[line(1, 1_000, 100, 101, 0)], HeaderAdjustments::default())
            .unwrap_err();
        assert!(err.to_string().starts_with("Line 1:"));
    }

    #[test]
    fn test_no_lines_rejected() {
        assert!(compute_ti_totals(&[], HeaderAdjustments::default()).is_err());
    }

    #[test]
    fn test_overflowing_lines_rejected_instead_of_panicking() {
        let half = i64::MAX / 2 + 1;
        let lines = vec![line(1, 1_000, half, 0, 0), line(2, 1_000, half, 0, 0)];
        match compute_ti_totals(&lines, HeaderAdjustments::default()) {
            Err(CoreError::PostingRule(msg)) => assert!(msg.contains("Subtotal"), "{}", msg),
            other => panic!("expected PostingRule, got {:?}", other),
        }

        let lines = vec![line(1, 3_000, half, 0, 0)];
        match compute_ti_totals(&lines, HeaderAdjustments::default()) {
            Err(CoreError::PostingRule(msg)) => assert!(msg.contains("Line 1"), "{}", msg),
            other => panic!("expected PostingRule, got {:?}", other),
        }

        let lines = vec![line(1, 1_000, i64::MAX - 10, 0, 0)];
        let adj = HeaderAdjustments {
            freight: Money::from_satang(100),
            ..Default::default()
        };
        match compute_ti_totals(&lines, adj) {
            Err(CoreError::PostingRule(msg)) => assert!(msg.contains("Grand total"), "{}", msg),
            other => panic!("expected PostingRule, got {:?}", other),
        }
    }

    #[test]
    fn test_preview_of_overflowing_payload_is_an_error() {
        use crate::draft::{TiDraftPayload, TiLineInput};

        let half = i64::MAX / 2 + 1;
        let ti_line = |line_no| TiLineInput {
            line_no,
            sku_id: "sku".to_string(),
            quantity: Quantity::from_units(1),
            unit_cost: Money::from_satang(half),
            line_discount: Money::zero(),
            tax_rate: TaxRate::zero(),
        };
        let payload = TiDraftPayload {
            id: None,
            supplier_id: "s".to_string(),
            location_id: "l".to_string(),
            doc_no: None,
            doc_date: chrono::NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
            remark: None,
            discount_amount: Money::zero(),
            freight_amount: Money::zero(),
            other_charge_amount: Money::zero(),
            status: None,
            idempotency_key: None,
            lines: vec![ti_line(1), ti_line(2)],
        };

        assert!(matches!(
            preview_ti_totals(&payload),
            Err(CoreError::PostingRule(_))
        ));
    }
}
