use crate::cart::repo_types::CartLine;
use rust_decimal::Decimal;

pub fn line_subtotal(line: &CartLine) -> Decimal {
    Decimal::from(line.quantity) * line.price
}

/// Cart total as the exact sum of line subtotals.
pub fn cart_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(line_subtotal).sum()
}

#[cfg(test)]
mod total_tests {
    use super::*;
    use uuid::Uuid;

    fn line(price: Decimal, quantity: i32) -> CartLine {
        CartLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            name: "oysters".into(),
            slug: "oysters".into(),
            price,
            quantity,
        }
    }

    #[test]
    fn sums_line_subtotals_exactly() {
        let lines = vec![
            line(Decimal::new(999, 2), 2), // 2 x 9.99
            line(Decimal::new(500, 2), 1), // 1 x 5.00
        ];
        assert_eq!(cart_total(&lines), Decimal::new(2498, 2));
    }

    #[test]
    fn empty_cart_totals_zero() {
        assert_eq!(cart_total(&[]), Decimal::ZERO);
    }

    #[test]
    fn subtotal_is_quantity_times_price() {
        let l = line(Decimal::new(1250, 2), 3);
        assert_eq!(line_subtotal(&l), Decimal::new(3750, 2));
    }
}
