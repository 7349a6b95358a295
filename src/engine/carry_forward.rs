use chrono::NaiveDate;

use crate::domain::InvestmentUpdate;

/// Carry the last known state of an investment forward to `date_from`.
///
/// `floor` is the latest update dated on or before `date_from`. Returns
/// `None` when the floor already sits exactly on `date_from`, since the
/// window fetch returns it as a real record.
pub fn carry_forward(date_from: NaiveDate, floor: &InvestmentUpdate) -> Option<InvestmentUpdate> {
    if floor.date >= date_from {
        return None;
    }

    Some(InvestmentUpdate {
        id: floor.id,
        investment_id: floor.investment_id,
        date: date_from,
        deposit: None,
        withdrawal: None,
        cost: floor.cost,
        value: floor.value,
    })
}

/// Merge synthesized window-start records with the real window, ascending by date.
///
/// The sort is stable; on equal dates synthesized records come first.
pub fn merge_window(
    synthesized: Vec<InvestmentUpdate>,
    window: Vec<InvestmentUpdate>,
) -> Vec<InvestmentUpdate> {
    let mut merged = synthesized;
    merged.extend(window);
    merged.sort_by_key(|u| u.date);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InvestmentId, UpdateId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn update(date: NaiveDate, deposit: Option<i64>, cost: i64, value: i64) -> InvestmentUpdate {
        InvestmentUpdate {
            id: UpdateId::new_random(),
            investment_id: InvestmentId::new_random(),
            date,
            deposit,
            withdrawal: None,
            cost,
            value,
        }
    }

    #[test]
    fn test_carry_forward_moves_floor_to_window_start() {
        let floor = update(date(2023, 1, 1), Some(1000), 1000, 1000);
        let synthesized = carry_forward(date(2023, 2, 1), &floor).unwrap();

        assert_eq!(synthesized.id, floor.id);
        assert_eq!(synthesized.investment_id, floor.investment_id);
        assert_eq!(synthesized.date, date(2023, 2, 1));
        assert_eq!(synthesized.deposit, None);
        assert_eq!(synthesized.withdrawal, None);
        assert_eq!(synthesized.cost, 1000);
        assert_eq!(synthesized.value, 1000);
    }

    #[test]
    fn test_no_carry_forward_when_floor_is_on_window_start() {
        let floor = update(date(2023, 2, 1), None, 0, 500);
        assert!(carry_forward(date(2023, 2, 1), &floor).is_none());
    }

    #[test]
    fn test_merge_window_sorts_ascending() {
        let synthesized = vec![update(date(2023, 2, 1), None, 0, 1000)];
        let window = vec![
            update(date(2023, 3, 1), None, 0, 1200),
            update(date(2023, 2, 15), None, 0, 1100),
        ];

        let merged = merge_window(synthesized, window);
        let dates: Vec<NaiveDate> = merged.iter().map(|u| u.date).collect();
        assert_eq!(
            dates,
            vec![date(2023, 2, 1), date(2023, 2, 15), date(2023, 3, 1)]
        );
    }

    #[test]
    fn test_merge_window_puts_synthesized_first_on_equal_dates() {
        let synthesized = update(date(2023, 2, 1), None, 10, 1);
        let real = update(date(2023, 2, 1), Some(5), 5, 2);

        let merged = merge_window(vec![synthesized.clone()], vec![real.clone()]);
        assert_eq!(merged, vec![synthesized, real]);
    }
}
