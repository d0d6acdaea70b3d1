use crate::models::trip::TripRecord;

// Half away from zero, to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn reimbursement(miles: f64, rate_per_mile: f64) -> f64 {
    round2(miles * rate_per_mile)
}

pub fn total_cost(record: &TripRecord) -> f64 {
    round2(
        record.reimbursement
            + record.costs.gas
            + record.costs.food
            + record.costs.tolls
            + record.costs.citation_total(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::{Citation, DistanceSource, TripKind, TripRecord};
    use chrono::Utc;

    fn record(miles: f64, rate: f64) -> TripRecord {
        TripRecord {
            id: "trip-1".into(),
            created_at: Utc::now(),
            kind: TripKind::OneWay,
            start_address: "A".into(),
            end_address: "B".into(),
            departed_at: None,
            arrived_at: None,
            stops: Vec::new(),
            rate_per_mile: rate,
            one_way_miles: miles,
            total_miles: miles,
            reimbursement: reimbursement(miles, rate),
            distance_source: DistanceSource::Manual,
            route_legs: Vec::new(),
            costs: Default::default(),
        }
    }

    #[test]
    fn reimbursement_is_miles_times_rate() {
        assert!((reimbursement(100.0, 0.70) - 70.0).abs() < 1e-9);
        assert!((reimbursement(12.4, 0.67) - 8.31).abs() < 1e-9);
        assert_eq!(reimbursement(0.0, 0.70), 0.0);
    }

    #[test]
    fn reimbursement_is_monotonic_in_miles() {
        let rate = 0.70;
        let mut last = reimbursement(0.0, rate);
        for tenths in 1..=2000 {
            let miles = tenths as f64 / 10.0;
            let next = reimbursement(miles, rate);
            assert!(next >= last, "dropped at {miles} miles");
            last = next;
        }
    }

    #[test]
    fn round2_goes_half_away_from_zero() {
        assert_eq!(round2(1.125), 1.13);
        assert_eq!(round2(-1.125), -1.13);
        assert_eq!(round2(1.004), 1.0);
    }

    #[test]
    fn total_cost_sums_reimbursement_and_spend() {
        let mut rec = record(100.0, 0.70);
        rec.costs.gas = 20.0;
        rec.costs.food = 15.0;
        rec.costs.tolls = 5.0;
        rec.costs.citations.push(Citation {
            amount: 50.0,
            description: "Parking violation".into(),
            state: None,
            county: None,
            department: None,
            citing_officer: None,
            ticket_number: None,
        });
        assert!((total_cost(&rec) - 160.0).abs() < 1e-9);
    }

    #[test]
    fn total_cost_with_no_spend_is_just_reimbursement() {
        let rec = record(40.0, 0.70);
        assert!((total_cost(&rec) - 28.0).abs() < 1e-9);
    }

    #[test]
    fn total_cost_sums_multiple_citations() {
        let mut rec = record(10.0, 0.70);
        for amount in [25.0, 75.5] {
            rec.costs.citations.push(Citation {
                amount,
                description: "Fine".into(),
                state: None,
                county: None,
                department: None,
                citing_officer: None,
                ticket_number: None,
            });
        }
        assert!((total_cost(&rec) - 107.5).abs() < 1e-9);
    }
}
