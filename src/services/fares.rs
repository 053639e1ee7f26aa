//! Fixed marketplace pricing, in Ugandan shillings.

use serde::Serialize;

pub const FARE_PER_SEAT: i64 = 4_000;
pub const PLATFORM_COMMISSION_PER_SEAT: i64 = 1_000;
pub const DRIVER_SHARE_PER_SEAT: i64 = FARE_PER_SEAT - PLATFORM_COMMISSION_PER_SEAT;

pub const SUBSCRIPTION_FEE: i64 = 6_000;
pub const SUBSCRIPTION_PERIOD_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FareSplit {
    pub total_amount: i64,
    pub driver_amount: i64,
    pub platform_commission: i64,
}

impl FareSplit {
    pub fn for_seats(seats: i32) -> Self {
        let seats = i64::from(seats.max(0));
        Self {
            total_amount: FARE_PER_SEAT * seats,
            driver_amount: DRIVER_SHARE_PER_SEAT * seats,
            platform_commission: PLATFORM_COMMISSION_PER_SEAT * seats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_seat_split() {
        let split = FareSplit::for_seats(1);
        assert_eq!(split.total_amount, 4_000);
        assert_eq!(split.driver_amount, 3_000);
        assert_eq!(split.platform_commission, 1_000);
    }

    #[test]
    fn test_split_always_sums_to_total() {
        for seats in 1..=8 {
            let split = FareSplit::for_seats(seats);
            assert_eq!(split.driver_amount + split.platform_commission, split.total_amount);
        }
    }
}
