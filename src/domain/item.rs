use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::ServiceProjection;
use crate::domain::money::Money;
use crate::domain::time::DurationMin;
use crate::error::{AppError, AppResult};

/// One line of a booking: a service plus selected options, with names and
/// prices snapshotted at composition time so historical bookings survive
/// later catalog edits. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingItem {
    pub service_id: Uuid,
    pub service_name: String,
    pub service_price: Money,
    pub service_duration: DurationMin,
    pub option_ids: Vec<Uuid>,
    pub option_names: Vec<String>,
    pub option_prices: Vec<Money>,
    pub option_durations: Vec<DurationMin>,
}

impl BookingItem {
    pub fn total_price(&self) -> AppResult<Money> {
        self.option_prices
            .iter()
            .try_fold(self.service_price.clone(), |acc, p| acc.add(p))
    }

    pub fn total_duration(&self) -> DurationMin {
        self.option_durations
            .iter()
            .copied()
            .fold(self.service_duration, |acc, d| acc + d)
    }
}

/// Materialize a `BookingItem` from the catalog. Inactive services are
/// rejected; inactive or unknown options are dropped, tolerating stale
/// client payloads.
pub fn compose(service: &ServiceProjection, option_ids: &[Uuid]) -> AppResult<BookingItem> {
    if !service.is_active {
        return Err(AppError::ServiceInactive(service.id));
    }

    let mut item = BookingItem {
        service_id: service.id,
        service_name: service.name.clone(),
        service_price: service.base_price.clone(),
        service_duration: service.base_duration,
        option_ids: Vec::new(),
        option_names: Vec::new(),
        option_prices: Vec::new(),
        option_durations: Vec::new(),
    };

    for option_id in option_ids {
        let Some(option) = service.options.iter().find(|o| o.id == *option_id) else {
            continue;
        };
        if !option.is_active {
            continue;
        }
        item.option_ids.push(option.id);
        item.option_names.push(option.name.clone());
        item.option_prices.push(option.add_price.clone());
        item.option_durations.push(option.add_duration);
    }

    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{OptionProjection, ServiceProjection};
    use crate::domain::money::DEFAULT_CURRENCY;
    use rust_decimal::Decimal;

    fn gel_service() -> ServiceProjection {
        ServiceProjection {
            id: Uuid::new_v4(),
            merchant_id: Uuid::new_v4(),
            name: "Gel manicure".into(),
            base_price: Money::new(Decimal::from(800), DEFAULT_CURRENCY).unwrap(),
            base_duration: DurationMin::new(60).unwrap(),
            allow_stack: false,
            is_active: true,
            options: vec![
                OptionProjection {
                    id: Uuid::new_v4(),
                    name: "Nail art".into(),
                    add_price: Money::new(Decimal::from(200), DEFAULT_CURRENCY).unwrap(),
                    add_duration: DurationMin::new(30).unwrap(),
                    is_active: true,
                },
                OptionProjection {
                    id: Uuid::new_v4(),
                    name: "Discontinued wrap".into(),
                    add_price: Money::new(Decimal::from(100), DEFAULT_CURRENCY).unwrap(),
                    add_duration: DurationMin::new(15).unwrap(),
                    is_active: false,
                },
            ],
        }
    }

    #[test]
    fn totals_are_service_plus_options() {
        let service = gel_service();
        let item = compose(&service, &[service.options[0].id]).unwrap();

        assert_eq!(
            item.total_price().unwrap().amount(),
            Decimal::from(1000)
        );
        assert_eq!(item.total_duration().minutes(), 90);
    }

    #[test]
    fn inactive_service_rejected() {
        let mut service = gel_service();
        service.is_active = false;
        assert!(matches!(
            compose(&service, &[]),
            Err(AppError::ServiceInactive(_))
        ));
    }

    #[test]
    fn inactive_and_unknown_options_filtered() {
        let service = gel_service();
        let stale = service.options[1].id;
        let item = compose(&service, &[stale, Uuid::new_v4()]).unwrap();

        assert!(item.option_ids.is_empty());
        assert_eq!(item.total_duration().minutes(), 60);
        assert_eq!(item.total_price().unwrap().amount(), Decimal::from(800));
    }

    #[test]
    fn recomputing_totals_from_snapshot_is_stable() {
        let service = gel_service();
        let item = compose(&service, &[service.options[0].id]).unwrap();
        let json = serde_json::to_value(&item).unwrap();
        let restored: BookingItem = serde_json::from_value(json).unwrap();

        assert_eq!(
            restored.total_price().unwrap(),
            item.total_price().unwrap()
        );
        assert_eq!(restored.total_duration(), item.total_duration());
    }
}
