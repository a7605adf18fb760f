use serde::Serialize;

use crate::{
    entities::{attendee, event, sea_orm_active_enums::PersonType},
    error::ActionError,
};

/// Largest amount an event may charge for one person, in minor units.
pub const MAX_AMOUNT: i64 = 100_000_000;

/// People on a batch, grouped the way fees are charged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadCount {
    pub delegates: u32,
    pub siblings: u32,
    pub cooks: u32,
}

impl HeadCount {
    pub fn add(&mut self, person_type: PersonType) {
        match person_type {
            PersonType::Delegate => self.delegates += 1,
            PersonType::Sibling => self.siblings += 1,
            PersonType::Cook => self.cooks += 1,
        }
    }

    pub fn from_types(types: impl IntoIterator<Item = PersonType>) -> Self {
        let mut count = Self::default();
        for person_type in types {
            count.add(person_type);
        }
        count
    }

    pub fn from_attendees<'a>(attendees: impl IntoIterator<Item = &'a attendee::Model>) -> Self {
        Self::from_types(attendees.into_iter().map(|a| a.person_type))
    }

    pub fn total(&self) -> u32 {
        self.delegates + self.siblings + self.cooks
    }
}

/// Rates that apply to one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSchedule {
    pub registration_fee: i64,
    pub sibling_discount: i64,
    pub cook_fee: i64,
}

impl FeeSchedule {
    /// Picks pre-registration or onsite rates from the batch's frozen flag.
    pub fn for_event(event: &event::Model, is_pre_registration: bool) -> Self {
        if is_pre_registration {
            Self {
                registration_fee: event.pre_registration_fee,
                sibling_discount: event.pre_registration_sibling_discount,
                cook_fee: event.cook_registration_fee,
            }
        } else {
            Self {
                registration_fee: event.onsite_registration_fee,
                sibling_discount: event.onsite_sibling_discount,
                cook_fee: event.cook_registration_fee,
            }
        }
    }

    pub fn person_fee(&self, person_type: PersonType) -> Result<i64, ActionError> {
        match person_type {
            PersonType::Delegate => Ok(self.registration_fee),
            PersonType::Sibling => self
                .registration_fee
                .checked_sub(self.sibling_discount)
                .ok_or_else(|| overflow(self)),
            PersonType::Cook => Ok(self.cook_fee),
        }
    }

    pub fn total(&self, count: HeadCount) -> Result<i64, ActionError> {
        let registrants = i64::from(count.delegates) + i64::from(count.siblings);
        self.registration_fee
            .checked_mul(registrants)
            .and_then(|fee| {
                fee.checked_sub(self.sibling_discount.checked_mul(i64::from(count.siblings))?)
            })
            .and_then(|fee| fee.checked_add(self.cook_fee.checked_mul(i64::from(count.cooks))?))
            .ok_or_else(|| overflow(self))
    }
}

/// Adds batch fees into a registration total.
pub fn sum_fees(fees: impl IntoIterator<Item = i64>) -> Result<i64, ActionError> {
    fees.into_iter().try_fold(0i64, |acc, fee| {
        acc.checked_add(fee)
            .ok_or_else(|| ActionError::Internal("fee total out of range".to_string()))
    })
}

fn overflow(schedule: &FeeSchedule) -> ActionError {
    ActionError::Internal(format!("fee out of range for {schedule:?}"))
}

/// Human label for the rate a batch was billed at.
pub fn fee_type(is_pre_registration: bool) -> &'static str {
    if is_pre_registration {
        "PRE_REGISTRATION"
    } else {
        "ONSITE"
    }
}
