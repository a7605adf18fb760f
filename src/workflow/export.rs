use sea_orm::{ActiveEnum, DatabaseConnection};
use serde::Serialize;

use super::{
    fee::fee_type,
    queue::{QueueFilter, filtered_batches, load_contexts, ordered},
};
use crate::{
    auth::role::{Actor, Capability},
    error::ActionError,
};

/// One attendee per line, with the fee they contribute to their batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Division")]
    pub division: String,
    #[serde(rename = "Church")]
    pub church: String,
    #[serde(rename = "Event")]
    pub event: String,
    #[serde(rename = "Batch")]
    pub batch_number: i32,
    #[serde(rename = "Batch Status")]
    pub batch_status: String,
    #[serde(rename = "Fee Type")]
    pub fee_type: &'static str,
    #[serde(rename = "Full Name")]
    pub full_name: String,
    #[serde(rename = "Nickname")]
    pub nickname: String,
    #[serde(rename = "Age")]
    pub age: i32,
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Type")]
    pub person_type: String,
    #[serde(rename = "Fee")]
    pub fee: i64,
}

pub async fn export_rows(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: &QueueFilter,
) -> Result<Vec<ExportRow>, ActionError> {
    actor.require(Capability::ExportReports)?;
    filter.validate()?;

    let batches = ordered(filtered_batches(filter)).all(db).await?;
    let contexts = load_contexts(db, batches).await?;

    let mut rows = Vec::new();
    for context in contexts {
        let schedule = context.schedule();
        for person in &context.attendees {
            rows.push(ExportRow {
                division: context.division.name.clone(),
                church: context.church.name.clone(),
                event: context.event.name.clone(),
                batch_number: context.batch.batch_number,
                batch_status: context.batch.status.to_value(),
                fee_type: fee_type(context.batch.is_pre_registration),
                full_name: person.full_name.clone(),
                nickname: person.nickname.clone().unwrap_or_default(),
                age: person.age,
                gender: person.gender.to_value(),
                person_type: person.person_type.to_value(),
                fee: schedule.person_fee(person.person_type)?,
            });
        }
    }
    tracing::debug!(rows = rows.len(), "export prepared");
    Ok(rows)
}

pub fn to_csv(rows: &[ExportRow]) -> Result<String, ActionError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| ActionError::Internal(format!("csv export: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ActionError::Internal(format!("csv export: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ActionError::Internal(format!("csv export: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_has_a_header_and_one_line_per_attendee() {
        let row = ExportRow {
            division: "North".to_string(),
            church: "Grace Chapel".to_string(),
            event: "Youth Camp 2025".to_string(),
            batch_number: 1,
            batch_status: "PENDING".to_string(),
            fee_type: "PRE_REGISTRATION",
            full_name: "Dela Cruz, Juan".to_string(),
            nickname: String::new(),
            age: 16,
            gender: "MALE".to_string(),
            person_type: "DELEGATE".to_string(),
            fee: 150,
        };
        let csv = to_csv(&[row]).expect("csv");
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Division,Church,Event,Batch,Batch Status,Fee Type,Full Name,Nickname,Age,Gender,Type,Fee")
        );
        assert_eq!(
            lines.next(),
            Some("North,Grace Chapel,Youth Camp 2025,1,PENDING,PRE_REGISTRATION,\"Dela Cruz, Juan\",,16,MALE,DELEGATE,150")
        );
        assert_eq!(lines.next(), None);
    }
}
