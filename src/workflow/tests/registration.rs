use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, prelude::Uuid,
};

use crate::{
    entities::{
        attendee, batch, prelude::*, registration,
        sea_orm_active_enums::{EventStatus, PersonType, ReviewStatus},
    },
    error::ActionError,
    test_support::*,
    workflow::{
        registration::{
            NewRegistration, REOPEN_WARNING, add_batch, batch_number_taken, cancel_registration, create_registration,
            edit_batch, edit_registration, get_registration, list_registrations,
        },
        review::{approve_batch, reject_batch},
    },
};

fn new_registration(world: &World) -> NewRegistration {
    NewRegistration {
        church_id: world.church.id,
        event_id: world.event.id,
        batch: grace_chapel_batch(),
    }
}

#[tokio::test]
async fn grace_chapel_registers_before_the_pre_registration_deadline() {
    let world = World::new().await;
    let now = at(2025, 5, 1, 9);

    let view = create_registration(&world.db, &world.president, new_registration(&world), now)
        .await
        .expect("registration created");

    assert_eq!(view.registration.status, ReviewStatus::Pending);
    assert_eq!(view.registration.president_id, world.president.user_id);
    assert_eq!(view.event_name, "Youth Camp 2025");
    assert_eq!(view.batches.len(), 1);

    let first = &view.batches[0];
    assert_eq!(first.batch.batch_number, 1);
    assert_eq!(first.batch.status, ReviewStatus::Pending);
    assert!(first.batch.is_pre_registration);
    assert_eq!(first.fee_type, "PRE_REGISTRATION");
    assert_eq!(first.head_count.delegates, 4);
    assert_eq!(first.head_count.siblings, 1);
    assert_eq!(first.head_count.cooks, 1);
    assert_eq!(first.fee, 150 * 5 - 30 + 50);
    assert_eq!(view.total_fee, first.fee);

    let stored = Attendee::find()
        .filter(attendee::Column::BatchId.eq(first.batch.id))
        .count(&world.db)
        .await
        .expect("count attendees");
    assert_eq!(stored, 6);
}

#[tokio::test]
async fn second_registration_for_the_same_event_is_refused() {
    let world = World::new().await;
    let now = at(2025, 5, 1, 9);
    create_registration(&world.db, &world.president, new_registration(&world), now)
        .await
        .expect("first registration");

    let err = create_registration(&world.db, &world.president, new_registration(&world), now)
        .await
        .expect_err("duplicate must fail");
    assert!(matches!(err, ActionError::DuplicateRegistration), "got {err:?}");

    let registrations = Registration::find().count(&world.db).await.expect("count");
    assert_eq!(registrations, 1);
}

#[tokio::test]
async fn unique_indexes_catch_writes_that_skip_the_lookup() {
    let world = World::new().await;
    let now = at(2025, 5, 1, 9);
    let view = create_registration(&world.db, &world.president, new_registration(&world), now)
        .await
        .expect("first registration");

    let err = registration::ActiveModel {
        id: Set(Uuid::new_v4()),
        event_id: Set(world.event.id),
        church_id: Set(world.church.id),
        president_id: Set(world.president.user_id),
        status: Set(ReviewStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&world.db)
    .await
    .expect_err("one registration per church and event");
    let mapped = ActionError::from_write(err, || ActionError::DuplicateRegistration);
    assert!(matches!(mapped, ActionError::DuplicateRegistration), "got {mapped:?}");

    let err = batch::ActiveModel {
        id: Set(Uuid::new_v4()),
        registration_id: Set(view.registration.id),
        batch_number: Set(1),
        status: Set(ReviewStatus::Pending),
        is_pre_registration: Set(true),
        receipt_url: Set(None),
        receipt_path: Set(None),
        reviewed_at: Set(None),
        reviewed_by: Set(None),
        rejection_remarks: Set(None),
        created_at: Set(now),
    }
    .insert(&world.db)
    .await
    .expect_err("batch numbers are unique per registration");
    match ActionError::from_write(err, batch_number_taken) {
        ActionError::Conflict { field, .. } => assert_eq!(field, "batchNumber"),
        other => panic!("expected conflict, got {other:?}"),
    }

    assert_eq!(Registration::find().count(&world.db).await.expect("count"), 1);
    assert_eq!(Batch::find().count(&world.db).await.expect("count"), 1);
}

#[tokio::test]
async fn fees_too_large_to_compute_roll_the_registration_back() {
    let world = World::new().await;
    let mut event = world.event.clone().into_active_model();
    event.pre_registration_fee = Set(i64::MAX / 2);
    event.update(&world.db).await.expect("raise fee");

    let err = create_registration(
        &world.db,
        &world.president,
        new_registration(&world),
        at(2025, 5, 1, 9),
    )
    .await
    .expect_err("fee overflows");
    assert!(matches!(err, ActionError::Internal(_)), "got {err:?}");

    assert_eq!(Registration::find().count(&world.db).await.expect("count"), 0);
    assert_eq!(Attendee::find().count(&world.db).await.expect("count"), 0);
}

#[tokio::test]
async fn registration_closes_when_the_event_starts_or_is_cancelled() {
    let world = World::new().await;

    let err = create_registration(
        &world.db,
        &world.president,
        new_registration(&world),
        world.event.start_date,
    )
    .await
    .expect_err("deadline passed");
    assert!(matches!(err, ActionError::EventNotOpen), "got {err:?}");

    let mut cancelled: crate::entities::event::ActiveModel = world.event.clone().into();
    cancelled.status = sea_orm::ActiveValue::Set(EventStatus::Cancelled);
    sea_orm::ActiveModelTrait::update(cancelled, &world.db)
        .await
        .expect("cancel event");

    let err = create_registration(
        &world.db,
        &world.president,
        new_registration(&world),
        at(2025, 5, 1, 9),
    )
    .await
    .expect_err("cancelled event");
    assert!(matches!(err, ActionError::EventNotOpen), "got {err:?}");
    assert_eq!(Batch::find().count(&world.db).await.expect("count"), 0);
}

#[tokio::test]
async fn invalid_attendees_leave_nothing_behind() {
    let world = World::new().await;
    let mut input = new_registration(&world);
    input.batch.attendees[1].age = 0;
    input.batch.attendees[2].full_name = "   ".to_string();

    let err = create_registration(&world.db, &world.president, input, at(2025, 5, 1, 9))
        .await
        .expect_err("invalid payload");
    match err {
        ActionError::Validation(fields) => {
            assert!(fields.contains_key("attendees[1].age"), "{fields:?}");
            assert!(
                fields.keys().any(|k| k.starts_with("attendees[2].")),
                "{fields:?}"
            );
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(Registration::find().count(&world.db).await.expect("count"), 0);
}

#[tokio::test]
async fn presidents_cannot_register_other_churches() {
    let world = World::new().await;
    let (other, _) = world.second_church("Hope Fellowship", "pres@hope.example.org").await;

    let input = NewRegistration {
        church_id: other.id,
        ..new_registration(&world)
    };
    let err = create_registration(&world.db, &world.president, input, at(2025, 5, 1, 9))
        .await
        .expect_err("foreign church");
    assert!(matches!(err, ActionError::Unauthorized), "got {err:?}");
}

#[tokio::test]
async fn later_batches_are_numbered_in_order_and_billed_onsite() {
    let world = World::new().await;
    let view = create_registration(
        &world.db,
        &world.president,
        new_registration(&world),
        at(2025, 5, 1, 9),
    )
    .await
    .expect("registration");
    let registration_id = view.registration.id;

    let second = add_batch(
        &world.db,
        &world.president,
        registration_id,
        payload(vec![
            person("Gio Tan", 16, PersonType::Delegate),
            person("Hana Tan", 11, PersonType::Sibling),
        ]),
        at(2025, 6, 15, 9),
    )
    .await
    .expect("second batch");

    assert_eq!(second.batch.batch_number, 2);
    assert!(!second.batch.is_pre_registration);
    assert_eq!(second.fee_type, "ONSITE");
    assert_eq!(second.fee, 200 * 2 - 20);

    let third = add_batch(
        &world.db,
        &world.president,
        registration_id,
        payload(vec![person("Ivy Uy", 14, PersonType::Delegate)]),
        at(2025, 6, 16, 9),
    )
    .await
    .expect("third batch");
    assert_eq!(third.batch.batch_number, 3);

    let full = get_registration(&world.db, &world.president, registration_id)
        .await
        .expect("registration view");
    let numbers: Vec<i32> = full.batches.iter().map(|b| b.batch.batch_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(full.total_fee, 770 + 380 + 200);
}

#[tokio::test]
async fn pending_batches_can_be_edited_but_reviewed_ones_cannot() {
    let world = World::new().await;
    let view = create_registration(
        &world.db,
        &world.president,
        new_registration(&world),
        at(2025, 5, 1, 9),
    )
    .await
    .expect("registration");
    let batch_id = view.batches[0].batch.id;

    let edited = edit_batch(
        &world.db,
        &world.president,
        batch_id,
        payload(vec![person("Ana Reyes", 16, PersonType::Delegate)]),
        at(2025, 6, 20, 9),
    )
    .await
    .expect("pending edit");
    assert_eq!(edited.attendees.len(), 1);
    assert!(edited.batch.is_pre_registration, "pricing flag is frozen");
    assert_eq!(edited.fee, 150);

    approve_batch(&world.db, &world.admin, batch_id, at(2025, 6, 21, 9))
        .await
        .expect("approve");

    let err = edit_batch(
        &world.db,
        &world.president,
        batch_id,
        grace_chapel_batch(),
        at(2025, 6, 22, 9),
    )
    .await
    .expect_err("approved batch is locked");
    assert!(matches!(err, ActionError::BatchNotEditable), "got {err:?}");
}

#[tokio::test]
async fn editing_a_reviewed_batch_through_the_registration_reopens_it() {
    let world = World::new().await;
    let view = create_registration(
        &world.db,
        &world.president,
        new_registration(&world),
        at(2025, 5, 1, 9),
    )
    .await
    .expect("registration");
    let registration_id = view.registration.id;
    let batch_id = view.batches[0].batch.id;

    let reviewed = approve_batch(&world.db, &world.admin, batch_id, at(2025, 5, 2, 9))
        .await
        .expect("approve");
    assert_eq!(reviewed.registration.status, ReviewStatus::Approved);

    let edit = edit_registration(
        &world.db,
        &world.president,
        registration_id,
        batch_id,
        grace_chapel_batch(),
        at(2025, 5, 3, 9),
    )
    .await
    .expect("reopen");

    assert!(edit.reopened);
    assert_eq!(edit.warning, Some(REOPEN_WARNING));
    assert_eq!(edit.batch.batch.status, ReviewStatus::Pending);
    assert_eq!(edit.batch.batch.reviewed_at, None);
    assert_eq!(edit.batch.batch.reviewed_by, None);
    assert_eq!(edit.registration.status, ReviewStatus::Pending);

    let pending = edit_registration(
        &world.db,
        &world.president,
        registration_id,
        batch_id,
        grace_chapel_batch(),
        at(2025, 5, 4, 9),
    )
    .await
    .expect("plain edit");
    assert!(!pending.reopened);
    assert_eq!(pending.warning, None);
}

#[tokio::test]
async fn cancelling_removes_everything_until_something_is_approved() {
    let world = World::new().await;
    let now = at(2025, 5, 1, 9);
    let view = create_registration(&world.db, &world.president, new_registration(&world), now)
        .await
        .expect("registration");

    reject_batch(&world.db, &world.admin, view.batches[0].batch.id, "Blurry receipt", now)
        .await
        .expect("reject");
    cancel_registration(&world.db, &world.president, view.registration.id, now)
        .await
        .expect("cancel");
    assert_eq!(Registration::find().count(&world.db).await.expect("count"), 0);
    assert_eq!(Attendee::find().count(&world.db).await.expect("count"), 0);

    let view = create_registration(&world.db, &world.president, new_registration(&world), now)
        .await
        .expect("registration again");
    approve_batch(&world.db, &world.admin, view.batches[0].batch.id, now)
        .await
        .expect("approve");
    let err = cancel_registration(&world.db, &world.president, view.registration.id, now)
        .await
        .expect_err("approved registration stays");
    assert!(matches!(err, ActionError::Conflict { .. }), "got {err:?}");
}

#[tokio::test]
async fn presidents_only_list_their_own_registrations() {
    let world = World::new().await;
    let now = at(2025, 5, 1, 9);
    let (hope, hope_president) =
        world.second_church("Hope Fellowship", "pres@hope.example.org").await;

    create_registration(&world.db, &world.president, new_registration(&world), now)
        .await
        .expect("grace");
    create_registration(
        &world.db,
        &hope_president,
        NewRegistration {
            church_id: hope.id,
            ..new_registration(&world)
        },
        now,
    )
    .await
    .expect("hope");

    let own = list_registrations(&world.db, &world.president)
        .await
        .expect("list");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].registration.church_id, world.church.id);

    let all = list_registrations(&world.db, &world.admin).await.expect("list");
    assert_eq!(all.len(), 2);

    let hope_registration = all
        .iter()
        .find(|r| r.registration.church_id == hope.id)
        .map(|r| r.registration.id)
        .expect("hope registration");
    let err = get_registration(&world.db, &world.president, hope_registration)
        .await
        .expect_err("other church");
    assert!(matches!(err, ActionError::Unauthorized), "got {err:?}");

    let batches = Batch::find()
        .filter(batch::Column::BatchNumber.eq(1))
        .count(&world.db)
        .await
        .expect("count");
    assert_eq!(batches, 2);
}
