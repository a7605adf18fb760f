use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, EntityTrait, PaginatorTrait, prelude::Uuid,
};

use super::{
    churches::{
        self, ChurchInput, PastorInput, assign_pastor, create_church, delete_church, list_churches,
        remove_pastor, update_church,
    },
    divisions::{
        self, CoordinatorInput, DivisionInput, assign_coordinator, create_division, delete_division,
        list_divisions, rename_division,
    },
    events::{EventInput, create_event, delete_event, list_open_events, set_event_status},
    users::{ProfileInput, RoleInput, complete_profile, list_users, set_role},
};
use crate::{
    auth::role::Actor,
    entities::{
        coordinator, pastor,
        prelude::*,
        sea_orm_active_enums::{EventStatus, Role},
    },
    error::ActionError,
    test_support::*,
    workflow::registration::{NewRegistration, create_registration},
};

fn division(name: &str) -> DivisionInput {
    DivisionInput {
        name: name.to_string(),
    }
}

fn pastor(name: &str) -> PastorInput {
    PastorInput {
        name: name.to_string(),
        phone: "+63 917 555 0101".to_string(),
        email: Some(" Pastor@Example.org ".to_string()),
    }
}

fn camp_input() -> EventInput {
    EventInput {
        name: "Leaders Summit".to_string(),
        description: Some("  ".to_string()),
        location: "Main Hall".to_string(),
        banner_url: None,
        banner_path: None,
        start_date: at(2025, 9, 1, 8),
        end_date: at(2025, 9, 2, 17),
        pre_registration_start: at(2025, 7, 1, 0),
        pre_registration_end: at(2025, 8, 15, 0),
        pre_registration_fee: 300,
        pre_registration_sibling_discount: 50,
        onsite_registration_fee: 350,
        onsite_sibling_discount: 50,
        cook_registration_fee: 100,
    }
}

#[tokio::test]
async fn division_names_are_unique_after_whitespace_cleanup() {
    let world = World::new().await;

    let created = create_division(&world.db, &world.admin, division("  Central   District "))
        .await
        .expect("create");
    assert_eq!(created.name, "Central District");

    let err = create_division(&world.db, &world.admin, division("Central District"))
        .await
        .expect_err("duplicate");
    match err {
        ActionError::Conflict { field, .. } => assert_eq!(field, "name"),
        other => panic!("expected conflict, got {other:?}"),
    }

    let err = rename_division(&world.db, &world.admin, created.id, division("North District"))
        .await
        .expect_err("rename onto existing");
    assert!(matches!(err, ActionError::Conflict { .. }), "got {err:?}");

    let renamed = rename_division(&world.db, &world.admin, created.id, division("Central"))
        .await
        .expect("rename");
    assert_eq!(renamed.name, "Central");
}

#[tokio::test]
async fn divisions_with_churches_cannot_be_deleted() {
    let world = World::new().await;

    let err = delete_division(&world.db, &world.admin, world.division.id)
        .await
        .expect_err("has a church");
    match err {
        ActionError::HasDependents(message) => assert_eq!(
            message,
            "Cannot delete division \"North District\": it still has 1 church"
        ),
        other => panic!("expected dependents error, got {other:?}"),
    }

    let empty = create_division(&world.db, &world.admin, division("East"))
        .await
        .expect("create");
    assign_coordinator(
        &world.db,
        &world.admin,
        empty.id,
        CoordinatorInput {
            name: "Mario Ramos".to_string(),
        },
    )
    .await
    .expect("coordinator");
    delete_division(&world.db, &world.admin, empty.id)
        .await
        .expect("delete empty division");
    assert_eq!(Coordinator::find().count(&world.db).await.expect("count"), 0);
}

#[tokio::test]
async fn each_division_has_at_most_one_coordinator() {
    let world = World::new().await;
    let input = || CoordinatorInput {
        name: "Lea Salonga".to_string(),
    };

    assign_coordinator(&world.db, &world.admin, world.division.id, input())
        .await
        .expect("first coordinator");
    let err = assign_coordinator(&world.db, &world.admin, world.division.id, input())
        .await
        .expect_err("second coordinator");
    match err {
        ActionError::Conflict { field, .. } => assert_eq!(field, "divisionId"),
        other => panic!("expected conflict, got {other:?}"),
    }

    let summaries = list_divisions(&world.db, &world.admin).await.expect("list");
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].church_count, 1);
    assert_eq!(
        summaries[0].coordinator.as_ref().map(|c| c.name.as_str()),
        Some("Lea Salonga")
    );
}

#[tokio::test]
async fn each_church_has_at_most_one_pastor() {
    let world = World::new().await;

    let first = assign_pastor(&world.db, &world.admin, world.church.id, pastor("Rev. Cruz"))
        .await
        .expect("pastor");
    assert_eq!(first.email.as_deref(), Some("pastor@example.org"));

    let err = assign_pastor(&world.db, &world.admin, world.church.id, pastor("Rev. Lim"))
        .await
        .expect_err("second pastor");
    match err {
        ActionError::Conflict { field, .. } => assert_eq!(field, "churchId"),
        other => panic!("expected conflict, got {other:?}"),
    }

    remove_pastor(&world.db, &world.admin, first.id)
        .await
        .expect("remove");
    assign_pastor(&world.db, &world.admin, world.church.id, pastor("Rev. Lim"))
        .await
        .expect("pastor after removal");
}

#[tokio::test]
async fn coordinator_and_pastor_indexes_reject_a_second_row() {
    let world = World::new().await;
    assign_coordinator(
        &world.db,
        &world.admin,
        world.division.id,
        CoordinatorInput {
            name: "Lea Salonga".to_string(),
        },
    )
    .await
    .expect("first coordinator");
    assign_pastor(&world.db, &world.admin, world.church.id, pastor("Rev. Cruz"))
        .await
        .expect("first pastor");

    // Written straight to the table, the way a concurrent request that passed
    // the lookup would.
    let err = coordinator::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Racing Coordinator".to_string()),
        division_id: Set(world.division.id),
    }
    .insert(&world.db)
    .await
    .expect_err("unique division_id");
    match ActionError::from_write(err, divisions::coordinator_taken) {
        ActionError::Conflict { field, .. } => assert_eq!(field, "divisionId"),
        other => panic!("expected conflict, got {other:?}"),
    }

    let err = pastor::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Rev. Lim".to_string()),
        phone: Set("+63 917 555 0102".to_string()),
        email: Set(None),
        church_id: Set(world.church.id),
    }
    .insert(&world.db)
    .await
    .expect_err("unique church_id");
    match ActionError::from_write(err, churches::pastor_taken) {
        ActionError::Conflict { field, .. } => assert_eq!(field, "churchId"),
        other => panic!("expected conflict, got {other:?}"),
    }

    assert_eq!(Coordinator::find().count(&world.db).await.expect("count"), 1);
    assert_eq!(Pastor::find().count(&world.db).await.expect("count"), 1);
}

#[tokio::test]
async fn churches_need_an_existing_division_and_a_free_name() {
    let world = World::new().await;

    let err = create_church(
        &world.db,
        &world.admin,
        ChurchInput {
            name: "New Life".to_string(),
            division_id: sea_orm::prelude::Uuid::new_v4(),
        },
    )
    .await
    .expect_err("unknown division");
    assert!(matches!(err, ActionError::NotFound("Division")), "got {err:?}");

    let err = create_church(
        &world.db,
        &world.admin,
        ChurchInput {
            name: "Grace Chapel".to_string(),
            division_id: world.division.id,
        },
    )
    .await
    .expect_err("taken name");
    assert!(matches!(err, ActionError::Conflict { field: "name", .. }), "got {err:?}");

    let south = create_division(&world.db, &world.admin, division("South"))
        .await
        .expect("division");
    let church = create_church(
        &world.db,
        &world.admin,
        ChurchInput {
            name: "New Life".to_string(),
            division_id: world.division.id,
        },
    )
    .await
    .expect("church");
    let moved = update_church(
        &world.db,
        &world.admin,
        church.id,
        ChurchInput {
            name: "New Life".to_string(),
            division_id: south.id,
        },
    )
    .await
    .expect("move church");
    assert_eq!(moved.division_id, south.id);

    let listed = list_churches(&world.db, &world.admin, &Default::default())
        .await
        .expect("list");
    let new_life = listed
        .iter()
        .find(|c| c.church.id == church.id)
        .expect("listed");
    assert_eq!(new_life.division_name, "South");
}

#[tokio::test]
async fn churches_in_use_cannot_be_deleted() {
    let world = World::new().await;
    assign_pastor(&world.db, &world.admin, world.church.id, pastor("Rev. Cruz"))
        .await
        .expect("pastor");

    let err = delete_church(&world.db, &world.admin, world.church.id)
        .await
        .expect_err("in use");
    match err {
        ActionError::HasDependents(message) => assert_eq!(
            message,
            "Cannot delete church \"Grace Chapel\": it still has 1 president, an assigned pastor"
        ),
        other => panic!("expected dependents error, got {other:?}"),
    }

    let lonely = seed_church(&world.db, "Lonely Chapel", world.division.id).await;
    delete_church(&world.db, &world.admin, lonely.id)
        .await
        .expect("delete unused church");
}

#[tokio::test]
async fn event_input_is_checked_across_fields() {
    let world = World::new().await;

    let mut input = camp_input();
    input.end_date = at(2025, 8, 31, 0);
    input.pre_registration_end = at(2025, 9, 5, 0);
    input.onsite_sibling_discount = 400;
    input.cook_registration_fee = -1;

    let err = create_event(&world.db, &world.admin, input, at(2025, 6, 1, 0))
        .await
        .expect_err("invalid event");
    match err {
        ActionError::Validation(fields) => {
            assert!(fields.contains_key("endDate"), "{fields:?}");
            assert!(fields.contains_key("preRegistrationEnd"), "{fields:?}");
            assert!(fields.contains_key("onsiteSiblingDiscount"), "{fields:?}");
            assert!(
                fields.keys().any(|k| k.starts_with("cook")),
                "{fields:?}"
            );
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let event = create_event(&world.db, &world.admin, camp_input(), at(2025, 6, 1, 0))
        .await
        .expect("valid event");
    assert_eq!(event.status, EventStatus::Upcoming);
    assert_eq!(event.description, None);
}

#[tokio::test]
async fn event_amounts_are_capped() {
    let world = World::new().await;

    let mut input = camp_input();
    input.pre_registration_fee = i64::MAX / 2;
    input.onsite_registration_fee = crate::workflow::fee::MAX_AMOUNT + 1;

    let err = create_event(&world.db, &world.admin, input, at(2025, 6, 1, 0))
        .await
        .expect_err("oversized fees");
    let ActionError::Validation(fields) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(fields.contains_key("preRegistrationFee"), "{fields:?}");
    assert!(fields.contains_key("onsiteRegistrationFee"), "{fields:?}");
}

#[tokio::test]
async fn open_events_exclude_closed_and_past_ones() {
    let world = World::new().await;
    let summit = create_event(&world.db, &world.admin, camp_input(), at(2025, 6, 1, 0))
        .await
        .expect("summit");

    let open = list_open_events(&world.db, at(2025, 6, 1, 0))
        .await
        .expect("open events");
    let names: Vec<&str> = open.iter().map(|e| e.event.name.as_str()).collect();
    assert_eq!(names, vec!["Youth Camp 2025", "Leaders Summit"]);
    assert!(!open[0].is_pre_registration);
    assert!(open[1].is_pre_registration);

    set_event_status(&world.db, &world.admin, summit.id, EventStatus::Cancelled)
        .await
        .expect("cancel");
    let open = list_open_events(&world.db, at(2025, 7, 2, 0))
        .await
        .expect("open events");
    assert!(open.is_empty());
}

#[tokio::test]
async fn events_with_registrations_cannot_be_deleted() {
    let world = World::new().await;
    create_registration(
        &world.db,
        &world.president,
        NewRegistration {
            church_id: world.church.id,
            event_id: world.event.id,
            batch: grace_chapel_batch(),
        },
        at(2025, 5, 1, 9),
    )
    .await
    .expect("registration");

    let err = delete_event(&world.db, &world.admin, world.event.id)
        .await
        .expect_err("registered event");
    assert!(matches!(err, ActionError::HasDependents(_)), "got {err:?}");

    let summit = create_event(&world.db, &world.admin, camp_input(), at(2025, 6, 1, 0))
        .await
        .expect("summit");
    delete_event(&world.db, &world.admin, summit.id)
        .await
        .expect("delete unused event");
    assert_eq!(Event::find().count(&world.db).await.expect("count"), 1);
}

#[tokio::test]
async fn completing_a_profile_makes_a_president_once_per_church() {
    let world = World::new().await;
    let newcomer = seed_user(&world.db, "new@example.org", Role::User, None).await;
    let actor = Actor::from(&newcomer);

    let err = complete_profile(
        &world.db,
        &actor,
        ProfileInput {
            name: "Newcomer".to_string(),
            church_id: world.church.id,
        },
    )
    .await
    .expect_err("church already led");
    assert!(matches!(err, ActionError::Conflict { field: "churchId", .. }), "got {err:?}");

    let hope = seed_church(&world.db, "Hope Fellowship", world.division.id).await;
    let user = complete_profile(
        &world.db,
        &actor,
        ProfileInput {
            name: "  Joy   Mendoza ".to_string(),
            church_id: hope.id,
        },
    )
    .await
    .expect("profile");
    assert_eq!(user.role, Role::President);
    assert_eq!(user.church_id, Some(hope.id));
    assert_eq!(user.name, "Joy Mendoza");
    assert_ne!(user.auth_hash, newcomer.auth_hash);

    let err = complete_profile(
        &world.db,
        &Actor::from(&user),
        ProfileInput {
            name: "Joy".to_string(),
            church_id: world.church.id,
        },
    )
    .await
    .expect_err("presidents keep their church");
    assert!(matches!(err, ActionError::Conflict { field: "churchId", .. }), "got {err:?}");
}

#[tokio::test]
async fn role_changes_rotate_the_session_hash() {
    let world = World::new().await;
    let member = seed_user(&world.db, "member@example.org", Role::User, None).await;

    let err = set_role(
        &world.db,
        &world.admin,
        member.id,
        RoleInput {
            role: Role::President,
            church_id: None,
        },
    )
    .await
    .expect_err("president without church");
    match err {
        ActionError::Validation(fields) => assert!(fields.contains_key("churchId"), "{fields:?}"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let promoted = set_role(
        &world.db,
        &world.admin,
        member.id,
        RoleInput {
            role: Role::Admin,
            church_id: None,
        },
    )
    .await
    .expect("promote");
    assert_eq!(promoted.role, Role::Admin);
    assert_ne!(promoted.auth_hash, member.auth_hash);

    let err = set_role(
        &world.db,
        &world.admin,
        world.admin.user_id,
        RoleInput {
            role: Role::User,
            church_id: None,
        },
    )
    .await
    .expect_err("own role");
    assert!(matches!(err, ActionError::Validation(_)), "got {err:?}");

    let admins = list_users(
        &world.db,
        &world.admin,
        &super::users::UserFilter {
            role: Some(Role::Admin),
        },
    )
    .await
    .expect("list");
    assert_eq!(admins.len(), 2);

    let err = list_users(&world.db, &world.president, &Default::default())
        .await
        .expect_err("president");
    assert!(matches!(err, ActionError::Unauthorized), "got {err:?}");
}
