//! End-to-end lifecycle behaviour against SQLite

mod common;

use breakdown::attachments::Upload;
use breakdown::services::{
    AdminEdit, AdminIdentity, ApprovalInput, ClosureInput, LifecycleError, OpenInput,
    TemporaryInput,
};
use breakdown::store::TicketFilter;
use breakdown::ticket::{ApprovalStatus, Stage};
use common::{Harness, ADMIN_PASSWORD, ADMIN_USER};

fn open_input(owner: &str) -> OpenInput {
    OpenInput {
        owner_id: owner.to_string(),
        machine_id: "M-12".to_string(),
        machine_family: "Press".to_string(),
        breakdown_type: "Mechanical".to_string(),
        production_stopped: true,
        problem_description: "belt snapped".to_string(),
        media: None,
    }
}

fn temporary(code: &str) -> TemporaryInput {
    TemporaryInput {
        maintenance_id: code.to_string(),
        corrective_action: "replaced belt".to_string(),
        spare_used: "belt B-40".to_string(),
    }
}

fn closure(code: &str) -> ClosureInput {
    ClosureInput {
        maintenance_id: code.to_string(),
        analysis_report: "root cause X".to_string(),
        media: None,
    }
}

fn approval(code: &str, status: &str) -> ApprovalInput {
    ApprovalInput {
        approval_id: code.to_string(),
        status: status.to_string(),
    }
}

fn upload(name: &str) -> Option<Upload> {
    Some(Upload::new(Some(name.to_string()), b"binary".to_vec()))
}

fn basic_header() -> String {
    use base64::Engine;
    let encoded = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", ADMIN_USER, ADMIN_PASSWORD));
    format!("Basic {}", encoded)
}

async fn admin(h: &Harness) -> AdminIdentity {
    h.gate.authenticate(Some(&basic_header())).unwrap()
}

#[tokio::test]
async fn test_full_lifecycle_scenario() {
    let mut h = Harness::new().await;

    let id = h.engine.open(open_input("U1")).await.unwrap();
    assert!(id.starts_with("BD-"));
    let rows = h.next_mirror().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], id);

    let ticket = h
        .engine
        .advance_temporary(&id, "U1", temporary("MNT-2023-001"))
        .await
        .unwrap();
    assert!(ticket.temporary_form.as_ref().unwrap().approved);
    h.next_mirror().await;

    let err = h
        .engine
        .advance_closure(&id, "U1", closure("BAD-CODE"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidCode { stage: Stage::Closure, ref code } if code == "BAD-CODE"
    ));
    let stored = h.engine.get(&id).await.unwrap();
    assert!(stored.timestamps.closure.is_none());
    assert!(stored.closure_form.is_none());

    let ticket = h
        .engine
        .advance_closure(&id, "U1", closure("CLS-2023-001"))
        .await
        .unwrap();
    assert_eq!(ticket.closure_form.as_ref().unwrap().analysis_report, "root cause X");
    h.next_mirror().await;

    let ticket = h
        .engine
        .advance_approval(&id, "U1", approval("APPR-2023-001", "Approved"))
        .await
        .unwrap();
    assert_eq!(ticket.current_stage(), Stage::Approval);
    let approval_form = ticket.approval_form.as_ref().unwrap();
    assert_eq!(approval_form.status, ApprovalStatus::Approved);
    assert!(approval_form.approved);

    let ts = &ticket.timestamps;
    let temporary_at = ts.temporary.unwrap();
    let closure_at = ts.closure.unwrap();
    let approval_at = ts.approval.unwrap();
    assert!(ts.open <= temporary_at);
    assert!(temporary_at <= closure_at);
    assert!(closure_at <= approval_at);

    let rows = h.next_mirror().await;
    assert_eq!(rows[0][21], "Approved");
    assert_eq!(rows[0][22], "Yes");
}

#[tokio::test]
async fn test_invalid_codes_leave_ticket_untouched() {
    let h = Harness::new().await;
    let id = h.engine.open(open_input("U1")).await.unwrap();
    let before = h.engine.get(&id).await.unwrap();

    assert!(h
        .engine
        .advance_temporary(&id, "U1", temporary("CLS-2023-001"))
        .await
        .is_err());
    assert_eq!(h.engine.get(&id).await.unwrap(), before);

    h.engine
        .advance_temporary(&id, "U1", temporary("MNT-2023-002"))
        .await
        .unwrap();
    h.engine
        .advance_closure(&id, "U1", closure("CLS-2023-001"))
        .await
        .unwrap();
    let before = h.engine.get(&id).await.unwrap();

    let err = h
        .engine
        .advance_approval(&id, "U1", approval("APPR-BOGUS", "Approved"))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidCode { stage: Stage::Approval, .. }));
    assert_eq!(h.engine.get(&id).await.unwrap(), before);
}

#[tokio::test]
async fn test_closure_before_temporary_fails_for_every_owner() {
    let h = Harness::new().await;
    let id = h.engine.open(open_input("U1")).await.unwrap();

    for owner in ["U1", "U2"] {
        let err = h
            .engine
            .advance_closure(&id, owner, closure("CLS-2023-001"))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NotAuthorizedOrNotFound));
    }
    let err = h
        .engine
        .advance_approval(&id, "U1", approval("APPR-2023-001", "Pending"))
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::NotAuthorizedOrNotFound));
}

#[tokio::test]
async fn test_non_owner_matches_missing_ticket_signal() {
    let h = Harness::new().await;
    let id = h.engine.open(open_input("U1")).await.unwrap();

    let foreign = h
        .engine
        .advance_temporary(&id, "U2", temporary("MNT-2023-001"))
        .await
        .unwrap_err();
    let missing = h
        .engine
        .advance_temporary("BD-DOESNOTEXIST-0000", "U2", temporary("MNT-2023-001"))
        .await
        .unwrap_err();

    assert!(matches!(foreign, LifecycleError::NotAuthorizedOrNotFound));
    assert!(matches!(missing, LifecycleError::NotAuthorizedOrNotFound));
    assert_eq!(foreign.to_string(), missing.to_string());

    let stored = h.engine.get(&id).await.unwrap();
    assert!(stored.temporary_form.is_none());
}

#[tokio::test]
async fn test_concurrent_advances_apply_once() {
    let h = Harness::new().await;
    let id = h.engine.open(open_input("U1")).await.unwrap();

    let attempts = (0..8).map(|_| {
        let engine = h.engine.clone();
        let id = id.clone();
        tokio::spawn(async move {
            engine
                .advance_temporary(&id, "U1", temporary("MNT-2023-001"))
                .await
        })
    });
    let mut succeeded = 0;
    for attempt in attempts.collect::<Vec<_>>() {
        match attempt.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert!(matches!(e, LifecycleError::NotAuthorizedOrNotFound)),
        }
    }
    assert_eq!(succeeded, 1);
}

#[tokio::test]
async fn test_every_mutation_runs_on_a_spawned_task() {
    let h = Harness::new().await;
    let engine = h.engine.clone();
    let admin = admin(&h).await;

    let id = tokio::spawn({
        let engine = engine.clone();
        async move {
            let mut input = open_input("U1");
            input.media = upload("photo.jpg");
            engine.open(input).await
        }
    })
    .await
    .unwrap()
    .unwrap();

    let stages = tokio::spawn({
        let (engine, id) = (engine.clone(), id.clone());
        async move {
            engine
                .advance_temporary(&id, "U1", temporary("MNT-2023-001"))
                .await?;
            let mut closing = closure("CLS-2023-001");
            closing.media = upload("report.pdf");
            engine.advance_closure(&id, "U1", closing).await?;
            engine
                .advance_approval(&id, "U1", approval("APPR-2023-001", "Pending"))
                .await
        }
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(stages.current_stage(), Stage::Approval);

    let edited = tokio::spawn({
        let (engine, id, admin) = (engine.clone(), id.clone(), admin.clone());
        async move {
            let edit = AdminEdit {
                open_media: upload("retake.jpg"),
                ..Default::default()
            };
            engine.admin_full_edit(&admin, &id, edit).await
        }
    })
    .await
    .unwrap()
    .unwrap();
    assert!(edited.open_form.media_url.is_some());

    tokio::spawn({
        let (engine, id) = (engine.clone(), id.clone());
        async move { engine.admin_full_delete(&admin, &id).await }
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(h.upload_count().await, 0);
}

#[tokio::test]
async fn test_admin_delete_removes_media_and_record() {
    let mut h = Harness::new().await;
    let mut input = open_input("U1");
    input.media = upload("photo.jpg");
    let id = h.engine.open(input).await.unwrap();
    h.engine
        .advance_temporary(&id, "U1", temporary("MNT-2023-001"))
        .await
        .unwrap();
    let mut closing = closure("CLS-2023-001");
    closing.media = upload("analysis.pdf");
    h.engine.advance_closure(&id, "U1", closing).await.unwrap();
    assert_eq!(h.upload_count().await, 2);

    let identity = admin(&h).await;
    h.engine.admin_full_delete(&identity, &id).await.unwrap();

    assert_eq!(h.upload_count().await, 0);
    assert!(h
        .store
        .find_one(&TicketFilter::by_id(&id))
        .await
        .unwrap()
        .is_none());

    // Eventually the mirror publishes an empty sheet
    loop {
        if h.next_mirror().await.is_empty() {
            break;
        }
    }
}

#[tokio::test]
async fn test_admin_delete_tolerates_missing_blobs() {
    let h = Harness::new().await;
    let mut input = open_input("U1");
    input.media = upload("photo.jpg");
    let id = h.engine.open(input).await.unwrap();

    let url = h.engine.get(&id).await.unwrap().open_form.media_url.unwrap();
    let filename = h.engine.attachments().filename_of(&url).unwrap().to_string();
    tokio::fs::remove_file(h.uploads.path().join(filename)).await.unwrap();

    let identity = admin(&h).await;
    h.engine.admin_full_delete(&identity, &id).await.unwrap();
    assert!(matches!(
        h.engine.get(&id).await,
        Err(LifecycleError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_admin_edit_bypasses_gating() {
    let h = Harness::new().await;
    let id = h.engine.open(open_input("U1")).await.unwrap();
    let opened = h.engine.get(&id).await.unwrap();
    let identity = admin(&h).await;

    let edit = AdminEdit {
        machine_id: Some("M-99".to_string()),
        closure_maintenance_id: Some("CLS-2023-001".to_string()),
        analysis_report: Some("entered late".to_string()),
        closure_media: upload("late.png"),
        ..Default::default()
    };
    let ticket = h.engine.admin_full_edit(&identity, &id, edit).await.unwrap();

    assert_eq!(ticket.open_form.machine_id, "M-99");
    assert!(ticket.timestamps.open >= opened.timestamps.open);
    assert!(ticket.timestamps.temporary.is_none());
    assert!(ticket.timestamps.closure.is_some());
    let closure_form = ticket.closure_form.unwrap();
    assert!(closure_form.approved);
    assert!(closure_form.media_url.unwrap().starts_with("/uploads/"));
    // Untouched fields survive
    assert_eq!(ticket.open_form.problem_description, "belt snapped");
    assert!(ticket.open_form.production_stopped);
}

#[tokio::test]
async fn test_admin_edit_replacing_media_retires_old_blob() {
    let h = Harness::new().await;
    let mut input = open_input("U1");
    input.media = upload("first.jpg");
    let id = h.engine.open(input).await.unwrap();
    assert_eq!(h.upload_count().await, 1);

    let identity = admin(&h).await;
    let edit = AdminEdit {
        open_media: upload("second.jpg"),
        ..Default::default()
    };
    h.engine.admin_full_edit(&identity, &id, edit).await.unwrap();
    assert_eq!(h.upload_count().await, 1);
}

#[tokio::test]
async fn test_list_for_owner_is_newest_first() {
    let h = Harness::new().await;
    let first = h.engine.open(open_input("U1")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = h.engine.open(open_input("U1")).await.unwrap();
    h.engine.open(open_input("U2")).await.unwrap();

    let owned = h.engine.list_for_owner("U1").await.unwrap();
    let ids: Vec<&str> = owned.iter().map(|t| t.ticket_id.as_str()).collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);

    let identity = admin(&h).await;
    assert_eq!(h.engine.list_all(&identity).await.unwrap().len(), 3);
}
