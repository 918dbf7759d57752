//! Unit of work raw commands and lifecycle against an in-memory SQLite store.

mod support;

use std::time::Duration;

use sea_orm::{Condition, TransactionTrait, Value};

use common::AppError;
use gateway_store_lib::{with_unit_of_work, Scalar};

use support::{seed_widgets, test_factory, widget};

async fn abc_factory() -> gateway_store_lib::UnitOfWorkFactory {
    let factory = test_factory().await;
    seed_widgets(
        &factory,
        vec![
            support::widget(1, "a"),
            support::widget(2, "b"),
            support::widget(3, "c"),
        ],
    )
    .await;
    factory
}

#[tokio::test]
async fn test_execute_function_single() {
    let factory = test_factory().await;
    let uow = factory.create().await.unwrap();

    let upper: Scalar<String> = uow
        .execute_function_single("upper", vec![Value::from("gateway")], None)
        .await
        .unwrap();

    assert_eq!(upper.into_inner(), "GATEWAY");
}

#[tokio::test]
async fn test_execute_function_collects_rows() {
    let factory = test_factory().await;
    let uow = factory.create().await.unwrap();

    let rows: Vec<Scalar<i64>> = uow
        .execute_function("abs", vec![Value::from(-5i64)], None)
        .await
        .unwrap();

    assert_eq!(rows, vec![Scalar(5)]);
}

#[tokio::test]
async fn test_execute_query_returns_loose_rows() {
    let factory = abc_factory().await;
    let uow = factory.create().await.unwrap();

    let rows = uow
        .execute_query("SELECT id, name FROM widgets ORDER BY id")
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["name"], "a");
    assert_eq!(rows[2]["name"], "c");
}

#[tokio::test]
async fn test_execute_query_with_binds_values() {
    let factory = abc_factory().await;
    let uow = factory.create().await.unwrap();

    let rows = uow
        .execute_query_with(
            "SELECT name FROM widgets WHERE id = ?",
            vec![Value::from(2i32)],
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "b");
}

#[tokio::test]
async fn test_bound_values_are_not_interpreted_as_sql() {
    let factory = abc_factory().await;
    let uow = factory.create().await.unwrap();

    let rows = uow
        .execute_query_with(
            "SELECT name FROM widgets WHERE name = ?",
            vec![Value::from("a' OR '1'='1")],
        )
        .await
        .unwrap();

    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_execute_command_reports_affected_rows() {
    let factory = abc_factory().await;
    let uow = factory.create().await.unwrap();

    let affected = uow
        .execute_command(
            "UPDATE widgets SET name = ? WHERE id >= ?",
            vec![Value::from("renamed"), Value::from(2i32)],
        )
        .await
        .unwrap();
    assert_eq!(affected, 2);

    let widgets = uow.repository::<widget::Entity>().unwrap();
    assert_eq!(widgets.get_by_id(3).await.unwrap().unwrap().name, "renamed");
    assert_eq!(widgets.get_by_id(1).await.unwrap().unwrap().name, "a");
}

#[tokio::test]
async fn test_stored_procedures_are_unavailable_on_sqlite() {
    let factory = test_factory().await;
    let uow = factory.create().await.unwrap();

    let result = uow
        .execute_stored_procedure::<Scalar<i32>>("card_list", vec![], None)
        .await;

    assert!(matches!(result, Err(AppError::Database(_))));
}

#[tokio::test]
async fn test_unsafe_routine_names_are_rejected() {
    let factory = abc_factory().await;
    let uow = factory.create().await.unwrap();

    let result = uow
        .execute_function::<Scalar<i32>>("abs(1); DROP TABLE widgets; --", vec![], None)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let widgets = uow.repository::<widget::Entity>().unwrap();
    assert_eq!(widgets.count(Condition::all()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_raw_commands_fail_after_dispose() {
    let factory = test_factory().await;
    let mut uow = factory.create().await.unwrap();
    uow.dispose();

    assert!(matches!(
        uow.execute_query("SELECT 1").await,
        Err(AppError::Disposed)
    ));
    assert!(matches!(
        uow.execute_command("DELETE FROM widgets", vec![]).await,
        Err(AppError::Disposed)
    ));
}

#[tokio::test]
async fn test_scope_discards_unsaved_changes() {
    let factory = abc_factory().await;

    let staged = with_unit_of_work!(factory, |uow| {
        uow.repository::<widget::Entity>()?
            .insert(support::widget(4, "never saved"));
        Ok(uow.has_changes())
    })
    .unwrap();
    assert!(staged);

    let count = with_unit_of_work!(factory, |uow| {
        uow.repository::<widget::Entity>()?
            .count(Condition::all())
            .await
    })
    .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_scope_persists_saved_changes() {
    let factory = abc_factory().await;

    let saved = with_unit_of_work!(factory, |uow| {
        uow.repository::<widget::Entity>()?
            .insert(support::widget(4, "d"));
        uow.save_changes().await
    })
    .unwrap();
    assert_eq!(saved, 1);

    let uow = factory.create().await.unwrap();
    let widgets = uow.repository::<widget::Entity>().unwrap();
    assert_eq!(widgets.get_by_id(4).await.unwrap().unwrap().name, "d");
}

#[tokio::test]
async fn test_abandoned_commit_keeps_staged_changes() {
    let factory = abc_factory().await;
    let uow = factory.create().await.unwrap();
    let widgets = uow.repository::<widget::Entity>().unwrap();
    widgets.insert(support::widget(4, "d"));

    // The pool holds one connection; while it is busy the commit cannot begin
    let busy = uow.context().unwrap().connection().begin().await.unwrap();
    let abandoned = tokio::time::timeout(Duration::from_millis(100), uow.save_changes()).await;
    assert!(abandoned.is_err());
    busy.rollback().await.unwrap();

    assert!(uow.has_changes());
    assert_eq!(uow.save_changes().await.unwrap(), 1);
    assert_eq!(widgets.get_by_id(4).await.unwrap().unwrap().name, "d");
}
