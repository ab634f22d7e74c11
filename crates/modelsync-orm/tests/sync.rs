mod common;

use common::{live_columns, users, MemoryConnection};
use modelsync_core::{LiveColumn, Operation, Plan};
use modelsync_orm::{sync, Connection};

#[tokio::test]
async fn test_plan_executes_nothing() {
    let connection = MemoryConnection::new(true);
    connection.connect().await.unwrap();

    let plan = sync::plan(&connection, &users()).await.unwrap();
    assert!(matches!(plan, Plan::CreateTable(_)));
    assert!(connection.statements().is_empty());
}

#[tokio::test]
async fn test_reconcile_alters_drifted_table() {
    let mut live = live_columns(&users());
    live.retain(|c| c.name != "age");
    live.push(LiveColumn::new("nickname", "varchar(20)"));
    let connection = MemoryConnection::new(true).with_live("users", live);
    connection.connect().await.unwrap();

    let plan = sync::reconcile(&connection, &users()).await.unwrap();
    let Plan::Alter { operations, .. } = &plan else {
        panic!("expected an alter plan");
    };
    assert_eq!(operations[0], Operation::DropColumn("nickname".to_string()));
    assert!(matches!(&operations[1], Operation::AddColumn { name, .. } if name == "age"));
    assert_eq!(
        connection.statements(),
        vec![
            "ALTER TABLE `users` DROP COLUMN `nickname`, \
             ADD COLUMN `age` TINYINT(3) UNSIGNED"
        ]
    );
}

#[tokio::test]
async fn test_reconcile_up_to_date_table() {
    let connection = MemoryConnection::new(true).with_table(&users());
    connection.connect().await.unwrap();

    let plan = sync::reconcile(&connection, &users()).await.unwrap();
    assert!(plan.is_empty());
    assert!(connection.statements().is_empty());
}
